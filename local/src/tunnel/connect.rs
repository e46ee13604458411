//! Dialing the remote tunnel terminator.

use crate::state::WsStream;

/// Open a fresh WebSocket connection to the remote side. Used both by the
/// sender's reconnect-on-failure path (spec §4.3) and by the switcher's
/// periodic hot-swap (spec §4.5).
pub async fn open_tunnel(url: &str) -> anyhow::Result<WsStream> {
    let (ws, response) = tokio_tungstenite::connect_async(url).await?;
    tracing::debug!(status = %response.status(), "tunnel handshake complete");
    Ok(ws)
}

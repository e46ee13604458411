//! Outbound frame delivery (spec §4.3).
//!
//! Every writer in the process — stream pumps, the acceptor's connect
//! requests, close notifications — funnels through [`send`], which holds
//! `send_lock` for the whole attempt so a concurrent [`super::switcher`]
//! swap can never interleave with a half-written frame.

use std::sync::Arc;

use futures_util::SinkExt;
use tunnel_proto::Message;

use super::connect;
use crate::state::{LocalEngine, TunnelParts, WsMessage};

/// Encode and send `msg` over the current tunnel. On a write failure, dial a
/// replacement tunnel once and retry; a second failure is reported to the
/// caller so it can fail the owning stream.
pub async fn send(engine: &Arc<LocalEngine>, msg: &Message) -> anyhow::Result<()> {
    let bytes = msg.encode()?;

    let _guard = engine.send_lock.lock().await;

    if try_send(engine, &bytes).await.is_ok() {
        return Ok(());
    }

    tracing::warn!("tunnel write failed, reconnecting");
    reconnect(engine).await?;
    try_send(engine, &bytes).await
}

async fn try_send(engine: &Arc<LocalEngine>, bytes: &[u8]) -> anyhow::Result<()> {
    let tunnel = engine
        .current_tunnel
        .load_full()
        .ok_or_else(|| anyhow::anyhow!("no tunnel established"))?;
    let mut sink = tunnel.sink.lock().await;
    sink.send(WsMessage::Binary(bytes.to_vec().into())).await?;
    Ok(())
}

async fn reconnect(engine: &Arc<LocalEngine>) -> anyhow::Result<()> {
    let ws = connect::open_tunnel(&engine.config.remote_url).await?;
    engine.current_tunnel.store(Some(Arc::new(TunnelParts::new(ws))));
    engine.set_connected(true);
    Ok(())
}

//! The tunnel WebSocket server (spec §4.7).
//!
//! Every upgraded connection becomes the new "current" tunnel — replacing
//! whatever connection was current before, the server-side mirror of the
//! local side's transport switcher. The previous connection's read loop
//! keeps running (so any frames still in flight on it are not lost) until
//! it errors out or the peer closes it.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::StreamExt;
use tracing::{info, warn};
use tunnel_proto::Message;

use crate::handlers;
use crate::state::{RemoteEngine, TunnelParts};

/// Serves the tunnel at the listener root — spec §6 names the tunnel URL
/// as `ws://<host>:3811` with no path component.
pub fn router(engine: Arc<RemoteEngine>) -> Router {
    Router::new().route("/", get(upgrade)).with_state(engine)
}

async fn upgrade(
    State(engine): State<Arc<RemoteEngine>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(engine, socket))
}

async fn handle_socket(engine: Arc<RemoteEngine>, socket: axum::extract::ws::WebSocket) {
    info!("tunnel connection established");
    let parts = Arc::new(TunnelParts::new(socket));
    engine.current_tunnel.store(Some(Arc::clone(&parts)));
    engine.set_connected(true);

    loop {
        let next = {
            let mut stream = parts.stream.lock().await;
            stream.next().await
        };

        match next {
            Some(Ok(WsMessage::Binary(bytes))) => match Message::decode(&bytes) {
                Ok(msg) => handlers::dispatch(&engine, msg).await,
                Err(e) => warn!(error = %e, "dropping malformed tunnel frame"),
            },
            Some(Ok(WsMessage::Close(_))) | None => {
                info!("tunnel connection closed");
                break;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                warn!(error = %e, "tunnel read error");
                break;
            }
        }
    }
}

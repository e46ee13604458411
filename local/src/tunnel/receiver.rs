//! Inbound frame handling (spec §4.4).
//!
//! Runs as a long-lived task, reading one frame at a time off the current
//! tunnel and routing it to the stream it belongs to. Each read is bracketed
//! by `recv_lock` so the switcher can pause the receiver mid-loop instead of
//! racing it for the socket.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::watch;
use tracing::{debug, warn};
use tunnel_proto::{Cmd, Message};

use crate::state::{LocalEngine, WsMessage};

/// Run the receive loop until shutdown is signalled.
pub async fn run(engine: Arc<LocalEngine>, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }

        match recv_next(&engine).await {
            Ok(Some(msg)) => dispatch(&engine, msg).await,
            Ok(None) => wait_or_shutdown(&engine, &mut shutdown).await,
            Err(e) => {
                warn!(error = %e, "tunnel read failed");
                engine.set_connected(false);
                wait_or_shutdown(&engine, &mut shutdown).await;
            }
        }

        if should_stop(&mut shutdown) {
            return;
        }
    }
}

fn should_stop(shutdown: &mut watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

async fn wait_or_shutdown(engine: &LocalEngine, shutdown: &mut watch::Receiver<bool>) {
    tokio::select! {
        _ = tokio::time::sleep(engine.config.recv_backoff()) => {}
        _ = shutdown.changed() => {}
    }
}

/// Read exactly one frame off the current tunnel, or `Ok(None)` if there is
/// no tunnel yet to read from.
async fn recv_next(engine: &LocalEngine) -> anyhow::Result<Option<Message>> {
    let _guard = engine.recv_lock.lock().await;

    let tunnel = match engine.current_tunnel.load_full() {
        Some(t) => t,
        None => return Ok(None),
    };

    let mut stream = tunnel.stream.lock().await;
    match stream.next().await {
        Some(Ok(WsMessage::Binary(bytes))) => Ok(Some(Message::decode(&bytes)?)),
        Some(Ok(WsMessage::Close(_))) | None => {
            engine.current_tunnel.store(None);
            anyhow::bail!("tunnel closed by peer")
        }
        Some(Ok(_)) => Ok(None),
        Some(Err(e)) => Err(e.into()),
    }
}

/// Route a decoded frame to the stream it names. Shared between the normal
/// receive loop and the switcher's drain-before-swap path.
pub async fn dispatch(engine: &LocalEngine, msg: Message) {
    match msg.cmd {
        Cmd::Switch => {
            debug!("received switch advisory from remote");
        }
        Cmd::Connect | Cmd::Data => {
            if let Some(entry) = engine.registry.lookup(&msg.cid) {
                let _ = entry.inbound.send(msg).await;
            } else {
                debug!(cid = %msg.cid, "frame for unknown stream, dropping");
            }
        }
        Cmd::Close => {
            if let Some(entry) = engine.registry.lookup(&msg.cid) {
                let _ = entry.inbound.send(msg).await;
            }
            engine.registry.remove(&msg.cid);
        }
    }
}

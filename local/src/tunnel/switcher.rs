//! Periodic hot-swap of the tunnel transport (spec §4.5).
//!
//! Every `switch_interval`, if the tunnel is currently connected, dial a
//! fresh WebSocket, advise the outgoing one with a `switch` frame, drain
//! whatever it still has in flight, and then publish the new transport
//! atomically. Locks are always taken in `recv_lock` → `send_lock` order so
//! this can never deadlock against a concurrent sender or receiver doing the
//! reverse. When not connected, reconnection is §4.3's job alone (spec §9
//! consolidates it there) — the switcher just waits for the next interval.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tracing::{info, warn};
use tunnel_proto::Message;

use super::{connect, receiver};
use crate::state::{LocalEngine, TunnelParts, WsMessage};

pub async fn run(engine: Arc<LocalEngine>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(engine.config.switch_interval());
    interval.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => return,
        }

        if *shutdown.borrow() {
            return;
        }

        if !engine.is_connected() {
            continue;
        }

        if let Err(e) = switch_once(&engine).await {
            warn!(error = %e, "scheduled tunnel switch failed, keeping current tunnel");
        }
    }
}

async fn switch_once(engine: &Arc<LocalEngine>) -> anyhow::Result<()> {
    let new_ws = connect::open_tunnel(&engine.config.remote_url).await?;
    let new_parts = Arc::new(TunnelParts::new(new_ws));

    let recv_guard = engine.recv_lock.lock().await;
    let send_guard = engine.send_lock.lock().await;

    // The switch frame goes out on the *new* link — it's how the remote
    // knows this connection now carries traffic for existing `cid`s.
    advise_switch(&new_parts).await;

    let old = engine.current_tunnel.load_full();
    if let Some(old) = &old {
        drain(engine, old, engine.config.drain_timeout()).await;
    }

    engine.current_tunnel.store(Some(new_parts));
    engine.set_connected(true);
    info!("switched tunnel transport");

    drop(send_guard);
    drop(recv_guard);
    Ok(())
}

async fn advise_switch(new: &TunnelParts) {
    let Ok(bytes) = Message::switch().encode() else {
        return;
    };
    let mut sink = new.sink.lock().await;
    let _ = sink.send(WsMessage::Binary(bytes.into())).await;
}

/// Read whatever the retiring tunnel still has buffered, routing each frame
/// normally, until a read takes longer than `timeout` or the tunnel closes.
async fn drain(engine: &LocalEngine, old: &TunnelParts, timeout: Duration) {
    let mut stream = old.stream.lock().await;
    loop {
        match tokio::time::timeout(timeout, stream.next()).await {
            Ok(Some(Ok(WsMessage::Binary(bytes)))) => match Message::decode(&bytes) {
                Ok(msg) => receiver::dispatch(engine, msg).await,
                Err(e) => warn!(error = %e, "dropping malformed frame during drain"),
            },
            Ok(Some(Ok(_))) => continue,
            _ => return,
        }
    }
}

//! Outbound frame delivery on the remote side (spec §4.7).
//!
//! Unlike the local side, the remote never dials out to re-establish a
//! tunnel — it only has whatever connection the local side most recently
//! opened. A send with no current tunnel simply fails; the caller (an
//! upstream pump) treats that as reason to give up on its stream.

use std::sync::Arc;

use axum::extract::ws::Message as WsMessage;
use futures_util::SinkExt;
use tunnel_proto::Message;

use crate::state::RemoteEngine;

pub async fn send(engine: &Arc<RemoteEngine>, msg: &Message) -> anyhow::Result<()> {
    let bytes = msg.encode()?;

    let _guard = engine.send_lock.lock().await;
    let tunnel = engine
        .current_tunnel
        .load_full()
        .ok_or_else(|| anyhow::anyhow!("no active tunnel connection"))?;

    let mut sink = tunnel.sink.lock().await;
    sink.send(WsMessage::Binary(bytes.into())).await?;
    Ok(())
}

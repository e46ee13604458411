//! Frame dispatch for the remote side (spec §4.8–§4.10).

use std::sync::Arc;

use tracing::{debug, warn};
use tunnel_proto::{Cmd, Message};

use crate::dialer;
use crate::pump;
use crate::registry::UpstreamEntry;
use crate::sender;
use crate::state::RemoteEngine;

/// Route one decoded frame from the tunnel.
pub async fn dispatch(engine: &Arc<RemoteEngine>, msg: Message) {
    match msg.cmd {
        Cmd::Connect => handle_connect(engine, msg).await,
        Cmd::Data => handle_data(engine, msg).await,
        Cmd::Close => handle_close(engine, msg).await,
        Cmd::Switch => debug!("received switch advisory from local"),
    }
}

async fn handle_connect(engine: &Arc<RemoteEngine>, msg: Message) {
    let cid = msg.cid.clone();
    match dialer::dial(&msg.host, msg.port, engine.config.dial_timeout()).await {
        Ok(stream) => {
            let (to_upstream, pump_handle) = pump::spawn(
                Arc::clone(engine),
                cid.clone(),
                msg.host.clone(),
                msg.port,
                stream,
            );
            engine.upstreams.insert(
                cid.clone(),
                UpstreamEntry {
                    to_upstream,
                    pump: pump_handle,
                },
            );
            let _ = sender::send(engine, &Message::connect_reply(&cid, true, "")).await;
        }
        Err(e) => {
            warn!(%cid, host = %msg.host, port = msg.port, error = %e, "upstream dial failed");
            let _ = sender::send(engine, &Message::connect_reply(&cid, false, e.to_string())).await;
        }
    }
}

async fn handle_data(engine: &Arc<RemoteEngine>, msg: Message) {
    if let Some(tx) = engine.upstreams.sender_for(&msg.cid) {
        let _ = tx.send(msg.data).await;
        return;
    }

    // The writer went away (e.g. process restart) but the local side still
    // has the host/port for this stream — redial once before giving up,
    // matching the original server's recovery path.
    if msg.host.is_empty() {
        debug!(cid = %msg.cid, "data frame for unknown stream with no recovery target");
        return;
    }

    match dialer::dial(&msg.host, msg.port, engine.config.dial_timeout()).await {
        Ok(stream) => {
            let (to_upstream, pump_handle) = pump::spawn(
                Arc::clone(engine),
                msg.cid.clone(),
                msg.host.clone(),
                msg.port,
                stream,
            );
            let _ = to_upstream.send(msg.data.clone()).await;
            engine.upstreams.insert(
                msg.cid.clone(),
                UpstreamEntry {
                    to_upstream,
                    pump: pump_handle,
                },
            );
        }
        Err(e) => {
            warn!(cid = %msg.cid, error = %e, "redial for orphaned data frame failed");
            let _ = sender::send(engine, &Message::close(&msg.cid)).await;
        }
    }
}

async fn handle_close(engine: &Arc<RemoteEngine>, msg: Message) {
    engine.upstreams.remove(&msg.cid);
}

//! Per-stream lifecycle: SOCKS5 negotiation, the connect handshake over the
//! tunnel, and the bidirectional data pump (spec §4.1/§4.6).
//!
//! Each accepted TCP connection gets its own `cid`, its own inbound queue
//! registered in the [`crate::registry::StreamRegistry`], and two pump
//! halves relaying bytes in each direction until either side closes.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tunnel_proto::{new_cid, Cmd, Message};

use crate::registry::StreamEntry;
use crate::socks5::{self, Socks5Request};
use crate::state::LocalEngine;
use crate::tunnel::sender;

/// How long to wait for the remote's `connect` reply before giving up.
const CONNECT_ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// States of the local half of a stream (spec §4.6). `Closed` is implicit:
/// once reached, the handler returns and the registry entry is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    AwaitingConnectAck,
    Established,
    HalfClosed,
}

/// Handle one freshly-accepted downstream TCP connection end to end.
pub async fn handle(engine: Arc<LocalEngine>, mut socket: TcpStream, queue_depth: usize) {
    let request = match socks5::accept(&mut socket).await {
        Ok(Some(req)) => req,
        Ok(None) => return,
        Err(e) => {
            debug!(error = %e, "socks5 negotiation failed");
            return;
        }
    };

    let cid = new_cid();
    let (tx, mut rx) = mpsc::channel(queue_depth);
    engine.registry.insert(cid.clone(), StreamEntry { inbound: tx });

    if let Err(e) = open_connect(&engine, &cid, &request).await {
        warn!(cid = %cid, error = %e, "failed to send connect request");
        let _ = socks5::reply(&mut socket, false).await;
        engine.registry.remove(&cid);
        return;
    }

    let ack = tokio::time::timeout(CONNECT_ACK_TIMEOUT, rx.recv()).await;
    let (ok, msg) = match ack {
        Ok(Some(m)) if m.cmd == Cmd::Connect => (m.ok, m.msg),
        Ok(Some(_)) | Ok(None) | Err(_) => (false, "connect timed out or stream closed".into()),
    };

    if !ok {
        debug!(cid = %cid, %msg, "remote refused connect");
        let _ = socks5::reply(&mut socket, false).await;
        engine.registry.remove(&cid);
        return;
    }

    if socks5::reply(&mut socket, true).await.is_err() {
        let _ = sender::send(&engine, &Message::close(&cid)).await;
        engine.registry.remove(&cid);
        return;
    }

    pump(engine, cid, socket, rx, request).await;
}

async fn open_connect(
    engine: &Arc<LocalEngine>,
    cid: &str,
    request: &Socks5Request,
) -> anyhow::Result<()> {
    let frame = Message::connect(cid, request.addr.clone(), request.port);
    sender::send(engine, &frame).await
}

/// Relay bytes in both directions until either side closes, then clean up.
async fn pump(
    engine: Arc<LocalEngine>,
    cid: String,
    socket: TcpStream,
    mut inbound: mpsc::Receiver<Message>,
    request: Socks5Request,
) {
    let (mut read_half, mut write_half) = socket.into_split();
    let mut state = StreamState::Established;

    let up_engine = Arc::clone(&engine);
    let up_cid = cid.clone();
    let up_host = request.addr.clone();
    let up_port = request.port;
    let upstream = tokio::spawn(async move {
        let mut buf = vec![0u8; 16 * 1024];
        loop {
            match read_half.read(&mut buf).await {
                Ok(0) => {
                    let _ = sender::send(&up_engine, &Message::close(&up_cid)).await;
                    return;
                }
                Ok(n) => {
                    let frame = Message::data(
                        &up_cid,
                        up_host.clone(),
                        up_port,
                        Bytes::copy_from_slice(&buf[..n]),
                    );
                    if sender::send(&up_engine, &frame).await.is_err() {
                        return;
                    }
                }
                Err(_) => {
                    let _ = sender::send(&up_engine, &Message::close(&up_cid)).await;
                    return;
                }
            }
        }
    });

    loop {
        match inbound.recv().await {
            Some(msg) if msg.cmd == Cmd::Data && !msg.data.is_empty() => {
                if write_half.write_all(&msg.data).await.is_err() {
                    break;
                }
            }
            // An empty `data` frame is equivalent to `close` (spec §4.6).
            Some(msg) if msg.cmd == Cmd::Data || msg.cmd == Cmd::Close => {
                state = StreamState::HalfClosed;
                let _ = write_half.shutdown().await;
                break;
            }
            Some(_) => continue,
            None => break,
        }
    }

    debug!(%cid, ?state, "stream pump finished");
    upstream.abort();
    engine.registry.remove(&cid);
}

//! Upstream-to-tunnel relay, one task per live `cid` (spec §4.11).
//!
//! Mirrors the original server's per-stream loop: read from the upstream
//! socket, forward as a `data` frame, and give up after an idle period with
//! no traffic (60s by default) — the same timeout the original Python
//! `asyncio.wait_for` applied.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::debug;
use tunnel_proto::Message;

use crate::sender;
use crate::state::RemoteEngine;

/// Spawn the pump task and return the channel its caller should register in
/// the upstream registry for inbound (tunnel-to-upstream) data.
pub fn spawn(
    engine: Arc<RemoteEngine>,
    cid: String,
    host: String,
    port: u16,
    stream: TcpStream,
) -> (mpsc::Sender<Bytes>, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(64);
    let handle = tokio::spawn(run(engine, cid, host, port, stream, rx));
    (tx, handle)
}

async fn run(
    engine: Arc<RemoteEngine>,
    cid: String,
    host: String,
    port: u16,
    stream: TcpStream,
    mut inbound: mpsc::Receiver<Bytes>,
) {
    let (mut read_half, mut write_half) = stream.into_split();
    let idle = engine.config.upstream_idle();
    let mut buf = vec![0u8; 16 * 1024];

    loop {
        tokio::select! {
            data = inbound.recv() => {
                match data {
                    Some(bytes) => {
                        if write_half.write_all(&bytes).await.is_err() {
                            let _ = sender::send(&engine, &Message::close(&cid)).await;
                            break;
                        }
                    }
                    None => break,
                }
            }
            read_result = tokio::time::timeout(idle, read_half.read(&mut buf)) => {
                match read_result {
                    Ok(Ok(0)) => {
                        let _ = sender::send(&engine, &Message::close(&cid)).await;
                        break;
                    }
                    Ok(Ok(n)) => {
                        let frame = Message::data(&cid, host.clone(), port, Bytes::copy_from_slice(&buf[..n]));
                        if sender::send(&engine, &frame).await.is_err() {
                            break;
                        }
                    }
                    Ok(Err(_)) => {
                        let _ = sender::send(&engine, &Message::close(&cid)).await;
                        break;
                    }
                    Err(_) => {
                        debug!(%cid, "upstream idle timeout, closing stream");
                        let _ = sender::send(&engine, &Message::close(&cid)).await;
                        break;
                    }
                }
            }
        }
    }

    engine.upstreams.remove(&cid);
}

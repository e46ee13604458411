//! End-to-end exercises of the local side against a scripted fake remote
//! peer, covering spec.md §8 scenarios S1 (connect + data round trip), S5
//! (upstream dial failure), and S6 (client disconnects before the SOCKS5
//! greeting). The fake remote here plays the wire protocol a real
//! `tunnel-remote` would, without needing a live destination host.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tunnel_local::config::Config;
use tunnel_local::state::LocalEngine;
use tunnel_local::{stream, tunnel};
use tunnel_proto::{Cmd, Message};

/// Spawn a fake remote tunnel terminator that accepts one WebSocket
/// connection and scripts replies: every `connect` is answered with
/// `connect_dial_ok`, and every `data` frame is echoed back verbatim
/// (simulating an echo upstream) until a `close` arrives.
async fn spawn_fake_remote(connect_dial_ok: bool) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let Ok((tcp, _)) = listener.accept().await else {
            return;
        };
        let Ok(ws) = tokio_tungstenite::accept_async(tcp).await else {
            return;
        };
        let (mut sink, mut src) = ws.split();

        while let Some(Ok(WsMessage::Binary(bytes))) = src.next().await {
            let Ok(frame) = Message::decode(&bytes) else {
                continue;
            };
            let reply = match frame.cmd {
                Cmd::Connect => Some(Message::connect_reply(
                    &frame.cid,
                    connect_dial_ok,
                    if connect_dial_ok { "" } else { "connection refused" },
                )),
                Cmd::Data => Some(Message::data(&frame.cid, &frame.host, frame.port, frame.data)),
                Cmd::Close => Some(Message::close(&frame.cid)),
                Cmd::Switch => None,
            };
            if let Some(reply) = reply {
                let encoded = reply.encode().unwrap();
                if sink.send(WsMessage::Binary(encoded.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    addr
}

/// Stand up a `LocalEngine` wired to `remote_addr`, with the tunnel receiver
/// running and a SOCKS5 listener accepting on a fresh loopback port. Returns
/// the SOCKS5 listen address and the engine (for registry assertions).
async fn spawn_local(remote_addr: SocketAddr) -> (SocketAddr, Arc<LocalEngine>) {
    let config = Arc::new(Config::parse_from([
        "tunnel-local",
        "--remote-url",
        &format!("ws://{remote_addr}"),
    ]));
    let engine = Arc::new(LocalEngine::new(Arc::clone(&config)));

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(tunnel::receiver::run(Arc::clone(&engine), shutdown_rx));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let local_addr = listener.local_addr().unwrap();
    let queue_depth = config.stream_queue_depth;

    let accept_engine = Arc::clone(&engine);
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            let engine = Arc::clone(&accept_engine);
            tokio::spawn(stream::handle(engine, socket, queue_depth));
        }
    });

    (local_addr, engine)
}

fn connect_request(domain: &str, port: u16) -> Vec<u8> {
    let mut req = vec![0x05, 0x01, 0x00, 0x03];
    req.push(domain.len() as u8);
    req.extend_from_slice(domain.as_bytes());
    req.extend_from_slice(&port.to_be_bytes());
    req
}

#[tokio::test]
async fn s1_connect_and_data_round_trip() {
    let remote_addr = spawn_fake_remote(true).await;
    let (local_addr, _engine) = spawn_local(remote_addr).await;

    let mut client = TcpStream::connect(local_addr).await.unwrap();
    client.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
    let mut method_reply = [0u8; 2];
    client.read_exact(&mut method_reply).await.unwrap();
    assert_eq!(method_reply, [0x05, 0x00]);

    client
        .write_all(&connect_request("example.com", 80))
        .await
        .unwrap();
    let mut connect_reply = [0u8; 10];
    client.read_exact(&mut connect_reply).await.unwrap();
    assert_eq!(connect_reply, [0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0]);

    let request = b"GET / HTTP/1.0\r\n\r\n";
    client.write_all(request).await.unwrap();
    let mut echoed = vec![0u8; request.len()];
    client.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, request);
}

#[tokio::test]
async fn s5_upstream_dial_failure_reports_general_failure() {
    let remote_addr = spawn_fake_remote(false).await;
    let (local_addr, engine) = spawn_local(remote_addr).await;

    let mut client = TcpStream::connect(local_addr).await.unwrap();
    client.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
    let mut method_reply = [0u8; 2];
    client.read_exact(&mut method_reply).await.unwrap();

    client
        .write_all(&connect_request("unreachable.invalid", 1))
        .await
        .unwrap();
    let mut connect_reply = [0u8; 10];
    client.read_exact(&mut connect_reply).await.unwrap();
    assert_eq!(connect_reply[..2], [0x05, 0x01]); // general failure

    // Downstream should be closed by now and no stream lingers in the registry.
    let mut probe = [0u8; 1];
    let n = client.read(&mut probe).await.unwrap_or(0);
    assert_eq!(n, 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.registry.len(), 0);
}

#[tokio::test]
async fn s6_disconnect_before_greeting_creates_no_registry_entry() {
    let remote_addr = spawn_fake_remote(true).await;
    let (local_addr, engine) = spawn_local(remote_addr).await;

    let client = TcpStream::connect(local_addr).await.unwrap();
    drop(client); // disconnect before sending any greeting bytes

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.registry.len(), 0);
}

//! Shared engine state: the hot-swappable tunnel transport, the stream
//! registry, and the locks that guard transport replacement (spec §3/§5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use futures_util::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::config::Config;
use crate::registry::StreamRegistry;

/// The WebSocket stream type used for the tunnel (plain TCP; spec §1 keeps
/// TLS out of scope, it can be layered on later at the transport level).
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type WsMessage = tokio_tungstenite::tungstenite::Message;

/// One live tunnel connection, split so the sender and receiver can make
/// independent progress while each holds only its own outer lock.
pub struct TunnelParts {
    pub sink: Mutex<SplitSink<WsStream, WsMessage>>,
    pub stream: Mutex<SplitStream<WsStream>>,
}

impl TunnelParts {
    pub fn new(ws: WsStream) -> Self {
        let (sink, stream) = futures_util::StreamExt::split(ws);
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }
}

/// Central engine state, threaded through every task on the local side.
///
/// `current_tunnel` is replaced wholesale by the transport switcher; readers
/// and writers always re-load it so they observe the replacement on their
/// next operation rather than holding a stale reference across a swap.
pub struct LocalEngine {
    pub config: Arc<Config>,
    pub registry: StreamRegistry,
    pub current_tunnel: ArcSwapOption<TunnelParts>,
    /// Serializes all outbound frame writes (spec §3/§4.3).
    pub send_lock: Mutex<()>,
    /// Serializes tunnel reads against a concurrent switch (spec §3/§4.4).
    pub recv_lock: Mutex<()>,
    /// Set by successful recv/send, cleared on transport error (spec §3).
    pub connected: AtomicBool,
}

impl LocalEngine {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            registry: StreamRegistry::new(),
            current_tunnel: ArcSwapOption::empty(),
            send_lock: Mutex::new(()),
            recv_lock: Mutex::new(()),
            connected: AtomicBool::new(false),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn set_connected(&self, value: bool) {
        self.connected.store(value, Ordering::Relaxed);
    }
}

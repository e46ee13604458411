//! Shared engine state for the remote terminator.
//!
//! Mirrors the local side's hot-swappable-transport design (spec §3/§5):
//! whichever WebSocket connection is "current" is where outbound frames go,
//! and a switch just replaces it. Unlike the local side, the remote never
//! dials out itself — it only ever reacts to an inbound upgrade.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::registry::UpstreamRegistry;

pub struct TunnelParts {
    pub sink: Mutex<SplitSink<WebSocket, WsMessage>>,
    pub stream: Mutex<SplitStream<WebSocket>>,
}

impl TunnelParts {
    pub fn new(socket: WebSocket) -> Self {
        let (sink, stream) = futures_util::StreamExt::split(socket);
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }
}

pub struct RemoteEngine {
    pub config: Arc<Config>,
    pub upstreams: UpstreamRegistry,
    pub current_tunnel: ArcSwapOption<TunnelParts>,
    /// Serializes outbound frame writes against a connection swap.
    pub send_lock: Mutex<()>,
    pub connected: AtomicBool,
}

impl RemoteEngine {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            upstreams: UpstreamRegistry::new(),
            current_tunnel: ArcSwapOption::empty(),
            send_lock: Mutex::new(()),
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

//! Local-process configuration.

use clap::Parser;

/// SOCKS5 local proxy: accepts SOCKS5 CONNECT streams and multiplexes them
/// over a single WebSocket tunnel to a remote proxy.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    /// Address to bind the SOCKS5 listener on.
    #[arg(long, env = "TUNNEL_LOCAL_LISTEN_ADDR", default_value = "0.0.0.0")]
    pub listen_addr: String,

    /// Port to bind the SOCKS5 listener on.
    #[arg(long, env = "TUNNEL_LOCAL_LISTEN_PORT", default_value_t = 3810)]
    pub listen_port: u16,

    /// WebSocket URL of the remote tunnel terminator.
    #[arg(long, env = "TUNNEL_LOCAL_REMOTE_URL", default_value = "ws://127.0.0.1:3811")]
    pub remote_url: String,

    /// Transport switch interval in seconds (spec default: 8s).
    #[arg(long, env = "TUNNEL_LOCAL_SWITCH_INTERVAL_SECS", default_value_t = 8)]
    pub switch_interval_secs: u64,

    /// Per-read timeout while draining the old tunnel during a switch, in
    /// milliseconds (spec default: 50ms).
    #[arg(long, env = "TUNNEL_LOCAL_DRAIN_TIMEOUT_MS", default_value_t = 50)]
    pub drain_timeout_ms: u64,

    /// Backoff after a tunnel recv failure, in milliseconds (spec default: 500ms).
    #[arg(long, env = "TUNNEL_LOCAL_RECV_BACKOFF_MS", default_value_t = 500)]
    pub recv_backoff_ms: u64,

    /// Depth of each per-stream inbound queue (spec §9: "modest depth, e.g. 64").
    #[arg(long, env = "TUNNEL_LOCAL_STREAM_QUEUE_DEPTH", default_value_t = 64)]
    pub stream_queue_depth: usize,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "TUNNEL_LOCAL_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Output logs as JSON.
    #[arg(long, env = "TUNNEL_LOCAL_LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

impl Config {
    pub fn switch_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.switch_interval_secs)
    }

    pub fn drain_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.drain_timeout_ms)
    }

    pub fn recv_backoff(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.recv_backoff_ms)
    }
}

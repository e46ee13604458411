//! Remote-process configuration.

use clap::Parser;

/// Remote tunnel terminator: accepts the WebSocket tunnel from a local proxy
/// and relays its multiplexed streams to real upstream addresses.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    /// Address to bind the tunnel WebSocket server on.
    #[arg(long, env = "TUNNEL_REMOTE_LISTEN_ADDR", default_value = "0.0.0.0")]
    pub listen_addr: String,

    /// Port to bind the tunnel WebSocket server on.
    #[arg(long, env = "TUNNEL_REMOTE_LISTEN_PORT", default_value_t = 3811)]
    pub listen_port: u16,

    /// Idle timeout for an upstream connection with no traffic either way,
    /// in seconds (spec default: 60s, matching the original server loop).
    #[arg(long, env = "TUNNEL_REMOTE_UPSTREAM_IDLE_SECS", default_value_t = 60)]
    pub upstream_idle_secs: u64,

    /// Connect timeout when dialing an upstream address, in seconds.
    #[arg(long, env = "TUNNEL_REMOTE_DIAL_TIMEOUT_SECS", default_value_t = 10)]
    pub dial_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "TUNNEL_REMOTE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Output logs as JSON.
    #[arg(long, env = "TUNNEL_REMOTE_LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

impl Config {
    pub fn upstream_idle(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.upstream_idle_secs)
    }

    pub fn dial_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.dial_timeout_secs)
    }
}

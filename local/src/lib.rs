//! SOCKS5 local proxy library: the acceptor, stream registry, tunnel
//! sender/receiver, transport switcher, and per-stream pumps (spec
//! §4.1-§4.6). `main.rs` is a thin CLI wrapper around [`app::run`]; the
//! modules here are `pub` so integration tests can drive them directly
//! against loopback sockets instead of mocking the transport.

pub mod app;
pub mod config;
pub mod registry;
pub mod socks5;
pub mod state;
pub mod stream;
pub mod tunnel;

//! Remote tunnel terminator library: the WebSocket tunnel server, upstream
//! dialer/registry, and per-stream upstream pump (spec §4.7-§4.11).
//! `main.rs` is a thin CLI wrapper around [`app::run`]; the modules here are
//! `pub` so integration tests can drive them directly against loopback
//! sockets instead of mocking the transport.

pub mod app;
pub mod config;
pub mod dialer;
pub mod handlers;
pub mod pump;
pub mod registry;
pub mod sender;
pub mod server;
pub mod state;

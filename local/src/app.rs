//! Application lifecycle: tracing setup, task orchestration, shutdown.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::state::LocalEngine;
use crate::{stream, tunnel};

/// Run the full application lifecycle after config has been parsed.
pub async fn run(config: Config) -> anyhow::Result<()> {
    init_tracing(&config);

    let config = Arc::new(config);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = format!("{}:{}", config.listen_addr, config.listen_port),
        remote = %config.remote_url,
        "tunnel-local starting"
    );

    let engine = Arc::new(LocalEngine::new(Arc::clone(&config)));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = TcpListener::bind((config.listen_addr.as_str(), config.listen_port)).await?;
    info!(addr = %listener.local_addr()?, "socks5 listener bound");

    let receiver_handle = tokio::spawn(tunnel::receiver::run(
        Arc::clone(&engine),
        shutdown_rx.clone(),
    ));
    let switcher_handle = tokio::spawn(tunnel::switcher::run(
        Arc::clone(&engine),
        shutdown_rx.clone(),
    ));
    let acceptor_handle = tokio::spawn(accept_loop(
        Arc::clone(&engine),
        listener,
        shutdown_rx.clone(),
    ));

    wait_for_shutdown().await;
    info!("shutdown signal received, stopping");
    let _ = shutdown_tx.send(true);

    let _ = tokio::join!(receiver_handle, switcher_handle, acceptor_handle);
    info!("tunnel-local stopped");
    Ok(())
}

async fn accept_loop(engine: Arc<LocalEngine>, listener: TcpListener, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, peer)) => {
                        let engine = Arc::clone(&engine);
                        let depth = engine.config.stream_queue_depth;
                        tokio::spawn(async move {
                            stream::handle(engine, socket, depth).await;
                        });
                        tracing::trace!(%peer, "accepted socks5 connection");
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                    }
                }
            }
            _ = shutdown.changed() => return,
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

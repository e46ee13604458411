//! Application lifecycle for the remote terminator.

use std::sync::Arc;

use tokio::signal;
use tracing::info;

use crate::config::Config;
use crate::server;
use crate::state::RemoteEngine;

pub async fn run(config: Config) -> anyhow::Result<()> {
    init_tracing(&config);

    let config = Arc::new(config);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = format!("{}:{}", config.listen_addr, config.listen_port),
        "tunnel-remote starting"
    );

    let engine = Arc::new(RemoteEngine::new(Arc::clone(&config)));
    let app = server::router(Arc::clone(&engine));

    let listener = tokio::net::TcpListener::bind((config.listen_addr.as_str(), config.listen_port)).await?;
    info!(addr = %listener.local_addr()?, "tunnel server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    info!("tunnel-remote stopped");
    Ok(())
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

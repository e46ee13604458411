use clap::Parser;
use tunnel_local::app;
use tunnel_local::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    app::run(config).await
}

use clap::Parser;
use tunnel_remote::app;
use tunnel_remote::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    app::run(config).await
}

use anyhow::Context;
use fauna::domain::config::ApiConfig;
use fauna::kernel::config::load_config;
use fauna_logger::Logger;
use fauna_server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg: ApiConfig = load_config(Some("server")).context("Critical: Configuration is malformed")?;

    let _log = Logger::builder().name(env!("CARGO_PKG_NAME")).config(&cfg.logging).init()?;

    Server::builder().config(cfg).build().await?.run().await
}

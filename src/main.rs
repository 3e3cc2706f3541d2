use clap::Parser;
use tracing::{debug, info, warn};

use catalog::config::Config;

mod log;
mod signal;

#[derive(Parser)]
#[command(version)]
struct Args {
    /// Set config file path
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = Config::parse(args.config)?;

    log::set(format!(
        "vidcat={},catalog={},blob_store={},http_log={},tower_http={},sea_orm=warn,sqlx=warn",
        cfg.log.level, cfg.log.level, cfg.log.level, cfg.log.level, cfg.log.level
    ));

    warn!("set log level : {}", cfg.log.level);
    debug!("config : {:?}", cfg);

    let listener = tokio::net::TcpListener::bind(cfg.http.listen).await?;

    catalog::serve(cfg, listener, shutdown_signal()).await?;
    info!("Server shutdown");
    Ok(())
}

async fn shutdown_signal() {
    let name = signal::wait_for_stop_signal().await;
    debug!("Received signal: {}", name);
}

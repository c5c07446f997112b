use anyhow::Result;
use clap::Parser;
use core_logic::{setup_logger, SchedulingMode, WorkerRunner};
use dotenv::dotenv;
use layeredge_project::{CampaignRunner, LayerEdgeConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "LayerEdge light-node campaign loop", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "chains/layeredge/config.toml")]
    config: String,
    /// Run one cycle and exit
    #[arg(long)]
    once: bool,
    /// Override the configured scheduling mode (sequential | fan_out)
    #[arg(short, long)]
    mode: Option<SchedulingMode>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = setup_logger("logs");
    dotenv().ok();

    let args = Args::parse();
    info!("Loading config from: {}", args.config);

    let mut config = match LayerEdgeConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            return Err(e);
        }
    };
    if let Some(mode) = args.mode {
        config.scheduling_mode = mode;
    }

    info!(
        "Wallet file: {} | proxy file: {} | mode: {} | cycle: {}s",
        config.wallet_file, config.proxy_file, config.scheduling_mode, config.cycle_interval_secs
    );

    let token = WorkerRunner::shutdown_token();
    let runner = CampaignRunner::new(config);
    runner.run_forever(token, args.once).await?;

    info!("Campaign loop stopped");
    Ok(())
}

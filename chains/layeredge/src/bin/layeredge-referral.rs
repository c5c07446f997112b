use anyhow::{bail, Context, Result};
use clap::Parser;
use core_logic::{setup_logger, ProxyManager, SchedulingMode};
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use dotenv::dotenv;
use layeredge_project::config::parse_wallet_count;
use layeredge_project::{LayerEdgeConfig, ReferralRunner};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Create LayerEdge wallets and register them with a referral code", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "chains/layeredge/config.toml")]
    config: String,
    /// Override the configured scheduling mode (sequential | fan_out)
    #[arg(short, long)]
    mode: Option<SchedulingMode>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = setup_logger("logs");
    dotenv().ok();

    let args = Args::parse();
    let mut config = LayerEdgeConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;
    if let Some(mode) = args.mode {
        config.scheduling_mode = mode;
    }

    let theme = ColorfulTheme::default();

    let use_proxy = Confirm::with_theme(&theme)
        .with_prompt("Use proxies?")
        .default(false)
        .interact()
        .context("Cannot prompt (not a terminal?)")?;

    let proxies = if use_proxy {
        if !std::path::Path::new(&config.proxy_file).exists() {
            bail!("{} not found", config.proxy_file);
        }
        let proxies = ProxyManager::load_proxy_specs(&config.proxy_file);
        if proxies.is_empty() {
            bail!("{} contains no usable proxies", config.proxy_file);
        }
        info!("Proxies enabled: {} loaded", proxies.len());
        proxies
    } else {
        Vec::new()
    };

    let code: String = Input::with_theme(&theme)
        .with_prompt("Referral code")
        .interact_text()
        .context("Failed to read referral code")?;

    let raw_count: String = Input::with_theme(&theme)
        .with_prompt("Number of wallets to create")
        .interact_text()
        .context("Failed to read wallet count")?;
    let count = match parse_wallet_count(&raw_count) {
        Ok(count) => count,
        Err(e) => {
            error!("Invalid number of wallets: {}", e);
            return Err(e.into());
        }
    };

    let runner = ReferralRunner::new(config);
    let summary = runner.create_and_register(code.trim(), count, &proxies).await;

    if summary.registered == 0 && count > 0 {
        error!("No wallet was registered");
    }
    Ok(())
}

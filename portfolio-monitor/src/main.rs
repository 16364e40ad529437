use anyhow::Context;
use clap::Parser;
use portfolio_monitor::config::DEFAULT_CONFIG_PATH;
use portfolio_monitor::output::save_digest;
use portfolio_monitor::render::{render_text, subject_line};
use portfolio_monitor::{DigestPipeline, MonitorConfig};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Weekly news digest for a list of portfolio companies
#[derive(Parser, Debug)]
#[command(name = "portfolio-monitor", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Number of days to look back for news
    #[arg(long)]
    days: Option<u32>,

    /// Skip funding information lookup (faster)
    #[arg(long)]
    skip_funding: bool,

    /// Number of companies fetched concurrently
    #[arg(long)]
    concurrency: Option<usize>,

    /// Directory the digest is written to
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Also write the report as JSON
    #[arg(long)]
    json: bool,

    /// Print only, do not write files
    #[arg(long)]
    no_save: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    info!("Portfolio Monitor - Starting");

    let mut config = MonitorConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    if let Some(days) = cli.days {
        config.settings.days_back = days;
    }
    if let Some(concurrency) = cli.concurrency {
        config.settings.concurrency = concurrency;
    }
    if cli.skip_funding {
        info!("Skipping funding information (--skip-funding flag set)");
        config.settings.include_funding = false;
    }

    let pipeline = DigestPipeline::from_config(&config).map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    info!("Monitoring {} companies", config.companies.len());
    let report = pipeline.run(&config.companies).await?;

    let body = render_text(&report);
    let subject = subject_line(&report);
    println!("Subject: {}\n\n{}", subject, body);

    if !cli.no_save {
        save_digest(&cli.output_dir, &report, &body, cli.json)
            .await
            .context("saving digest")?;
    }

    info!("Portfolio Monitor - Finished (run {})", report.run_id);
    Ok(())
}

//! httpcheck binary entry point.
//!
//! Loads the target list, probes each target once and hands the metrics to
//! the configured sink.

use clap::Parser;
use httpcheck::{
    config::AppConfig,
    runner,
    sink::{InfluxSink, OutputFormat, Sink, StdoutSink},
};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// HTTP endpoint health-check probe
#[derive(Parser, Debug)]
#[command(name = "httpcheck", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "app.yml", env = "HTTPCHECK_CONFIG")]
    config: String,

    /// Print metrics instead of writing them to InfluxDB
    #[arg(long)]
    print: bool,

    /// Output format for printed metrics: short, long, line or json
    #[arg(long, default_value = "short", env = "HTTPCHECK_FORMAT")]
    format: OutputFormat,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("httpcheck=info".parse()?))
        .init();

    let cli = Cli::parse();

    // Load configuration
    tracing::info!("Loading configuration from {}", cli.config);
    let cfg = AppConfig::load(&cli.config).inspect_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
    })?;
    let mut targets = cfg.targets()?;

    let sink = match &cfg.influxdb {
        Some(influx) if !cli.print => {
            tracing::info!("Writing metrics to {} (database {})", influx.url, influx.database);
            Sink::Influx(InfluxSink::new(influx)?)
        }
        _ => Sink::Stdout(StdoutSink::new(cli.format)),
    };

    let acc = runner::run(&mut targets).await;
    sink.emit(&acc).await?;

    Ok(())
}

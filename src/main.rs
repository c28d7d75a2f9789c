use clap::Parser;
use iva_ofe::cli::{Cli, Commands};
use iva_ofe::config::Config;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration; an invalid file is fatal, a missing one is not
    let config = if Path::new(&cli.config).exists() {
        Config::load(&cli.config)?
    } else {
        eprintln!("Warning: {} not found, using default configuration", cli.config);
        Config::default()
    };

    iva_ofe::telemetry::init_telemetry(&config.telemetry)?;

    match &cli.command {
        Commands::Fetch(args) => {
            tracing::info!(ticker = %args.ticker, "Fetching price data");
            args.execute(&config).await?;
        }
        Commands::Detect(args) => {
            tracing::info!(ticker = %args.ticker, "Detecting volume anomalies");
            args.execute(&config).await?;
        }
        Commands::Chain(args) => {
            tracing::info!(ticker = %args.ticker, "Scoring option chain");
            args.execute(&config).await?;
        }
        Commands::Run(args) => {
            tracing::info!(ticker = %args.ticker, live = args.live, "Starting engine run");
            args.execute(&config).await?;
        }
        Commands::Collect(args) => {
            tracing::info!(ticker = %args.ticker, "Starting real-time collector");
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration ({}):", cli.config);
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

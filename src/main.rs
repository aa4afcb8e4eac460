//! folio: static ETF allocation report.
//!
//! Usage:
//!   folio --config folio.toml --prices prices.csv
//!   folio --config folio.toml                       (Yahoo, `yahoo` feature)
//!
//! Environment:
//!   RUST_LOG - log filter (default: info)

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use folio_rs::Analysis;
use folio_rs::AnalysisConfig;
use folio_rs::PricePanel;
use folio_rs::data::read_csv;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(about = "Mean-variance allocation, outcome simulation and rebalancing guidance for ETFs")]
struct Args {
  /// TOML analysis config; built-in defaults when omitted
  #[arg(long, env = "FOLIO_CONFIG")]
  config: Option<PathBuf>,

  /// Wide price CSV (`date,<asset>...`); fetched from Yahoo when omitted
  #[arg(long, env = "FOLIO_PRICES")]
  prices: Option<PathBuf>,

  /// Write CSV exports here (overrides the config)
  #[arg(long)]
  export_dir: Option<PathBuf>,

  /// Write HTML charts here
  #[arg(long)]
  plots_dir: Option<PathBuf>,

  /// Simulation and random-portfolio seed
  #[arg(long)]
  seed: Option<u64>,

  /// Number of simulated paths
  #[arg(long)]
  paths: Option<usize>,
}

fn load_prices(args: &Args, config: &AnalysisConfig) -> Result<PricePanel> {
  if let Some(path) = &args.prices {
    info!(path = %path.display(), "reading prices");
    return read_csv(path);
  }
  fetch(config)
}

#[cfg(feature = "yahoo")]
fn fetch(config: &AnalysisConfig) -> Result<PricePanel> {
  info!(tickers = config.tickers.len(), start = %config.start, "fetching prices from Yahoo Finance");
  folio_rs::data::yahoo::fetch_prices_blocking(&config.tickers, config.start, config.end)
}

#[cfg(not(feature = "yahoo"))]
fn fetch(_config: &AnalysisConfig) -> Result<PricePanel> {
  anyhow::bail!("no --prices file given and folio was built without the `yahoo` feature")
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let mut config = match &args.config {
    Some(path) => AnalysisConfig::from_toml_file(path)?,
    None => AnalysisConfig::default(),
  };
  if let Some(seed) = args.seed {
    config.simulation.seed = seed;
  }
  if let Some(paths) = args.paths {
    config.simulation.n_paths = paths;
  }
  if args.export_dir.is_some() {
    config.export_dir = args.export_dir.clone();
  }

  let prices = load_prices(&args, &config)?;
  let report = Analysis::new(config).run(&prices)?;
  println!("{}", report.render());

  if let Some(dir) = &report.config.export_dir {
    for path in report.export_csv(dir)? {
      info!(path = %path.display(), "exported");
    }
  }
  if let Some(dir) = &args.plots_dir {
    report.write_plots(dir)?;
  }

  Ok(())
}

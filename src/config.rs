//! # Configuration
//!
//! Analysis settings loaded from TOML. Every field has a default, so an empty
//! file reproduces the standard five-ETF run.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

use crate::portfolio::PortfolioEngineConfig;
use crate::portfolio::RebalanceConfig;
use crate::returns::CASH;
use crate::returns::CashConfig;
use crate::returns::ReturnMethod;
use crate::simulation::SimulationConfig;

/// An asset name and the Yahoo symbol it is priced from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerSpec {
  pub name: String,
  pub symbol: String,
}

impl TickerSpec {
  pub fn new(name: &str, symbol: &str) -> Self {
    Self {
      name: name.to_string(),
      symbol: symbol.to_string(),
    }
  }
}

/// Data coverage requirements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
  /// Fraction of the common calendar each asset must have prices for.
  pub min_fraction: f64,
}

impl Default for CoverageConfig {
  fn default() -> Self {
    Self { min_fraction: 0.95 }
  }
}

/// Full analysis configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
  pub tickers: Vec<TickerSpec>,
  pub start: NaiveDate,
  pub end: Option<NaiveDate>,
  pub return_method: ReturnMethod,
  /// Annual expense ratio per asset name.
  pub annual_fees: BTreeMap<String, f64>,
  pub cash: CashConfig,
  pub optimizer: PortfolioEngineConfig,
  pub coverage: CoverageConfig,
  pub simulation: SimulationConfig,
  pub rebalance: RebalanceConfig,
  /// Number of Dirichlet portfolios for the frontier cloud.
  pub random_portfolios: usize,
  /// Weights below this are folded into one line in the allocation table.
  pub display_threshold: f64,
  /// Write CSV exports here when set.
  pub export_dir: Option<PathBuf>,
}

impl Default for AnalysisConfig {
  fn default() -> Self {
    Self {
      tickers: vec![
        TickerSpec::new("USA_SP500", "SPY"),
        TickerSpec::new("Europe", "VGK"),
        TickerSpec::new("EmergingMarkets", "EEM"),
        TickerSpec::new("Gold", "GLD"),
        TickerSpec::new("Bonds", "AGG"),
      ],
      start: NaiveDate::from_ymd_opt(2012, 10, 16).unwrap_or_default(),
      end: None,
      return_method: ReturnMethod::Log,
      annual_fees: BTreeMap::new(),
      cash: CashConfig::default(),
      optimizer: PortfolioEngineConfig::default(),
      coverage: CoverageConfig::default(),
      simulation: SimulationConfig::default(),
      rebalance: RebalanceConfig::default(),
      random_portfolios: 2000,
      display_threshold: 0.005,
      export_dir: None,
    }
  }
}

impl AnalysisConfig {
  pub fn from_toml_str(s: &str) -> Result<Self> {
    let config: Self = toml::from_str(s).context("invalid analysis config")?;
    config.validate()?;
    Ok(config)
  }

  pub fn from_toml_file(path: &Path) -> Result<Self> {
    let raw = fs::read_to_string(path)
      .with_context(|| format!("failed to read config {}", path.display()))?;
    Self::from_toml_str(&raw).with_context(|| format!("in {}", path.display()))
  }

  /// Asset names in ticker order, plus `Cash` when it is included.
  pub fn asset_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.tickers.iter().map(|t| t.name.clone()).collect();
    if self.cash.include {
      names.push(CASH.to_string());
    }
    names
  }

  pub fn validate(&self) -> Result<()> {
    if self.tickers.is_empty() {
      bail!("at least one ticker is required");
    }
    let mut seen = BTreeSet::new();
    for t in &self.tickers {
      if t.name == CASH {
        bail!("{CASH} is reserved for the synthetic cash asset");
      }
      if !seen.insert(t.name.as_str()) {
        bail!("duplicate asset name {}", t.name);
      }
    }
    if let Some(end) = self.end {
      if end <= self.start {
        bail!("end date {end} is not after start date {}", self.start);
      }
    }

    let names = self.asset_names();
    if let Some(unknown) = self.annual_fees.keys().find(|k| !names.contains(k)) {
      bail!("fee given for unknown asset {unknown}");
    }
    if let Some((asset, fee)) = self
      .annual_fees
      .iter()
      .find(|(_, f)| !(0.0..1.0).contains(*f))
    {
      bail!("fee for {asset} must lie in [0, 1), got {fee}");
    }

    if !self.optimizer.bounds().is_feasible(names.len()) {
      bail!(
        "weight bounds [{}, {}] are infeasible for {} assets",
        self.optimizer.min_weight,
        self.optimizer.max_weight,
        names.len()
      );
    }
    if self.optimizer.max_volatility <= 0.0 {
      bail!("volatility cap must be positive");
    }
    if !(0.0..=1.0).contains(&self.coverage.min_fraction) {
      bail!("coverage fraction must lie in [0, 1]");
    }
    if self.rebalance.drift_band <= 0.0 {
      bail!("drift band must be positive");
    }
    self.simulation.validate()
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;
  use crate::portfolio::OptimizerMethod;
  use crate::portfolio::RebalanceFrequency;

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = AnalysisConfig::from_toml_str("").unwrap();
    assert_eq!(cfg, AnalysisConfig::default());
    assert_eq!(cfg.tickers[0].symbol, "SPY");
    assert_eq!(cfg.asset_names().last().map(String::as_str), Some("Cash"));
    assert_eq!(cfg.simulation.horizon_years, 20);
    assert_eq!(cfg.optimizer.target_return, 0.08);
  }

  #[test]
  fn parses_nested_sections() {
    let cfg = AnalysisConfig::from_toml_str(
      r#"
        start = "2015-01-02"
        return_method = "simple"
        random_portfolios = 100

        [[tickers]]
        name = "World"
        symbol = "ACWI"

        [[tickers]]
        name = "Bonds"
        symbol = "AGG"

        [annual_fees]
        World = 0.002

        [cash]
        include = false

        [optimizer]
        optimizer = "max-sharpe"
        target_return = 0.05

        [rebalance]
        frequency = "quarterly"

        [simulation]
        n_paths = 500
        annual_tax = 0.00888
      "#,
    )
    .unwrap();

    assert_eq!(cfg.tickers.len(), 2);
    assert_eq!(cfg.asset_names(), vec!["World", "Bonds"]);
    assert_eq!(cfg.return_method, ReturnMethod::Simple);
    assert_eq!(cfg.optimizer.optimizer, OptimizerMethod::MaxSharpe);
    assert_eq!(cfg.optimizer.max_volatility, 0.13);
    assert_eq!(cfg.rebalance.frequency, RebalanceFrequency::Quarterly);
    assert_eq!(cfg.simulation.n_paths, 500);
    assert_eq!(cfg.simulation.seed, 42);
  }

  #[test]
  fn rejects_fee_for_unknown_asset() {
    let err = AnalysisConfig::from_toml_str("[annual_fees]\nMars = 0.01\n").unwrap_err();
    assert!(format!("{err:#}").contains("Mars"));
  }

  #[test]
  fn rejects_infeasible_bounds() {
    let err = AnalysisConfig::from_toml_str("[optimizer]\nmax_weight = 0.1\n").unwrap_err();
    assert!(format!("{err:#}").contains("infeasible"));
  }

  #[test]
  fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "display_threshold = 0.01").unwrap();
    let cfg = AnalysisConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(cfg.display_threshold, 0.01);
    assert!(AnalysisConfig::from_toml_file(Path::new("/nonexistent/folio.toml")).is_err());
  }
}

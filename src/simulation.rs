//! # Simulation
//!
//! $$
//! V_{y}=V_{y-1}\,(1-\tau)\prod_{d\in y}\left(1+\sum_i w_i r_{d,i}\right)
//! $$
//!
//! Forward value paths of a daily-rebalanced static allocation, driven either
//! by resampled history or by a fitted multivariate normal.

pub mod bootstrap;
pub mod monte_carlo;
pub mod summary;

use anyhow::Result;
use anyhow::bail;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Deserialize;
use serde::Serialize;

pub use bootstrap::historical_bootstrap;
pub use monte_carlo::monte_carlo;
pub use summary::PERCENTILES;
pub use summary::SimulationSummary;
pub use summary::percentile;

/// Simulated trading days per year.
pub const DAYS_PER_YEAR: usize = 252;

/// Forward simulation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
  pub horizon_years: usize,
  pub n_paths: usize,
  /// Consecutive historical days drawn together (1 = iid days).
  pub block_length: usize,
  pub seed: u64,
  pub initial_value: f64,
  /// Flat tax on account value at every year end.
  pub annual_tax: f64,
}

impl Default for SimulationConfig {
  fn default() -> Self {
    Self {
      horizon_years: 20,
      n_paths: 10_000,
      block_length: 1,
      seed: 42,
      initial_value: 1.0,
      annual_tax: 0.0,
    }
  }
}

impl SimulationConfig {
  pub fn validate(&self) -> Result<()> {
    if self.horizon_years == 0 {
      bail!("simulation horizon must be at least one year");
    }
    if self.n_paths == 0 {
      bail!("simulation needs at least one path");
    }
    if self.block_length == 0 {
      bail!("bootstrap block length must be positive");
    }
    if !(self.initial_value > 0.0) {
      bail!("initial value must be positive, got {}", self.initial_value);
    }
    if !(0.0..1.0).contains(&self.annual_tax) {
      bail!("annual tax must lie in [0, 1), got {}", self.annual_tax);
    }
    Ok(())
  }

  pub fn steps(&self) -> usize {
    self.horizon_years * DAYS_PER_YEAR
  }
}

/// Source of simulated daily returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SimulationMethod {
  HistoricalBootstrap,
  MonteCarlo,
}

impl std::fmt::Display for SimulationMethod {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SimulationMethod::HistoricalBootstrap => write!(f, "Historical bootstrap"),
      SimulationMethod::MonteCarlo => write!(f, "Monte Carlo (normal)"),
    }
  }
}

/// Year-end values of every simulated path.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationPaths {
  pub method: SimulationMethod,
  pub initial_value: f64,
  pub horizon_years: usize,
  /// `values[path][year]`, with `year = 0` the starting value.
  pub values: Vec<Vec<f64>>,
}

impl SimulationPaths {
  pub fn n_paths(&self) -> usize {
    self.values.len()
  }

  /// Terminal value of each path.
  pub fn terminal_values(&self) -> Vec<f64> {
    self
      .values
      .iter()
      .map(|p| p.last().copied().unwrap_or(self.initial_value))
      .collect()
  }

  /// Cross-sectional percentile `q` (0..=100) of the value at each year end.
  pub fn percentile_by_year(&self, q: f64) -> Vec<f64> {
    (0..=self.horizon_years)
      .map(|year| {
        let mut column: Vec<f64> = self.values.iter().map(|p| p[year]).collect();
        column.sort_by(f64::total_cmp);
        percentile(&column, q)
      })
      .collect()
  }
}

pub(crate) fn path_rng(seed: u64, idx: usize) -> StdRng {
  StdRng::seed_from_u64(seed.wrapping_add(0x9E37_79B9_7F4A_7C15_u64.wrapping_mul(idx as u64 + 1)))
}

/// Run `cfg.n_paths` paths in parallel. `draw` fills one path's daily
/// portfolio simple returns for the full horizon.
pub(crate) fn simulate_paths<F>(method: SimulationMethod, cfg: &SimulationConfig, draw: F) -> SimulationPaths
where
  F: Fn(&mut StdRng, &mut [f64]) + Sync,
{
  let values = (0..cfg.n_paths)
    .into_par_iter()
    .map(|idx| {
      let mut rng = path_rng(cfg.seed, idx);
      let mut daily = vec![0.0; cfg.steps()];
      draw(&mut rng, &mut daily);

      let mut value = cfg.initial_value;
      let mut yearly = Vec::with_capacity(cfg.horizon_years + 1);
      yearly.push(value);
      for year in daily.chunks(DAYS_PER_YEAR) {
        for r in year {
          value *= 1.0 + r;
        }
        value -= cfg.annual_tax * value;
        yearly.push(value);
      }
      yearly
    })
    .collect();

  SimulationPaths {
    method,
    initial_value: cfg.initial_value,
    horizon_years: cfg.horizon_years,
    values,
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  fn cfg() -> SimulationConfig {
    SimulationConfig {
      horizon_years: 3,
      n_paths: 8,
      ..Default::default()
    }
  }

  #[test]
  fn constant_draw_compounds_yearly() {
    let paths = simulate_paths(SimulationMethod::MonteCarlo, &cfg(), |_, out| out.fill(0.001));
    let year = 1.001f64.powi(DAYS_PER_YEAR as i32);

    assert_eq!(paths.n_paths(), 8);
    assert_eq!(paths.values[0].len(), 4);
    assert_relative_eq!(paths.values[3][1], year, epsilon = 1e-12);
    assert_relative_eq!(paths.terminal_values()[5], year.powi(3), epsilon = 1e-12);
  }

  #[test]
  fn tax_is_taken_every_year_end() {
    let taxed = SimulationConfig {
      annual_tax: 0.01,
      ..cfg()
    };
    let paths = simulate_paths(SimulationMethod::MonteCarlo, &taxed, |_, out| out.fill(0.0));
    assert_relative_eq!(paths.values[0][3], 0.99f64.powi(3), epsilon = 1e-12);
  }

  #[test]
  fn config_validation_rejects_degenerate_runs() {
    assert!(SimulationConfig::default().validate().is_ok());
    assert!(SimulationConfig {
      n_paths: 0,
      ..Default::default()
    }
    .validate()
    .is_err());
    assert!(SimulationConfig {
      annual_tax: 1.5,
      ..Default::default()
    }
    .validate()
    .is_err());
  }
}

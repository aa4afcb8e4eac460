//! # Historical Bootstrap
//!
//! $$
//! r^\*_d = r^{p}_{\tau_d},\qquad \tau_d\sim\mathcal U\{0,\dots,T-1\}
//! $$
//!
//! Whole historical days are redrawn with replacement, so every asset's
//! return on a drawn day comes from the same date and cross-asset dependence
//! survives. With `block_length > 1` consecutive runs of days are drawn.

use anyhow::Result;
use anyhow::bail;
use rand::Rng;
use tracing::info;

use super::SimulationConfig;
use super::SimulationMethod;
use super::SimulationPaths;
use super::simulate_paths;
use crate::metrics::portfolio_return_series;
use crate::returns::ReturnPanel;

/// Resample history for a portfolio rebalanced daily to `weights`.
pub fn historical_bootstrap(
  returns: &ReturnPanel,
  weights: &[f64],
  cfg: &SimulationConfig,
) -> Result<SimulationPaths> {
  cfg.validate()?;
  if returns.is_empty() {
    bail!("cannot bootstrap an empty return history");
  }
  if weights.len() != returns.n_assets() {
    bail!(
      "{} weights for {} assets",
      weights.len(),
      returns.n_assets()
    );
  }

  // Static weights rebalanced daily make a drawn day's portfolio return a
  // function of that date alone.
  let history = portfolio_return_series(returns, weights);
  let days = history.len();
  let block = cfg.block_length.min(days);

  info!(
    paths = cfg.n_paths,
    years = cfg.horizon_years,
    history = days,
    block,
    "running historical bootstrap"
  );

  Ok(simulate_paths(SimulationMethod::HistoricalBootstrap, cfg, |rng, out| {
    for chunk in out.chunks_mut(block) {
      let start = rng.random_range(0..=days - block);
      chunk.copy_from_slice(&history[start..start + chunk.len()]);
    }
  }))
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use chrono::NaiveDate;

  use super::*;
  use crate::returns::ReturnMethod;

  fn panel() -> ReturnPanel {
    let dates: Vec<NaiveDate> = (1..=10)
      .map(|d| NaiveDate::from_ymd_opt(2021, 3, d).unwrap())
      .collect();
    ReturnPanel::new(
      dates,
      vec!["A".to_string(), "B".to_string()],
      vec![
        vec![0.01, -0.02, 0.03, 0.0, 0.01, -0.01, 0.02, 0.0, -0.005, 0.004],
        vec![0.0; 10],
      ],
      ReturnMethod::Simple,
    )
    .unwrap()
  }

  fn cfg() -> SimulationConfig {
    SimulationConfig {
      horizon_years: 2,
      n_paths: 64,
      seed: 7,
      ..Default::default()
    }
  }

  #[test]
  fn bootstrap_is_reproducible_by_seed() {
    let a = historical_bootstrap(&panel(), &[0.6, 0.4], &cfg()).unwrap();
    let b = historical_bootstrap(&panel(), &[0.6, 0.4], &cfg()).unwrap();
    let c = historical_bootstrap(
      &panel(),
      &[0.6, 0.4],
      &SimulationConfig { seed: 8, ..cfg() },
    )
    .unwrap();

    assert_eq!(a.values, b.values);
    assert_ne!(a.values, c.values);
    assert_eq!(a.values[0].len(), 3);
  }

  #[test]
  fn riskless_history_grows_deterministically() {
    let flat = ReturnPanel::new(
      panel().dates().to_vec(),
      vec!["Cash".to_string()],
      vec![vec![0.0001; 10]],
      ReturnMethod::Simple,
    )
    .unwrap();
    let paths = historical_bootstrap(&flat, &[1.0], &cfg()).unwrap();
    let expected = 1.0001f64.powi(2 * 252);
    for v in paths.terminal_values() {
      assert_relative_eq!(v, expected, epsilon = 1e-10);
    }
  }

  #[test]
  fn blocks_longer_than_history_are_clamped() {
    let long_blocks = SimulationConfig {
      block_length: 500,
      n_paths: 4,
      ..cfg()
    };
    let paths = historical_bootstrap(&panel(), &[1.0, 0.0], &long_blocks).unwrap();
    assert_eq!(paths.n_paths(), 4);
    assert!(paths.terminal_values().iter().all(|v| v.is_finite() && *v > 0.0));
  }

  #[test]
  fn rejects_mismatched_weights() {
    assert!(historical_bootstrap(&panel(), &[1.0], &cfg()).is_err());
  }
}

//! # Portfolio Data Utilities
//!
//! $$
//! \hat\Sigma_{ij} = \frac{252}{T-1}\sum_{t}(r_{ti}-\bar r_i)(r_{tj}-\bar r_j)
//! $$
//!
//! Annualised sample moments of a return panel.

use serde::Serialize;

use crate::TRADING_DAYS;
use crate::returns::ReturnPanel;

fn sample_mean(xs: &[f64]) -> f64 {
  if xs.is_empty() {
    0.0
  } else {
    xs.iter().sum::<f64>() / xs.len() as f64
  }
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
  let n = x.len().min(y.len());
  if n < 2 {
    return 0.0;
  }

  let mx = sample_mean(x);
  let my = sample_mean(y);

  let mut cov = 0.0;
  let mut sx = 0.0;
  let mut sy = 0.0;

  for i in 0..n {
    let dx = x[i] - mx;
    let dy = y[i] - my;
    cov += dx * dy;
    sx += dx * dx;
    sy += dy * dy;
  }

  let denom = (sx * sy).sqrt();
  if denom < 1e-15 {
    0.0
  } else {
    (cov / denom).clamp(-1.0, 1.0)
  }
}

/// Build a Pearson correlation matrix from aligned return series.
pub fn correlation_matrix(aligned_returns: &[Vec<f64>]) -> Vec<Vec<f64>> {
  let n = aligned_returns.len();
  let mut corr = vec![vec![1.0; n]; n];

  for i in 0..n {
    for j in (i + 1)..n {
      let r = pearson(&aligned_returns[i], &aligned_returns[j]);
      corr[i][j] = r;
      corr[j][i] = r;
    }
  }

  corr
}

/// Unbiased sample covariance of aligned return series (per period).
pub fn sample_covariance(aligned_returns: &[Vec<f64>]) -> Vec<Vec<f64>> {
  let n = aligned_returns.len();
  let periods = aligned_returns.first().map_or(0, |r| r.len());
  let mut cov = vec![vec![0.0; n]; n];
  if periods < 2 {
    return cov;
  }

  let means: Vec<f64> = aligned_returns.iter().map(|r| sample_mean(r)).collect();
  for i in 0..n {
    for j in i..n {
      let acc: f64 = aligned_returns[i]
        .iter()
        .zip(aligned_returns[j].iter())
        .map(|(a, b)| (a - means[i]) * (b - means[j]))
        .sum();
      let c = acc / (periods - 1) as f64;
      cov[i][j] = c;
      cov[j][i] = c;
    }
  }

  cov
}

/// Annualised mean return of each column.
pub fn annualized_mean(aligned_returns: &[Vec<f64>]) -> Vec<f64> {
  aligned_returns
    .iter()
    .map(|r| sample_mean(r) * TRADING_DAYS)
    .collect()
}

/// Annualised sample covariance matrix.
pub fn annualized_covariance(aligned_returns: &[Vec<f64>]) -> Vec<Vec<f64>> {
  sample_covariance(aligned_returns)
    .into_iter()
    .map(|row| row.into_iter().map(|c| c * TRADING_DAYS).collect())
    .collect()
}

/// Optimizer inputs estimated from a return panel.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AssetStatistics {
  pub assets: Vec<String>,
  /// Annualised mean returns.
  pub mu: Vec<f64>,
  /// Annualised volatilities.
  pub vol: Vec<f64>,
  /// Annualised covariance.
  pub cov: Vec<Vec<f64>>,
  pub corr: Vec<Vec<f64>>,
}

impl AssetStatistics {
  pub fn from_returns(returns: &ReturnPanel) -> Self {
    let columns = returns.columns();
    let cov = annualized_covariance(columns);
    let vol = (0..cov.len()).map(|i| cov[i][i].max(0.0).sqrt()).collect();
    Self {
      assets: returns.assets().to_vec(),
      mu: annualized_mean(columns),
      vol,
      cov,
      corr: correlation_matrix(columns),
    }
  }

  pub fn n_assets(&self) -> usize {
    self.assets.len()
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn covariance_matches_hand_computation() {
    let a = vec![0.01, 0.02, 0.03];
    let b = vec![0.03, 0.02, 0.01];
    let cov = sample_covariance(&[a, b]);

    assert_relative_eq!(cov[0][0], 1e-4, epsilon = 1e-15);
    assert_relative_eq!(cov[1][1], 1e-4, epsilon = 1e-15);
    assert_relative_eq!(cov[0][1], -1e-4, epsilon = 1e-15);
    assert_relative_eq!(cov[1][0], cov[0][1]);
  }

  #[test]
  fn correlation_of_constant_series_is_zero() {
    let corr = correlation_matrix(&[vec![0.01, 0.01, 0.01], vec![0.0, 0.02, -0.01]]);
    assert_eq!(corr[0][0], 1.0);
    assert_eq!(corr[0][1], 0.0);
  }

  #[test]
  fn annualisation_scales_by_trading_days() {
    let r = vec![vec![0.001, 0.003]];
    assert_relative_eq!(annualized_mean(&r)[0], 0.002 * 252.0, epsilon = 1e-12);
    assert_relative_eq!(
      annualized_covariance(&r)[0][0],
      sample_covariance(&r)[0][0] * 252.0,
      epsilon = 1e-15
    );
  }

  #[test]
  fn short_history_yields_zero_covariance() {
    let cov = sample_covariance(&[vec![0.01], vec![0.02]]);
    assert_eq!(cov, vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
  }
}

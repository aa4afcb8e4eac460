//! # Monte Carlo
//!
//! $$
//! \mathbf x_d=\hat\mu+L\mathbf z_d,\quad \mathbf z_d\sim\mathcal N(0,I),\quad LL^\top=\hat\Sigma,
//! \qquad r^p_d=\sum_i w_i\left(e^{x_{d,i}}-1\right)
//! $$
//!
//! Daily log returns drawn from a multivariate normal fitted to history.

use anyhow::Result;
use anyhow::bail;
use nalgebra::DMatrix;
use nalgebra::DVector;
use rand_distr::Distribution;
use rand_distr::StandardNormal;
use tracing::debug;
use tracing::info;

use super::SimulationConfig;
use super::SimulationMethod;
use super::SimulationPaths;
use super::simulate_paths;
use crate::portfolio::data::sample_covariance;
use crate::returns::ReturnMethod;
use crate::returns::ReturnPanel;

/// Lower Cholesky factor, adding diagonal jitter until the matrix factors.
///
/// A constant-rate cash column makes the sample covariance singular.
fn cholesky_lower_with_jitter(mut sigma: DMatrix<f64>) -> DMatrix<f64> {
  let dim = sigma.nrows();
  let mut jitter = 1e-14;
  for _ in 0..8 {
    if let Some(chol) = sigma.clone().cholesky() {
      return chol.l();
    }
    debug!(jitter, "covariance not positive definite, adding jitter");
    for i in 0..dim {
      sigma[(i, i)] += jitter;
    }
    jitter *= 10.0;
  }

  let mut l = DMatrix::<f64>::zeros(dim, dim);
  for i in 0..dim {
    l[(i, i)] = sigma[(i, i)].max(0.0).sqrt();
  }
  l
}

/// Simulate a portfolio rebalanced daily to `weights` under normal log returns.
pub fn monte_carlo(
  returns: &ReturnPanel,
  weights: &[f64],
  cfg: &SimulationConfig,
) -> Result<SimulationPaths> {
  cfg.validate()?;
  if returns.len() < 2 {
    bail!("need at least two return observations to fit a covariance");
  }
  let n = returns.n_assets();
  if weights.len() != n {
    bail!("{} weights for {n} assets", weights.len());
  }

  let log_columns: Vec<Vec<f64>> = match returns.method() {
    ReturnMethod::Log => returns.columns().to_vec(),
    ReturnMethod::Simple => returns
      .columns()
      .iter()
      .map(|c| c.iter().map(|r| r.ln_1p()).collect())
      .collect(),
  };

  let mean = DVector::from_iterator(
    n,
    log_columns
      .iter()
      .map(|c| c.iter().sum::<f64>() / c.len() as f64),
  );
  let cov = sample_covariance(&log_columns);
  let sigma = DMatrix::from_fn(n, n, |i, j| cov[i][j]);
  let l = cholesky_lower_with_jitter(sigma);

  info!(
    paths = cfg.n_paths,
    years = cfg.horizon_years,
    assets = n,
    "running Monte Carlo simulation"
  );

  Ok(simulate_paths(SimulationMethod::MonteCarlo, cfg, |rng, out| {
    let mut z = DVector::<f64>::zeros(n);
    for r in out.iter_mut() {
      for zi in z.iter_mut() {
        *zi = StandardNormal.sample(&mut *rng);
      }
      let x = &mean + &l * &z;
      *r = weights
        .iter()
        .zip(x.iter())
        .map(|(w, xi)| w * xi.exp_m1())
        .sum();
    }
  }))
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use chrono::NaiveDate;

  use super::*;
  use crate::simulation::SimulationSummary;

  fn panel(method: ReturnMethod) -> ReturnPanel {
    let dates: Vec<NaiveDate> = (1..=12)
      .map(|d| NaiveDate::from_ymd_opt(2022, 6, d).unwrap())
      .collect();
    let a: Vec<f64> = (0..12).map(|i| if i % 2 == 0 { 0.012 } else { -0.008 }).collect();
    let b: Vec<f64> = (0..12).map(|i| if i % 3 == 0 { 0.004 } else { -0.001 }).collect();
    ReturnPanel::new(
      dates,
      vec!["A".to_string(), "B".to_string(), "Cash".to_string()],
      vec![a, b, vec![0.0001; 12]],
      method,
    )
    .unwrap()
  }

  fn cfg() -> SimulationConfig {
    SimulationConfig {
      horizon_years: 1,
      n_paths: 200,
      seed: 11,
      ..Default::default()
    }
  }

  #[test]
  fn jitter_factors_singular_covariance() {
    let sigma = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
    let l = cholesky_lower_with_jitter(sigma);
    let back = &l * l.transpose();
    assert_relative_eq!(back[(0, 1)], 1.0, epsilon = 1e-6);
  }

  #[test]
  fn all_cash_path_is_deterministic() {
    let paths = monte_carlo(&panel(ReturnMethod::Log), &[0.0, 0.0, 1.0], &cfg()).unwrap();
    let expected = (0.0001f64 * 252.0).exp();
    for v in paths.terminal_values() {
      assert_relative_eq!(v, expected, epsilon = 1e-4);
    }
  }

  #[test]
  fn monte_carlo_is_seeded_and_spread() {
    let a = monte_carlo(&panel(ReturnMethod::Simple), &[0.5, 0.3, 0.2], &cfg()).unwrap();
    let b = monte_carlo(&panel(ReturnMethod::Simple), &[0.5, 0.3, 0.2], &cfg()).unwrap();
    assert_eq!(a.values, b.values);

    let s = SimulationSummary::from_paths(&a, 0.0);
    assert!(s.terminal_percentiles[0].1 < s.terminal_percentiles[4].1);
  }
}

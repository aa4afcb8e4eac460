//! # Random Portfolios
//!
//! $$
//! \mathbf w\sim\operatorname{Dirichlet}(\mathbf 1),\qquad
//! w_i=\frac{E_i}{\sum_j E_j},\ E_i\sim\operatorname{Exp}(1)
//! $$
//!
//! Uniform sampling of long-only allocations, scored on realised history.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Distribution;
use rand_distr::Exp1;
use rayon::prelude::*;
use serde::Serialize;

use crate::metrics::PortfolioMetrics;
use crate::metrics::portfolio_metrics;
use crate::metrics::weighted_series;
use crate::returns::ReturnPanel;

/// A sampled allocation and its historical performance.
#[derive(Clone, Debug, Serialize)]
pub struct RandomPortfolio {
  pub weights: Vec<f64>,
  pub metrics: PortfolioMetrics,
}

/// Draw one point uniformly from the probability simplex.
pub fn dirichlet_uniform<R: rand::Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<f64> {
  let draws: Vec<f64> = (0..n).map(|_| Exp1.sample(&mut *rng)).collect();
  let total: f64 = draws.iter().sum();
  if total <= 0.0 {
    return vec![1.0 / n as f64; n];
  }
  draws.into_iter().map(|e| e / total).collect()
}

/// Evaluate `num_portfolios` Dirichlet(1) allocations on the return history.
///
/// Deterministic for a given `seed` regardless of thread count.
pub fn generate_random_portfolios(
  returns: &ReturnPanel,
  num_portfolios: usize,
  seed: u64,
  risk_free: f64,
) -> Vec<RandomPortfolio> {
  let n = returns.n_assets();
  if n == 0 || returns.is_empty() {
    return Vec::new();
  }

  let simple = returns.simple_columns();
  let dates = returns.dates();

  (0..num_portfolios)
    .into_par_iter()
    .map(|idx| {
      let mut rng = StdRng::seed_from_u64(
        seed.wrapping_add(0x9E37_79B9_7F4A_7C15_u64.wrapping_mul((idx as u64).wrapping_add(1))),
      );
      let weights = dirichlet_uniform(n, &mut rng);
      let series = weighted_series(&simple, &weights);
      RandomPortfolio {
        metrics: portfolio_metrics(dates, &series, 1.0, risk_free),
        weights,
      }
    })
    .collect()
}

//! # Portfolio Optimizers
//!
//! $$
//! \min_{\mathbf{x}} \ \mathcal{L}(\Pi(\mathbf{x})) + \lambda\,\max(0, r^\*-\mu_p)^2
//! + \lVert \mathbf x-\Pi(\mathbf x)\rVert^2
//! $$
//!
//! Long-only allocation solvers on the bounded simplex. Nelder-Mead searches an
//! unconstrained space whose points are projected onto
//! $\{\mathbf 1^\top\mathbf w=1,\ w_{\min}\le w_i\le w_{\max}\}$; the return and
//! volatility constraints are enforced with an escalating quadratic penalty.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use tracing::debug;
use tracing::warn;

use super::types::OptimizerMethod;
use super::types::PortfolioResult;
use super::types::WeightBounds;
use super::types::empty_result;

/// Allowed shortfall below the target return.
const RETURN_TOL: f64 = 1e-4;
/// Allowed overshoot of the volatility cap.
const VOL_TOL: f64 = 1e-4;
const PENALTY_SCHEDULE: [f64; 3] = [1e2, 1e4, 1e6];
const SIMPLEX_STEP: f64 = 0.05;
const MAX_ITERS: u64 = 5000;

fn dot(a: &[f64], b: &[f64]) -> f64 {
  a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn mat_vec_mul(mat: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
  mat
    .iter()
    .map(|row| row.iter().zip(v.iter()).map(|(a, b)| a * b).sum())
    .collect()
}

fn dist_sq(a: &[f64], b: &[f64]) -> f64 {
  a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn portfolio_return(w: &[f64], mu: &[f64]) -> f64 {
  dot(w, mu)
}

fn portfolio_variance(w: &[f64], cov: &[Vec<f64>]) -> f64 {
  dot(w, &mat_vec_mul(cov, w)).max(0.0)
}

/// Euclidean projection of `x` onto the simplex capped by `bounds`.
///
/// Bisects the shift `tau` in `w_i = clamp(x_i - tau, min, max)` until the
/// weights sum to one. Bounds must be feasible for `x.len()` assets. Points
/// already inside the capped simplex come back unchanged.
pub(crate) fn project_to_bounds(x: &[f64], bounds: WeightBounds) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }
  let inside = x.iter().all(|&xi| xi >= bounds.min && xi <= bounds.max);
  if inside && (x.iter().sum::<f64>() - 1.0).abs() <= 1e-12 {
    return x.to_vec();
  }

  let lo_x = x.iter().cloned().fold(f64::INFINITY, f64::min);
  let hi_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let mut lo = lo_x - bounds.max;
  let mut hi = hi_x - bounds.min;

  let total = |tau: f64| -> f64 {
    x.iter()
      .map(|&xi| (xi - tau).clamp(bounds.min, bounds.max))
      .sum()
  };

  for _ in 0..200 {
    let mid = 0.5 * (lo + hi);
    if total(mid) > 1.0 {
      lo = mid;
    } else {
      hi = mid;
    }
    if hi - lo < 1e-15 {
      break;
    }
  }

  let tau = 0.5 * (lo + hi);
  let mut w: Vec<f64> = x
    .iter()
    .map(|&xi| (xi - tau).clamp(bounds.min, bounds.max))
    .collect();

  // Spread the bisection residual over coordinates off their bounds.
  let residual = 1.0 - w.iter().sum::<f64>();
  let free: Vec<usize> = (0..w.len())
    .filter(|&i| w[i] > bounds.min && w[i] < bounds.max)
    .collect();
  if !free.is_empty() {
    let share = residual / free.len() as f64;
    for i in free {
      w[i] = (w[i] + share).clamp(bounds.min, bounds.max);
    }
  }
  w
}

fn initial_simplex(x0: &[f64]) -> Vec<Vec<f64>> {
  let mut simplex = Vec::with_capacity(x0.len() + 1);
  simplex.push(x0.to_vec());
  for i in 0..x0.len() {
    let mut point = x0.to_vec();
    point[i] += SIMPLEX_STEP;
    simplex.push(point);
  }
  simplex
}

fn nelder_mead<C>(cost: C, x0: Vec<f64>) -> Option<Vec<f64>>
where
  C: CostFunction<Param = Vec<f64>, Output = f64>,
{
  let solver = match NelderMead::new(initial_simplex(&x0)).with_sd_tolerance(1e-13) {
    Ok(solver) => solver,
    Err(err) => {
      warn!(%err, "failed to build Nelder-Mead solver");
      return None;
    }
  };

  match Executor::new(cost, solver)
    .configure(|state| state.max_iters(MAX_ITERS))
    .run()
  {
    Ok(res) => {
      debug!(best_cost = res.state.best_cost, "Nelder-Mead finished");
      res.state.best_param
    }
    Err(err) => {
      warn!(%err, "Nelder-Mead failed");
      None
    }
  }
}

/// Run Nelder-Mead once per penalty level, warm-starting from the previous
/// optimum. Returns projected weights and whether every stage succeeded.
fn solve_with_penalties<C, F>(n: usize, bounds: WeightBounds, make_cost: F) -> (Vec<f64>, bool)
where
  C: CostFunction<Param = Vec<f64>, Output = f64>,
  F: Fn(f64) -> C,
{
  let mut x = vec![1.0 / n as f64; n];
  let mut ok = true;

  for &penalty in &PENALTY_SCHEDULE {
    match nelder_mead(make_cost(penalty), x.clone()) {
      Some(best) => x = best,
      None => {
        ok = false;
        break;
      }
    }
  }

  (project_to_bounds(&x, bounds), ok)
}

fn finish(
  w: Vec<f64>,
  mu: &[f64],
  cov: &[Vec<f64>],
  risk_free: f64,
  converged: bool,
) -> PortfolioResult {
  let expected_return = portfolio_return(&w, mu);
  let volatility = portfolio_variance(&w, cov).sqrt();
  let sharpe = if volatility > 1e-15 {
    (expected_return - risk_free) / volatility
  } else {
    0.0
  };

  PortfolioResult {
    weights: w,
    expected_return,
    volatility,
    sharpe,
    converged,
  }
}

fn check_bounds(n: usize, bounds: WeightBounds) -> bool {
  if bounds.is_feasible(n) {
    true
  } else {
    warn!(
      n,
      min = bounds.min,
      max = bounds.max,
      "weight bounds cannot sum to one"
    );
    false
  }
}

/// Minimum-variance weights whose expected return is at least `target_return`.
pub fn optimize_target_return(
  mu: &[f64],
  cov: &[Vec<f64>],
  bounds: WeightBounds,
  target_return: f64,
  risk_free: f64,
) -> PortfolioResult {
  let n = mu.len();
  if n == 0 || !check_bounds(n, bounds) {
    return empty_result();
  }

  struct TargetReturnCost {
    mu: Vec<f64>,
    cov: Vec<Vec<f64>>,
    bounds: WeightBounds,
    target_return: f64,
    penalty: f64,
  }

  impl CostFunction for TargetReturnCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
      let w = project_to_bounds(x, self.bounds);
      let port_var = portfolio_variance(&w, &self.cov);
      let shortfall = (self.target_return - portfolio_return(&w, &self.mu)).max(0.0);

      Ok(port_var + self.penalty * shortfall.powi(2) + dist_sq(x, &w))
    }
  }

  let (w, ok) = solve_with_penalties(n, bounds, |penalty| TargetReturnCost {
    mu: mu.to_vec(),
    cov: cov.to_vec(),
    bounds,
    target_return,
    penalty,
  });

  let reached = portfolio_return(&w, mu) >= target_return - RETURN_TOL;
  if !reached {
    warn!(
      target_return,
      achieved = portfolio_return(&w, mu),
      "target return not reachable within weight bounds"
    );
  }
  finish(w, mu, cov, risk_free, ok && reached)
}

/// Maximum expected-return weights with volatility at most `max_volatility`.
pub fn optimize_max_volatility(
  mu: &[f64],
  cov: &[Vec<f64>],
  bounds: WeightBounds,
  max_volatility: f64,
  risk_free: f64,
) -> PortfolioResult {
  let n = mu.len();
  if n == 0 || !check_bounds(n, bounds) {
    return empty_result();
  }

  struct MaxVolCost {
    mu: Vec<f64>,
    cov: Vec<Vec<f64>>,
    bounds: WeightBounds,
    max_volatility: f64,
    penalty: f64,
  }

  impl CostFunction for MaxVolCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
      let w = project_to_bounds(x, self.bounds);
      let port_vol = portfolio_variance(&w, &self.cov).sqrt();
      let excess = (port_vol - self.max_volatility).max(0.0);

      Ok(-portfolio_return(&w, &self.mu) + self.penalty * excess.powi(2) + dist_sq(x, &w))
    }
  }

  let (w, ok) = solve_with_penalties(n, bounds, |penalty| MaxVolCost {
    mu: mu.to_vec(),
    cov: cov.to_vec(),
    bounds,
    max_volatility,
    penalty,
  });

  let vol = portfolio_variance(&w, cov).sqrt();
  let within = vol <= max_volatility + VOL_TOL;
  if !within {
    warn!(
      max_volatility,
      achieved = vol,
      "volatility cap not reachable within weight bounds"
    );
  }
  finish(w, mu, cov, risk_free, ok && within)
}

/// Weights maximising `(mu_p - risk_free) / sigma_p`.
pub fn optimize_max_sharpe(
  mu: &[f64],
  cov: &[Vec<f64>],
  bounds: WeightBounds,
  risk_free: f64,
) -> PortfolioResult {
  let n = mu.len();
  if n == 0 || !check_bounds(n, bounds) {
    return empty_result();
  }

  struct NegSharpeCost {
    mu: Vec<f64>,
    cov: Vec<Vec<f64>>,
    bounds: WeightBounds,
    risk_free: f64,
  }

  impl CostFunction for NegSharpeCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
      let w = project_to_bounds(x, self.bounds);
      let port_vol = portfolio_variance(&w, &self.cov).sqrt();
      let dist = dist_sq(x, &w);
      if port_vol < 1e-15 {
        return Ok(1e6 + dist);
      }

      Ok(-(portfolio_return(&w, &self.mu) - self.risk_free) / port_vol + dist)
    }
  }

  // Restarts at each schedule step; the penalty level is unused here.
  let (w, ok) = solve_with_penalties(n, bounds, |_| NegSharpeCost {
    mu: mu.to_vec(),
    cov: cov.to_vec(),
    bounds,
    risk_free,
  });

  finish(w, mu, cov, risk_free, ok)
}

/// Equal weights, projected onto the bounds.
pub fn optimize_equal_weight(
  mu: &[f64],
  cov: &[Vec<f64>],
  bounds: WeightBounds,
  risk_free: f64,
) -> PortfolioResult {
  let n = mu.len();
  if n == 0 || !check_bounds(n, bounds) {
    return empty_result();
  }
  let w = project_to_bounds(&vec![1.0 / n as f64; n], bounds);
  finish(w, mu, cov, risk_free, true)
}

/// Dispatch to selected optimizer with common configuration inputs.
pub fn optimize_with_method(
  method: OptimizerMethod,
  mu: &[f64],
  cov: &[Vec<f64>],
  bounds: WeightBounds,
  target_return: f64,
  max_volatility: f64,
  risk_free: f64,
) -> PortfolioResult {
  if mu.is_empty() {
    return empty_result();
  }

  match method {
    OptimizerMethod::TargetReturn => {
      optimize_target_return(mu, cov, bounds, target_return, risk_free)
    }
    OptimizerMethod::MaxVolatility => {
      optimize_max_volatility(mu, cov, bounds, max_volatility, risk_free)
    }
    OptimizerMethod::MaxSharpe => optimize_max_sharpe(mu, cov, bounds, risk_free),
    OptimizerMethod::EqualWeight => optimize_equal_weight(mu, cov, bounds, risk_free),
  }
}

//! # Metrics
//!
//! $$
//! \text{CAGR}=\left(\frac{V_T}{V_0}\right)^{365.25/\text{days}}-1,\qquad
//! \text{MDD}=\min_t\left(\frac{V_t}{\max_{s\le t}V_s}-1\right)
//! $$
//!
//! Realised performance statistics of a daily portfolio return series.

use chrono::Datelike;
use chrono::NaiveDate;
use serde::Serialize;
use statrs::statistics::Statistics;

use crate::TRADING_DAYS;
use crate::returns::ReturnPanel;

/// Headline statistics of a realised return series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PortfolioMetrics {
  pub cagr: f64,
  pub annual_vol: f64,
  pub sharpe: f64,
  pub max_drawdown: f64,
}

/// Daily simple returns of a portfolio held at constant `weights`.
///
/// `weights` follow the panel's asset order.
pub fn portfolio_return_series(returns: &ReturnPanel, weights: &[f64]) -> Vec<f64> {
  assert_eq!(
    weights.len(),
    returns.n_assets(),
    "one weight per asset is required"
  );
  weighted_series(&returns.simple_columns(), weights)
}

/// `sum_i w_i r_{t,i}` for column-major simple returns.
pub fn weighted_series(simple_columns: &[Vec<f64>], weights: &[f64]) -> Vec<f64> {
  let periods = simple_columns.first().map_or(0, |c| c.len());
  (0..periods)
    .map(|t| {
      weights
        .iter()
        .zip(simple_columns.iter())
        .map(|(w, col)| w * col[t])
        .sum()
    })
    .collect()
}

/// Compounded value path, one entry per return.
pub fn value_series(simple_returns: &[f64], start_value: f64) -> Vec<f64> {
  simple_returns
    .iter()
    .scan(start_value, |v, &r| {
      *v *= 1.0 + r;
      Some(*v)
    })
    .collect()
}

/// Compound annual growth rate between the first and last point.
pub fn cagr(dates: &[NaiveDate], values: &[f64]) -> f64 {
  let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
    return 0.0;
  };
  let days = (*last - *first).num_days();
  let (v0, vn) = (values[0], values[values.len() - 1]);
  if days <= 0 || v0 <= 0.0 || vn <= 0.0 {
    return 0.0;
  }
  let years = days as f64 / 365.25;
  (vn / v0).powf(1.0 / years) - 1.0
}

/// Largest peak-to-trough loss, as a non-positive fraction.
pub fn max_drawdown(values: &[f64]) -> f64 {
  let mut peak = f64::NEG_INFINITY;
  let mut worst = 0.0_f64;
  for &v in values {
    peak = peak.max(v);
    if peak > 0.0 {
      worst = worst.min(v / peak - 1.0);
    }
  }
  worst
}

/// Sample standard deviation of daily returns, annualised.
pub fn annualized_vol(returns: &[f64]) -> f64 {
  if returns.len() < 2 {
    return 0.0;
  }
  returns.iter().std_dev() * TRADING_DAYS.sqrt()
}

/// Annualised excess return per unit of annualised volatility.
///
/// `NaN` for a series with zero volatility. Anything below `1e-12` is rounding
/// noise from a constant series.
pub fn sharpe_ratio(returns: &[f64], risk_free: f64) -> f64 {
  let vol = annualized_vol(returns);
  if vol < 1e-12 || !vol.is_finite() {
    return f64::NAN;
  }
  (returns.iter().mean() * TRADING_DAYS - risk_free) / vol
}

/// CAGR, volatility, Sharpe and drawdown of a daily simple return series.
pub fn portfolio_metrics(
  dates: &[NaiveDate],
  simple_returns: &[f64],
  start_value: f64,
  risk_free: f64,
) -> PortfolioMetrics {
  let values = value_series(simple_returns, start_value);
  PortfolioMetrics {
    cagr: cagr(dates, &values),
    annual_vol: annualized_vol(simple_returns),
    sharpe: sharpe_ratio(simple_returns, risk_free),
    max_drawdown: max_drawdown(&values),
  }
}

/// Flat annual tax on account value (Swedish ISK style).
///
/// On the last observation of every calendar year `rate` times the value on
/// that day is withdrawn; the withdrawal carries forward to every later value.
pub fn apply_annual_tax(dates: &[NaiveDate], values: &[f64], rate: f64) -> Vec<f64> {
  let mut out = values.to_vec();
  if rate == 0.0 {
    return out;
  }
  for t in 0..out.len() {
    let year_end = dates
      .get(t + 1)
      .map_or(true, |next| next.year() != dates[t].year());
    if year_end {
      let tax = rate * out[t];
      for v in out[t..].iter_mut() {
        *v -= tax;
      }
    }
  }
  out
}

/// Arithmetic contribution `w_i * mu_i` of each asset to expected return.
pub fn return_contributions(weights: &[f64], mu: &[f64]) -> Vec<f64> {
  weights.iter().zip(mu.iter()).map(|(w, m)| w * m).collect()
}

/// Approximate gap between arithmetic and geometric annual return.
pub fn volatility_drag(annual_vol: f64) -> f64 {
  0.5 * annual_vol * annual_vol
}

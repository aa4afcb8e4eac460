//! # Returns
//!
//! $$
//! r_t^{\log}=\ln\frac{P_t}{P_{t-1}},\qquad r_t^{\text{simple}}=\frac{P_t}{P_{t-1}}-1
//! $$
//!
//! Daily return panels, expense-ratio drag and a synthetic cash asset.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::Result;
use anyhow::anyhow;
use anyhow::bail;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

use crate::TRADING_DAYS;
use crate::data::PricePanel;

/// Name of the synthetic cash column.
pub const CASH: &str = "Cash";

/// How consecutive prices are turned into returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnMethod {
  #[default]
  Log,
  Simple,
}

impl ReturnMethod {
  /// Daily return of an asset compounding at `annual` per year.
  pub fn daily_from_annual(self, annual: f64) -> f64 {
    match self {
      Self::Log => (1.0 + annual).ln() / TRADING_DAYS,
      Self::Simple => (1.0 + annual).powf(1.0 / TRADING_DAYS) - 1.0,
    }
  }

  /// Convert a return expressed in this method into a simple return.
  pub fn to_simple(self, r: f64) -> f64 {
    match self {
      Self::Log => r.exp_m1(),
      Self::Simple => r,
    }
  }
}

impl FromStr for ReturnMethod {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_lowercase().as_str() {
      "log" => Ok(Self::Log),
      "simple" | "pct" => Ok(Self::Simple),
      other => Err(anyhow!("unknown return method {other:?}")),
    }
  }
}

impl Display for ReturnMethod {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ReturnMethod::Log => write!(f, "log"),
      ReturnMethod::Simple => write!(f, "simple"),
    }
  }
}

/// Cash asset settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CashConfig {
  /// Append a `Cash` column to the return panel.
  pub include: bool,
  /// Constant annual rate. Takes precedence over the policy-rate schedule.
  pub fixed_rate: Option<f64>,
  /// Spread a savings account pays over the policy rate.
  pub bank_margin: f64,
  /// Use the historical policy-rate schedule plus `bank_margin`.
  pub use_policy_rate: bool,
}

impl Default for CashConfig {
  fn default() -> Self {
    Self {
      include: true,
      fixed_rate: None,
      bank_margin: 0.0075,
      use_policy_rate: true,
    }
  }
}

/// Fallback annual cash rate when neither a fixed rate nor the schedule is used.
const DEFAULT_CASH_RATE: f64 = 0.02;

/// Sveriges Riksbank repo rate in force on `date`.
pub fn policy_rate(date: NaiveDate) -> f64 {
  // (first month the next rate applies, rate until then)
  const SCHEDULE: [(i32, u32, f64); 8] = [
    (2009, 1, 0.035),
    (2010, 7, 0.005),
    (2022, 4, 0.0),
    (2022, 9, 0.0075),
    (2022, 11, 0.015),
    (2023, 2, 0.02),
    (2023, 9, 0.025),
    (2024, 1, 0.0275),
  ];
  const CURRENT: f64 = 0.035;

  SCHEDULE
    .iter()
    .find(|(year, month, _)| {
      NaiveDate::from_ymd_opt(*year, *month, 1).is_some_and(|until| date < until)
    })
    .map_or(CURRENT, |(_, _, rate)| *rate)
}

/// Daily returns on the dates of a price panel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReturnPanel {
  dates: Vec<NaiveDate>,
  assets: Vec<String>,
  returns: Vec<Vec<f64>>,
  method: ReturnMethod,
}

impl ReturnPanel {
  pub fn new(
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    returns: Vec<Vec<f64>>,
    method: ReturnMethod,
  ) -> Result<Self> {
    if assets.len() != returns.len() {
      bail!(
        "{} asset names but {} return columns",
        assets.len(),
        returns.len()
      );
    }
    if let Some((asset, _)) = assets
      .iter()
      .zip(returns.iter())
      .find(|(_, col)| col.len() != dates.len())
    {
      bail!("return column {asset} does not match {} dates", dates.len());
    }
    Ok(Self {
      dates,
      assets,
      returns,
      method,
    })
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  /// Per-asset return columns, aligned on [`ReturnPanel::dates`].
  pub fn columns(&self) -> &[Vec<f64>] {
    &self.returns
  }

  pub fn column(&self, asset: &str) -> Option<&[f64]> {
    self
      .assets
      .iter()
      .position(|a| a == asset)
      .map(|i| self.returns[i].as_slice())
  }

  pub fn method(&self) -> ReturnMethod {
    self.method
  }

  pub fn len(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }

  pub fn n_assets(&self) -> usize {
    self.assets.len()
  }

  /// Same panel expressed as simple returns.
  pub fn simple_columns(&self) -> Vec<Vec<f64>> {
    self
      .returns
      .iter()
      .map(|col| col.iter().map(|&r| self.method.to_simple(r)).collect())
      .collect()
  }

  /// Returns of all assets on day `t`.
  pub fn row(&self, t: usize) -> Vec<f64> {
    self.returns.iter().map(|col| col[t]).collect()
  }

  /// Weight vector in panel order for named weights; absent assets get zero.
  pub fn weight_vector(&self, weights: &BTreeMap<String, f64>) -> Vec<f64> {
    self
      .assets
      .iter()
      .map(|a| weights.get(a).copied().unwrap_or(0.0))
      .collect()
  }
}

/// Turn prices into returns after dropping dates with any missing price.
pub fn compute_returns(prices: &PricePanel, method: ReturnMethod) -> Result<ReturnPanel> {
  let aligned = prices.drop_incomplete_rows();
  if aligned.len() < 2 {
    bail!(
      "need at least two complete price rows, got {}",
      aligned.len()
    );
  }

  let returns = aligned
    .columns()
    .iter()
    .map(|closes| {
      closes
        .windows(2)
        .map(|w| match method {
          ReturnMethod::Log => (w[1] / w[0]).ln(),
          ReturnMethod::Simple => w[1] / w[0] - 1.0,
        })
        .collect()
    })
    .collect();

  ReturnPanel::new(
    aligned.dates()[1..].to_vec(),
    aligned.assets().to_vec(),
    returns,
    method,
  )
}

/// Deduct annual expense ratios from daily returns.
pub fn apply_annual_fees(returns: &ReturnPanel, annual_fees: &BTreeMap<String, f64>) -> ReturnPanel {
  let mut net = returns.clone();
  for (asset, column) in net.assets.iter().zip(net.returns.iter_mut()) {
    let Some(&fee) = annual_fees.get(asset) else {
      continue;
    };
    let daily = match returns.method {
      ReturnMethod::Log => -(1.0 - fee).ln() / TRADING_DAYS,
      ReturnMethod::Simple => (1.0 + fee).powf(1.0 / TRADING_DAYS) - 1.0,
    };
    for r in column.iter_mut() {
      *r -= daily;
    }
  }
  net
}

/// Append a `Cash` column earning either a fixed rate or the policy rate plus
/// a bank margin.
pub fn add_cash_returns(returns: &ReturnPanel, cash: &CashConfig) -> Result<ReturnPanel> {
  if returns.column(CASH).is_some() {
    bail!("return panel already has a {CASH} column");
  }

  let column: Vec<f64> = match (cash.fixed_rate, cash.use_policy_rate) {
    (Some(rate), _) => vec![returns.method.daily_from_annual(rate); returns.len()],
    (None, true) => returns
      .dates
      .iter()
      .map(|&d| {
        returns
          .method
          .daily_from_annual(policy_rate(d) + cash.bank_margin)
      })
      .collect(),
    (None, false) => vec![returns.method.daily_from_annual(DEFAULT_CASH_RATE); returns.len()],
  };

  let mut out = returns.clone();
  out.assets.push(CASH.to_string());
  out.returns.push(column);
  Ok(out)
}

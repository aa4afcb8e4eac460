//! # Rebalancing
//!
//! $$
//! w_{t,i}=\frac{w_{0,i}\prod_{s\le t}(1+r_{s,i})}{\sum_j w_{0,j}\prod_{s\le t}(1+r_{s,j})},\qquad
//! \text{turnover}=\tfrac12\sum_i\lvert w_i^\*-w_{t,i}\rvert
//! $$
//!
//! Weight drift under buy-and-hold and calendar rebalancing back to target.

use std::fmt::Display;
use std::str::FromStr;

use anyhow::Result;
use anyhow::anyhow;
use chrono::Datelike;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

use crate::returns::ReturnPanel;

/// Calendar rebalancing schedule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebalanceFrequency {
  Monthly,
  Quarterly,
  #[default]
  SemiAnnual,
  Annual,
}

impl RebalanceFrequency {
  pub fn months(self) -> u32 {
    match self {
      Self::Monthly => 1,
      Self::Quarterly => 3,
      Self::SemiAnnual => 6,
      Self::Annual => 12,
    }
  }

  pub fn per_year(self) -> f64 {
    12.0 / self.months() as f64
  }

  /// Calendar-aligned period index containing `date`.
  fn period(self, date: NaiveDate) -> i64 {
    let month_index = date.year() as i64 * 12 + date.month0() as i64;
    month_index.div_euclid(self.months() as i64)
  }
}

impl FromStr for RebalanceFrequency {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_lowercase().as_str() {
      "m" | "monthly" => Ok(Self::Monthly),
      "q" | "quarterly" => Ok(Self::Quarterly),
      "6m" | "semiannual" | "semi-annual" => Ok(Self::SemiAnnual),
      "a" | "y" | "annual" | "yearly" => Ok(Self::Annual),
      other => Err(anyhow!("unknown rebalance frequency {other:?}")),
    }
  }
}

impl Display for RebalanceFrequency {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      RebalanceFrequency::Monthly => write!(f, "monthly"),
      RebalanceFrequency::Quarterly => write!(f, "quarterly"),
      RebalanceFrequency::SemiAnnual => write!(f, "every 6 months"),
      RebalanceFrequency::Annual => write!(f, "annually"),
    }
  }
}

/// Rebalancing settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceConfig {
  pub frequency: RebalanceFrequency,
  /// Absolute weight drift that calls for an off-schedule rebalance.
  pub drift_band: f64,
}

impl Default for RebalanceConfig {
  fn default() -> Self {
    Self {
      frequency: RebalanceFrequency::SemiAnnual,
      drift_band: 0.05,
    }
  }
}

/// A scheduled rebalance at the end of a period.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RebalanceEvent {
  pub date: NaiveDate,
  /// Weights just before trading back to target.
  pub pre_weights: Vec<f64>,
  pub turnover: f64,
}

/// Daily weights and turnover of a calendar-rebalanced portfolio.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RebalanceSimulation {
  pub frequency: RebalanceFrequency,
  pub dates: Vec<NaiveDate>,
  /// One weight row per date (after that day's returns, before trading).
  pub weights: Vec<Vec<f64>>,
  pub events: Vec<RebalanceEvent>,
}

impl RebalanceSimulation {
  pub fn total_turnover(&self) -> f64 {
    self.events.iter().map(|e| e.turnover).sum()
  }

  pub fn mean_turnover(&self) -> f64 {
    if self.events.is_empty() {
      0.0
    } else {
      self.total_turnover() / self.events.len() as f64
    }
  }

  /// Largest absolute deviation from target seen at any rebalance.
  pub fn max_drift(&self, target: &[f64]) -> f64 {
    self
      .events
      .iter()
      .map(|e| max_abs_deviation(&e.pre_weights, target))
      .fold(0.0, f64::max)
  }
}

fn max_abs_deviation(a: &[f64], b: &[f64]) -> f64 {
  a.iter()
    .zip(b.iter())
    .map(|(x, y)| (x - y).abs())
    .fold(0.0, f64::max)
}

fn normalise(values: &[f64]) -> Vec<f64> {
  let total: f64 = values.iter().sum();
  if total.abs() < 1e-15 {
    return vec![0.0; values.len()];
  }
  values.iter().map(|v| v / total).collect()
}

/// Daily weights of a portfolio that is never rebalanced.
pub fn weights_over_time_buy_and_hold(returns: &ReturnPanel, init_weights: &[f64]) -> Vec<Vec<f64>> {
  let simple = returns.simple_columns();
  let mut values = init_weights.to_vec();
  (0..returns.len())
    .map(|t| {
      for (v, col) in values.iter_mut().zip(simple.iter()) {
        *v *= 1.0 + col[t];
      }
      normalise(&values)
    })
    .collect()
}

/// Let weights drift within each calendar period, then trade back to
/// `target` on the period's last trading day.
pub fn simulate_rebalancing(
  returns: &ReturnPanel,
  target: &[f64],
  frequency: RebalanceFrequency,
) -> RebalanceSimulation {
  let simple = returns.simple_columns();
  let dates = returns.dates();
  let mut values = target.to_vec();
  let mut weights = Vec::with_capacity(dates.len());
  let mut events = Vec::new();

  for (t, &date) in dates.iter().enumerate() {
    for (v, col) in values.iter_mut().zip(simple.iter()) {
      *v *= 1.0 + col[t];
    }
    let w = normalise(&values);

    let period_ends = dates
      .get(t + 1)
      .map_or(true, |&next| frequency.period(next) != frequency.period(date));
    if period_ends {
      let turnover = 0.5
        * target
          .iter()
          .zip(w.iter())
          .map(|(a, b)| (a - b).abs())
          .sum::<f64>();
      events.push(RebalanceEvent {
        date,
        pre_weights: w.clone(),
        turnover,
      });
      let total: f64 = values.iter().sum();
      values = target.iter().map(|&x| x * total).collect();
    }

    weights.push(w);
  }

  RebalanceSimulation {
    frequency,
    dates: dates.to_vec(),
    weights,
    events,
  }
}

/// Trade needed to bring one asset back to target.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RebalanceTrade {
  pub asset: String,
  pub current: f64,
  pub target: f64,
  /// Target minus current; positive means buy.
  pub delta: f64,
}

/// Whether current holdings have drifted outside the band, and the trades.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RebalanceAdvice {
  pub needed: bool,
  pub max_drift: f64,
  pub band: f64,
  pub trades: Vec<RebalanceTrade>,
}

/// Compare current weights with target under an absolute drift band.
pub fn rebalance_guidance(
  assets: &[String],
  current: &[f64],
  target: &[f64],
  band: f64,
) -> RebalanceAdvice {
  let max_drift = max_abs_deviation(current, target);
  let trades = assets
    .iter()
    .zip(current.iter().zip(target.iter()))
    .filter(|(_, (c, t))| (*t - *c).abs() > 1e-9)
    .map(|(asset, (&current, &target))| RebalanceTrade {
      asset: asset.clone(),
      current,
      target,
      delta: target - current,
    })
    .collect();

  RebalanceAdvice {
    needed: max_drift > band,
    max_drift,
    band,
    trades,
  }
}

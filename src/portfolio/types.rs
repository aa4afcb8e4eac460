//! # Portfolio Types
//!
//! $$
//! \mathbf{w}\in\{\mathbf{w}:\ \mathbf 1^\top\mathbf w=1,\ w_{\min}\le w_i\le w_{\max}\}
//! $$
//!
//! Shared enums and result containers for portfolio optimization.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::Result;
use anyhow::anyhow;
use serde::Deserialize;
use serde::Serialize;

/// Supported allocation rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizerMethod {
  /// Minimum variance subject to a floor on expected return.
  #[default]
  TargetReturn,
  /// Maximum expected return subject to a volatility cap.
  MaxVolatility,
  /// Maximum Sharpe ratio.
  MaxSharpe,
  /// `1/n` in every asset.
  EqualWeight,
}

impl FromStr for OptimizerMethod {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_lowercase().as_str() {
      "target" | "target-return" | "min-variance" => Ok(Self::TargetReturn),
      "max-vol" | "max-volatility" => Ok(Self::MaxVolatility),
      "sharpe" | "max-sharpe" => Ok(Self::MaxSharpe),
      "equal" | "equal-weight" => Ok(Self::EqualWeight),
      other => Err(anyhow!("unknown optimizer {other:?}")),
    }
  }
}

impl Display for OptimizerMethod {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      OptimizerMethod::TargetReturn => write!(f, "Min variance @ target return"),
      OptimizerMethod::MaxVolatility => write!(f, "Max return @ volatility cap"),
      OptimizerMethod::MaxSharpe => write!(f, "Max Sharpe"),
      OptimizerMethod::EqualWeight => write!(f, "Equal weight"),
    }
  }
}

/// Per-asset weight limits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightBounds {
  pub min: f64,
  pub max: f64,
}

impl Default for WeightBounds {
  fn default() -> Self {
    Self { min: 0.0, max: 1.0 }
  }
}

impl WeightBounds {
  /// Whether `n` assets can sum to one inside the bounds.
  pub fn is_feasible(&self, n: usize) -> bool {
    let n = n as f64;
    self.min >= 0.0
      && self.min <= self.max
      && n * self.min <= 1.0 + 1e-12
      && n * self.max >= 1.0 - 1e-12
  }
}

/// Output of a portfolio optimization run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PortfolioResult {
  /// Final portfolio weights.
  pub weights: Vec<f64>,
  /// Model expected portfolio return (annualized if inputs are annualized).
  pub expected_return: f64,
  /// Model portfolio volatility.
  pub volatility: f64,
  /// Sharpe ratio computed as `(expected_return - risk_free) / volatility`.
  pub sharpe: f64,
  /// Solver finished and every constraint holds within tolerance.
  pub converged: bool,
}

pub(crate) fn empty_result() -> PortfolioResult {
  PortfolioResult::default()
}

/// Optimization result with asset names attached.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Allocation {
  pub method: OptimizerMethod,
  pub assets: Vec<String>,
  pub result: PortfolioResult,
}

impl Allocation {
  /// Weight of `asset`, zero when absent.
  pub fn weight(&self, asset: &str) -> f64 {
    self
      .assets
      .iter()
      .position(|a| a == asset)
      .and_then(|i| self.result.weights.get(i).copied())
      .unwrap_or(0.0)
  }

  pub fn weights(&self) -> &[f64] {
    &self.result.weights
  }

  /// Weights keyed by asset name.
  pub fn weight_map(&self) -> BTreeMap<String, f64> {
    self
      .assets
      .iter()
      .cloned()
      .zip(self.result.weights.iter().copied())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_optimizer_aliases() {
    assert_eq!(
      "max-sharpe".parse::<OptimizerMethod>().unwrap(),
      OptimizerMethod::MaxSharpe
    );
    assert_eq!(
      "Target".parse::<OptimizerMethod>().unwrap(),
      OptimizerMethod::TargetReturn
    );
    assert!("hrp".parse::<OptimizerMethod>().is_err());
  }

  #[test]
  fn bounds_feasibility() {
    let b = WeightBounds { min: 0.05, max: 0.4 };
    assert!(b.is_feasible(5));
    assert!(!b.is_feasible(2));
    assert!(!b.is_feasible(25));
  }
}

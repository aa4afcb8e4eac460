//! # Portfolio Engine
//!
//! $$
//! \mathbf{w}^\* = \operatorname{Optimize}(\mu, \Sigma)
//! $$
//!
//! High-level orchestration API for optimizer selection.

use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use super::data::AssetStatistics;
use super::optimizers::optimize_with_method;
use super::types::Allocation;
use super::types::OptimizerMethod;
use super::types::WeightBounds;

/// Runtime configuration for [`PortfolioEngine`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioEngineConfig {
  /// Optimizer used by [`PortfolioEngine::optimize`].
  pub optimizer: OptimizerMethod,
  /// Floor on annual expected return for the target-return optimizer.
  pub target_return: f64,
  /// Cap on annual volatility for the max-volatility optimizer.
  pub max_volatility: f64,
  /// Minimum weight per asset (0 = no forced holding).
  pub min_weight: f64,
  /// Maximum weight per asset (1 = no cap).
  pub max_weight: f64,
  /// Risk-free rate used in Sharpe computations.
  pub risk_free: f64,
}

impl Default for PortfolioEngineConfig {
  fn default() -> Self {
    Self {
      optimizer: OptimizerMethod::TargetReturn,
      target_return: 0.08,
      max_volatility: 0.13,
      min_weight: 0.0,
      max_weight: 1.0,
      risk_free: 0.0,
    }
  }
}

impl PortfolioEngineConfig {
  pub fn bounds(&self) -> WeightBounds {
    WeightBounds {
      min: self.min_weight,
      max: self.max_weight,
    }
  }
}

/// Single entry-point engine for allocation workflows.
#[derive(Clone, Debug)]
pub struct PortfolioEngine {
  config: PortfolioEngineConfig,
}

impl PortfolioEngine {
  /// Construct a new engine with explicit configuration.
  pub fn new(config: PortfolioEngineConfig) -> Self {
    Self { config }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &PortfolioEngineConfig {
    &self.config
  }

  /// Allocate with the configured optimizer.
  pub fn optimize(&self, stats: &AssetStatistics) -> Allocation {
    self.optimize_with(self.config.optimizer, stats)
  }

  /// Allocate with an explicit optimizer, keeping the other settings.
  pub fn optimize_with(&self, method: OptimizerMethod, stats: &AssetStatistics) -> Allocation {
    let result = optimize_with_method(
      method,
      &stats.mu,
      &stats.cov,
      self.config.bounds(),
      self.config.target_return,
      self.config.max_volatility,
      self.config.risk_free,
    );

    info!(
      method = %method,
      expected_return = result.expected_return,
      volatility = result.volatility,
      converged = result.converged,
      "allocation solved"
    );

    Allocation {
      method,
      assets: stats.assets.clone(),
      result,
    }
  }

  /// Configured optimizer first, then every other method for comparison.
  pub fn compare(&self, stats: &AssetStatistics) -> Vec<Allocation> {
    let mut methods = vec![self.config.optimizer];
    methods.extend(
      [
        OptimizerMethod::TargetReturn,
        OptimizerMethod::MaxVolatility,
        OptimizerMethod::MaxSharpe,
        OptimizerMethod::EqualWeight,
      ]
      .into_iter()
      .filter(|m| *m != self.config.optimizer),
    );
    methods
      .into_iter()
      .map(|m| self.optimize_with(m, stats))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn stats() -> AssetStatistics {
    AssetStatistics {
      assets: vec!["Stocks".to_string(), "Bonds".to_string(), "Cash".to_string()],
      mu: vec![0.09, 0.03, 0.01],
      vol: vec![0.16, 0.05, 0.001],
      cov: vec![
        vec![0.0256, 0.0004, 0.0],
        vec![0.0004, 0.0025, 0.0],
        vec![0.0, 0.0, 1e-6],
      ],
      corr: vec![
        vec![1.0, 0.05, 0.0],
        vec![0.05, 1.0, 0.0],
        vec![0.0, 0.0, 1.0],
      ],
    }
  }

  #[test]
  fn optimize_handles_empty_inputs() {
    let engine = PortfolioEngine::new(PortfolioEngineConfig::default());
    let allocation = engine.optimize(&AssetStatistics::default());

    assert!(allocation.weights().is_empty());
    assert_eq!(allocation.result.expected_return, 0.0);
    assert_eq!(allocation.result.volatility, 0.0);
  }

  #[test]
  fn target_allocation_names_weights() {
    let engine = PortfolioEngine::new(PortfolioEngineConfig {
      target_return: 0.06,
      ..Default::default()
    });
    let allocation = engine.optimize(&stats());

    assert!(allocation.result.converged);
    assert!(allocation.result.expected_return >= 0.06 - 1e-4);
    let total: f64 = allocation.weight_map().values().sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert!(allocation.weight("Stocks") > allocation.weight("Cash"));
    assert_eq!(allocation.weight("Gold"), 0.0);
  }

  #[test]
  fn compare_lists_configured_method_first() {
    let engine = PortfolioEngine::new(PortfolioEngineConfig {
      optimizer: OptimizerMethod::MaxSharpe,
      ..Default::default()
    });
    let all = engine.compare(&stats());

    assert_eq!(all.len(), 4);
    assert_eq!(all[0].method, OptimizerMethod::MaxSharpe);
    assert!(all[1..].iter().all(|a| a.method != OptimizerMethod::MaxSharpe));
  }
}

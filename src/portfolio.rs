//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Asset statistics, long-only allocation, random portfolios and rebalancing.

pub mod data;
pub mod engine;
pub mod optimizers;
pub mod random;
pub mod rebalance;
pub mod types;

pub use data::AssetStatistics;
pub use data::annualized_covariance;
pub use data::annualized_mean;
pub use data::correlation_matrix;
pub use data::sample_covariance;
pub use engine::PortfolioEngine;
pub use engine::PortfolioEngineConfig;
pub use optimizers::optimize_equal_weight;
pub use optimizers::optimize_max_sharpe;
pub use optimizers::optimize_max_volatility;
pub use optimizers::optimize_target_return;
pub use optimizers::optimize_with_method;
pub use random::RandomPortfolio;
pub use random::generate_random_portfolios;
pub use rebalance::RebalanceAdvice;
pub use rebalance::RebalanceConfig;
pub use rebalance::RebalanceFrequency;
pub use rebalance::RebalanceSimulation;
pub use rebalance::rebalance_guidance;
pub use rebalance::simulate_rebalancing;
pub use rebalance::weights_over_time_buy_and_hold;
pub use types::Allocation;
pub use types::OptimizerMethod;
pub use types::PortfolioResult;
pub use types::WeightBounds;

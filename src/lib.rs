//! # folio-rs
//!
//! $$
//! \mathbf{w}^\*=\arg\min_{\mathbf{w}} \mathbf{w}^\top\Sigma\mathbf{w}
//! \quad\text{s.t.}\quad \mathbf{1}^\top\mathbf{w}=1,\ \mu^\top\mathbf{w}\ge r^\*
//! $$
//!
//! Static ETF allocation analysis: price coverage checks, return statistics,
//! mean-variance allocation, forward outcome simulation and rebalancing
//! guidance.

pub mod analysis;
pub mod config;
pub mod data;
pub mod metrics;
pub mod portfolio;
pub mod report;
pub mod returns;
pub mod simulation;
pub mod visualization;

pub use analysis::Analysis;
pub use analysis::AnalysisReport;
pub use config::AnalysisConfig;
pub use data::PricePanel;
pub use returns::ReturnPanel;

/// Trading days used to annualise daily statistics.
pub const TRADING_DAYS: f64 = 252.0;

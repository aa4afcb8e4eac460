//! # Data
//!
//! $$
//! P\in\mathbb R^{T\times N},\qquad \text{coverage}_j=\frac{\#\{t: P_{tj}\ \text{valid}\}}{T}
//! $$
//!
//! Price panels, coverage checks and price sources (CSV files, Yahoo Finance).

pub mod io;
pub mod panel;
#[cfg(feature = "yahoo")]
pub mod yahoo;

pub use io::read_csv;
pub use io::write_csv;
pub use panel::CoverageReport;
pub use panel::PricePanel;
#[cfg(feature = "yahoo")]
pub use yahoo::fetch_prices;

//! # Simulation Summary
//!
//! $$
//! Q(q)=x_{\lfloor h\rfloor}+(h-\lfloor h\rfloor)(x_{\lceil h\rceil}-x_{\lfloor h\rfloor}),\quad h=\tfrac{q}{100}(n-1)
//! $$
//!
//! Percentiles and probabilities of simulated terminal outcomes.

use serde::Serialize;

use super::SimulationMethod;
use super::SimulationPaths;

/// Reported percentiles of terminal value and annualised return.
pub const PERCENTILES: [f64; 5] = [5.0, 25.0, 50.0, 75.0, 95.0];

/// Linearly interpolated percentile of ascending `sorted` data.
///
/// `q` is in percent. `NaN` for empty input.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
  let n = sorted.len();
  if n == 0 {
    return f64::NAN;
  }
  let h = (q.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
  let lo = h.floor() as usize;
  let hi = h.ceil() as usize;
  sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Distribution of simulated outcomes.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationSummary {
  pub method: SimulationMethod,
  pub n_paths: usize,
  pub horizon_years: usize,
  pub initial_value: f64,
  pub mean_terminal: f64,
  /// `(percentile, terminal value)` for each of [`PERCENTILES`].
  pub terminal_percentiles: Vec<(f64, f64)>,
  /// `(percentile, annualised return)` for each of [`PERCENTILES`].
  pub cagr_percentiles: Vec<(f64, f64)>,
  /// Share of paths ending below the initial value.
  pub prob_loss: f64,
  pub target_cagr: f64,
  /// Share of paths compounding at least `target_cagr`.
  pub prob_target: f64,
}

impl SimulationSummary {
  pub fn from_paths(paths: &SimulationPaths, target_cagr: f64) -> Self {
    let mut terminal = paths.terminal_values();
    terminal.sort_by(f64::total_cmp);

    let years = paths.horizon_years.max(1) as f64;
    // Monotone in terminal value, so already sorted.
    let cagrs: Vec<f64> = terminal
      .iter()
      .map(|&v| {
        if v <= 0.0 {
          -1.0
        } else {
          (v / paths.initial_value).powf(1.0 / years) - 1.0
        }
      })
      .collect();

    let n = terminal.len().max(1) as f64;
    let losses = terminal.iter().filter(|&&v| v < paths.initial_value).count();
    let hits = cagrs.iter().filter(|&&c| c >= target_cagr).count();

    Self {
      method: paths.method,
      n_paths: terminal.len(),
      horizon_years: paths.horizon_years,
      initial_value: paths.initial_value,
      mean_terminal: terminal.iter().sum::<f64>() / n,
      terminal_percentiles: PERCENTILES
        .iter()
        .map(|&q| (q, percentile(&terminal, q)))
        .collect(),
      cagr_percentiles: PERCENTILES
        .iter()
        .map(|&q| (q, percentile(&cagrs, q)))
        .collect(),
      prob_loss: losses as f64 / n,
      target_cagr,
      prob_target: hits as f64 / n,
    }
  }

  /// Median terminal value.
  pub fn median_terminal(&self) -> f64 {
    self
      .terminal_percentiles
      .iter()
      .find(|(q, _)| *q == 50.0)
      .map_or(f64::NAN, |(_, v)| *v)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn percentile_interpolates_linearly() {
    let xs = [1.0, 2.0, 3.0, 4.0];
    assert_eq!(percentile(&xs, 0.0), 1.0);
    assert_eq!(percentile(&xs, 100.0), 4.0);
    assert_relative_eq!(percentile(&xs, 50.0), 2.5);
    assert_relative_eq!(percentile(&xs, 25.0), 1.75);
    assert!(percentile(&[], 50.0).is_nan());
    assert_eq!(percentile(&[7.0], 95.0), 7.0);
  }

  #[test]
  fn summary_counts_losses_and_targets() {
    let paths = SimulationPaths {
      method: SimulationMethod::HistoricalBootstrap,
      initial_value: 1.0,
      horizon_years: 2,
      values: vec![
        vec![1.0, 0.9, 0.8],
        vec![1.0, 1.1, 1.21],
        vec![1.0, 1.0, 1.0],
        vec![1.0, 1.2, 1.44],
      ],
    };
    let s = SimulationSummary::from_paths(&paths, 0.15);

    assert_eq!(s.n_paths, 4);
    assert_relative_eq!(s.prob_loss, 0.25);
    assert_relative_eq!(s.prob_target, 0.25);
    assert_relative_eq!(s.mean_terminal, (0.8 + 1.21 + 1.0 + 1.44) / 4.0, epsilon = 1e-12);
    assert_relative_eq!(s.median_terminal(), 1.105, epsilon = 1e-12);
    assert_relative_eq!(s.cagr_percentiles[4].1, 0.185, epsilon = 1e-12);
  }
}

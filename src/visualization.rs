//! # Visualization
//!
//! $$
//! (\sigma_k, g_k)_{k=1}^{m},\qquad Q_q(V_y),\qquad w_{t,i}
//! $$
//!
//! HTML charts: the random-portfolio cloud, simulated value fans and weight
//! drift with and without rebalancing.

use std::fs;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use chrono::NaiveDate;
use plotly::Layout;
use plotly::Plot;
use plotly::Scatter;
use plotly::common::DashType;
use plotly::common::Line;
use plotly::common::Marker;
use plotly::common::Mode;
use plotly::common::Title;
use plotly::layout::Axis;
use plotly::layout::Margin;
use tracing::info;

use crate::metrics::PortfolioMetrics;
use crate::portfolio::RandomPortfolio;
use crate::simulation::PERCENTILES;
use crate::simulation::SimulationPaths;

const HIGHLIGHT_COLORS: [&str; 4] = ["#d62728", "#2ca02c", "#9467bd", "#ff7f0e"];

fn base_layout(title: &str, x: &str, y: &str) -> Layout {
  Layout::new()
    .title(Title::from(title))
    .auto_size(true)
    .margin(Margin::new().left(64).right(24).top(64).bottom(48))
    .x_axis(Axis::new().title(x))
    .y_axis(Axis::new().title(y))
}

/// Realised volatility against CAGR for random allocations, with named
/// allocations on top.
pub fn frontier_plot(random: &[RandomPortfolio], highlights: &[(String, PortfolioMetrics)]) -> Plot {
  let mut plot = Plot::new();
  plot.set_layout(base_layout(
    "Random portfolios (historical)",
    "Annualised volatility",
    "CAGR",
  ));

  let x: Vec<f64> = random.iter().map(|p| p.metrics.annual_vol).collect();
  let y: Vec<f64> = random.iter().map(|p| p.metrics.cagr).collect();
  plot.add_trace(
    Scatter::new(x, y)
      .mode(Mode::Markers)
      .marker(Marker::new().size(4).opacity(0.5).color("#7f7f7f"))
      .name("Random"),
  );

  for (i, (name, m)) in highlights.iter().enumerate() {
    plot.add_trace(
      Scatter::new(vec![m.annual_vol], vec![m.cagr])
        .mode(Mode::Markers)
        .marker(
          Marker::new()
            .size(12)
            .color(HIGHLIGHT_COLORS[i % HIGHLIGHT_COLORS.len()]),
        )
        .name(name.as_str()),
    );
  }

  plot
}

/// Percentile bands of simulated value by year.
pub fn fan_chart(paths: &SimulationPaths) -> Plot {
  let mut plot = Plot::new();
  plot.set_layout(base_layout(
    &format!("{} ({} paths)", paths.method, paths.n_paths()),
    "Years",
    "Portfolio value",
  ));

  let years: Vec<usize> = (0..=paths.horizon_years).collect();
  for q in PERCENTILES {
    let dash = if q == 50.0 {
      DashType::Solid
    } else if q == 25.0 || q == 75.0 {
      DashType::Dash
    } else {
      DashType::Dot
    };
    plot.add_trace(
      Scatter::new(years.clone(), paths.percentile_by_year(q))
        .mode(Mode::Lines)
        .line(Line::new().width(if q == 50.0 { 2.5 } else { 1.2 }).dash(dash))
        .name(format!("P{q:.0}")),
    );
  }

  plot
}

/// Weights per asset over time, buy-and-hold solid and rebalanced dashed.
pub fn weight_drift_plot(
  dates: &[NaiveDate],
  assets: &[String],
  buy_and_hold: &[Vec<f64>],
  rebalanced: &[Vec<f64>],
) -> Plot {
  let mut plot = Plot::new();
  plot.set_layout(base_layout("Weight drift", "Date", "Weight"));

  let x: Vec<String> = dates.iter().map(|d| d.to_string()).collect();
  for (i, asset) in assets.iter().enumerate() {
    let hold: Vec<f64> = buy_and_hold.iter().map(|row| row[i]).collect();
    let rebal: Vec<f64> = rebalanced.iter().map(|row| row[i]).collect();
    plot.add_trace(
      Scatter::new(x.clone(), hold)
        .mode(Mode::Lines)
        .line(Line::new().width(1.5))
        .name(format!("{asset} (buy & hold)")),
    );
    plot.add_trace(
      Scatter::new(x.clone(), rebal)
        .mode(Mode::Lines)
        .line(Line::new().width(1.0).dash(DashType::Dash))
        .name(format!("{asset} (rebalanced)")),
    );
  }

  plot
}

/// Write `plot` as standalone HTML, creating parent directories.
pub fn write_plot(plot: &Plot, path: &Path) -> Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)
      .with_context(|| format!("failed creating plot output directory {parent:?}"))?;
  }
  plot.write_html(path);
  info!(path = %path.display(), "wrote chart");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::simulation::SimulationMethod;

  #[test]
  fn fan_chart_has_one_trace_per_percentile() {
    let paths = SimulationPaths {
      method: SimulationMethod::MonteCarlo,
      initial_value: 1.0,
      horizon_years: 2,
      values: vec![vec![1.0, 1.1, 1.2], vec![1.0, 0.9, 1.0]],
    };
    let html = fan_chart(&paths).to_html();
    for q in ["P5", "P25", "P50", "P75", "P95"] {
      assert!(html.contains(q));
    }
  }

  #[test]
  fn writes_html_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("charts").join("drift.html");
    let dates = vec![NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()];
    let plot = weight_drift_plot(&dates, &["A".to_string()], &[vec![1.0]], &[vec![1.0]]);

    write_plot(&plot, &path).unwrap();
    let html = fs::read_to_string(&path).unwrap();
    assert!(html.contains("A (rebalanced)"));
  }
}

//! # Report
//!
//! Console tables for every stage of the analysis. Weights, returns,
//! volatilities and drawdowns are always shown as fixed-decimal percentages.

use chrono::NaiveDate;
use prettytable::Cell;
use prettytable::Row;
use prettytable::Table;
use prettytable::format;
use prettytable::row;

use crate::data::CoverageReport;
use crate::metrics::PortfolioMetrics;
use crate::metrics::return_contributions;
use crate::metrics::volatility_drag;
use crate::portfolio::Allocation;
use crate::portfolio::AssetStatistics;
use crate::portfolio::RebalanceAdvice;
use crate::portfolio::RebalanceSimulation;
use crate::simulation::SimulationSummary;

/// `0.1234 -> "12.34%"` for `decimals = 2`; `n/a` for non-finite input.
pub fn format_pct(x: f64, decimals: usize) -> String {
  if x.is_finite() {
    format!("{:.*}%", decimals, x * 100.0)
  } else {
    "n/a".to_string()
  }
}

fn format_ratio(x: f64) -> String {
  if x.is_finite() {
    format!("{x:.2}")
  } else {
    "n/a".to_string()
  }
}

fn new_table(titles: Row) -> Table {
  let mut table = Table::new();
  table.set_format(*format::consts::FORMAT_BOX_CHARS);
  table.set_titles(titles);
  table
}

fn title_row(titles: &[&str]) -> Row {
  Row::new(titles.iter().map(|t| Cell::new(t).style_spec("b")).collect())
}

/// First and last valid date and coverage fraction per asset.
pub fn coverage_table(reports: &[CoverageReport]) -> Table {
  let mut table = new_table(title_row(&["Asset", "First", "Last", "Days", "Coverage"]));
  let date = |d: Option<NaiveDate>| d.map_or("-".to_string(), |d| d.to_string());
  for report in reports {
    table.add_row(row![
      report.asset,
      date(report.first_date),
      date(report.last_date),
      r -> report.observations,
      r -> format_pct(report.fraction, 1)
    ]);
  }
  table
}

/// Annualised return and volatility per asset.
pub fn asset_stats_table(stats: &AssetStatistics) -> Table {
  let mut table = new_table(title_row(&["Asset", "Mean return", "Volatility"]));
  for (i, asset) in stats.assets.iter().enumerate() {
    table.add_row(row![
      asset,
      r -> format_pct(stats.mu[i], 2),
      r -> format_pct(stats.vol[i], 2)
    ]);
  }
  table
}

/// Pairwise correlation matrix.
pub fn correlation_table(stats: &AssetStatistics) -> Table {
  let mut titles = vec![""];
  titles.extend(stats.assets.iter().map(String::as_str));
  let mut table = new_table(title_row(&titles));
  for (asset, corr_row) in stats.assets.iter().zip(stats.corr.iter()) {
    let mut cells = vec![Cell::new(asset)];
    cells.extend(
      corr_row
        .iter()
        .map(|c| Cell::new(&format!("{c:.2}")).style_spec("r")),
    );
    table.add_row(Row::new(cells));
  }
  table
}

/// Weights largest first; weights below `threshold` collapse into one line.
pub fn allocation_table(allocation: &Allocation, threshold: f64) -> Table {
  let mut table = new_table(title_row(&["Asset", "Weight"]));
  let mut rows: Vec<(&str, f64)> = allocation
    .assets
    .iter()
    .map(String::as_str)
    .zip(allocation.weights().iter().copied())
    .collect();
  rows.sort_by(|a, b| b.1.total_cmp(&a.1));

  let (shown, folded): (Vec<_>, Vec<_>) = rows.into_iter().partition(|(_, w)| *w >= threshold);
  for (asset, w) in &shown {
    table.add_row(row![asset, r -> format_pct(*w, 2)]);
  }
  if !folded.is_empty() {
    let total: f64 = folded.iter().map(|(_, w)| w).sum();
    table.add_row(row![
      i -> format!("{} below {}", folded.len(), format_pct(threshold, 1)),
      r -> format_pct(total, 2)
    ]);
  }
  let result = &allocation.result;
  table.add_row(row![b -> "Expected return", r -> format_pct(result.expected_return, 2)]);
  table.add_row(row![b -> "Volatility", r -> format_pct(result.volatility, 2)]);
  table.add_row(row![b -> "Sharpe", r -> format_ratio(result.sharpe)]);
  table
}

/// Model and realised statistics of several allocations side by side.
pub fn comparison_table(rows: &[(Allocation, PortfolioMetrics)]) -> Table {
  let mut table = new_table(title_row(&[
    "Strategy",
    "Exp. return",
    "Exp. vol",
    "CAGR",
    "Realised vol",
    "Sharpe",
    "Max drawdown",
    "Solved",
  ]));
  for (allocation, m) in rows {
    let result = &allocation.result;
    table.add_row(row![
      allocation.method.to_string(),
      r -> format_pct(result.expected_return, 2),
      r -> format_pct(result.volatility, 2),
      r -> format_pct(m.cagr, 2),
      r -> format_pct(m.annual_vol, 2),
      r -> format_ratio(m.sharpe),
      r -> format_pct(m.max_drawdown, 2),
      c -> if result.converged { "yes" } else { "NO" }
    ]);
  }
  table
}

/// Per-asset `w_i * mu_i` reconciled against the realised CAGR.
///
/// Weighted arithmetic means overstate compound growth by roughly half the
/// portfolio variance, so the two are shown together with that drag.
pub fn contributions_table(
  allocation: &Allocation,
  stats: &AssetStatistics,
  realised: &PortfolioMetrics,
) -> Table {
  let mut table = new_table(title_row(&["Asset", "Weight", "Mean return", "Contribution"]));
  let mu: Vec<f64> = allocation
    .assets
    .iter()
    .map(|a| {
      stats
        .assets
        .iter()
        .position(|s| s == a)
        .map_or(0.0, |i| stats.mu[i])
    })
    .collect();
  let contributions = return_contributions(allocation.weights(), &mu);

  for ((asset, w), (m, c)) in allocation
    .assets
    .iter()
    .zip(allocation.weights())
    .zip(mu.iter().zip(contributions.iter()))
  {
    table.add_row(row![
      asset,
      r -> format_pct(*w, 2),
      r -> format_pct(*m, 2),
      r -> format_pct(*c, 2)
    ]);
  }

  let arithmetic: f64 = contributions.iter().sum();
  let drag = volatility_drag(realised.annual_vol);
  table.add_row(row![b -> "Sum (arithmetic)", "", "", r -> format_pct(arithmetic, 2)]);
  table.add_row(row![i -> "Volatility drag", "", "", r -> format_pct(-drag, 2)]);
  table.add_row(row![i -> "Approx. geometric", "", "", r -> format_pct(arithmetic - drag, 2)]);
  table.add_row(row![b -> "Realised CAGR", "", "", r -> format_pct(realised.cagr, 2)]);
  table
}

/// Terminal value and annualised return percentiles per simulation method.
pub fn simulation_table(summaries: &[SimulationSummary]) -> Table {
  let mut titles = vec!["Method".to_string(), "Statistic".to_string()];
  if let Some(first) = summaries.first() {
    titles.extend(first.terminal_percentiles.iter().map(|(q, _)| format!("P{q:.0}")));
  }
  let mut table = new_table(Row::new(
    titles
      .iter()
      .map(|t| Cell::new(t).style_spec("b"))
      .collect(),
  ));

  for s in summaries {
    let mut terminal = vec![
      Cell::new(&s.method.to_string()),
      Cell::new(&format!("Value after {}y", s.horizon_years)),
    ];
    terminal.extend(
      s.terminal_percentiles
        .iter()
        .map(|(_, v)| Cell::new(&format!("{v:.2}")).style_spec("r")),
    );
    table.add_row(Row::new(terminal));

    let mut cagr = vec![Cell::new(""), Cell::new("Annualised return")];
    cagr.extend(
      s.cagr_percentiles
        .iter()
        .map(|(_, c)| Cell::new(&format_pct(*c, 2)).style_spec("r")),
    );
    table.add_row(Row::new(cagr));
  }
  table
}

/// Probability lines below the percentile table.
pub fn simulation_probabilities(summaries: &[SimulationSummary]) -> Table {
  let mut table = new_table(title_row(&["Method", "Mean value", "P(loss)", "P(CAGR >= target)"]));
  for s in summaries {
    table.add_row(row![
      s.method.to_string(),
      r -> format!("{:.2}", s.mean_terminal),
      r -> format_pct(s.prob_loss, 1),
      r -> format!("{} ({})", format_pct(s.prob_target, 1), format_pct(s.target_cagr, 1))
    ]);
  }
  table
}

/// Rebalancing dates with pre-trade weights and turnover.
pub fn rebalance_table(sim: &RebalanceSimulation, assets: &[String], last: usize) -> Table {
  let mut titles = vec!["Date".to_string()];
  titles.extend(assets.iter().cloned());
  titles.push("Turnover".to_string());
  let mut table = new_table(Row::new(
    titles
      .iter()
      .map(|t| Cell::new(t).style_spec("b"))
      .collect(),
  ));

  let skip = sim.events.len().saturating_sub(last);
  for event in sim.events.iter().skip(skip) {
    let mut cells = vec![Cell::new(&event.date.to_string())];
    cells.extend(
      event
        .pre_weights
        .iter()
        .map(|w| Cell::new(&format_pct(*w, 1)).style_spec("r")),
    );
    cells.push(Cell::new(&format_pct(event.turnover, 2)).style_spec("r"));
    table.add_row(Row::new(cells));
  }
  table
}

/// Trades that bring current weights back to target.
pub fn guidance_table(advice: &RebalanceAdvice) -> Table {
  let mut table = new_table(title_row(&["Asset", "Current", "Target", "Trade"]));
  for t in &advice.trades {
    let action = if t.delta > 0.0 { "buy" } else { "sell" };
    table.add_row(row![
      t.asset,
      r -> format_pct(t.current, 2),
      r -> format_pct(t.target, 2),
      r -> format!("{action} {}", format_pct(t.delta.abs(), 2))
    ]);
  }
  table
}

//! # Analysis
//!
//! $$
//! P\ \to\ r\ \to\ (\hat\mu,\hat\Sigma)\ \to\ \mathbf w^\*\ \to\ \{V^{(k)}_{y}\}
//! $$
//!
//! The end-to-end run: coverage, returns, allocation, history, simulation and
//! rebalancing, collected into one report.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use csv::Writer;
use tracing::info;
use tracing::warn;

use crate::config::AnalysisConfig;
use crate::data::CoverageReport;
use crate::data::PricePanel;
use crate::data::write_csv;
use crate::metrics::PortfolioMetrics;
use crate::metrics::apply_annual_tax;
use crate::metrics::cagr;
use crate::metrics::portfolio_metrics;
use crate::metrics::portfolio_return_series;
use crate::metrics::value_series;
use crate::portfolio::Allocation;
use crate::portfolio::AssetStatistics;
use crate::portfolio::PortfolioEngine;
use crate::portfolio::RandomPortfolio;
use crate::portfolio::RebalanceAdvice;
use crate::portfolio::RebalanceSimulation;
use crate::portfolio::generate_random_portfolios;
use crate::portfolio::rebalance_guidance;
use crate::portfolio::simulate_rebalancing;
use crate::portfolio::weights_over_time_buy_and_hold;
use crate::report;
use crate::returns::ReturnPanel;
use crate::returns::add_cash_returns;
use crate::returns::apply_annual_fees;
use crate::returns::compute_returns;
use crate::simulation::SimulationPaths;
use crate::simulation::SimulationSummary;
use crate::simulation::historical_bootstrap;
use crate::simulation::monte_carlo;
use crate::visualization;

/// Rebalancing dates shown in the console report.
const REBALANCE_ROWS: usize = 8;

/// Runs the full analysis for one configuration.
#[derive(Clone, Debug)]
pub struct Analysis {
  config: AnalysisConfig,
}

/// Everything the analysis computed.
#[derive(Clone, Debug)]
pub struct AnalysisReport {
  pub config: AnalysisConfig,
  pub prices: PricePanel,
  pub coverage: Vec<CoverageReport>,
  /// Net of fees, with the cash column when enabled.
  pub returns: ReturnPanel,
  pub stats: AssetStatistics,
  /// Configured optimizer first, then the comparison allocations, each with
  /// its realised historical metrics.
  pub allocations: Vec<(Allocation, PortfolioMetrics)>,
  /// Historical CAGR of the recommendation after annual tax, when taxed.
  pub after_tax_cagr: Option<f64>,
  pub random: Vec<RandomPortfolio>,
  pub buy_and_hold: Vec<Vec<f64>>,
  pub rebalancing: RebalanceSimulation,
  pub guidance: RebalanceAdvice,
  pub bootstrap: SimulationPaths,
  pub monte_carlo: SimulationPaths,
  pub summaries: Vec<SimulationSummary>,
}

impl Analysis {
  pub fn new(config: AnalysisConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &AnalysisConfig {
    &self.config
  }

  /// Run every stage on `prices`, which must hold a column per ticker name.
  pub fn run(&self, prices: &PricePanel) -> Result<AnalysisReport> {
    let cfg = &self.config;
    cfg.validate()?;

    let names: Vec<&str> = cfg.tickers.iter().map(|t| t.name.as_str()).collect();
    let prices = prices.select(&names)?.between(cfg.start, cfg.end);
    if prices.is_empty() {
      bail!(
        "no prices between {} and {}",
        cfg.start,
        cfg.end.map_or_else(|| "today".to_string(), |d| d.to_string())
      );
    }
    let coverage = prices
      .validate_coverage(cfg.coverage.min_fraction)
      .context("price coverage check failed")?;
    info!(dates = prices.len(), assets = names.len(), "price data validated");

    let mut returns = compute_returns(&prices, cfg.return_method)?;
    returns = apply_annual_fees(&returns, &cfg.annual_fees);
    if cfg.cash.include {
      returns = add_cash_returns(&returns, &cfg.cash)?;
    }
    if returns.len() < 2 {
      bail!("not enough overlapping history to estimate statistics");
    }
    info!(
      periods = returns.len(),
      method = %returns.method(),
      first = %returns.dates()[0],
      "returns computed"
    );

    let stats = AssetStatistics::from_returns(&returns);
    let engine = PortfolioEngine::new(cfg.optimizer.clone());
    let risk_free = cfg.optimizer.risk_free;
    let allocations: Vec<(Allocation, PortfolioMetrics)> = engine
      .compare(&stats)
      .into_iter()
      .map(|a| {
        let series = portfolio_return_series(&returns, a.weights());
        let metrics = portfolio_metrics(returns.dates(), &series, 1.0, risk_free);
        (a, metrics)
      })
      .collect();

    let recommended = &allocations[0].0;
    if !recommended.result.converged {
      warn!(method = %recommended.method, "recommended allocation did not satisfy its constraints");
    }
    let target = recommended.weights().to_vec();

    let after_tax_cagr = (cfg.simulation.annual_tax > 0.0).then(|| {
      let series = portfolio_return_series(&returns, &target);
      let values = value_series(&series, 1.0);
      let taxed = apply_annual_tax(returns.dates(), &values, cfg.simulation.annual_tax);
      cagr(returns.dates(), &taxed)
    });

    let random = generate_random_portfolios(
      &returns,
      cfg.random_portfolios,
      cfg.simulation.seed,
      risk_free,
    );
    info!(count = random.len(), "random portfolios evaluated");

    let buy_and_hold = weights_over_time_buy_and_hold(&returns, &target);
    let rebalancing = simulate_rebalancing(&returns, &target, cfg.rebalance.frequency);
    let drifted = buy_and_hold.last().cloned().unwrap_or_else(|| target.clone());
    let guidance = rebalance_guidance(
      returns.assets(),
      &drifted,
      &target,
      cfg.rebalance.drift_band,
    );
    info!(
      events = rebalancing.events.len(),
      mean_turnover = rebalancing.mean_turnover(),
      "rebalancing simulated"
    );

    let bootstrap = historical_bootstrap(&returns, &target, &cfg.simulation)?;
    let monte_carlo = monte_carlo(&returns, &target, &cfg.simulation)?;
    let summaries = vec![
      SimulationSummary::from_paths(&bootstrap, cfg.optimizer.target_return),
      SimulationSummary::from_paths(&monte_carlo, cfg.optimizer.target_return),
    ];
    info!(
      bootstrap_median = summaries[0].median_terminal(),
      monte_carlo_median = summaries[1].median_terminal(),
      "simulations finished"
    );

    Ok(AnalysisReport {
      config: cfg.clone(),
      prices,
      coverage,
      returns,
      stats,
      allocations,
      after_tax_cagr,
      random,
      buy_and_hold,
      rebalancing,
      guidance,
      bootstrap,
      monte_carlo,
      summaries,
    })
  }
}

impl AnalysisReport {
  /// Allocation from the configured optimizer.
  pub fn recommended(&self) -> &Allocation {
    &self.allocations[0].0
  }

  /// Realised historical metrics of the recommendation.
  pub fn recommended_metrics(&self) -> &PortfolioMetrics {
    &self.allocations[0].1
  }

  /// The full console report.
  pub fn render(&self) -> String {
    let cfg = &self.config;
    let recommended = self.recommended();
    let mut out = String::new();

    let mut section = |title: &str, body: String| {
      let _ = writeln!(out, "\n== {title} ==");
      out.push_str(&body);
    };

    section("Data coverage", report::coverage_table(&self.coverage).to_string());
    section(
      &format!(
        "Asset statistics ({} to {}, {} returns)",
        self.returns.dates()[0],
        self.returns.dates()[self.returns.len() - 1],
        self.returns.method()
      ),
      report::asset_stats_table(&self.stats).to_string(),
    );
    section("Correlation", report::correlation_table(&self.stats).to_string());
    section(
      &format!("Recommended allocation: {}", recommended.method),
      report::allocation_table(recommended, cfg.display_threshold).to_string(),
    );
    section(
      "Strategy comparison (model vs realised)",
      report::comparison_table(&self.allocations).to_string(),
    );

    let mut contributions =
      report::contributions_table(recommended, &self.stats, self.recommended_metrics()).to_string();
    if let Some(taxed) = self.after_tax_cagr {
      let _ = writeln!(
        contributions,
        "After {} annual tax: CAGR {}",
        report::format_pct(cfg.simulation.annual_tax, 3),
        report::format_pct(taxed, 2)
      );
    }
    section("Return contributions", contributions);

    let mut simulation = report::simulation_table(&self.summaries).to_string();
    simulation.push_str(&report::simulation_probabilities(&self.summaries).to_string());
    section(
      &format!(
        "{}-year outlook ({} paths, start value {})",
        cfg.simulation.horizon_years, cfg.simulation.n_paths, cfg.simulation.initial_value
      ),
      simulation,
    );

    let mut rebalance = format!(
      "Rebalance {}: {} events, mean turnover {}, total {}, largest drift {}\n",
      self.rebalancing.frequency,
      self.rebalancing.events.len(),
      report::format_pct(self.rebalancing.mean_turnover(), 2),
      report::format_pct(self.rebalancing.total_turnover(), 1),
      report::format_pct(self.rebalancing.max_drift(recommended.weights()), 1),
    );
    rebalance.push_str(
      &report::rebalance_table(&self.rebalancing, self.returns.assets(), REBALANCE_ROWS).to_string(),
    );
    section("Rebalancing schedule", rebalance);

    let guidance = if self.guidance.needed {
      format!(
        "Buy-and-hold weights drifted {} from target (band {}); trades to restore:\n{}",
        report::format_pct(self.guidance.max_drift, 1),
        report::format_pct(self.guidance.band, 1),
        report::guidance_table(&self.guidance)
      )
    } else {
      format!(
        "Buy-and-hold weights within {} of target; no trade needed.\n",
        report::format_pct(self.guidance.band, 1)
      )
    };
    section("Rebalancing guidance", guidance);

    out
  }

  /// Write prices, returns, weights and simulation summaries as CSV.
  pub fn export_csv(&self, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let prices_path = dir.join("prices.csv");
    write_csv(&self.prices, &prices_path)?;

    let returns_path = dir.join("returns.csv");
    let mut writer = Writer::from_path(&returns_path)
      .with_context(|| format!("failed to create {}", returns_path.display()))?;
    let mut header = vec!["date".to_string()];
    header.extend(self.returns.assets().iter().cloned());
    writer.write_record(&header)?;
    for (t, date) in self.returns.dates().iter().enumerate() {
      let mut row = vec![date.to_string()];
      row.extend(self.returns.row(t).iter().map(|r| r.to_string()));
      writer.write_record(&row)?;
    }
    writer.flush()?;

    let weights_path = dir.join("weights.csv");
    let mut writer = Writer::from_path(&weights_path)
      .with_context(|| format!("failed to create {}", weights_path.display()))?;
    let mut header = vec!["asset".to_string()];
    header.extend(self.allocations.iter().map(|(a, _)| a.method.to_string()));
    writer.write_record(&header)?;
    for (i, asset) in self.recommended().assets.iter().enumerate() {
      let mut row = vec![asset.clone()];
      row.extend(
        self
          .allocations
          .iter()
          .map(|(a, _)| a.weights().get(i).copied().unwrap_or(0.0).to_string()),
      );
      writer.write_record(&row)?;
    }
    writer.flush()?;

    let summary_path = dir.join("simulation_summary.csv");
    let mut writer = Writer::from_path(&summary_path)
      .with_context(|| format!("failed to create {}", summary_path.display()))?;
    writer.write_record(["method", "percentile", "terminal_value", "annualised_return"])?;
    for s in &self.summaries {
      for ((q, v), (_, c)) in s.terminal_percentiles.iter().zip(s.cagr_percentiles.iter()) {
        writer.write_record([s.method.to_string(), q.to_string(), v.to_string(), c.to_string()])?;
      }
    }
    writer.flush()?;

    info!(dir = %dir.display(), "exported CSV files");
    Ok(vec![prices_path, returns_path, weights_path, summary_path])
  }

  /// Frontier cloud, simulation fans and weight drift as HTML.
  pub fn write_plots(&self, dir: &Path) -> Result<Vec<PathBuf>> {
    let highlights: Vec<(String, PortfolioMetrics)> = self
      .allocations
      .iter()
      .map(|(a, m)| (a.method.to_string(), *m))
      .collect();

    let charts = [
      (
        "frontier.html",
        visualization::frontier_plot(&self.random, &highlights),
      ),
      ("bootstrap_fan.html", visualization::fan_chart(&self.bootstrap)),
      ("monte_carlo_fan.html", visualization::fan_chart(&self.monte_carlo)),
      (
        "weight_drift.html",
        visualization::weight_drift_plot(
          self.returns.dates(),
          self.returns.assets(),
          &self.buy_and_hold,
          &self.rebalancing.weights,
        ),
      ),
    ];

    let mut written = Vec::with_capacity(charts.len());
    for (name, plot) in &charts {
      let path = dir.join(name);
      visualization::write_plot(plot, &path)?;
      written.push(path);
    }
    Ok(written)
  }
}

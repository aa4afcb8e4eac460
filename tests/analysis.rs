use chrono::Datelike;
use chrono::NaiveDate;
use chrono::Weekday;
use folio_rs::Analysis;
use folio_rs::AnalysisConfig;
use folio_rs::PricePanel;
use folio_rs::data::read_csv;
use folio_rs::portfolio::OptimizerMethod;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Distribution;
use rand_distr::StandardNormal;

/// Business-day geometric random walks: (name, annual drift, annual vol).
fn synthetic_prices(seed: u64) -> PricePanel {
  let assets = [
    ("USA_SP500", 0.10, 0.17),
    ("Europe", 0.07, 0.19),
    ("EmergingMarkets", 0.05, 0.22),
    ("Gold", 0.04, 0.15),
    ("Bonds", 0.025, 0.05),
  ];

  let mut dates = Vec::new();
  let mut d = NaiveDate::from_ymd_opt(2019, 1, 2).unwrap();
  while dates.len() < 760 {
    if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
      dates.push(d);
    }
    d = d.succ_opt().unwrap();
  }

  let mut rng = StdRng::seed_from_u64(seed);
  let mut columns = vec![Vec::with_capacity(dates.len()); assets.len()];
  let mut level = vec![100.0; assets.len()];
  for t in 0..dates.len() {
    let market: f64 = StandardNormal.sample(&mut rng);
    for (i, (_, drift, vol)) in assets.iter().enumerate() {
      if t > 0 {
        let own: f64 = StandardNormal.sample(&mut rng);
        let z = 0.5 * market + (1.0 - 0.25f64).sqrt() * own;
        let dt: f64 = 1.0 / 252.0;
        level[i] *= ((drift - 0.5 * vol * vol) * dt + vol * dt.sqrt() * z).exp();
      }
      columns[i].push(level[i]);
    }
  }
  // A holiday gap in one series.
  columns[3][100] = f64::NAN;

  PricePanel::new(
    dates,
    assets.iter().map(|(n, _, _)| n.to_string()).collect(),
    columns,
  )
  .unwrap()
}

fn small_config() -> AnalysisConfig {
  let mut cfg = AnalysisConfig::default();
  cfg.optimizer.target_return = 0.03;
  cfg.simulation.n_paths = 200;
  cfg.simulation.horizon_years = 3;
  cfg.random_portfolios = 64;
  cfg.annual_fees.insert("Gold".to_string(), 0.004);
  cfg
}

#[test]
fn full_pipeline_produces_consistent_report() {
  let report = Analysis::new(small_config())
    .run(&synthetic_prices(1))
    .unwrap();

  assert_eq!(report.returns.n_assets(), 6);
  assert_eq!(report.returns.len(), 758);
  assert_eq!(report.allocations.len(), 4);
  assert_eq!(report.recommended().method, OptimizerMethod::TargetReturn);

  for (allocation, metrics) in &report.allocations {
    let total: f64 = allocation.weights().iter().sum();
    assert!((total - 1.0).abs() < 1e-6, "{} sums to {total}", allocation.method);
    assert!(allocation.weights().iter().all(|&w| w >= -1e-12));
    assert!(metrics.max_drawdown <= 0.0);
  }

  assert_eq!(report.random.len(), 64);
  assert_eq!(report.buy_and_hold.len(), report.returns.len());
  assert!(!report.rebalancing.events.is_empty());
  assert_eq!(report.bootstrap.n_paths(), 200);
  assert_eq!(report.monte_carlo.values[0].len(), 4);
  assert_eq!(report.summaries.len(), 2);
  assert!(report.after_tax_cagr.is_none());

  let rendered = report.render();
  for heading in [
    "Data coverage",
    "Recommended allocation",
    "Strategy comparison",
    "Return contributions",
    "3-year outlook",
    "Rebalancing schedule",
    "Rebalancing guidance",
  ] {
    assert!(rendered.contains(heading), "missing section {heading}");
  }
  assert!(rendered.contains('%'));
}

#[test]
fn runs_are_reproducible_for_a_seed() {
  let prices = synthetic_prices(2);
  let a = Analysis::new(small_config()).run(&prices).unwrap();
  let b = Analysis::new(small_config()).run(&prices).unwrap();

  assert_eq!(a.bootstrap.values, b.bootstrap.values);
  assert_eq!(a.monte_carlo.values, b.monte_carlo.values);
  assert_eq!(a.random[10].weights, b.random[10].weights);
}

#[test]
fn annual_tax_lowers_historical_cagr() {
  let mut cfg = small_config();
  cfg.simulation.annual_tax = 0.01;
  let report = Analysis::new(cfg).run(&synthetic_prices(3)).unwrap();

  let taxed = report.after_tax_cagr.unwrap();
  assert!(taxed < report.recommended_metrics().cagr);
  assert!(report.render().contains("annual tax"));
}

#[test]
fn poor_coverage_is_rejected() {
  let mut prices = synthetic_prices(4);
  let mut columns = prices.columns().to_vec();
  for p in columns[1].iter_mut().take(200) {
    *p = f64::NAN;
  }
  prices = PricePanel::new(prices.dates().to_vec(), prices.assets().to_vec(), columns).unwrap();

  let err = Analysis::new(small_config()).run(&prices).unwrap_err();
  assert!(format!("{err:#}").contains("Europe"));
}

#[test]
fn date_window_limits_history() {
  let mut cfg = small_config();
  cfg.start = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
  cfg.end = NaiveDate::from_ymd_opt(2021, 6, 30);
  let report = Analysis::new(cfg).run(&synthetic_prices(7)).unwrap();

  let dates = report.returns.dates();
  assert!(dates[0] > NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());
  assert!(*dates.last().unwrap() <= NaiveDate::from_ymd_opt(2021, 6, 30).unwrap());
  assert!(report.prices.dates()[0] >= NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());

  let mut empty = small_config();
  empty.start = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
  assert!(Analysis::new(empty).run(&synthetic_prices(7)).is_err());
}

#[test]
fn missing_ticker_column_is_an_error() {
  let mut cfg = small_config();
  cfg.tickers.push(folio_rs::config::TickerSpec::new("Japan", "EWJ"));
  assert!(Analysis::new(cfg).run(&synthetic_prices(5)).is_err());
}

#[test]
fn exports_round_trip_prices() {
  let mut cfg = small_config();
  cfg.cash.include = false;
  let report = Analysis::new(cfg).run(&synthetic_prices(6)).unwrap();

  let dir = tempfile::tempdir().unwrap();
  let written = report.export_csv(dir.path()).unwrap();
  assert_eq!(written.len(), 4);
  assert!(written.iter().all(|p| p.exists()));

  let prices = read_csv(&dir.path().join("prices.csv")).unwrap();
  assert_eq!(prices.len(), report.prices.len());
  assert_eq!(prices.assets(), report.prices.assets());

  let weights = std::fs::read_to_string(dir.path().join("weights.csv")).unwrap();
  assert!(weights.lines().next().unwrap().starts_with("asset,"));
  assert_eq!(weights.lines().count(), 6);
}

use std::hint::black_box;

use chrono::NaiveDate;
use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use folio_rs::ReturnPanel;
use folio_rs::portfolio::AssetStatistics;
use folio_rs::portfolio::WeightBounds;
use folio_rs::portfolio::optimize_target_return;
use folio_rs::returns::ReturnMethod;
use folio_rs::simulation::SimulationConfig;
use folio_rs::simulation::historical_bootstrap;
use folio_rs::simulation::monte_carlo;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Distribution;
use rand_distr::Normal;

const DAYS: usize = 2500;
const ASSETS: usize = 6;

fn panel() -> ReturnPanel {
  let mut rng = StdRng::seed_from_u64(1);
  let start = NaiveDate::from_ymd_opt(2012, 10, 17).unwrap();
  let dates = (0..DAYS)
    .map(|i| start + chrono::Duration::days(i as i64))
    .collect();
  let columns = (0..ASSETS)
    .map(|i| {
      let dist = Normal::new(0.0003 * i as f64, 0.004 + 0.002 * i as f64).unwrap();
      (0..DAYS).map(|_| dist.sample(&mut rng)).collect::<Vec<f64>>()
    })
    .collect();
  let assets = (0..ASSETS).map(|i| format!("A{i}")).collect();
  ReturnPanel::new(dates, assets, columns, ReturnMethod::Log).unwrap()
}

fn bench_simulation(c: &mut Criterion) {
  let returns = panel();
  let weights = vec![1.0 / ASSETS as f64; ASSETS];
  let mut group = c.benchmark_group("Simulation");
  group.sample_size(10);

  for paths in [1_000usize, 10_000] {
    let cfg = SimulationConfig {
      n_paths: paths,
      ..Default::default()
    };
    group.bench_with_input(BenchmarkId::new("bootstrap", paths), &cfg, |b, cfg| {
      b.iter(|| black_box(historical_bootstrap(&returns, &weights, cfg).unwrap()))
    });
    group.bench_with_input(BenchmarkId::new("monte_carlo", paths), &cfg, |b, cfg| {
      b.iter(|| black_box(monte_carlo(&returns, &weights, cfg).unwrap()))
    });
  }

  group.finish();
}

fn bench_optimizer(c: &mut Criterion) {
  let stats = AssetStatistics::from_returns(&panel());
  c.bench_function("target_return_6_assets", |b| {
    b.iter(|| {
      black_box(optimize_target_return(
        &stats.mu,
        &stats.cov,
        WeightBounds::default(),
        0.08,
        0.0,
      ))
    })
  });
}

criterion_group!(benches, bench_simulation, bench_optimizer);
criterion_main!(benches);

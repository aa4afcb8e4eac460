//! # Price Panel
//!
//! $$
//! P_{tj} = \text{close of asset } j \text{ on date } t,\qquad P_{tj}=\text{NaN} \text{ if missing}
//! $$
//!
//! Date-indexed price table with one column per asset.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use anyhow::Result;
use anyhow::anyhow;
use anyhow::bail;
use chrono::NaiveDate;
use tracing::debug;
use tracing::warn;

fn is_valid_price(p: f64) -> bool {
  p.is_finite() && p > 0.0
}

/// Per-asset data availability over the panel calendar.
#[derive(Clone, Debug, PartialEq)]
pub struct CoverageReport {
  pub asset: String,
  pub first_date: Option<NaiveDate>,
  pub last_date: Option<NaiveDate>,
  /// Number of dates with a valid price.
  pub observations: usize,
  /// `observations / panel length`.
  pub fraction: f64,
}

/// Prices on a shared, strictly increasing date index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PricePanel {
  dates: Vec<NaiveDate>,
  assets: Vec<String>,
  prices: Vec<Vec<f64>>,
}

impl PricePanel {
  /// Build a panel from column-major prices.
  ///
  /// Dates must be strictly increasing and every column must have one entry
  /// per date.
  pub fn new(dates: Vec<NaiveDate>, assets: Vec<String>, prices: Vec<Vec<f64>>) -> Result<Self> {
    if assets.len() != prices.len() {
      bail!(
        "{} asset names but {} price columns",
        assets.len(),
        prices.len()
      );
    }
    if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
      bail!("dates must be strictly increasing ({} then {})", w[0], w[1]);
    }
    let unique: BTreeSet<&str> = assets.iter().map(String::as_str).collect();
    if unique.len() != assets.len() {
      bail!("duplicate asset names in panel: {assets:?}");
    }
    for (asset, column) in assets.iter().zip(prices.iter()) {
      if column.len() != dates.len() {
        bail!(
          "column {asset} has {} prices for {} dates",
          column.len(),
          dates.len()
        );
      }
    }

    Ok(Self {
      dates,
      assets,
      prices,
    })
  }

  /// Outer-join independently dated series onto their union calendar.
  ///
  /// Dates missing for an asset become `NaN`. A date repeated within one
  /// series keeps its last value.
  pub fn from_series(series: Vec<(String, Vec<(NaiveDate, f64)>)>) -> Result<Self> {
    let calendar: BTreeSet<NaiveDate> = series
      .iter()
      .flat_map(|(_, points)| points.iter().map(|(d, _)| *d))
      .collect();
    let dates: Vec<NaiveDate> = calendar.into_iter().collect();
    let index: BTreeMap<NaiveDate, usize> =
      dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut assets = Vec::with_capacity(series.len());
    let mut prices = Vec::with_capacity(series.len());
    for (asset, points) in series {
      let mut column = vec![f64::NAN; dates.len()];
      for (date, price) in points {
        column[index[&date]] = price;
      }
      assets.push(asset);
      prices.push(column);
    }

    Self::new(dates, assets, prices)
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn columns(&self) -> &[Vec<f64>] {
    &self.prices
  }

  /// Price column for `asset`, if present.
  pub fn column(&self, asset: &str) -> Option<&[f64]> {
    self
      .assets
      .iter()
      .position(|a| a == asset)
      .map(|i| self.prices[i].as_slice())
  }

  pub fn len(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }

  /// Availability of each asset over the panel calendar.
  pub fn coverage(&self) -> Vec<CoverageReport> {
    let total = self.dates.len();
    self
      .assets
      .iter()
      .zip(self.prices.iter())
      .map(|(asset, column)| {
        let valid: Vec<usize> = column
          .iter()
          .enumerate()
          .filter(|(_, p)| is_valid_price(**p))
          .map(|(i, _)| i)
          .collect();
        CoverageReport {
          asset: asset.clone(),
          first_date: valid.first().map(|&i| self.dates[i]),
          last_date: valid.last().map(|&i| self.dates[i]),
          observations: valid.len(),
          fraction: if total == 0 {
            0.0
          } else {
            valid.len() as f64 / total as f64
          },
        }
      })
      .collect()
  }

  /// Fail when any asset covers less than `min_fraction` of the calendar.
  pub fn validate_coverage(&self, min_fraction: f64) -> Result<Vec<CoverageReport>> {
    if self.is_empty() {
      bail!("price panel is empty");
    }

    let reports = self.coverage();
    let short: Vec<String> = reports
      .iter()
      .filter(|r| r.fraction < min_fraction)
      .map(|r| {
        format!(
          "{} ({:.1}% of {} days, first {})",
          r.asset,
          r.fraction * 100.0,
          self.len(),
          r.first_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "never".to_string())
        )
      })
      .collect();

    if !short.is_empty() {
      bail!(
        "insufficient price coverage (minimum {:.1}%): {}",
        min_fraction * 100.0,
        short.join(", ")
      );
    }

    for r in reports.iter().filter(|r| r.fraction < 1.0) {
      warn!(
        asset = %r.asset,
        fraction = r.fraction,
        "asset has gaps; incomplete dates will be dropped"
      );
    }

    Ok(reports)
  }

  /// Keep only dates on which every asset has a valid price.
  pub fn drop_incomplete_rows(&self) -> PricePanel {
    let keep: Vec<usize> = (0..self.dates.len())
      .filter(|&t| self.prices.iter().all(|col| is_valid_price(col[t])))
      .collect();

    let dropped = self.dates.len() - keep.len();
    if dropped > 0 {
      debug!(dropped, kept = keep.len(), "dropped incomplete price rows");
    }

    PricePanel {
      dates: keep.iter().map(|&t| self.dates[t]).collect(),
      assets: self.assets.clone(),
      prices: self
        .prices
        .iter()
        .map(|col| keep.iter().map(|&t| col[t]).collect())
        .collect(),
    }
  }

  /// Rows dated within `[start, end]`; an open `end` keeps everything after
  /// `start`.
  pub fn between(&self, start: NaiveDate, end: Option<NaiveDate>) -> PricePanel {
    let keep: Vec<usize> = (0..self.dates.len())
      .filter(|&t| self.dates[t] >= start && end.map_or(true, |e| self.dates[t] <= e))
      .collect();

    PricePanel {
      dates: keep.iter().map(|&t| self.dates[t]).collect(),
      assets: self.assets.clone(),
      prices: self
        .prices
        .iter()
        .map(|col| keep.iter().map(|&t| col[t]).collect())
        .collect(),
    }
  }

  /// Sub-panel with the given assets, in the given order.
  pub fn select(&self, assets: &[&str]) -> Result<PricePanel> {
    let mut names = Vec::with_capacity(assets.len());
    let mut columns = Vec::with_capacity(assets.len());
    for &asset in assets {
      let column = self
        .column(asset)
        .ok_or_else(|| anyhow!("asset {asset} is not in the price panel"))?;
      names.push(asset.to_string());
      columns.push(column.to_vec());
    }
    PricePanel::new(self.dates.clone(), names, columns)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  fn sample_panel() -> PricePanel {
    PricePanel::from_series(vec![
      (
        "A".to_string(),
        vec![
          (d(2020, 1, 2), 100.0),
          (d(2020, 1, 3), 101.0),
          (d(2020, 1, 6), 102.0),
          (d(2020, 1, 7), 103.0),
        ],
      ),
      (
        "B".to_string(),
        vec![(d(2020, 1, 3), 50.0), (d(2020, 1, 6), 51.0), (d(2020, 1, 7), 49.0)],
      ),
    ])
    .unwrap()
  }

  #[test]
  fn from_series_builds_union_calendar() {
    let panel = sample_panel();
    assert_eq!(panel.len(), 4);
    assert_eq!(panel.dates()[0], d(2020, 1, 2));
    assert!(panel.column("B").unwrap()[0].is_nan());
    assert_eq!(panel.column("B").unwrap()[1], 50.0);
  }

  #[test]
  fn coverage_reports_first_date_and_fraction() {
    let reports = sample_panel().coverage();
    assert_eq!(reports[0].fraction, 1.0);
    assert_eq!(reports[1].observations, 3);
    assert_eq!(reports[1].first_date, Some(d(2020, 1, 3)));
    assert!((reports[1].fraction - 0.75).abs() < 1e-12);
  }

  #[test]
  fn validate_coverage_names_short_assets() {
    let panel = sample_panel();
    let err = panel.validate_coverage(0.9).unwrap_err().to_string();
    assert!(err.contains('B'), "{err}");
    assert!(!err.contains("A ("), "{err}");
    assert!(panel.validate_coverage(0.7).is_ok());
  }

  #[test]
  fn between_keeps_inclusive_window() {
    let panel = sample_panel();
    let window = panel.between(d(2020, 1, 3), Some(d(2020, 1, 6)));
    assert_eq!(window.dates(), &[d(2020, 1, 3), d(2020, 1, 6)]);
    assert_eq!(window.column("B").unwrap(), &[50.0, 51.0]);

    let open = panel.between(d(2020, 1, 6), None);
    assert_eq!(open.len(), 2);
    assert!(panel.between(d(2021, 1, 1), None).is_empty());
  }

  #[test]
  fn drop_incomplete_rows_keeps_common_dates() {
    let aligned = sample_panel().drop_incomplete_rows();
    assert_eq!(aligned.len(), 3);
    assert_eq!(aligned.dates()[0], d(2020, 1, 3));
    assert_eq!(aligned.column("A").unwrap(), &[101.0, 102.0, 103.0]);
  }

  #[test]
  fn new_rejects_unsorted_dates() {
    let res = PricePanel::new(
      vec![d(2020, 1, 3), d(2020, 1, 2)],
      vec!["A".to_string()],
      vec![vec![1.0, 2.0]],
    );
    assert!(res.is_err());
  }

  #[test]
  fn select_reorders_and_rejects_unknown() {
    let panel = sample_panel();
    let sub = panel.select(&["B", "A"]).unwrap();
    assert_eq!(sub.assets(), &["B".to_string(), "A".to_string()]);
    assert!(panel.select(&["C"]).is_err());
  }
}

//! # Price CSV
//!
//! Wide CSV layout: `date,<asset_1>,…,<asset_n>`, ISO dates, empty cell for a
//! missing price.

use std::fs::File;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use chrono::NaiveDate;
use csv::Reader;
use csv::Writer;

use super::panel::PricePanel;

/// Load a price panel from a wide CSV file.
pub fn read_csv(path: &Path) -> Result<PricePanel> {
  let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
  let mut reader = Reader::from_reader(file);

  let headers = reader.headers()?.clone();
  if headers.len() < 2 {
    bail!(
      "{}: expected a date column and at least one asset column",
      path.display()
    );
  }
  let assets: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

  let mut dates = Vec::new();
  let mut prices = vec![Vec::new(); assets.len()];
  for (line, record) in reader.records().enumerate() {
    let record = record?;
    let date = NaiveDate::parse_from_str(record[0].trim(), "%Y-%m-%d")
      .with_context(|| format!("row {}: invalid date {:?}", line + 2, &record[0]))?;
    dates.push(date);

    for (j, column) in prices.iter_mut().enumerate() {
      let cell = record.get(j + 1).unwrap_or("").trim();
      let value = if cell.is_empty() {
        f64::NAN
      } else {
        cell
          .parse::<f64>()
          .with_context(|| format!("row {}: invalid price {cell:?} for {}", line + 2, assets[j]))?
      };
      column.push(value);
    }
  }

  PricePanel::new(dates, assets, prices)
}

/// Write a price panel as a wide CSV file.
pub fn write_csv(panel: &PricePanel, path: &Path) -> Result<()> {
  let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
  let mut writer = Writer::from_writer(file);

  let mut header = vec!["date".to_string()];
  header.extend(panel.assets().iter().cloned());
  writer.write_record(&header)?;

  for (t, date) in panel.dates().iter().enumerate() {
    let mut row = Vec::with_capacity(panel.assets().len() + 1);
    row.push(date.format("%Y-%m-%d").to_string());
    for column in panel.columns() {
      let p = column[t];
      row.push(if p.is_finite() {
        p.to_string()
      } else {
        String::new()
      });
    }
    writer.write_record(&row)?;
  }

  writer.flush()?;
  Ok(())
}

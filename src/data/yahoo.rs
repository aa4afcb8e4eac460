//! # Yahoo Finance
//!
//! Daily adjusted closes for the configured tickers, renamed to asset names.

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use chrono::DateTime;
use chrono::Datelike;
use chrono::NaiveDate;
use chrono::Utc;
use time::Month;
use time::OffsetDateTime;
use tracing::info;
use tracing::warn;
use yahoo_finance_api as yahoo;

use super::panel::PricePanel;
use crate::config::TickerSpec;

fn to_offset(date: NaiveDate) -> Result<OffsetDateTime> {
  let month = Month::try_from(date.month() as u8)?;
  let day = time::Date::from_calendar_date(date.year(), month, date.day() as u8)?;
  Ok(day.midnight().assume_utc())
}

/// Adjusted close when Yahoo reports one, the raw close otherwise.
fn quote_price(quote: &yahoo::Quote) -> f64 {
  if quote.adjclose.is_finite() && quote.adjclose > 0.0 {
    quote.adjclose
  } else {
    quote.close
  }
}

/// Download daily prices for every ticker between `start` and `end`
/// (today when `None`).
pub async fn fetch_prices(
  tickers: &[TickerSpec],
  start: NaiveDate,
  end: Option<NaiveDate>,
) -> Result<PricePanel> {
  let provider = yahoo::YahooConnector::new()?;
  let start_ts = to_offset(start)?;
  let end_ts = match end {
    Some(d) => to_offset(d)?,
    None => to_offset(Utc::now().date_naive())?,
  };

  let mut series = Vec::with_capacity(tickers.len());
  for ticker in tickers {
    let response = provider
      .get_quote_history(&ticker.symbol, start_ts, end_ts)
      .await
      .with_context(|| format!("failed to fetch {} ({})", ticker.symbol, ticker.name))?;
    let quotes = response
      .quotes()
      .with_context(|| format!("no quotes in response for {}", ticker.symbol))?;

    let points: Vec<(NaiveDate, f64)> = quotes
      .iter()
      .filter_map(|q| {
        DateTime::<Utc>::from_timestamp(q.timestamp as i64, 0)
          .map(|dt| (dt.date_naive(), quote_price(q)))
      })
      .collect();

    if points.is_empty() {
      warn!(symbol = %ticker.symbol, "no quotes returned");
    } else {
      info!(symbol = %ticker.symbol, asset = %ticker.name, quotes = points.len(), "fetched prices");
    }
    series.push((ticker.name.clone(), points));
  }

  if series.iter().all(|(_, points)| points.is_empty()) {
    bail!("no data fetched; check tickers or date range");
  }

  PricePanel::from_series(series)
}

/// Blocking wrapper around [`fetch_prices`] for synchronous callers.
pub fn fetch_prices_blocking(
  tickers: &[TickerSpec],
  start: NaiveDate,
  end: Option<NaiveDate>,
) -> Result<PricePanel> {
  let runtime = tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()?;
  runtime.block_on(fetch_prices(tickers, start, end))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn to_offset_is_midnight_utc() {
    let ts = to_offset(NaiveDate::from_ymd_opt(2012, 10, 16).unwrap()).unwrap();
    assert_eq!(ts.unix_timestamp(), 1_350_345_600);
  }

  #[test]
  #[ignore = "requires network access"]
  fn fetches_spy_history() {
    let tickers = vec![TickerSpec {
      name: "USA_SP500".to_string(),
      symbol: "SPY".to_string(),
    }];
    let panel = tokio_test::block_on(fetch_prices(
      &tickers,
      NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
      Some(NaiveDate::from_ymd_opt(2023, 2, 1).unwrap()),
    ))
    .unwrap();
    assert!(panel.len() > 15);
  }
}

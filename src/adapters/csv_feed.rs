//! CSV candle source.
//!
//! Expects a header row of `timestamp,open,high,low,close,volume` with
//! RFC 3339 timestamps. Rows are sorted by timestamp after loading so a
//! shuffled export still ingests cleanly.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::candle::Candle;
use crate::domain::error::FeedError;
use crate::ports::feed_port::CandleFeed;

pub struct CsvFeed {
    path: PathBuf,
}

impl CsvFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvFeed { path: path.into() }
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl CandleFeed for CsvFeed {
    fn candles(&self) -> Result<Vec<Candle>, FeedError> {
        let path = self.path.display().to_string();
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| FeedError::Read {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let mut candles = Vec::new();
        for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row = row.map_err(|e| FeedError::MalformedRecord {
                path: path.clone(),
                row: i + 1,
                reason: e.to_string(),
            })?;
            let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
                .map_err(|e| FeedError::MalformedRecord {
                    path: path.clone(),
                    row: i + 1,
                    reason: format!("bad timestamp '{}': {e}", row.timestamp),
                })?
                .with_timezone(&Utc);
            candles.push(Candle::new(
                timestamp, row.open, row.high, row.low, row.close, row.volume,
            ));
        }

        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }
}

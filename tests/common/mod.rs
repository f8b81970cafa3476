#![allow(dead_code)]

use algoscript::domain::ast::Strategy;
use algoscript::domain::candle::Candle;
use algoscript::domain::session::Session;
use algoscript::domain::validate::parse_source;
use chrono::{DateTime, Duration, TimeZone, Utc};

pub fn ts(i: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(4 * i)
}

pub fn make_candle(i: i64, close: f64) -> Candle {
    Candle::new(ts(i), close, close + 1.0, close - 1.0, close, 1000.0)
}

pub fn strategy_from(source: &str) -> Strategy {
    parse_source(source).unwrap().strategy
}

pub fn feed_closes(session: &mut Session, closes: &[f64]) {
    for (i, close) in closes.iter().enumerate() {
        session.ingest(make_candle(i as i64, *close)).unwrap();
    }
}

//! Port for candle sources. Adapters (CSV files, synthetic generators)
//! implement this so the runner never cares where candles come from.

use crate::domain::candle::Candle;
use crate::domain::error::FeedError;

pub trait CandleFeed {
    /// All candles from this source, in non-decreasing timestamp order.
    fn candles(&self) -> Result<Vec<Candle>, FeedError>;
}

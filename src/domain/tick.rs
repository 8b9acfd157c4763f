//! Canonical tick record.
//!
//! Intraday quotes carry bid/ask/last; daily bars only carry a close, which is
//! stored as `last_price` with bid and ask set to the same value.

use chrono::{NaiveDateTime, NaiveTime};

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub symbol: String,
    pub bid_price: f64,
    pub ask_price: f64,
    pub last_price: f64,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub timestamp: NaiveDateTime,
    pub cumulative_volume: Option<i64>,
}

impl Tick {
    /// Tick built from a single closing price (daily bars, tests).
    pub fn from_close(symbol: &str, timestamp: NaiveDateTime, close: f64) -> Self {
        Tick {
            symbol: symbol.to_string(),
            bid_price: close,
            ask_price: close,
            last_price: close,
            high: None,
            low: None,
            timestamp,
            cumulative_volume: None,
        }
    }

    pub fn close(&self) -> f64 {
        self.last_price
    }

    pub fn high(&self) -> f64 {
        self.high.unwrap_or(self.last_price)
    }

    pub fn low(&self) -> f64 {
        self.low.unwrap_or(self.last_price)
    }

    pub fn time(&self) -> NaiveTime {
        self.timestamp.time()
    }

    /// Volume traded since `previous_cumulative`, 0 when the feed has no volume.
    pub fn volume_since(&self, previous_cumulative: i64) -> i64 {
        self.cumulative_volume
            .map(|v| v - previous_cumulative)
            .unwrap_or(0)
    }
}

/// Selects which price of a tick an indicator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceField {
    Bid,
    Ask,
    #[default]
    Close,
    High,
    Low,
}

impl PriceField {
    pub fn read(self, tick: &Tick) -> f64 {
        match self {
            PriceField::Bid => tick.bid_price,
            PriceField::Ask => tick.ask_price,
            PriceField::Close => tick.close(),
            PriceField::High => tick.high(),
            PriceField::Low => tick.low(),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "bid" => Some(PriceField::Bid),
            "ask" => Some(PriceField::Ask),
            "close" | "last" => Some(PriceField::Close),
            "high" => Some(PriceField::High),
            "low" => Some(PriceField::Low),
            _ => None,
        }
    }
}

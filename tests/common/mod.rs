#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use ticktrader::domain::error::TicktraderError;
use ticktrader::domain::phenotype::Phenotype;
use ticktrader::domain::tick::Tick;
use ticktrader::ports::tick_port::TickPort;

pub struct MockTickPort {
    pub ticks: Vec<Tick>,
    pub errors: HashMap<String, String>,
}

impl MockTickPort {
    pub fn new() -> Self {
        Self {
            ticks: Vec::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_ticks(mut self, ticks: Vec<Tick>) -> Self {
        self.ticks.extend(ticks);
        self.ticks.sort_by_key(|t| t.timestamp);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl TickPort for MockTickPort {
    fn load_ticks(&self, symbol: Option<&str>) -> Result<Vec<Tick>, TicktraderError> {
        if let Some(reason) = symbol.and_then(|s| self.errors.get(s)) {
            return Err(TicktraderError::TickData {
                reason: reason.clone(),
            });
        }
        let ticks: Vec<Tick> = self
            .ticks
            .iter()
            .filter(|t| symbol.is_none_or(|s| t.symbol == s))
            .cloned()
            .collect();
        match symbol {
            Some(s) if ticks.is_empty() => Err(TicktraderError::NoData {
                symbol: s.to_string(),
            }),
            _ => Ok(ticks),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, TicktraderError> {
        let symbols: BTreeSet<String> = self.ticks.iter().map(|t| t.symbol.clone()).collect();
        Ok(symbols.into_iter().collect())
    }
}

pub fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2016, 11, 18)
        .unwrap()
        .and_hms_opt(hour, minute, second)
        .unwrap()
}

/// A quote `offset` seconds after 10:00:00.
pub fn quote(symbol: &str, offset: u32, bid: f64, ask: f64) -> Tick {
    let timestamp = at(10, 0, 0) + TimeDelta::seconds(i64::from(offset));
    let mut tick = Tick::from_close(symbol, timestamp, (bid + ask) / 2.0);
    tick.bid_price = bid;
    tick.ask_price = ask;
    tick
}

/// Flat quotes (bid = ask = last) one second apart from 10:00:00.
pub fn closes(symbol: &str, prices: &[f64]) -> Vec<Tick> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| quote(symbol, i as u32, p, p))
        .collect()
}

/// A signaler phenotype that buys the first rise after one falling tick.
pub fn eager_signaler() -> Phenotype {
    Phenotype::new()
        .with("ema_length", 1.0)
        .with("ema_change_negative_buy_threshold", 1.0)
        .with("ema_change_positive_buy_threshold", 1.0)
        .with("target_increase", 0.01)
}

pub fn eager_ema_threshold() -> Phenotype {
    eager_signaler().with("stop_loss_threshold", 0.05)
}

/// Ticks as CSV with the full column set.
pub fn ticks_csv(ticks: &[Tick]) -> String {
    let mut out = String::from("symbol,timestamp,bid,ask,last,cumulative_volume\n");
    for tick in ticks {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            tick.symbol,
            tick.timestamp.format("%Y-%m-%d %H:%M:%S"),
            tick.bid_price,
            tick.ask_price,
            tick.last_price,
            tick.cumulative_volume.unwrap_or(0),
        ));
    }
    out
}

pub fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    write_temp(content, ".ini")
}

pub fn write_temp_csv(ticks: &[Tick]) -> tempfile::NamedTempFile {
    write_temp(&ticks_csv(ticks), ".csv")
}

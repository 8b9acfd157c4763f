//! CSV file tick adapter.
//!
//! Columns are located by header name: `symbol`, `timestamp`, `last` (or
//! `close`) are required; `bid`, `ask`, `high`, `low` and `cumulative_volume`
//! are optional. Empty bid/ask cells fall back to the last price. Symbols are
//! uppercased on read.

use crate::domain::error::TicktraderError;
use crate::domain::tick::Tick;
use crate::ports::tick_port::TickPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub struct CsvAdapter {
    path: PathBuf,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    symbol: usize,
    timestamp: usize,
    last: usize,
    bid: Option<usize>,
    ask: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    cumulative_volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, TicktraderError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let require = |name: &str, aliases: &[&str]| {
            find(aliases).ok_or_else(|| TicktraderError::TickData {
                reason: format!("missing {name} column"),
            })
        };
        Ok(Columns {
            symbol: require("symbol", &["symbol"])?,
            timestamp: require("timestamp", &["timestamp", "date", "created_at"])?,
            last: require("last", &["last", "close", "last_price"])?,
            bid: find(&["bid", "bid_price"]),
            ask: find(&["ask", "ask_price"]),
            high: find(&["high"]),
            low: find(&["low"]),
            cumulative_volume: find(&["cumulative_volume", "volume"]),
        })
    }
}

fn cell(record: &csv::StringRecord, index: Option<usize>) -> Option<&str> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(
    value: Option<&str>,
    column: &str,
    line: u64,
) -> Result<Option<T>, TicktraderError>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.parse::<T>().map_err(|e| TicktraderError::TickData {
                reason: format!("line {line}: invalid {column} value '{v}': {e}"),
            })
        })
        .transpose()
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_all(&self) -> Result<Vec<Tick>, TicktraderError> {
        let content = fs::read_to_string(&self.path).map_err(|e| TicktraderError::TickData {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| TicktraderError::TickData {
            reason: format!("CSV header error: {}", e),
        })?;
        let columns = Columns::from_headers(headers)?;

        let mut ticks = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| TicktraderError::TickData {
                reason: format!("CSV parse error: {}", e),
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let symbol = cell(&record, Some(columns.symbol)).ok_or_else(|| {
                TicktraderError::TickData {
                    reason: format!("line {line}: missing symbol"),
                }
            })?;
            let raw_ts = cell(&record, Some(columns.timestamp)).unwrap_or_default();
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| TicktraderError::TickData {
                reason: format!("line {line}: invalid timestamp '{raw_ts}'"),
            })?;
            let last_price: f64 = parse_number(cell(&record, Some(columns.last)), "last", line)?
                .ok_or_else(|| TicktraderError::TickData {
                    reason: format!("line {line}: missing last price"),
                })?;

            ticks.push(Tick {
                symbol: symbol.to_uppercase(),
                bid_price: parse_number(cell(&record, columns.bid), "bid", line)?
                    .unwrap_or(last_price),
                ask_price: parse_number(cell(&record, columns.ask), "ask", line)?
                    .unwrap_or(last_price),
                last_price,
                high: parse_number(cell(&record, columns.high), "high", line)?,
                low: parse_number(cell(&record, columns.low), "low", line)?,
                timestamp,
                cumulative_volume: parse_number(
                    cell(&record, columns.cumulative_volume),
                    "cumulative_volume",
                    line,
                )?,
            });
        }

        ticks.sort_by_key(|t| t.timestamp);
        debug!(path = %self.path.display(), rows = ticks.len(), "loaded ticks");
        Ok(ticks)
    }
}

impl TickPort for CsvAdapter {
    fn load_ticks(&self, symbol: Option<&str>) -> Result<Vec<Tick>, TicktraderError> {
        let mut ticks = self.read_all()?;
        if let Some(symbol) = symbol {
            ticks.retain(|t| t.symbol.eq_ignore_ascii_case(symbol));
            if ticks.is_empty() {
                return Err(TicktraderError::NoData {
                    symbol: symbol.to_string(),
                });
            }
        }
        Ok(ticks)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TicktraderError> {
        let symbols: BTreeSet<String> = self.read_all()?.into_iter().map(|t| t.symbol).collect();
        Ok(symbols.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ticks.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    const QUOTES: &str = "symbol,timestamp,bid,ask,last,high,low,cumulative_volume\n\
        AAPL,2016-11-18 10:00:01,109.9,110.0,109.95,110.2,109.5,1000\n\
        MSFT,2016-11-18 10:00:00,60.1,60.2,60.15,,,500\n\
        AAPL,2016-11-18T10:00:00,109.8,109.9,109.85,,,800\n";

    #[test]
    fn load_ticks_returns_sorted_rows() {
        let (_dir, path) = setup_test_data(QUOTES);
        let adapter = CsvAdapter::new(path);

        let ticks = adapter.load_ticks(None).unwrap();
        assert_eq!(ticks.len(), 3);
        assert!(ticks.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        // Equal timestamps keep file order.
        assert_eq!(ticks[0].symbol, "MSFT");
        assert_eq!(ticks[1].symbol, "AAPL");
    }

    #[test]
    fn load_ticks_parses_fields() {
        let (_dir, path) = setup_test_data(QUOTES);
        let adapter = CsvAdapter::new(path);

        let ticks = adapter.load_ticks(Some("AAPL")).unwrap();
        assert_eq!(ticks.len(), 2);
        let last = &ticks[1];
        assert_eq!(last.bid_price, 109.9);
        assert_eq!(last.ask_price, 110.0);
        assert_eq!(last.last_price, 109.95);
        assert_eq!(last.high, Some(110.2));
        assert_eq!(last.low, Some(109.5));
        assert_eq!(last.cumulative_volume, Some(1000));
        assert_eq!(ticks[0].high, None);
    }

    #[test]
    fn close_only_rows_fill_bid_and_ask() {
        let (_dir, path) = setup_test_data("symbol,date,close\nSPY,2017-01-03,225.24\n");
        let adapter = CsvAdapter::new(path);

        let ticks = adapter.load_ticks(None).unwrap();
        assert_eq!(ticks[0].bid_price, 225.24);
        assert_eq!(ticks[0].ask_price, 225.24);
        assert_eq!(ticks[0].cumulative_volume, None);
    }

    #[test]
    fn unknown_symbol_is_no_data() {
        let (_dir, path) = setup_test_data(QUOTES);
        let adapter = CsvAdapter::new(path);
        assert!(matches!(
            adapter.load_ticks(Some("XYZ")),
            Err(TicktraderError::NoData { .. })
        ));
    }

    #[test]
    fn missing_file_is_error() {
        let adapter = CsvAdapter::new(PathBuf::from("/nonexistent/ticks.csv"));
        assert!(adapter.load_ticks(None).is_err());
    }

    #[test]
    fn missing_required_column() {
        let (_dir, path) = setup_test_data("symbol,timestamp,bid\nAAPL,2016-11-18 10:00:00,1\n");
        let adapter = CsvAdapter::new(path);
        let err = adapter.load_ticks(None).unwrap_err();
        assert!(err.to_string().contains("missing last column"));
    }

    #[test]
    fn bad_number_reports_line() {
        let (_dir, path) =
            setup_test_data("symbol,timestamp,last\nAAPL,2016-11-18 10:00:00,abc\n");
        let adapter = CsvAdapter::new(path);
        let err = adapter.load_ticks(None).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn bad_timestamp_is_error() {
        let (_dir, path) = setup_test_data("symbol,timestamp,last\nAAPL,yesterday,1.0\n");
        let adapter = CsvAdapter::new(path);
        assert!(matches!(
            adapter.load_ticks(None),
            Err(TicktraderError::TickData { .. })
        ));
    }

    #[test]
    fn list_symbols_is_sorted_and_unique() {
        let (_dir, path) = setup_test_data(QUOTES);
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_symbols().unwrap(), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn symbols_are_uppercased() {
        let (_dir, path) = setup_test_data(
            "symbol,timestamp,last\naapl,2016-11-18 10:00:00,1.0\nAapl,2016-11-18 10:00:01,1.1\n",
        );
        let adapter = CsvAdapter::new(path);

        let ticks = adapter.load_ticks(None).unwrap();
        assert!(ticks.iter().all(|t| t.symbol == "AAPL"));
        assert_eq!(adapter.list_symbols().unwrap(), vec!["AAPL"]);
    }
}

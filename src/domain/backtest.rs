//! Single-phenotype backtests.
//!
//! `backtest` replays a tick sequence through one strategy variant and
//! returns the resulting balance, profit, loss and trade count. Every variant
//! keeps its state local to the call, so the result depends only on the
//! phenotype, the ticks and the config. Time-of-day rules read the tick
//! timestamps.

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use std::fmt;
use tracing::debug;

use crate::domain::error::TicktraderError;
use crate::domain::indicator::{BollingerBands, Ema, EmaState};
use crate::domain::phenotype::Phenotype;
use crate::domain::position::{Ledger, Position};
use crate::domain::signal::{EmaStreak, SignalerParams, default_day_end};
use crate::domain::strategy::StrategyKind;
use crate::domain::tick::Tick;
use crate::domain::trader::DEFAULT_COMMISSION;

/// Shortest hold, in seconds, before a RecentChange position may be closed.
const MIN_HOLD_SECONDS: i64 = 3;

/// Ticks between the end of the lagged low window and the current tick.
const RECENT_CHANGE_LAG: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_balance: f64,
    pub commission: f64,
    pub day_end: NaiveTime,
    pub too_late_to_trade: NaiveTime,
    pub min_volume: i64,
    pub margin_multiplier: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_balance: 10_000.0,
            commission: DEFAULT_COMMISSION,
            day_end: default_day_end(),
            too_late_to_trade: NaiveTime::from_hms_opt(14, 56, 0).unwrap_or(NaiveTime::MIN),
            min_volume: 3_000,
            margin_multiplier: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BacktestResult {
    pub balance: f64,
    pub profit: f64,
    pub loss: f64,
    pub trade_count: u32,
}

impl fmt::Display for BacktestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Balance:      {:.2}", self.balance)?;
        writeln!(f, "Profit:       {:.2}", self.profit)?;
        writeln!(f, "Loss:         {:.2}", self.loss)?;
        write!(f, "Trades:       {}", self.trade_count)
    }
}

pub fn backtest(
    kind: StrategyKind,
    phenotype: &Phenotype,
    ticks: &[Tick],
    config: &BacktestConfig,
) -> Result<BacktestResult, TicktraderError> {
    let result = match kind {
        StrategyKind::EmaThreshold => ema_threshold(phenotype, ticks, config)?,
        StrategyKind::BollingerReversion => bollinger_reversion(phenotype, ticks, config)?,
        StrategyKind::PriceChange => price_change(phenotype, ticks, config)?,
        StrategyKind::RecentChange => recent_change(phenotype, ticks, config)?,
    };
    debug!(
        strategy = %kind,
        ticks = ticks.len(),
        profit = result.profit,
        loss = result.loss,
        trades = result.trade_count,
        "backtest finished"
    );
    Ok(result)
}

fn ema_threshold(
    phenotype: &Phenotype,
    ticks: &[Tick],
    config: &BacktestConfig,
) -> Result<BacktestResult, TicktraderError> {
    let params = SignalerParams::from_phenotype(phenotype)?;
    let stop_loss_threshold = phenotype.require("stop_loss_threshold")?;
    let ema = Ema::with_length(params.ema_length)?;

    let mut ledger = Ledger::new(config.initial_balance, config.commission);
    let mut ema_state = EmaState::default();
    let mut streak = EmaStreak::default();
    let mut position: Option<Position> = None;
    let mut target_sell_price = 0.0;
    let mut highest_bid = 0.0_f64;

    for end in 1..=ticks.len() {
        let tick = &ticks[end - 1];
        let (state, value) = ema.step(&ema_state, &ticks[..end]);
        ema_state = state;

        if position.is_some() {
            highest_bid = highest_bid.max(tick.bid_price);
        }

        let Some(value) = value else { continue };
        if !streak.observe(value) {
            continue;
        }

        if position.is_none() {
            if streak.is_buy_setup(&params) {
                let balance = ledger.balance;
                position = ledger.buy(&tick.symbol, balance, tick.ask_price);
                if position.is_some() {
                    target_sell_price = tick.ask_price * (1.0 + params.target_increase);
                    highest_bid = tick.bid_price;
                }
            }
            continue;
        }

        let reached_target = tick.bid_price >= target_sell_price;
        let stop_loss = tick.bid_price <= highest_bid * (1.0 - stop_loss_threshold);
        let day_end = tick.time() >= config.day_end;
        if reached_target || stop_loss || day_end {
            if let Some(open) = position.take() {
                ledger.sell(&open, tick.bid_price);
            }
        }
    }

    Ok(ledger.result())
}

fn bollinger_reversion(
    phenotype: &Phenotype,
    ticks: &[Tick],
    config: &BacktestConfig,
) -> Result<BacktestResult, TicktraderError> {
    let bands = BollingerBands::with_length(
        phenotype.require_count("bollinger_length")?,
        phenotype.require("deviations")?,
    )?;
    let target_increase = phenotype.require("target_increase")?;
    let stop_loss_threshold = phenotype.require("stop_loss_threshold")?;

    let mut ledger = Ledger::new(config.initial_balance, config.commission);
    let mut position: Option<Position> = None;
    let mut target_sell_price = 0.0;

    for end in 1..=ticks.len() {
        let tick = &ticks[end - 1];
        let Some(band) = bands.bands(&ticks[..end]) else {
            continue;
        };
        let time = tick.time();

        match position.take() {
            Some(open) => {
                let exit = tick.bid_price >= band.middle
                    || tick.bid_price >= target_sell_price
                    || tick.bid_price <= open.buy_price * (1.0 - stop_loss_threshold)
                    || time >= config.day_end;
                if exit {
                    ledger.sell(&open, tick.bid_price);
                } else {
                    position = Some(open);
                }
            }
            None => {
                if time < config.too_late_to_trade
                    && time < config.day_end
                    && tick.ask_price < band.lower
                {
                    let balance = ledger.balance;
                    position = ledger.buy(&tick.symbol, balance, tick.ask_price);
                    target_sell_price = tick.ask_price * (1.0 + target_increase);
                }
            }
        }
    }

    Ok(ledger.result())
}

/// One buy of a multi-lot position.
#[derive(Debug, Clone, Copy)]
struct Lot {
    shares: i64,
    cost_basis: f64,
}

/// Lots folded into one position at their average cost basis.
fn combine_lots(symbol: &str, lots: &[Lot]) -> Position {
    let quantity: i64 = lots.iter().map(|l| l.shares).sum();
    let cost_basis: f64 = lots.iter().map(|l| l.cost_basis).sum();
    let buy_price = if quantity > 0 {
        cost_basis / quantity as f64
    } else {
        0.0
    };
    Position {
        symbol: symbol.to_string(),
        quantity,
        buy_price,
        cost_basis,
    }
}

fn price_change(
    phenotype: &Phenotype,
    ticks: &[Tick],
    config: &BacktestConfig,
) -> Result<BacktestResult, TicktraderError> {
    let investment_divisor = phenotype.require("investment_divisor")?;
    if investment_divisor <= 0.0 {
        return Err(TicktraderError::ParameterOutOfRange {
            name: "investment_divisor".into(),
            value: investment_divisor,
            min: f64::MIN_POSITIVE,
            max: f64::INFINITY,
        });
    }
    let sell_trigger = phenotype.require("sell_trigger_profit_percentage")? / 100.0;
    let stop_loss = phenotype.require("stop_loss_threshold")? / 100.0;
    let counter_start = phenotype.require("recent_large_change_counter_start")?.round() as i64;
    let min_percent_change = phenotype.require("min_percent_change_buy")?;
    let max_percent_change = phenotype.require("max_percent_change_buy")?;

    let mut ledger = Ledger::new(config.initial_balance, config.commission);
    let mut base_investment = ledger.balance / investment_divisor;
    let mut lots: Vec<Lot> = Vec::new();
    let mut recent_large_change_counter: i64 = 0;

    let Some((first, rest)) = ticks.split_first() else {
        return Ok(realised(&ledger));
    };
    let mut previous_close = first.close();

    for tick in rest {
        let close = tick.close();
        let holding = combine_lots(&tick.symbol, &lots);
        let average_cost_basis = holding.buy_price;
        let percent_change = (close / previous_close - 1.0) * 100.0;

        let target_reached = close >= average_cost_basis * (1.0 + sell_trigger);
        let stop_loss_reached = close <= average_cost_basis * (1.0 - stop_loss);
        if !lots.is_empty() && (target_reached || stop_loss_reached) {
            ledger.sell(&holding, close);
            lots.clear();
            base_investment = ledger.balance / investment_divisor;
        }

        if percent_change != 0.0
            && percent_change > min_percent_change
            && percent_change < max_percent_change
        {
            if recent_large_change_counter <= 0 {
                let investment = percent_change.abs().sqrt() * base_investment;
                let shares = (investment / close).floor() as i64;
                let cost_basis = shares as f64 * close + ledger.commission;
                if shares > 0 && ledger.balance - cost_basis > 0.0 {
                    ledger.balance -= cost_basis;
                    lots.push(Lot { shares, cost_basis });
                }
            }
        } else {
            recent_large_change_counter = counter_start;
        }

        previous_close = close;
        recent_large_change_counter -= 1;
    }

    Ok(realised(&ledger))
}

/// Result counting only closed positions: balance as of the last sell.
fn realised(ledger: &Ledger) -> BacktestResult {
    BacktestResult {
        balance: ledger.last_sell_balance,
        profit: ledger.last_sell_balance - ledger.starting_balance,
        loss: ledger.loss,
        trade_count: ledger.trade_count,
    }
}

#[derive(Debug, Clone, Copy)]
struct RecentChangeParams {
    recent_change_length: usize,
    recent_ratio_length: usize,
    min_recent_change: f64,
    max_recent_change: f64,
    min_recent_ratio: f64,
    max_recent_ratio: f64,
    min_ticks_since_last_trade: usize,
    stop_loss_threshold: f64,
}

impl RecentChangeParams {
    fn from_phenotype(phenotype: &Phenotype) -> Result<Self, TicktraderError> {
        Ok(RecentChangeParams {
            recent_change_length: phenotype.require_count("recent_change_length")?,
            recent_ratio_length: phenotype.require_count("recent_ratio_length")?,
            min_recent_change: phenotype.require("min_recent_change")?,
            max_recent_change: phenotype.require("max_recent_change")?,
            min_recent_ratio: phenotype.require("min_recent_ratio")?,
            max_recent_ratio: phenotype.require("max_recent_ratio")?,
            min_ticks_since_last_trade: phenotype.require_count("min_ticks_since_last_trade")?,
            stop_loss_threshold: phenotype.require("stop_loss_threshold")?,
        })
    }
}

fn recent_change(
    phenotype: &Phenotype,
    ticks: &[Tick],
    config: &BacktestConfig,
) -> Result<BacktestResult, TicktraderError> {
    let params = RecentChangeParams::from_phenotype(phenotype)?;
    let warmup = params.recent_change_length.max(params.recent_ratio_length) + RECENT_CHANGE_LAG;

    let mut ledger = Ledger::new(config.initial_balance, config.commission);
    let min_hold = TimeDelta::seconds(MIN_HOLD_SECONDS);
    let mut position: Option<(Position, NaiveDateTime)> = None;
    let mut previous_cumulative_volume = 0_i64;
    let mut ticks_since_last_trade = 0_usize;
    let mut buying = false;
    let mut highest_bid = 0.0_f64;

    for (index, tick) in ticks.iter().enumerate() {
        if index < warmup {
            continue;
        }

        if position.is_some() {
            highest_bid = highest_bid.max(tick.bid_price);
        }

        let volume = tick.volume_since(previous_cumulative_volume);
        let time = tick.time();
        let too_late = time >= config.too_late_to_trade;
        let day_end = time >= config.day_end;
        let stop_loss_reached = position.is_some()
            && tick.bid_price <= highest_bid * (1.0 - params.stop_loss_threshold);

        let window_start = index - (params.recent_change_length + RECENT_CHANGE_LAG);
        let recent_low = ticks[window_start..=index - RECENT_CHANGE_LAG]
            .iter()
            .map(|t| t.bid_price)
            .fold(f64::INFINITY, f64::min);
        let recent_change = tick.bid_price / recent_low;
        let recent_ratio = tick.bid_price / ticks[index - params.recent_ratio_length].bid_price;

        let change_signal =
            recent_change >= params.min_recent_change && recent_change <= params.max_recent_change;
        // The upper ratio bound is applied to the recent change.
        let ratio_signal =
            recent_ratio >= params.min_recent_ratio && recent_change <= params.max_recent_ratio;
        let spaced_out = ticks_since_last_trade == 0
            || ticks_since_last_trade >= params.min_ticks_since_last_trade;

        let mut just_bought = false;
        if buying && volume >= config.min_volume {
            buying = false;
            let buying_power = ledger.balance * config.margin_multiplier;
            if let Some(open) = ledger.buy(&tick.symbol, buying_power, tick.ask_price) {
                highest_bid = tick.bid_price;
                just_bought = true;
                position = Some((open, tick.timestamp));
            }
        }

        if position.is_none() && !too_late && change_signal && ratio_signal && spaced_out {
            buying = true;
        }

        let held_long_enough = position
            .as_ref()
            .is_some_and(|(_, bought_at)| tick.timestamp - *bought_at >= min_hold);
        if !buying
            && !just_bought
            && held_long_enough
            && (stop_loss_reached || day_end)
            && volume >= config.min_volume
        {
            if let Some((open, _)) = position.take() {
                ledger.sell(&open, tick.bid_price);
                ticks_since_last_trade = 0;
                highest_bid = 0.0;
            }
        }

        if let Some(cumulative) = tick.cumulative_volume {
            previous_cumulative_volume = cumulative;
        }
        ticks_since_last_trade += 1;
    }

    Ok(ledger.result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 11, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn quote(ts: NaiveDateTime, bid: f64, ask: f64, volume: i64) -> Tick {
        let mut tick = Tick::from_close("AAPL", ts, (bid + ask) / 2.0);
        tick.bid_price = bid;
        tick.ask_price = ask;
        tick.cumulative_volume = Some(volume);
        tick
    }

    fn closes(prices: &[f64]) -> Vec<Tick> {
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| Tick::from_close("AAPL", at(18, 10, (i / 60) as u32, (i % 60) as u32), *p))
            .collect()
    }

    fn ema_phenotype() -> Phenotype {
        Phenotype::new()
            .with("ema_length", 1.0)
            .with("ema_change_negative_buy_threshold", 1.0)
            .with("ema_change_positive_buy_threshold", 1.0)
            .with("target_increase", 0.01)
            .with("stop_loss_threshold", 0.05)
    }

    #[test]
    fn empty_ticks_leave_balance_untouched() {
        let config = BacktestConfig::default();
        for kind in StrategyKind::ALL {
            let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(1);
            let phenotype = kind.schema().random(&mut rng);
            let result = backtest(kind, &phenotype, &[], &config).unwrap();
            assert!((result.balance - config.initial_balance).abs() < f64::EPSILON);
            assert_eq!(result.trade_count, 0);
        }
    }

    #[test]
    fn missing_parameter_is_reported() {
        let phenotype = ema_phenotype();
        let err = backtest(
            StrategyKind::BollingerReversion,
            &phenotype,
            &closes(&[1.0]),
            &BacktestConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TicktraderError::MissingParameter { .. }));
    }

    #[test]
    fn ema_threshold_buys_dip_and_sells_target() {
        let ticks = closes(&[52.0, 49.0, 50.0, 51.0]);
        let result = backtest(
            StrategyKind::EmaThreshold,
            &ema_phenotype(),
            &ticks,
            &BacktestConfig::default(),
        )
        .unwrap();
        assert_eq!(result.trade_count, 1);
        let net = (51.0 * 199.0 - 4.95) - (199.0 * 50.0 + 4.95);
        assert!((result.profit - net).abs() < 1e-9);
        assert!(result.loss.abs() < f64::EPSILON);
    }

    #[test]
    fn ema_threshold_holds_through_its_buy_tick() {
        let p = ema_phenotype().with_value("target_increase", 0.0);
        let ticks: Vec<Tick> = [(58, 52.0), (59, 49.0), (60, 50.0), (61, 50.0)]
            .iter()
            .map(|&(s, price)| {
                Tick::from_close("AAPL", at(18, 14, 58 + s / 60, s % 60), price)
            })
            .collect();
        let config = BacktestConfig::default();

        let opened = backtest(StrategyKind::EmaThreshold, &p, &ticks[..3], &config).unwrap();
        assert_eq!(opened.trade_count, 0);
        let cost = 199.0 * 50.0 + 4.95;
        assert!((opened.balance - (10_000.0 - cost)).abs() < 1e-9);

        let closed = backtest(StrategyKind::EmaThreshold, &p, &ticks, &config).unwrap();
        assert_eq!(closed.trade_count, 1);
        assert!((closed.loss - 2.0 * 4.95).abs() < 1e-9);
    }

    #[test]
    fn ema_threshold_trailing_stop() {
        // Bought at 50, rallies to 50.4 (below target 50.5), then drops 5%+.
        let ticks = closes(&[52.0, 49.0, 50.0, 50.4, 47.5]);
        let result = backtest(
            StrategyKind::EmaThreshold,
            &ema_phenotype(),
            &ticks,
            &BacktestConfig::default(),
        )
        .unwrap();
        assert_eq!(result.trade_count, 1);
        assert!(result.loss > 0.0);
        assert!((result.profit + result.loss).abs() < 1e-9);
    }

    #[test]
    fn ema_threshold_sells_at_day_end() {
        let mut ticks = closes(&[52.0, 49.0, 50.0]);
        ticks.push(Tick::from_close("AAPL", at(18, 14, 58, 0), 50.1));
        let result = backtest(
            StrategyKind::EmaThreshold,
            &ema_phenotype(),
            &ticks,
            &BacktestConfig::default(),
        )
        .unwrap();
        assert_eq!(result.trade_count, 1);
    }

    #[test]
    fn bollinger_reversion_round_trip() {
        let phenotype = Phenotype::new()
            .with("bollinger_length", 3.0)
            .with("deviations", 1.0)
            .with("target_increase", 0.5)
            .with("stop_loss_threshold", 0.5);
        // Lower band at tick 3 sits above 90; middle at tick 4 is below 100.
        let ticks = closes(&[100.0, 100.0, 100.0, 90.0, 100.0]);
        let result = backtest(
            StrategyKind::BollingerReversion,
            &phenotype,
            &ticks,
            &BacktestConfig::default(),
        )
        .unwrap();
        assert_eq!(result.trade_count, 1);
        assert!(result.profit > 0.0);
    }

    #[test]
    fn bollinger_reversion_respects_too_late_cutoff() {
        let phenotype = Phenotype::new()
            .with("bollinger_length", 3.0)
            .with("deviations", 1.0)
            .with("target_increase", 0.5)
            .with("stop_loss_threshold", 0.5);
        let ticks: Vec<Tick> = [100.0, 100.0, 100.0, 90.0, 100.0]
            .iter()
            .enumerate()
            .map(|(i, p)| Tick::from_close("AAPL", at(18, 14, 56, i as u32), *p))
            .collect();
        let result = backtest(
            StrategyKind::BollingerReversion,
            &phenotype,
            &ticks,
            &BacktestConfig::default(),
        )
        .unwrap();
        assert_eq!(result.trade_count, 0);
    }

    fn price_change_phenotype() -> Phenotype {
        Phenotype::new()
            .with("investment_divisor", 4.0)
            .with("sell_trigger_profit_percentage", 2.0)
            .with("stop_loss_threshold", 5.0)
            .with("recent_large_change_counter_start", 2.0)
            .with("min_percent_change_buy", -5.0)
            .with("max_percent_change_buy", 5.0)
    }

    #[test]
    fn price_change_scales_in_and_takes_profit() {
        // 100 -> 99 (-1%): buy sqrt(1) * 2500 = 25 shares at 99.
        // 99 -> 105: target 2% above average cost reached; sell everything.
        let ticks = closes(&[100.0, 99.0, 105.0]);
        let result = backtest(
            StrategyKind::PriceChange,
            &price_change_phenotype(),
            &ticks,
            &BacktestConfig::default(),
        )
        .unwrap();
        assert_eq!(result.trade_count, 1);
        let cost = 25.0 * 99.0 + 4.95;
        let gross = 25.0 * 105.0 - 4.95;
        assert!((result.profit - (gross - cost)).abs() < 1e-9);
    }

    #[test]
    fn price_change_profit_is_realised_only() {
        // A single buy that is never sold leaves realised profit at zero.
        let ticks = closes(&[100.0, 99.0, 99.5]);
        let result = backtest(
            StrategyKind::PriceChange,
            &price_change_phenotype(),
            &ticks,
            &BacktestConfig::default(),
        )
        .unwrap();
        assert_eq!(result.trade_count, 0);
        assert!(result.profit.abs() < f64::EPSILON);
    }

    #[test]
    fn price_change_large_move_starts_cool_down() {
        // +10% is outside the band and arms the counter, so the -0.9% move
        // right after it is skipped. Nothing is ever sold.
        let ticks = closes(&[100.0, 110.0, 109.0, 108.0]);
        let result = backtest(
            StrategyKind::PriceChange,
            &price_change_phenotype(),
            &ticks,
            &BacktestConfig::default(),
        )
        .unwrap();
        assert_eq!(result.trade_count, 0);
        assert!(result.profit.abs() < f64::EPSILON);
    }

    #[test]
    fn price_change_rejects_zero_divisor() {
        let phenotype = price_change_phenotype().with_value("investment_divisor", 0.0);
        let err = backtest(
            StrategyKind::PriceChange,
            &phenotype,
            &closes(&[1.0, 2.0]),
            &BacktestConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TicktraderError::ParameterOutOfRange { .. }));
    }

    fn recent_change_phenotype() -> Phenotype {
        Phenotype::new()
            .with("recent_change_length", 2.0)
            .with("recent_ratio_length", 1.0)
            .with("min_recent_change", 1.001)
            .with("max_recent_change", 1.01)
            .with("min_recent_ratio", 1.0001)
            .with("max_recent_ratio", 1.01)
            .with("min_ticks_since_last_trade", 1.0)
            .with("stop_loss_threshold", 0.001)
    }

    fn recent_change_ticks() -> Vec<Tick> {
        let mut ticks = Vec::new();
        let mut volume = 0;
        // Flat warmup at 100.
        for i in 0..12 {
            volume += 5_000;
            ticks.push(quote(at(18, 10, 0, i), 100.0, 100.02, volume));
        }
        // A 0.5% pop signals a buy; the next tick fills.
        volume += 5_000;
        ticks.push(quote(at(18, 10, 0, 12), 100.5, 100.52, volume));
        volume += 5_000;
        ticks.push(quote(at(18, 10, 0, 13), 100.6, 100.62, volume));
        // Drift up, then a drop through the trailing stop after the hold.
        volume += 5_000;
        ticks.push(quote(at(18, 10, 0, 20), 100.8, 100.82, volume));
        volume += 5_000;
        ticks.push(quote(at(18, 10, 0, 25), 100.6, 100.62, volume));
        ticks
    }

    #[test]
    fn recent_change_buys_on_margin_and_stops_out() {
        let config = BacktestConfig::default();
        let result = backtest(
            StrategyKind::RecentChange,
            &recent_change_phenotype(),
            &recent_change_ticks(),
            &config,
        )
        .unwrap();
        assert_eq!(result.trade_count, 1);
        let shares = ((10_000.0 * 4.0 - 4.95) / 100.62_f64).floor();
        let cost = shares * 100.62 + 4.95;
        let gross = shares * 100.6 - 4.95;
        assert!((result.profit - (gross - cost)).abs() < 1e-6);
        assert!((result.loss - (cost - gross)).abs() < 1e-6);
    }

    #[test]
    fn recent_change_needs_volume_to_fill() {
        let config = BacktestConfig {
            min_volume: 1_000_000,
            ..BacktestConfig::default()
        };
        let result = backtest(
            StrategyKind::RecentChange,
            &recent_change_phenotype(),
            &recent_change_ticks(),
            &config,
        )
        .unwrap();
        assert_eq!(result.trade_count, 0);
        assert!((result.balance - config.initial_balance).abs() < f64::EPSILON);
    }

    #[test]
    fn backtest_is_deterministic() {
        let prices: Vec<f64> = (0..300)
            .map(|i| 100.0 + ((i as f64) * 0.37).sin() * 3.0 + (i as f64) * 0.01)
            .collect();
        let ticks = closes(&prices);
        let config = BacktestConfig::default();
        for kind in StrategyKind::ALL {
            let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(42);
            let phenotype = kind.schema().random(&mut rng);
            let a = backtest(kind, &phenotype, &ticks, &config).unwrap();
            let b = backtest(kind, &phenotype, &ticks, &config).unwrap();
            assert_eq!(a, b, "{kind} is not deterministic");
        }
    }
}

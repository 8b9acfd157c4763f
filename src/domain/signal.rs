//! Per-symbol EMA trend signaler.
//!
//! The signaler counts consecutive falling and rising EMA steps. A BUY fires
//! once a run of falls of at least `ema_change_negative_buy_threshold` has been
//! followed by at least `ema_change_positive_buy_threshold` rises. A SELL fires
//! once the bid reaches the target price set at the BUY, or at day-end.

use chrono::NaiveTime;

use crate::domain::error::TicktraderError;
use crate::domain::indicator::{Ema, EmaState};
use crate::domain::phenotype::Phenotype;
use crate::domain::tick::Tick;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    #[default]
    None,
    Buy,
    Sell,
}

/// Local time at and after which open positions are liquidated.
pub fn default_day_end() -> NaiveTime {
    NaiveTime::from_hms_opt(14, 58, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalerParams {
    pub ema_length: usize,
    pub ema_change_negative_buy_threshold: f64,
    pub ema_change_positive_buy_threshold: f64,
    pub target_increase: f64,
}

impl SignalerParams {
    pub fn from_phenotype(phenotype: &Phenotype) -> Result<Self, TicktraderError> {
        Ok(SignalerParams {
            ema_length: phenotype.require_count("ema_length")?,
            ema_change_negative_buy_threshold: phenotype
                .require("ema_change_negative_buy_threshold")?,
            ema_change_positive_buy_threshold: phenotype
                .require("ema_change_positive_buy_threshold")?,
            target_increase: phenotype.require("target_increase")?,
        })
    }
}

/// Run lengths of falling and rising EMA steps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmaStreak {
    previous_ema: Option<f64>,
    pub negative: u32,
    pub positive: u32,
    /// Length of the falling run that preceded the latest rise.
    pub recent_negative: u32,
}

impl EmaStreak {
    /// Feed the next EMA value. Returns false while the streak is only being seeded.
    pub fn observe(&mut self, ema: f64) -> bool {
        let Some(previous) = self.previous_ema.replace(ema) else {
            return false;
        };
        if ema - previous < 0.0 {
            self.negative += 1;
            self.positive = 0;
        } else {
            self.recent_negative = self.negative;
            self.negative = 0;
            self.positive += 1;
        }
        true
    }

    pub fn is_buy_setup(&self, params: &SignalerParams) -> bool {
        f64::from(self.recent_negative) >= params.ema_change_negative_buy_threshold
            && f64::from(self.positive) >= params.ema_change_positive_buy_threshold
    }
}

#[derive(Debug, Clone)]
pub struct TradeSignaler {
    symbol: String,
    params: SignalerParams,
    ticks: Vec<Tick>,
    ema: Ema,
    ema_state: EmaState,
    streak: EmaStreak,
    target_sell_price: Option<f64>,
    is_trading: bool,
    day_end: NaiveTime,
}

impl TradeSignaler {
    pub fn new(symbol: &str, phenotype: &Phenotype) -> Result<Self, TicktraderError> {
        let params = SignalerParams::from_phenotype(phenotype)?;
        let ema = Ema::with_length(params.ema_length)?;
        Ok(TradeSignaler {
            symbol: symbol.to_uppercase(),
            params,
            ticks: Vec::new(),
            ema,
            ema_state: EmaState::default(),
            streak: EmaStreak::default(),
            target_sell_price: None,
            is_trading: false,
            day_end: default_day_end(),
        })
    }

    pub fn with_day_end(mut self, day_end: NaiveTime) -> Self {
        self.day_end = day_end;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn params(&self) -> &SignalerParams {
        &self.params
    }

    pub fn target_sell_price(&self) -> Option<f64> {
        self.target_sell_price
    }

    pub fn is_trading(&self) -> bool {
        self.is_trading
    }

    pub fn set_is_trading(&mut self, is_trading: bool) {
        self.is_trading = is_trading;
    }

    pub fn tick(&mut self, tick: &Tick) -> Signal {
        if !tick.symbol.eq_ignore_ascii_case(&self.symbol) {
            return Signal::None;
        }

        self.ticks.push(tick.clone());
        let (state, value) = self.ema.step(&self.ema_state, &self.ticks);
        self.ema_state = state;
        // The EMA only reads its last `ema_length` points.
        let keep = self.params.ema_length;
        if self.ticks.len() > keep {
            self.ticks.drain(..self.ticks.len() - keep);
        }

        let Some(ema) = value else {
            return Signal::None;
        };
        if !self.streak.observe(ema) {
            return Signal::None;
        }

        let mut signal = Signal::None;
        if !self.is_trading && self.streak.is_buy_setup(&self.params) {
            self.target_sell_price = Some(tick.ask_price * (1.0 + self.params.target_increase));
            signal = Signal::Buy;
        }

        let is_day_end = tick.time() >= self.day_end;
        let reached_target = self
            .target_sell_price
            .is_some_and(|target| tick.bid_price >= target);
        if self.is_trading && signal != Signal::Buy && (reached_target || is_day_end) {
            self.target_sell_price = None;
            signal = Signal::Sell;
        }

        signal
    }
}

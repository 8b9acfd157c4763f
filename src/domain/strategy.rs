//! Strategy variants and their phenotype schemas.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::TicktraderError;
use crate::domain::phenotype::{ParamSpec, PhenotypeSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Buy after a run of falling EMA steps turns up; sell at a target,
    /// trailing stop or day-end.
    EmaThreshold,
    /// Buy below the lower Bollinger band; sell back at the middle band.
    BollingerReversion,
    /// Daily-bar scaling in on moderate moves, sized by the size of the move.
    PriceChange,
    /// Intraday momentum off the low of a lagged window, bought on margin.
    RecentChange,
}

const EMA_THRESHOLD_FIELDS: &[ParamSpec] = &[
    ParamSpec::new("ema_length", 5.0, 50.0, 0),
    ParamSpec::new("ema_change_negative_buy_threshold", 1.0, 50.0, 0),
    ParamSpec::new("ema_change_positive_buy_threshold", 1.0, 5.0, 0),
    ParamSpec::new("target_increase", 0.0001, 0.002, 7),
    ParamSpec::new("stop_loss_threshold", 0.0001, 0.005, 5),
];

const BOLLINGER_REVERSION_FIELDS: &[ParamSpec] = &[
    ParamSpec::new("bollinger_length", 10.0, 60.0, 0),
    ParamSpec::new("deviations", 1.0, 3.0, 2),
    ParamSpec::new("target_increase", 0.0005, 0.01, 5),
    ParamSpec::new("stop_loss_threshold", 0.0005, 0.01, 5),
];

const PRICE_CHANGE_FIELDS: &[ParamSpec] = &[
    ParamSpec::new("investment_divisor", 3.0, 20.0, 0),
    ParamSpec::new("sell_trigger_profit_percentage", 0.05, 5.0, 5),
    ParamSpec::new("stop_loss_threshold", 0.05, 10.0, 5),
    ParamSpec::new("recent_large_change_counter_start", 1.0, 10.0, 0),
    ParamSpec::new("min_percent_change_buy", -10.0, 0.0, 2),
    ParamSpec::new("max_percent_change_buy", 0.0, 10.0, 2),
];

const RECENT_CHANGE_FIELDS: &[ParamSpec] = &[
    ParamSpec::new("recent_change_length", 20.0, 50.0, 0),
    ParamSpec::new("recent_ratio_length", 1.0, 10.0, 0),
    ParamSpec::new("min_recent_change", 1.0005, 1.0015, 5),
    ParamSpec::new("max_recent_change", 1.0015, 1.01, 5),
    ParamSpec::new("min_recent_ratio", 1.0001, 1.0008, 5),
    ParamSpec::new("max_recent_ratio", 1.0006, 1.003, 5),
    ParamSpec::new("min_ticks_since_last_trade", 1.0, 200.0, 0),
    ParamSpec::new("stop_loss_threshold", 0.0001, 0.001, 5),
];

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::EmaThreshold,
        StrategyKind::BollingerReversion,
        StrategyKind::PriceChange,
        StrategyKind::RecentChange,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::EmaThreshold => "ema_threshold",
            StrategyKind::BollingerReversion => "bollinger_reversion",
            StrategyKind::PriceChange => "price_change",
            StrategyKind::RecentChange => "recent_change",
        }
    }

    pub fn schema(self) -> PhenotypeSchema {
        let fields = match self {
            StrategyKind::EmaThreshold => EMA_THRESHOLD_FIELDS,
            StrategyKind::BollingerReversion => BOLLINGER_REVERSION_FIELDS,
            StrategyKind::PriceChange => PRICE_CHANGE_FIELDS,
            StrategyKind::RecentChange => RECENT_CHANGE_FIELDS,
        };
        PhenotypeSchema { fields }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = TicktraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| TicktraderError::UnknownStrategy {
                name: s.to_string(),
            })
    }
}

//! Configuration validation.
//!
//! Builds and checks the run configuration from a `ConfigPort` before any
//! ticks are replayed. Missing keys take their defaults; present but invalid
//! values are errors.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::TicktraderError;
use crate::domain::genetic::{FitnessKind, OptimizerConfig};
use crate::domain::phenotype::Phenotype;
use crate::domain::strategy::StrategyKind;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveTime;

pub const SIGNALER_SECTION_PREFIX: &str = "signaler.";

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TicktraderError {
    TicktraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// A numeric key that must parse when present.
fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, TicktraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(section, key, format!("'{raw}' is not a number"))),
    }
}

fn read_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, TicktraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| invalid(section, key, format!("'{raw}' is not a whole number"))),
    }
}

fn read_time(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: NaiveTime,
) -> Result<NaiveTime, TicktraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => {
            let raw = raw.trim();
            NaiveTime::parse_from_str(raw, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
                .map_err(|_| invalid(section, key, format!("'{raw}' is not HH:MM or HH:MM:SS")))
        }
    }
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TicktraderError> {
    let defaults = BacktestConfig::default();
    let built = BacktestConfig {
        initial_balance: read_double(config, "backtest", "initial_balance", defaults.initial_balance)?,
        commission: read_double(config, "backtest", "commission", defaults.commission)?,
        day_end: read_time(config, "backtest", "day_end", defaults.day_end)?,
        too_late_to_trade: read_time(
            config,
            "backtest",
            "too_late_to_trade",
            defaults.too_late_to_trade,
        )?,
        min_volume: read_count(config, "backtest", "min_volume", defaults.min_volume as usize)?
            as i64,
        margin_multiplier: read_double(
            config,
            "backtest",
            "margin_multiplier",
            defaults.margin_multiplier,
        )?,
    };
    validate_backtest_values(&built)?;
    Ok(built)
}

fn validate_backtest_values(config: &BacktestConfig) -> Result<(), TicktraderError> {
    if config.initial_balance <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_balance",
            "initial_balance must be positive",
        ));
    }
    if config.commission < 0.0 {
        return Err(invalid(
            "backtest",
            "commission",
            "commission must be non-negative",
        ));
    }
    if config.margin_multiplier < 1.0 {
        return Err(invalid(
            "backtest",
            "margin_multiplier",
            "margin_multiplier must be at least 1",
        ));
    }
    if config.too_late_to_trade > config.day_end {
        return Err(invalid(
            "backtest",
            "too_late_to_trade",
            "too_late_to_trade must not be after day_end",
        ));
    }
    Ok(())
}

pub fn build_strategy_kind(config: &dyn ConfigPort) -> Result<StrategyKind, TicktraderError> {
    config
        .get_string("optimizer", "strategy")
        .ok_or_else(|| TicktraderError::ConfigMissing {
            section: "optimizer".into(),
            key: "strategy".into(),
        })?
        .parse()
}

pub fn build_optimizer_config(config: &dyn ConfigPort) -> Result<OptimizerConfig, TicktraderError> {
    let defaults = OptimizerConfig::default();
    let population_size =
        read_count(config, "optimizer", "population_size", defaults.population_size)?;
    if population_size == 0 {
        return Err(invalid(
            "optimizer",
            "population_size",
            "population_size must be at least 1",
        ));
    }
    let evolution_count =
        read_count(config, "optimizer", "evolution_count", defaults.evolution_count)?;
    let seed = match config.get_string("optimizer", "seed") {
        None => None,
        Some(raw) => Some(
            raw.trim()
                .parse::<u64>()
                .map_err(|_| invalid("optimizer", "seed", format!("'{raw}' is not a seed")))?,
        ),
    };
    let fitness = match config.get_string("optimizer", "fitness") {
        None => FitnessKind::default(),
        Some(raw) => raw.parse()?,
    };
    Ok(OptimizerConfig {
        population_size,
        evolution_count,
        seed,
        fitness,
    })
}

/// Every key of `section` read as a phenotype parameter.
pub fn read_phenotype(config: &dyn ConfigPort, section: &str) -> Result<Phenotype, TicktraderError> {
    let keys = config.keys(section);
    if keys.is_empty() {
        return Err(TicktraderError::ConfigMissing {
            section: section.to_string(),
            key: "*".into(),
        });
    }
    keys.iter().try_fold(Phenotype::new(), |phenotype, key| {
        let value = read_double(config, section, key, f64::NAN)?;
        Ok(phenotype.with(key, value))
    })
}

/// `(symbol, phenotype)` for every `[signaler.<symbol>]` section; symbols uppercased.
pub fn read_signaler_phenotypes(
    config: &dyn ConfigPort,
) -> Result<Vec<(String, Phenotype)>, TicktraderError> {
    config
        .sections()
        .into_iter()
        .filter_map(|section| {
            section
                .strip_prefix(SIGNALER_SECTION_PREFIX)
                .map(|symbol| (symbol.to_uppercase(), section.clone()))
        })
        .map(|(symbol, section)| Ok((symbol, read_phenotype(config, &section)?)))
        .collect()
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TicktraderError> {
    build_backtest_config(config).map(|_| ())
}

pub fn validate_optimizer_config(config: &dyn ConfigPort) -> Result<(), TicktraderError> {
    build_strategy_kind(config)?;
    build_optimizer_config(config).map(|_| ())
}

/// Phenotype fields present and within the strategy's ranges.
pub fn validate_phenotype(kind: StrategyKind, phenotype: &Phenotype) -> Result<(), TicktraderError> {
    kind.schema().validate(phenotype)
}

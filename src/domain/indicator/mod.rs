//! Incremental technical indicators.
//!
//! This module provides the shared indicator contract:
//! - `Inputs`: named numeric construction parameters (`length`, `d_length`, ...)
//! - `OutputMap`: canonical output key -> caller-chosen output name
//! - `IndicatorOutput`: named outputs of one tick, empty while warming up
//! - `Indicator`: pure `tick(state, data) -> (state, output)` over a tick window
//! - `Study`: an indicator bound to its state and a borrowed data window
//! - `AnyIndicator`: run-time selection over the concrete variants

pub mod bollinger;
pub mod ema;
pub mod rsi;
pub mod stochastic;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::domain::error::TicktraderError;
use crate::domain::tick::Tick;

pub use bollinger::BollingerBands;
pub use ema::{Ema, EmaState};
pub use rsi::{Rsi, RsiState};
pub use stochastic::{Stochastic, StochasticState};

/// Named outputs of a single indicator tick, keyed by mapped output name.
pub type IndicatorOutput = BTreeMap<String, f64>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    values: HashMap<String, f64>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// A required window length. Absent or zero is a construction error.
    pub fn require_length(&self, study: &str, key: &str) -> Result<usize, TicktraderError> {
        let value = match self.get(key) {
            Some(v) if v != 0.0 => v,
            _ => {
                return Err(TicktraderError::MissingInput {
                    study: study.to_string(),
                    input: key.to_string(),
                });
            }
        };
        if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
            return Err(TicktraderError::InvalidInput {
                study: study.to_string(),
                input: key.to_string(),
                reason: format!("{value} is not a positive whole number"),
            });
        }
        Ok(value as usize)
    }
}

/// Maps an indicator's canonical output keys onto caller-chosen names.
/// Unmapped keys keep their canonical name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputMap {
    names: HashMap<String, String>,
}

impl OutputMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, key: &str, name: &str) -> Self {
        self.names.insert(key.to_string(), name.to_string());
        self
    }

    pub fn resolve(&self, key: &str) -> String {
        self.names
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

pub trait Indicator {
    type State: Clone + Default + fmt::Debug;

    fn output_map(&self) -> &OutputMap;

    /// Compute the outputs for the newest point of `data`.
    ///
    /// `data` is the full ordered window seen so far for one symbol. Returns the
    /// successor state and the outputs; the outputs are empty when too little
    /// data has accumulated.
    fn tick(&self, state: &Self::State, data: &[Tick]) -> (Self::State, IndicatorOutput);
}

/// An indicator bound to its own state and a borrowed data window.
#[derive(Debug)]
pub struct Study<'a, I: Indicator> {
    indicator: I,
    state: I::State,
    data: &'a [Tick],
}

impl<'a, I: Indicator> Study<'a, I> {
    pub fn new(indicator: I) -> Self {
        Study {
            indicator,
            state: I::State::default(),
            data: &[],
        }
    }

    /// Rebind the working data window. The ticks are borrowed, not copied.
    pub fn set_data(&mut self, data: &'a [Tick]) {
        self.data = data;
    }

    pub fn tick(&mut self) -> IndicatorOutput {
        let (state, output) = self.indicator.tick(&self.state, self.data);
        self.state = state;
        output
    }

    pub fn state(&self) -> &I::State {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = I::State::default();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnyIndicator {
    Ema(Ema),
    Rsi(Rsi),
    Stochastic(Stochastic),
    Bollinger(BollingerBands),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum AnyState {
    #[default]
    Fresh,
    Ema(EmaState),
    Rsi(RsiState),
    Stochastic(StochasticState),
    Bollinger,
}

impl AnyIndicator {
    /// Build an indicator by name: `ema`, `rsi`, `stochastic` or `bollinger`.
    pub fn from_name(
        name: &str,
        inputs: &Inputs,
        outputs: OutputMap,
    ) -> Result<Self, TicktraderError> {
        match name.to_lowercase().as_str() {
            "ema" => Ok(AnyIndicator::Ema(Ema::new(inputs, outputs)?)),
            "rsi" => Ok(AnyIndicator::Rsi(Rsi::new(inputs, outputs)?)),
            "stochastic" => Ok(AnyIndicator::Stochastic(Stochastic::new(inputs, outputs)?)),
            "bollinger" => Ok(AnyIndicator::Bollinger(BollingerBands::new(inputs, outputs)?)),
            other => Err(TicktraderError::InvalidInput {
                study: other.to_string(),
                input: "name".into(),
                reason: "unknown indicator".into(),
            }),
        }
    }
}

impl Indicator for AnyIndicator {
    type State = AnyState;

    fn output_map(&self) -> &OutputMap {
        match self {
            AnyIndicator::Ema(i) => i.output_map(),
            AnyIndicator::Rsi(i) => i.output_map(),
            AnyIndicator::Stochastic(i) => i.output_map(),
            AnyIndicator::Bollinger(i) => i.output_map(),
        }
    }

    fn tick(&self, state: &AnyState, data: &[Tick]) -> (AnyState, IndicatorOutput) {
        match self {
            AnyIndicator::Ema(i) => {
                let prev = match state {
                    AnyState::Ema(s) => s.clone(),
                    _ => EmaState::default(),
                };
                let (next, out) = i.tick(&prev, data);
                (AnyState::Ema(next), out)
            }
            AnyIndicator::Rsi(i) => {
                let prev = match state {
                    AnyState::Rsi(s) => s.clone(),
                    _ => RsiState::default(),
                };
                let (next, out) = i.tick(&prev, data);
                (AnyState::Rsi(next), out)
            }
            AnyIndicator::Stochastic(i) => {
                let prev = match state {
                    AnyState::Stochastic(s) => s.clone(),
                    _ => StochasticState::default(),
                };
                let (next, out) = i.tick(&prev, data);
                (AnyState::Stochastic(next), out)
            }
            AnyIndicator::Bollinger(i) => {
                let (_, out) = i.tick(&(), data);
                (AnyState::Bollinger, out)
            }
        }
    }
}

impl fmt::Display for AnyIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyIndicator::Ema(i) => write!(f, "EMA({})", i.length()),
            AnyIndicator::Rsi(i) => write!(f, "RSI({})", i.length()),
            AnyIndicator::Stochastic(i) => {
                write!(f, "STOCHASTIC({},{})", i.length(), i.d_length())
            }
            AnyIndicator::Bollinger(i) => {
                write!(f, "BOLLINGER({},{})", i.length(), i.deviations())
            }
        }
    }
}

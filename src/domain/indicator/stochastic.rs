//! Stochastic oscillator.
//!
//! %K = 100 * (close - low) / (high - low), with low/high taken over the whole
//! data window supplied (not a trailing `length` window). %K = 0 when
//! high == low.
//! %D = mean %K over the last `d_length` points; points without a recorded %K
//! (the newest point, and any point ticked before warmup) use the current %K.
//! While the window holds fewer than `d_length` points, %D is the mean over the
//! points available, so it can differ from a full `d_length` average only when
//! `length < d_length`.
//!
//! Computed %K values are recorded in `StochasticState` by data index rather
//! than written back onto the ticks.

use std::collections::BTreeMap;

use crate::domain::error::TicktraderError;
use crate::domain::indicator::{Indicator, IndicatorOutput, Inputs, OutputMap};
use crate::domain::tick::{PriceField, Tick};

#[derive(Debug, Clone, PartialEq)]
pub struct Stochastic {
    length: usize,
    d_length: usize,
    close_source: PriceField,
    high_source: PriceField,
    low_source: PriceField,
    outputs: OutputMap,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StochasticState {
    /// Recorded %K by index into the data window, pruned to the last `d_length`.
    pub k_by_index: BTreeMap<usize, f64>,
}

impl Stochastic {
    pub fn new(inputs: &Inputs, outputs: OutputMap) -> Result<Self, TicktraderError> {
        let length = inputs.require_length("Stochastic", "length")?;
        let d_length = inputs.require_length("Stochastic", "d_length")?;
        Ok(Stochastic {
            length,
            d_length,
            close_source: PriceField::Close,
            high_source: PriceField::High,
            low_source: PriceField::Low,
            outputs,
        })
    }

    pub fn with_sources(mut self, close: PriceField, high: PriceField, low: PriceField) -> Self {
        self.close_source = close;
        self.high_source = high;
        self.low_source = low;
        self
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn d_length(&self) -> usize {
        self.d_length
    }

    /// Returns the next state and `(%K, %D)` once `length` points are available.
    pub fn step(&self, state: &StochasticState, data: &[Tick]) -> (StochasticState, Option<(f64, f64)>) {
        if data.is_empty() || data.len() < self.length {
            return (state.clone(), None);
        }

        let last_index = data.len() - 1;
        let low = data
            .iter()
            .map(|t| self.low_source.read(t))
            .fold(f64::INFINITY, f64::min);
        let high = data
            .iter()
            .map(|t| self.high_source.read(t))
            .fold(f64::NEG_INFINITY, f64::max);
        let range = high - low;
        let k = if range > 0.0 {
            100.0 * ((self.close_source.read(&data[last_index]) - low) / range)
        } else {
            0.0
        };

        let d_start = data.len().saturating_sub(self.d_length);
        let d_count = data.len() - d_start;
        let d = (d_start..data.len())
            .map(|i| state.k_by_index.get(&i).copied().unwrap_or(k))
            .sum::<f64>()
            / d_count as f64;

        let mut next = state.clone();
        next.k_by_index.insert(last_index, k);
        while next.k_by_index.len() > self.d_length {
            next.k_by_index.pop_first();
        }

        (next, Some((k, d)))
    }
}

impl Indicator for Stochastic {
    type State = StochasticState;

    fn output_map(&self) -> &OutputMap {
        &self.outputs
    }

    fn tick(&self, state: &StochasticState, data: &[Tick]) -> (StochasticState, IndicatorOutput) {
        let (next, value) = self.step(state, data);
        let mut output = IndicatorOutput::new();
        if let Some((k, d)) = value {
            output.insert(self.outputs.resolve("K"), k);
            output.insert(self.outputs.resolve("D"), d);
        }
        (next, output)
    }
}

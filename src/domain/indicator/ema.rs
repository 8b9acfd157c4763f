//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with the SMA of the last n closes, then
//! EMA = C*k + EMA_prev*(1-k).
//! Warmup: nothing is emitted until n points have been seen.

use crate::domain::error::TicktraderError;
use crate::domain::indicator::{Indicator, IndicatorOutput, Inputs, OutputMap};
use crate::domain::tick::Tick;

#[derive(Debug, Clone, PartialEq)]
pub struct Ema {
    length: usize,
    outputs: OutputMap,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmaState {
    pub points_seen: usize,
    pub previous_ema: Option<f64>,
}

impl Ema {
    pub fn new(inputs: &Inputs, outputs: OutputMap) -> Result<Self, TicktraderError> {
        let length = inputs.require_length("EMA", "length")?;
        Ok(Ema { length, outputs })
    }

    pub fn with_length(length: usize) -> Result<Self, TicktraderError> {
        Self::new(&Inputs::new().with("length", length as f64), OutputMap::new())
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn smoothing(&self) -> f64 {
        2.0 / (self.length as f64 + 1.0)
    }

    /// Advance the EMA by one point, returning the new state and the value if warm.
    pub fn step(&self, state: &EmaState, data: &[Tick]) -> (EmaState, Option<f64>) {
        let points_seen = state.points_seen + 1;

        if points_seen < self.length || data.is_empty() {
            return (
                EmaState {
                    points_seen,
                    previous_ema: state.previous_ema,
                },
                None,
            );
        }

        let ema = match state.previous_ema {
            None => {
                let start = data.len().saturating_sub(self.length);
                let segment = &data[start..];
                segment.iter().map(|t| t.close()).sum::<f64>() / self.length as f64
            }
            Some(prev) => {
                let k = self.smoothing();
                let close = data[data.len() - 1].close();
                close * k + prev * (1.0 - k)
            }
        };

        (
            EmaState {
                points_seen,
                previous_ema: Some(ema),
            },
            Some(ema),
        )
    }
}

impl Indicator for Ema {
    type State = EmaState;

    fn output_map(&self) -> &OutputMap {
        &self.outputs
    }

    fn tick(&self, state: &EmaState, data: &[Tick]) -> (EmaState, IndicatorOutput) {
        let (next, value) = self.step(state, data);
        let mut output = IndicatorOutput::new();
        if let Some(ema) = value {
            output.insert(self.outputs.resolve("ema"), ema);
        }
        (next, output)
    }
}

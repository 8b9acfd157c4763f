//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - Bootstrap: mean per-step gain/loss over the last n points
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RS is taken as 0, so RSI = 0.
//!
//! The averages are re-bootstrapped whenever either stored average is zero.

use crate::domain::error::TicktraderError;
use crate::domain::indicator::{Indicator, IndicatorOutput, Inputs, OutputMap};
use crate::domain::tick::Tick;

#[derive(Debug, Clone, PartialEq)]
pub struct Rsi {
    length: usize,
    outputs: OutputMap,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RsiState {
    pub previous_average_gain: Option<f64>,
    pub previous_average_loss: Option<f64>,
}

fn gain_loss(previous: f64, current: f64) -> (f64, f64) {
    let change = current - previous;
    if change > 0.0 {
        (change, 0.0)
    } else {
        (0.0, -change)
    }
}

impl Rsi {
    pub fn new(inputs: &Inputs, outputs: OutputMap) -> Result<Self, TicktraderError> {
        let length = inputs.require_length("RSI", "length")?;
        Ok(Rsi { length, outputs })
    }

    pub fn with_length(length: usize) -> Result<Self, TicktraderError> {
        Self::new(&Inputs::new().with("length", length as f64), OutputMap::new())
    }

    pub fn length(&self) -> usize {
        self.length
    }

    fn initial_averages(&self, data: &[Tick]) -> (f64, f64) {
        let start = data.len() - self.length;
        let mut gains = 0.0;
        let mut losses = 0.0;
        for i in start.max(1)..data.len() {
            let (gain, loss) = gain_loss(data[i - 1].close(), data[i].close());
            gains += gain;
            losses += loss;
        }
        (gains / self.length as f64, losses / self.length as f64)
    }

    pub fn step(&self, state: &RsiState, data: &[Tick]) -> (RsiState, Option<f64>) {
        if data.len() < self.length {
            return (state.clone(), None);
        }

        let last = &data[data.len() - 1];
        let previous = if data.len() >= 2 {
            &data[data.len() - 2]
        } else {
            last
        };
        let (current_gain, current_loss) = gain_loss(previous.close(), last.close());

        let n = self.length as f64;
        let (average_gain, average_loss) =
            match (state.previous_average_gain, state.previous_average_loss) {
                (Some(gain), Some(loss)) if gain != 0.0 && loss != 0.0 => (
                    (gain * (n - 1.0) + current_gain) / n,
                    (loss * (n - 1.0) + current_loss) / n,
                ),
                _ => self.initial_averages(data),
            };

        let rs = if average_loss > 0.0 {
            average_gain / average_loss
        } else {
            0.0
        };
        let rsi = 100.0 - (100.0 / (1.0 + rs));

        (
            RsiState {
                previous_average_gain: Some(average_gain),
                previous_average_loss: Some(average_loss),
            },
            Some(rsi),
        )
    }
}

impl Indicator for Rsi {
    type State = RsiState;

    fn output_map(&self) -> &OutputMap {
        &self.outputs
    }

    fn tick(&self, state: &RsiState, data: &[Tick]) -> (RsiState, IndicatorOutput) {
        let (next, value) = self.step(state, data);
        let mut output = IndicatorOutput::new();
        if let Some(rsi) = value {
            output.insert(self.outputs.resolve("rsi"), rsi);
        }
        (next, output)
    }
}

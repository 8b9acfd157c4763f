//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over the last n points
//! - Upper: Middle + (deviations × StdDev)
//! - Lower: Middle - (deviations × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//! Points older than the trailing n-point window are ignored.
//!
//! Default deviations: 2.0. Warmup: no output until n points are available.

use crate::domain::error::TicktraderError;
use crate::domain::indicator::{Indicator, IndicatorOutput, Inputs, OutputMap};
use crate::domain::tick::Tick;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    length: usize,
    deviations: f64,
    outputs: OutputMap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerBands {
    pub fn new(inputs: &Inputs, outputs: OutputMap) -> Result<Self, TicktraderError> {
        let length = inputs.require_length("Bollinger", "length")?;
        let deviations = inputs.get("deviations").unwrap_or(2.0);
        if !deviations.is_finite() || deviations < 0.0 {
            return Err(TicktraderError::InvalidInput {
                study: "Bollinger".into(),
                input: "deviations".into(),
                reason: "deviations must be non-negative".into(),
            });
        }
        Ok(BollingerBands {
            length,
            deviations,
            outputs,
        })
    }

    pub fn with_length(length: usize, deviations: f64) -> Result<Self, TicktraderError> {
        Self::new(
            &Inputs::new()
                .with("length", length as f64)
                .with("deviations", deviations),
            OutputMap::new(),
        )
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn deviations(&self) -> f64 {
        self.deviations
    }

    pub fn bands(&self, data: &[Tick]) -> Option<Bands> {
        if data.len() < self.length {
            return None;
        }

        let window = &data[data.len() - self.length..];
        let n = self.length as f64;
        let middle = window.iter().map(|t| t.close()).sum::<f64>() / n;
        let variance = window
            .iter()
            .map(|t| {
                let diff = t.close() - middle;
                diff * diff
            })
            .sum::<f64>()
            / n;
        let stddev = variance.sqrt();

        Some(Bands {
            upper: middle + self.deviations * stddev,
            middle,
            lower: middle - self.deviations * stddev,
        })
    }
}

impl Indicator for BollingerBands {
    type State = ();

    fn output_map(&self) -> &OutputMap {
        &self.outputs
    }

    fn tick(&self, _state: &(), data: &[Tick]) -> ((), IndicatorOutput) {
        let mut output = IndicatorOutput::new();
        if let Some(bands) = self.bands(data) {
            output.insert(self.outputs.resolve("upper"), bands.upper);
            output.insert(self.outputs.resolve("middle"), bands.middle);
            output.insert(self.outputs.resolve("lower"), bands.lower);
        }
        ((), output)
    }
}

//! Strategy parameter sets and their schemas.
//!
//! A `Phenotype` is a flat map of parameter name to value. Each strategy
//! declares a `PhenotypeSchema` giving every field's range and rounding;
//! sampling, mutation and crossover are defined against the schema and always
//! return new phenotypes.

use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::error::TicktraderError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Phenotype {
    values: BTreeMap<String, f64>,
}

impl Phenotype {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    /// Copy of this phenotype with one field replaced.
    pub fn with_value(&self, name: &str, value: f64) -> Self {
        self.clone().with(name, value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn require(&self, name: &str) -> Result<f64, TicktraderError> {
        self.get(name).ok_or_else(|| TicktraderError::MissingParameter {
            name: name.to_string(),
        })
    }

    /// A whole, non-negative parameter such as a window length or a count.
    pub fn require_count(&self, name: &str) -> Result<usize, TicktraderError> {
        let value = self.require(name)?;
        if value < 0.0 || !value.is_finite() {
            return Err(TicktraderError::ParameterOutOfRange {
                name: name.to_string(),
                value,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        Ok(value.round() as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// INI-style `name = value` lines, one per field.
impl fmt::Display for Phenotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.values {
            writeln!(f, "{name} = {value}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    /// Digits kept after the decimal point when sampling; 0 for whole numbers.
    pub decimals: u32,
}

impl ParamSpec {
    pub const fn new(name: &'static str, min: f64, max: f64, decimals: u32) -> Self {
        ParamSpec {
            name,
            min,
            max,
            decimals,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let raw = rng.r#gen::<f64>() * (self.max - self.min) + self.min;
        let scale = 10f64.powi(self.decimals as i32);
        ((raw * scale).round() / scale).clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhenotypeSchema {
    pub fields: &'static [ParamSpec],
}

impl PhenotypeSchema {
    pub fn field(&self, name: &str) -> Option<&ParamSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Every field sampled independently within its range.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Phenotype {
        self.fields
            .iter()
            .fold(Phenotype::new(), |p, spec| p.with(spec.name, spec.sample(rng)))
    }

    /// Copy of `phenotype` with one randomly chosen field resampled.
    pub fn mutate<R: Rng + ?Sized>(&self, phenotype: &Phenotype, rng: &mut R) -> Phenotype {
        if self.fields.is_empty() {
            return phenotype.clone();
        }
        let spec = &self.fields[rng.gen_range(0..self.fields.len())];
        phenotype.with_value(spec.name, spec.sample(rng))
    }

    /// Two children; each field is swapped between the parents with probability 0.5.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        a: &Phenotype,
        b: &Phenotype,
        rng: &mut R,
    ) -> (Phenotype, Phenotype) {
        let mut first = a.clone();
        let mut second = b.clone();
        for spec in self.fields {
            if rng.gen_bool(0.5) {
                if let (Some(va), Some(vb)) = (a.get(spec.name), b.get(spec.name)) {
                    first = first.with(spec.name, vb);
                    second = second.with(spec.name, va);
                }
            }
        }
        (first, second)
    }

    /// Every schema field present and within range.
    pub fn validate(&self, phenotype: &Phenotype) -> Result<(), TicktraderError> {
        for spec in self.fields {
            let value = phenotype.require(spec.name)?;
            if !spec.contains(value) {
                return Err(TicktraderError::ParameterOutOfRange {
                    name: spec.name.to_string(),
                    value,
                    min: spec.min,
                    max: spec.max,
                });
            }
        }
        Ok(())
    }
}

//! Core domain types and logic.

pub mod tick;
pub mod indicator;
pub mod phenotype;
pub mod position;
pub mod signal;
pub mod trader;
pub mod strategy;
pub mod backtest;
pub mod genetic;
pub mod config_validation;
pub mod error;

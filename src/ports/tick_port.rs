//! Tick data access port trait.

use crate::domain::error::TicktraderError;
use crate::domain::tick::Tick;

pub trait TickPort {
    /// Ticks in timestamp order, restricted to `symbol` when given.
    fn load_ticks(&self, symbol: Option<&str>) -> Result<Vec<Tick>, TicktraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, TicktraderError>;
}

//! Multi-symbol trade simulator.
//!
//! A `Trader` routes each tick to the signaler registered for its symbol and
//! acts on the signal. Only one position is ever open at a time, across all
//! symbols; a BUY for any symbol is ignored while a position is held.
//! Symbols are matched without regard to ASCII case.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::domain::backtest::BacktestResult;
use crate::domain::position::{Ledger, Position};
use crate::domain::signal::{Signal, TradeSignaler};
use crate::domain::tick::Tick;

pub const DEFAULT_COMMISSION: f64 = 4.95;

#[derive(Debug, Clone)]
pub struct Trader {
    signalers: HashMap<String, TradeSignaler>,
    position: Option<Position>,
    ledger: Ledger,
}

impl Trader {
    pub fn new(signalers: Vec<TradeSignaler>, initial_balance: f64, commission: f64) -> Self {
        let signalers = signalers
            .into_iter()
            .map(|s| (s.symbol().to_string(), s))
            .collect();
        Trader {
            signalers,
            position: None,
            ledger: Ledger::new(initial_balance, commission),
        }
    }

    pub fn balance(&self) -> f64 {
        self.ledger.balance
    }

    pub fn profit(&self) -> f64 {
        self.ledger.profit()
    }

    pub fn loss(&self) -> f64 {
        self.ledger.loss
    }

    pub fn trade_count(&self) -> u32 {
        self.ledger.trade_count
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn result(&self) -> BacktestResult {
        self.ledger.result()
    }

    pub fn tick(&mut self, tick: &Tick) {
        let Some(signaler) = self.signalers.get_mut(&tick.symbol.to_uppercase()) else {
            return;
        };
        let signal = signaler.tick(tick);

        if signal == Signal::Buy && self.position.is_none() {
            let balance = self.ledger.balance;
            match self.ledger.buy(&tick.symbol, balance, tick.ask_price) {
                Some(position) => {
                    signaler.set_is_trading(true);
                    info!(
                        symbol = %tick.symbol,
                        at = %tick.timestamp,
                        quantity = position.quantity,
                        cost_basis = position.cost_basis,
                        price = position.buy_price,
                        target = ?signaler.target_sell_price(),
                        "BOUGHT"
                    );
                    self.position = Some(position);
                }
                None => debug!(
                    symbol = %tick.symbol,
                    balance,
                    ask = tick.ask_price,
                    "buy skipped, balance too small for one share"
                ),
            }
        }

        let holds_symbol = self
            .position
            .as_ref()
            .is_some_and(|p| p.symbol.eq_ignore_ascii_case(&tick.symbol));
        if signal == Signal::Sell && holds_symbol {
            if let Some(position) = self.position.take() {
                let proceeds = self.ledger.sell(&position, tick.bid_price);
                signaler.set_is_trading(false);
                info!(
                    symbol = %tick.symbol,
                    at = %tick.timestamp,
                    quantity = position.quantity,
                    gross = proceeds.gross_profit,
                    net = proceeds.net_profit,
                    price = tick.bid_price,
                    "SOLD"
                );
            }
        }
    }
}

//! Open positions and the cash ledger that pays for them.

use crate::domain::backtest::BacktestResult;

/// A long position opened by a single buy. Destroyed on sell.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub quantity: i64,
    pub buy_price: f64,
    /// Total cash outlay including commission.
    pub cost_basis: f64,
}

/// Proceeds of closing a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaleProceeds {
    pub gross_profit: f64,
    pub net_profit: f64,
}

impl Position {
    /// Size a position that spends `balance` minus commission at `ask_price`.
    /// Returns `None` when not even one share is affordable.
    pub fn open_with_balance(
        symbol: &str,
        balance: f64,
        ask_price: f64,
        commission: f64,
    ) -> Option<Self> {
        if ask_price <= 0.0 {
            return None;
        }
        let quantity = ((balance - commission) / ask_price).floor();
        if quantity < 1.0 {
            return None;
        }
        let quantity = quantity as i64;
        Some(Position {
            symbol: symbol.to_string(),
            quantity,
            buy_price: ask_price,
            cost_basis: ask_price * quantity as f64 + commission,
        })
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    /// gross = bid * quantity - commission; net = gross - cost basis.
    pub fn sell_at(&self, bid_price: f64, commission: f64) -> SaleProceeds {
        let gross_profit = self.market_value(bid_price) - commission;
        SaleProceeds {
            gross_profit,
            net_profit: gross_profit - self.cost_basis,
        }
    }
}

/// Cash balance, realised loss and completed round trips.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub balance: f64,
    pub starting_balance: f64,
    /// Balance after the most recent sell.
    pub last_sell_balance: f64,
    pub loss: f64,
    pub trade_count: u32,
    pub commission: f64,
}

impl Ledger {
    pub fn new(initial_balance: f64, commission: f64) -> Self {
        Ledger {
            balance: initial_balance,
            starting_balance: initial_balance,
            last_sell_balance: initial_balance,
            loss: 0.0,
            trade_count: 0,
            commission,
        }
    }

    pub fn profit(&self) -> f64 {
        self.balance - self.starting_balance
    }

    /// Open a position spending `buying_power`, debiting its cost basis.
    pub fn buy(&mut self, symbol: &str, buying_power: f64, ask_price: f64) -> Option<Position> {
        let position = Position::open_with_balance(symbol, buying_power, ask_price, self.commission)?;
        self.balance -= position.cost_basis;
        Some(position)
    }

    /// Close `position` at `bid_price`, crediting gross proceeds.
    pub fn sell(&mut self, position: &Position, bid_price: f64) -> SaleProceeds {
        let proceeds = position.sell_at(bid_price, self.commission);
        self.balance += proceeds.gross_profit;
        if proceeds.net_profit < 0.0 {
            self.loss -= proceeds.net_profit;
        }
        self.trade_count += 1;
        self.last_sell_balance = self.balance;
        proceeds
    }

    pub fn result(&self) -> BacktestResult {
        BacktestResult {
            balance: self.balance,
            profit: self.profit(),
            loss: self.loss,
            trade_count: self.trade_count,
        }
    }
}

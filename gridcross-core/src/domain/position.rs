//! Position — one open lot, owned exclusively by the ledger.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// An open position created by a staged buy.
///
/// `nominal_buy_price` is the bar close at execution; `effective_buy_price`
/// includes slippage. Size shrinks on partial sells; the ledger removes the
/// position once the residual falls below `SIZE_EPSILON`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub opened_at: NaiveDateTime,
    pub nominal_buy_price: f64,
    pub effective_buy_price: f64,
    pub size: f64,
    pub buy_fee: f64,
}

impl Position {
    /// Market value at the given price.
    pub fn market_value(&self, price: f64) -> f64 {
        self.size * price
    }

    /// Unrealized profit in percent versus the nominal buy price.
    pub fn profit_percent(&self, price: f64) -> f64 {
        (price - self.nominal_buy_price) / self.nominal_buy_price * 100.0
    }
}

//! ClosedTrade — a realized (fully or partially) sold position.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Record of one sell against one position. Append-only.
///
/// A partial sell produces a ClosedTrade for the sold fraction while the
/// position stays open with the residual size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub opened_at: NaiveDateTime,
    pub closed_at: NaiveDateTime,

    pub buy_price: f64,
    pub effective_buy_price: f64,
    pub sell_price: f64,
    pub effective_sell_price: f64,

    pub size: f64,
    pub buy_fee: f64,
    pub sell_fee: f64,

    /// Proceeds before the sell fee, minus the sold fraction's buy cost.
    pub gross_pnl: f64,
    /// Proceeds after the sell fee, minus the sold fraction's buy cost.
    pub net_pnl: f64,

    pub holding_days: f64,
}

impl ClosedTrade {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }
}

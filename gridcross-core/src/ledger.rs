//! Position ledger — balance, open positions, and realized PnL.
//!
//! The ledger owns all mutable money state for one simulation. Buys apply
//! slippage on the fill price and a fee on notional; if notional plus fee
//! would overdraw the balance, both are reduced proportionally. Sells credit
//! net proceeds and emit a `ClosedTrade` for the sold fraction.

use chrono::NaiveDateTime;

use crate::domain::{ClosedTrade, Position};

/// Residual sizes below this are treated as fully closed.
pub const SIZE_EPSILON: f64 = 1e-8;

/// Slippage and fee rates applied to every fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub slippage: f64,
    pub fee_rate: f64,
}

/// Cash balance plus open positions for one simulation run.
#[derive(Debug, Clone)]
pub struct PositionLedger {
    balance: f64,
    positions: Vec<Position>,
    last_buy_price: Option<f64>,
}

impl PositionLedger {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            balance: initial_balance,
            positions: Vec::new(),
            last_buy_price: None,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    /// Nominal price of the most recent executed buy, if any.
    pub fn last_buy_price(&self) -> Option<f64> {
        self.last_buy_price
    }

    /// Mark-to-market equity: balance plus open position value at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.balance
            + self
                .positions
                .iter()
                .map(|p| p.market_value(price))
                .sum::<f64>()
    }

    /// Buy `notional` worth at `price`. No-op when the notional or balance is
    /// non-positive. The notional is clamped to the balance, and if notional
    /// plus fee would still overdraw, both shrink proportionally.
    pub fn buy(
        &mut self,
        notional: f64,
        price: f64,
        timestamp: NaiveDateTime,
        costs: CostModel,
    ) -> Option<&Position> {
        if notional <= 0.0 || self.balance <= 0.0 {
            return None;
        }

        let effective_price = price * (1.0 + costs.slippage);
        let mut cost_before_fee = notional.min(self.balance);
        let mut fee = cost_before_fee * costs.fee_rate;
        if cost_before_fee + fee > self.balance {
            cost_before_fee = self.balance / (1.0 + costs.fee_rate);
            fee = cost_before_fee * costs.fee_rate;
        }

        let size = cost_before_fee / effective_price;
        self.balance -= cost_before_fee + fee;

        self.positions.push(Position {
            opened_at: timestamp,
            nominal_buy_price: price,
            effective_buy_price: effective_price,
            size,
            buy_fee: fee,
        });
        self.last_buy_price = Some(price);
        self.positions.last()
    }

    /// Sell `ratio` (0..=1) of the position at `index`. Credits net proceeds
    /// to the balance and returns the realized trade. A residual size below
    /// `SIZE_EPSILON` closes the position entirely, shifting later indices
    /// down by one.
    pub fn sell(
        &mut self,
        index: usize,
        ratio: f64,
        price: f64,
        timestamp: NaiveDateTime,
        costs: CostModel,
    ) -> ClosedTrade {
        let effective_price = price * (1.0 - costs.slippage);
        let position = &mut self.positions[index];

        let sell_size = position.size * ratio;
        let proceeds = sell_size * effective_price;
        let sell_fee = proceeds * costs.fee_rate;
        let net_proceeds = proceeds - sell_fee;
        self.balance += net_proceeds;

        let buy_cost = sell_size * position.effective_buy_price;
        let gross_pnl = proceeds - buy_cost;
        let net_pnl = net_proceeds - buy_cost;
        let holding_days = (timestamp - position.opened_at).num_seconds() as f64 / 86_400.0;

        let trade = ClosedTrade {
            opened_at: position.opened_at,
            closed_at: timestamp,
            buy_price: position.nominal_buy_price,
            effective_buy_price: position.effective_buy_price,
            sell_price: price,
            effective_sell_price: effective_price,
            size: sell_size,
            buy_fee: position.buy_fee,
            sell_fee,
            gross_pnl,
            net_pnl,
            holding_days,
        };

        position.size -= sell_size;
        if position.size < SIZE_EPSILON {
            self.positions.remove(index);
        }

        trade
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    const FREE: CostModel = CostModel {
        slippage: 0.0,
        fee_rate: 0.0,
    };

    const REALISTIC: CostModel = CostModel {
        slippage: 0.0005,
        fee_rate: 0.001,
    };

    #[test]
    fn buy_records_position_and_debits_balance() {
        let mut ledger = PositionLedger::new(1000.0);
        let pos = ledger.buy(100.0, 50.0, ts(0), FREE).unwrap();
        assert!((pos.size - 2.0).abs() < 1e-12);
        assert_eq!(pos.nominal_buy_price, 50.0);
        assert!((ledger.balance() - 900.0).abs() < 1e-12);
        assert_eq!(ledger.last_buy_price(), Some(50.0));
    }

    #[test]
    fn buy_noop_on_nonpositive_notional() {
        let mut ledger = PositionLedger::new(1000.0);
        assert!(ledger.buy(0.0, 50.0, ts(0), FREE).is_none());
        assert!(ledger.buy(-10.0, 50.0, ts(0), FREE).is_none());
        assert_eq!(ledger.open_count(), 0);
        assert_eq!(ledger.balance(), 1000.0);
    }

    #[test]
    fn buy_noop_when_balance_exhausted() {
        let mut ledger = PositionLedger::new(100.0);
        ledger.buy(100.0, 50.0, ts(0), FREE).unwrap();
        assert!(ledger.buy(10.0, 50.0, ts(1), FREE).is_none());
    }

    #[test]
    fn buy_clamps_notional_to_balance() {
        let mut ledger = PositionLedger::new(100.0);
        let pos = ledger.buy(500.0, 50.0, ts(0), FREE).unwrap();
        assert!((pos.size - 2.0).abs() < 1e-12);
        assert!(ledger.balance().abs() < 1e-12);
    }

    #[test]
    fn buy_reduces_notional_and_fee_proportionally() {
        // Notional equals balance, so notional + fee would overdraw:
        // notional becomes balance / (1 + fee_rate).
        let mut ledger = PositionLedger::new(1000.0);
        let pos = ledger.buy(1000.0, 100.0, ts(0), REALISTIC).unwrap();
        let expected_notional = 1000.0 / 1.001;
        assert!((pos.buy_fee - expected_notional * 0.001).abs() < 1e-9);
        assert!((pos.size - expected_notional / (100.0 * 1.0005)).abs() < 1e-12);
        // Entire balance spent, never negative.
        assert!(ledger.balance().abs() < 1e-9);
        assert!(ledger.balance() >= -1e-9);
    }

    #[test]
    fn full_sell_closes_position_exactly() {
        let mut ledger = PositionLedger::new(1000.0);
        let size = ledger.buy(100.0, 50.0, ts(0), FREE).unwrap().size;
        let trade = ledger.sell(0, 1.0, 60.0, ts(5), FREE);
        assert_eq!(trade.size, size);
        assert_eq!(ledger.open_count(), 0);
        assert!((ledger.balance() - 1020.0).abs() < 1e-9);
        assert!((trade.net_pnl - 20.0).abs() < 1e-9);
    }

    #[test]
    fn partial_sell_leaves_residual() {
        let mut ledger = PositionLedger::new(1000.0);
        ledger.buy(100.0, 50.0, ts(0), FREE).unwrap();
        let trade = ledger.sell(0, 0.5, 60.0, ts(5), FREE);
        assert!((trade.size - 1.0).abs() < 1e-12);
        assert_eq!(ledger.open_count(), 1);
        assert!((ledger.positions()[0].size - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sell_accounts_slippage_and_fees() {
        let mut ledger = PositionLedger::new(1000.0);
        ledger.buy(100.0, 50.0, ts(0), REALISTIC).unwrap();
        let balance_before = ledger.balance();
        let trade = ledger.sell(0, 1.0, 60.0, ts(5), REALISTIC);
        assert!((trade.effective_sell_price - 60.0 * 0.9995).abs() < 1e-12);
        let proceeds = trade.size * trade.effective_sell_price;
        assert!((trade.sell_fee - proceeds * 0.001).abs() < 1e-12);
        assert!((ledger.balance() - (balance_before + proceeds - trade.sell_fee)).abs() < 1e-9);
        // Gross vs net differ by exactly the sell fee.
        assert!((trade.gross_pnl - trade.net_pnl - trade.sell_fee).abs() < 1e-9);
    }

    #[test]
    fn holding_days_from_timestamps() {
        let mut ledger = PositionLedger::new(1000.0);
        ledger.buy(100.0, 50.0, ts(0), FREE).unwrap();
        let trade = ledger.sell(0, 1.0, 50.0, ts(12), FREE);
        assert!((trade.holding_days - 0.5).abs() < 1e-12);
    }

    #[test]
    fn equity_is_balance_plus_marked_positions() {
        let mut ledger = PositionLedger::new(1000.0);
        ledger.buy(100.0, 50.0, ts(0), FREE).unwrap();
        ledger.buy(200.0, 40.0, ts(1), FREE).unwrap();
        let expected = ledger.balance()
            + ledger
                .positions()
                .iter()
                .map(|p| p.size * 55.0)
                .sum::<f64>();
        assert!((ledger.equity(55.0) - expected).abs() < 1e-9);
        // Side-effect free.
        let again = ledger.equity(55.0);
        assert!((ledger.equity(55.0) - again).abs() < 1e-12);
    }
}

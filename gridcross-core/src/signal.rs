//! Per-bar crossover, crossdown, and entry decisions.
//!
//! The evaluator borrows the three precomputed MA series and answers pure
//! questions about a bar index. It never touches money state; the engine
//! combines its answers with the ledger and planner.

use crate::config::EntryStacking;

/// Read-only view over the three MA series for one simulation run.
pub struct SignalEvaluator<'a> {
    short: &'a [f64],
    mid: &'a [f64],
    long: &'a [f64],
    stacking: EntryStacking,
}

impl<'a> SignalEvaluator<'a> {
    pub fn new(
        short: &'a [f64],
        mid: &'a [f64],
        long: &'a [f64],
        stacking: EntryStacking,
    ) -> Self {
        Self {
            short,
            mid,
            long,
            stacking,
        }
    }

    /// All three series hold usable values at `index`.
    pub fn indicators_ready(&self, index: usize) -> bool {
        !self.short[index].is_nan() && !self.mid[index].is_nan() && !self.long[index].is_nan()
    }

    /// Short MA crossed below the mid MA between `index - 1` and `index`.
    /// Requires both bars' values to be ready; false at index 0.
    pub fn is_crossdown(&self, index: usize) -> bool {
        if index == 0 {
            return false;
        }
        let (s0, s1) = (self.short[index - 1], self.short[index]);
        let (m0, m1) = (self.mid[index - 1], self.mid[index]);
        if s0.is_nan() || s1.is_nan() || m0.is_nan() || m1.is_nan() {
            return false;
        }
        s1 < m1 && s0 >= m0
    }

    /// The configured bullish MA ordering holds at `index`.
    pub fn is_stacked(&self, index: usize) -> bool {
        let (s, m, l) = (self.short[index], self.mid[index], self.long[index]);
        match self.stacking {
            EntryStacking::ShortAboveMidAboveLong => s > m && m > l,
            EntryStacking::BothAboveLong => s > l && m > l,
        }
    }

    /// Entry qualifies: bullish stacking plus a bar-over-bar price change
    /// above the threshold. Plan state, position cap, and the reentry gap
    /// are the engine's concern.
    pub fn entry_signal(&self, index: usize, price_change_pct: f64, threshold_pct: f64) -> bool {
        self.is_stacked(index) && price_change_pct > threshold_pct
    }
}

/// Reentry-gap rule: with positions open, a new entry is blocked unless the
/// price has fallen at least `gap_percent` below the last executed buy.
/// Never blocks a first entry.
pub fn reentry_blocked(
    price: f64,
    last_buy_price: Option<f64>,
    open_count: usize,
    gap_percent: f64,
) -> bool {
    if open_count == 0 {
        return false;
    }
    match last_buy_price {
        Some(last) => price > last * (1.0 - gap_percent / 100.0),
        None => false,
    }
}

//! Per-bar simulation engine.
//!
//! `run_simulation` is a pure function of (bars, combination, config): all
//! money state lives in locals, so concurrent runs over the same slice never
//! interfere. Per bar, in order: equity and baseline snapshots, accumulation
//! plan step, take-profit, crossdown, entry. Warmup bars skip only the
//! crossdown/entry evaluation. At the end every remaining position is
//! liquidated at the final close and one post-liquidation snapshot is
//! appended to the equity curve.

use serde::{Deserialize, Serialize};

use crate::config::{CrossdownPolicy, ParameterCombination, SimConfig};
use crate::domain::{Bar, ClosedTrade};
use crate::error::SimulationError;
use crate::indicators::moving_average;
use crate::ledger::{CostModel, PositionLedger};
use crate::plan::AccumulationPlanner;
use crate::signal::{reentry_blocked, SignalEvaluator};

/// Buy-and-hold comparison: a fixed quantity bought at the first close and
/// marked to market each bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineResult {
    pub size: f64,
    pub curve: Vec<f64>,
    pub final_value: f64,
    pub total_pnl: f64,
    pub max_drawdown_pct: f64,
}

/// Immutable outcome of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub initial_balance: f64,
    pub final_balance: f64,
    pub final_equity: f64,
    pub total_pnl: f64,
    pub max_drawdown_pct: f64,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<f64>,
    pub max_open_positions: usize,
    pub buy_and_hold: BaselineResult,
}

impl BacktestResult {
    pub fn pct_gain(&self) -> f64 {
        self.total_pnl / self.initial_balance * 100.0
    }
}

/// Maximum peak-to-trough decline over `curve`, as a percentage in [0, 100].
pub fn max_drawdown_pct(curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0;
    for &equity in curve {
        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let dd = (peak - equity) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Run the crossover strategy over `bars` with one parameter combination.
///
/// Fails with `InsufficientData` when the series cannot cover the longest
/// lookback plus one evaluated bar.
pub fn run_simulation(
    bars: &[Bar],
    combination: &ParameterCombination,
    config: &SimConfig,
) -> Result<BacktestResult, SimulationError> {
    let warmup = combination.warmup_bars();
    if bars.len() < 2 || bars.len() <= warmup {
        return Err(SimulationError::InsufficientData {
            required: warmup + 1,
            got: bars.len(),
        });
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let short = moving_average(&closes, combination.short, config.ma_kind);
    let mid = moving_average(&closes, combination.mid, config.ma_kind);
    let long = moving_average(&closes, combination.long, config.ma_kind);
    let signals = SignalEvaluator::new(&short, &mid, &long, config.entry_stacking);

    let costs = config.costs();
    let mut ledger = PositionLedger::new(config.initial_balance);
    let mut planner = AccumulationPlanner::new();
    let mut closed_trades: Vec<ClosedTrade> = Vec::new();
    let mut equity_curve = Vec::with_capacity(bars.len() + 1);
    let mut max_open = 0usize;

    let baseline_size = config.initial_balance / closes[0];
    let mut baseline_curve = Vec::with_capacity(bars.len());

    let reentry_gap = combination.reentry_gap_percent(config);
    let take_profit = combination.take_profit();

    for (i, bar) in bars.iter().enumerate() {
        let price = bar.close;
        baseline_curve.push(baseline_size * price);
        equity_curve.push(ledger.equity(price));

        if let Some(step_value) = planner.next_step() {
            ledger.buy(step_value, price, bar.timestamp, costs);
        }

        if let Some((tp_percent, sell_percent)) = take_profit {
            sell_take_profits(
                &mut ledger,
                &mut closed_trades,
                price,
                bar.timestamp,
                costs,
                tp_percent,
                sell_percent / 100.0,
            );
        }

        if i >= warmup && signals.indicators_ready(i) {
            if signals.is_crossdown(i) {
                planner.abort();
                apply_crossdown_policy(
                    &mut ledger,
                    &mut closed_trades,
                    price,
                    bar.timestamp,
                    costs,
                    config.crossdown_policy,
                );
            }

            // Entry is evaluated on every bar past warmup, including a
            // crossdown bar: the stacking rule can still hold after the
            // liquidation (a bounce bar), and the entry sees the post-
            // liquidation book.
            let price_change_pct = (price - closes[i - 1]) / closes[i - 1] * 100.0;
            let open_count = ledger.open_count();
            if signals.entry_signal(i, price_change_pct, config.price_change_threshold_percent)
                && !planner.is_active()
                && open_count < config.max_open_positions
                && !reentry_blocked(price, ledger.last_buy_price(), open_count, reentry_gap)
            {
                planner.open_cycle(
                    ledger.equity(price),
                    ledger.balance(),
                    open_count > 0,
                    config,
                );
            }
        }

        max_open = max_open.max(ledger.open_count());
        if ledger.open_count() == 0 {
            planner.reset_scaling();
        }
    }

    // Forced liquidation at the final close.
    let last = bars[bars.len() - 1];
    for index in (0..ledger.open_count()).rev() {
        closed_trades.push(ledger.sell(index, 1.0, last.close, last.timestamp, costs));
    }
    equity_curve.push(ledger.equity(last.close));

    let final_balance = ledger.balance();
    let final_equity = final_balance;
    let final_baseline = baseline_size * last.close;

    Ok(BacktestResult {
        initial_balance: config.initial_balance,
        final_balance,
        final_equity,
        total_pnl: final_balance - config.initial_balance,
        max_drawdown_pct: max_drawdown_pct(&equity_curve),
        closed_trades,
        equity_curve,
        max_open_positions: max_open,
        buy_and_hold: BaselineResult {
            size: baseline_size,
            final_value: final_baseline,
            total_pnl: final_baseline - config.initial_balance,
            max_drawdown_pct: max_drawdown_pct(&baseline_curve),
            curve: baseline_curve,
        },
    })
}

fn sell_take_profits(
    ledger: &mut PositionLedger,
    closed_trades: &mut Vec<ClosedTrade>,
    price: f64,
    timestamp: chrono::NaiveDateTime,
    costs: CostModel,
    tp_percent: f64,
    sell_ratio: f64,
) {
    // Reverse index scan so removals do not shift pending indices.
    for index in (0..ledger.open_count()).rev() {
        let position = &ledger.positions()[index];
        if price >= position.nominal_buy_price * (1.0 + tp_percent / 100.0) {
            closed_trades.push(ledger.sell(index, sell_ratio, price, timestamp, costs));
        }
    }
}

fn apply_crossdown_policy(
    ledger: &mut PositionLedger,
    closed_trades: &mut Vec<ClosedTrade>,
    price: f64,
    timestamp: chrono::NaiveDateTime,
    costs: CostModel,
    policy: CrossdownPolicy,
) {
    match policy {
        CrossdownPolicy::Hold => {}
        CrossdownPolicy::CloseAll => {
            for index in (0..ledger.open_count()).rev() {
                closed_trades.push(ledger.sell(index, 1.0, price, timestamp, costs));
            }
        }
        CrossdownPolicy::CloseProfitable { buffer_percent } => {
            for index in (0..ledger.open_count()).rev() {
                let profitable = ledger.positions()[index].profit_percent(price) > buffer_percent;
                if profitable {
                    closed_trades.push(ledger.sell(index, 1.0, price, timestamp, costs));
                }
            }
        }
    }
}

//! GridCross Core — the strategy simulation engine.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, positions, closed trades)
//! - Moving-average indicator engine (SMA/EMA over close prices)
//! - Position ledger (balance, slippage/fee accounting, realized PnL)
//! - Accumulation planner (staged multi-step entry state machine)
//! - Signal evaluator (crossdown, entry stacking, reentry gap, take-profit)
//! - Per-bar simulation loop producing an immutable `BacktestResult`
//!
//! Everything here is pure computation: a simulation is a function of
//! (bar slice, parameter combination, fixed config) with no ambient state,
//! which is what makes the runner's parallel fan-out safe.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod ledger;
pub mod plan;
pub mod signal;

pub use config::{
    CrossdownPolicy, EntryStacking, ParameterCombination, SecondaryParams, SimConfig,
};
pub use domain::{Bar, ClosedTrade, Position};
pub use engine::{max_drawdown_pct, run_simulation, BacktestResult, BaselineResult};
pub use error::{ConfigError, SimulationError};
pub use indicators::{moving_average, MaKind};
pub use ledger::{CostModel, PositionLedger, SIZE_EPSILON};
pub use plan::{AccumulationPlan, AccumulationPlanner};
pub use signal::{reentry_blocked, SignalEvaluator};

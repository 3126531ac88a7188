//! GridCross Runner — optimization orchestration on top of `gridcross-core`.
//!
//! This crate builds on the core engine to provide:
//! - Parameter-space generation (MA-length triples × secondary parameters)
//! - Randomized sample-window selection with a degraded-mode fallback
//! - Deterministic per-(instrument, iteration) RNG seeding
//! - Parallel optimization driver over a bounded rayon pool
//! - Result aggregation and ranking (per instrument and overall)
//! - Optimizer configuration (TOML) and CSV bar loading

pub mod aggregate;
pub mod config;
pub mod driver;
pub mod grid;
pub mod loader;
pub mod sampler;
pub mod seeds;

pub use aggregate::{
    profit_factor, rank_by_gain, rank_by_profit_factor, summarize_by_instrument,
    summarize_overall, RankedSummary,
};
pub use config::{ConfigFileError, GridSection, OptimizerConfig, SamplingSection};
pub use driver::{DriveError, GridOutcome, OptimizationDriver, TaggedResult, TaskFailure};
pub use grid::{ParamGrid, SecondaryGrid};
pub use loader::{load_bars, LoadError, LoadedSeries};
pub use sampler::{select_window, SampleError, SampleWindow};
pub use seeds::rng_for;

//! Parallel optimization driver.
//!
//! Fans one sampled window out over every parameter combination on a bounded
//! rayon pool. Workers only read the shared bar slice and return owned
//! results, so no synchronization beyond the join is needed. A failing
//! combination is captured, never propagated, so its siblings still report.

use gridcross_core::{run_simulation, BacktestResult, Bar, ParameterCombination, SimConfig, SimulationError};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::sampler::SampleWindow;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("refusing to start: parameter grid is empty")]
    EmptyGrid,

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// A successful simulation tagged with where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct TaggedResult {
    pub instrument: String,
    pub combination: ParameterCombination,
    pub window: SampleWindow,
    pub result: BacktestResult,
}

/// A failed simulation, kept beside the successes for reporting.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub instrument: String,
    pub combination: ParameterCombination,
    pub error: SimulationError,
}

/// Everything one `run_grid` call produced.
#[derive(Debug, Default)]
pub struct GridOutcome {
    pub results: Vec<TaggedResult>,
    pub failures: Vec<TaskFailure>,
}

impl GridOutcome {
    /// Fold another outcome into this one; used when accumulating over
    /// iterations and instruments.
    pub fn absorb(&mut self, other: GridOutcome) {
        self.results.extend(other.results);
        self.failures.extend(other.failures);
    }
}

/// Number of workers to use: the requested count (if any), capped so one
/// core stays free for the coordinating thread.
pub fn bounded_workers(requested: Option<usize>) -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let cap = available.saturating_sub(1).max(1);
    match requested {
        Some(n) if n >= 1 => n.min(cap),
        _ => cap,
    }
}

/// Owns the rayon pool all simulation tasks run on.
pub struct OptimizationDriver {
    pool: rayon::ThreadPool,
}

impl OptimizationDriver {
    pub fn new(max_workers: Option<usize>) -> Result<Self, DriveError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(bounded_workers(max_workers))
            .build()?;
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run every combination against one sampled window of `bars`.
    ///
    /// Completion order is non-deterministic but the output preserves the
    /// combination order of the input slice.
    pub fn run_grid(
        &self,
        instrument: &str,
        bars: &[Bar],
        window: SampleWindow,
        combinations: &[ParameterCombination],
        config: &SimConfig,
    ) -> Result<GridOutcome, DriveError> {
        if combinations.is_empty() {
            return Err(DriveError::EmptyGrid);
        }

        let slice = window.slice(bars);
        let runs: Vec<Result<TaggedResult, TaskFailure>> = self.pool.install(|| {
            combinations
                .par_iter()
                .map(|combination| {
                    run_simulation(slice, combination, config)
                        .map(|result| TaggedResult {
                            instrument: instrument.to_string(),
                            combination: combination.clone(),
                            window,
                            result,
                        })
                        .map_err(|error| TaskFailure {
                            instrument: instrument.to_string(),
                            combination: combination.clone(),
                            error,
                        })
                })
                .collect()
        });

        let mut outcome = GridOutcome::default();
        for run in runs {
            match run {
                Ok(result) => outcome.results.push(result),
                Err(failure) => outcome.failures.push(failure),
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_bound_leaves_a_core_free() {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let cap = available.saturating_sub(1).max(1);

        assert_eq!(bounded_workers(None), cap);
        assert_eq!(bounded_workers(Some(1)), 1);
        assert_eq!(bounded_workers(Some(usize::MAX)), cap);
        assert_eq!(bounded_workers(Some(0)), cap);
    }

    #[test]
    fn empty_grid_refused_before_any_work() {
        let driver = OptimizationDriver::new(Some(1)).unwrap();
        let window = SampleWindow {
            start: 0,
            end: 1,
            degraded: false,
        };
        let err = driver
            .run_grid("BTCUSDT", &[], window, &[], &SimConfig::default())
            .unwrap_err();
        assert!(matches!(err, DriveError::EmptyGrid));
    }
}

//! Core error types.
//!
//! Configuration problems are fatal before any run starts; data problems are
//! recoverable per sample/combination and captured by the driver.

use thiserror::Error;

/// Invalid configuration, rejected before the optimization loop starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unsupported moving-average kind '{0}' (expected 'sma' or 'ema')")]
    UnsupportedMaKind(String),

    #[error("moving-average length must be at least 1")]
    InvalidLength,

    #[error("initial balance must be positive, got {0}")]
    InvalidBalance(f64),

    #[error("accumulation steps must be at least 1")]
    InvalidSteps,

    #[error("{name} must be within {min}..={max}, got {value}")]
    PercentOutOfRange {
        name: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("max open positions must be at least 1")]
    InvalidPositionCap,

    #[error("configure either reentry gaps or take-profit/partial-sell lists, not both")]
    ConflictingSecondaryGrid,

    #[error("no secondary parameter list configured (reentry gaps or take-profit pairs)")]
    MissingSecondaryGrid,

    #[error("parameter grid is empty after the ordering filter")]
    EmptyGrid,
}

/// Failure of an individual simulation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("price series has {got} bars but the longest lookback needs at least {required}")]
    InsufficientData { required: usize, got: usize },
}

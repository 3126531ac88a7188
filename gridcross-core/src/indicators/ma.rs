//! Simple and exponential moving averages over close prices.
//!
//! SMA: trailing mean, NaN until `length` observations (first valid value at
//! index length-1).
//! EMA: `alpha = 2 / (length + 1)`, seeded from the first close and computed
//! recursively from bar 0. Early EMA values exist but are unreliable until
//! `length` bars have elapsed; the simulation engine gates signal evaluation
//! on that warmup index rather than on NaN.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Moving-average flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaKind {
    Sma,
    Ema,
}

impl FromStr for MaKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sma" => Ok(MaKind::Sma),
            "ema" => Ok(MaKind::Ema),
            other => Err(ConfigError::UnsupportedMaKind(other.to_string())),
        }
    }
}

impl fmt::Display for MaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaKind::Sma => write!(f, "sma"),
            MaKind::Ema => write!(f, "ema"),
        }
    }
}

/// Compute a moving average of the given kind over `closes`.
///
/// The returned series has the same length as the input. Length must be
/// validated (>= 1) before calling; `SimConfig`/grid validation guarantees it.
pub fn moving_average(closes: &[f64], length: usize, kind: MaKind) -> Vec<f64> {
    match kind {
        MaKind::Sma => sma(closes, length),
        MaKind::Ema => ema(closes, length),
    }
}

fn sma(closes: &[f64], length: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];
    if n < length {
        return result;
    }

    let mut sum: f64 = closes.iter().take(length).sum();
    result[length - 1] = sum / length as f64;

    for i in length..n {
        sum = sum - closes[i - length] + closes[i];
        result[i] = sum / length as f64;
    }

    result
}

fn ema(closes: &[f64], length: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];
    if n == 0 {
        return result;
    }

    let alpha = 2.0 / (length as f64 + 1.0);
    let mut prev = closes[0];
    result[0] = prev;
    for i in 1..n {
        let value = alpha * closes[i] + (1.0 - alpha) * prev;
        result[i] = value;
        prev = value;
    }

    result
}

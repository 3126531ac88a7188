//! Moving-average indicator engine.
//!
//! Series are `Vec<f64>` aligned to the input closes; `f64::NAN` marks
//! "not ready" values.

mod ma;

pub use ma::{moving_average, MaKind};

#[cfg(test)]
pub(crate) const DEFAULT_EPSILON: f64 = 1e-9;

#[cfg(test)]
pub(crate) fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "expected {expected}, got {actual}"
    );
}

//! Randomized sample-window selection.
//!
//! An optimization iteration does not test the whole history; it draws a
//! random contiguous window of at least `min_duration`. When the series is
//! too short for that duration after the chosen start, the selector falls
//! back to any window of at least two bars and flags it as degraded rather
//! than failing, so thin histories still produce (clearly marked) results.

use chrono::Duration;
use gridcross_core::Bar;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inclusive index range into the bar series for one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleWindow {
    pub start: usize,
    pub end: usize,
    /// Set when the minimum duration could not be met.
    pub degraded: bool,
}

#[allow(clippy::len_without_is_empty)]
impl SampleWindow {
    /// Number of bars in the window; always at least 2 since `end > start`.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn slice<'a>(&self, bars: &'a [Bar]) -> &'a [Bar] {
        &bars[self.start..=self.end]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("cannot sample a window from {got} bars (need at least 2)")]
    TooFewBars { got: usize },
}

/// Draw a random window of at least `min_duration` from `bars`.
///
/// The start index is uniform over `[0, n-2]`. The earliest index whose
/// timestamp reaches `start + min_duration` becomes the floor for a uniform
/// end index; without such an index the window degrades to any end after the
/// start.
pub fn select_window(
    bars: &[Bar],
    min_duration: Duration,
    rng: &mut StdRng,
) -> Result<SampleWindow, SampleError> {
    let n = bars.len();
    if n < 2 {
        return Err(SampleError::TooFewBars { got: n });
    }

    let start = rng.gen_range(0..=n - 2);
    let target = bars[start].timestamp + min_duration;

    // Timestamps are sorted, so the floor is a partition point.
    let floor = start + 1 + bars[start + 1..].partition_point(|b| b.timestamp < target);

    if floor <= n - 1 {
        let end = rng.gen_range(floor..=n - 1);
        Ok(SampleWindow {
            start,
            end,
            degraded: false,
        })
    } else {
        let end = rng.gen_range(start + 1..=n - 1);
        Ok(SampleWindow {
            start,
            end,
            degraded: true,
        })
    }
}

//! Parameter-space generation for the optimization grid.

use gridcross_core::{ConfigError, ParameterCombination, SecondaryParams};

/// The secondary dimension swept alongside the MA-length triples.
#[derive(Debug, Clone, PartialEq)]
pub enum SecondaryGrid {
    /// One combination per reentry-gap percentage.
    ReentryGaps(Vec<f64>),
    /// One combination per (take-profit, partial-sell) pair.
    TakeProfit {
        tp_percents: Vec<f64>,
        partial_sell_percents: Vec<f64>,
    },
}

impl SecondaryGrid {
    fn params(&self) -> Vec<SecondaryParams> {
        match self {
            SecondaryGrid::ReentryGaps(gaps) => gaps
                .iter()
                .map(|&percent| SecondaryParams::ReentryGap { percent })
                .collect(),
            SecondaryGrid::TakeProfit {
                tp_percents,
                partial_sell_percents,
            } => {
                let mut params = Vec::with_capacity(tp_percents.len() * partial_sell_percents.len());
                for &percent in tp_percents {
                    for &partial_sell_percent in partial_sell_percents {
                        params.push(SecondaryParams::TakeProfit {
                            percent,
                            partial_sell_percent,
                        });
                    }
                }
                params
            }
        }
    }
}

/// Candidate MA lengths plus the secondary parameter lists.
///
/// `combinations()` enumerates the cartesian product, keeping only strictly
/// ordered length triples. The strict ordering is the generation-time
/// guarantee the engine relies on.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    pub ma_lengths: Vec<usize>,
    pub secondary: SecondaryGrid,
}

impl ParamGrid {
    /// Reject non-positive MA lengths before any combination is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ma_lengths.iter().any(|&len| len == 0) {
            return Err(ConfigError::InvalidLength);
        }
        Ok(())
    }

    /// Enumerate all valid combinations: ordered triples `short < mid < long`
    /// crossed with every secondary parameter. An empty result is reported
    /// with a warning; the driver treats it as fatal before starting.
    pub fn combinations(&self) -> Vec<ParameterCombination> {
        let secondary_params = self.secondary.params();
        let mut combinations = Vec::new();

        for &short in &self.ma_lengths {
            for &mid in &self.ma_lengths {
                for &long in &self.ma_lengths {
                    if !(short < mid && mid < long) {
                        continue;
                    }
                    for &secondary in &secondary_params {
                        combinations.push(ParameterCombination {
                            short,
                            mid,
                            long,
                            secondary,
                        });
                    }
                }
            }
        }

        if combinations.is_empty() {
            eprintln!("warning: parameter grid is empty after the ordering filter");
        }
        combinations
    }
}

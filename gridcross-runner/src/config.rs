//! Optimizer configuration (TOML).
//!
//! One file drives a whole optimization: the grid lists, the fixed
//! simulation options, and the sampling controls. Everything except the grid
//! lists has defaults, so a minimal config is just `[grid]` with lengths and
//! one secondary list.

use std::path::{Path, PathBuf};

use gridcross_core::{ConfigError, SimConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{ParamGrid, SecondaryGrid};

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse optimizer config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// The `[grid]` section: MA lengths plus exactly one secondary list family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSection {
    pub ma_lengths: Vec<usize>,
    #[serde(default)]
    pub reentry_gaps: Vec<f64>,
    #[serde(default)]
    pub take_profit_percents: Vec<f64>,
    #[serde(default)]
    pub partial_sell_percents: Vec<f64>,
}

impl GridSection {
    /// Build the parameter grid, enforcing that exactly one secondary family
    /// is configured.
    pub fn to_grid(&self) -> Result<ParamGrid, ConfigError> {
        let has_gaps = !self.reentry_gaps.is_empty();
        let has_tp = !self.take_profit_percents.is_empty() || !self.partial_sell_percents.is_empty();

        let secondary = match (has_gaps, has_tp) {
            (true, true) => return Err(ConfigError::ConflictingSecondaryGrid),
            (true, false) => SecondaryGrid::ReentryGaps(self.reentry_gaps.clone()),
            (false, true) => {
                if self.take_profit_percents.is_empty() || self.partial_sell_percents.is_empty() {
                    return Err(ConfigError::MissingSecondaryGrid);
                }
                SecondaryGrid::TakeProfit {
                    tp_percents: self.take_profit_percents.clone(),
                    partial_sell_percents: self.partial_sell_percents.clone(),
                }
            }
            (false, false) => return Err(ConfigError::MissingSecondaryGrid),
        };

        let grid = ParamGrid {
            ma_lengths: self.ma_lengths.clone(),
            secondary,
        };
        grid.validate()?;
        Ok(grid)
    }
}

/// The `[sampling]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSection {
    /// Minimum window span in days before the selector degrades.
    pub min_days: i64,
    /// Windows with fewer rows are skipped with a warning.
    pub min_rows: usize,
    pub iterations_per_instrument: u32,
    pub seed: u64,
    pub max_workers: Option<usize>,
}

impl Default for SamplingSection {
    fn default() -> Self {
        Self {
            min_days: 365,
            min_rows: 100,
            iterations_per_instrument: 3,
            seed: 0,
            max_workers: None,
        }
    }
}

impl SamplingSection {
    pub fn min_duration(&self) -> chrono::Duration {
        chrono::Duration::days(self.min_days)
    }
}

/// Top-level optimizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub grid: GridSection,
    #[serde(default)]
    pub simulation: SimConfig,
    #[serde(default)]
    pub sampling: SamplingSection,
}

impl OptimizerConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigFileError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Validate everything and return the expanded grid.
    pub fn validate(&self) -> Result<ParamGrid, ConfigFileError> {
        self.simulation.validate()?;
        Ok(self.grid.to_grid()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcross_core::MaKind;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = OptimizerConfig::from_toml(
            r#"
            [grid]
            ma_lengths = [10, 20, 30]
            reentry_gaps = [12.0]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.simulation, SimConfig::default());
        assert_eq!(cfg.sampling.min_days, 365);
        assert_eq!(cfg.sampling.min_rows, 100);
        assert_eq!(cfg.sampling.iterations_per_instrument, 3);

        let grid = cfg.validate().unwrap();
        assert_eq!(grid.combinations().len(), 1);
    }

    #[test]
    fn full_config_parses() {
        let cfg = OptimizerConfig::from_toml(
            r#"
            [grid]
            ma_lengths = [14, 18, 22, 30]
            take_profit_percents = [5.0, 9.0]
            partial_sell_percents = [50.0, 100.0]

            [simulation]
            ma_kind = "sma"
            initial_balance = 5000.0
            accumulation_steps = 3

            [sampling]
            min_days = 180
            iterations_per_instrument = 5
            seed = 42
            max_workers = 4
            "#,
        )
        .unwrap();

        assert_eq!(cfg.simulation.ma_kind, MaKind::Sma);
        assert_eq!(cfg.simulation.initial_balance, 5000.0);
        assert_eq!(cfg.sampling.max_workers, Some(4));

        // C(4,3) = 4 triples × 4 tp pairs.
        let grid = cfg.validate().unwrap();
        assert_eq!(grid.combinations().len(), 16);
    }

    #[test]
    fn conflicting_secondary_lists_rejected() {
        let cfg = OptimizerConfig::from_toml(
            r#"
            [grid]
            ma_lengths = [10, 20, 30]
            reentry_gaps = [12.0]
            take_profit_percents = [9.0]
            partial_sell_percents = [50.0]
            "#,
        )
        .unwrap();
        assert!(matches!(
            cfg.grid.to_grid().unwrap_err(),
            ConfigError::ConflictingSecondaryGrid
        ));
    }

    #[test]
    fn missing_secondary_lists_rejected() {
        let cfg = OptimizerConfig::from_toml(
            r#"
            [grid]
            ma_lengths = [10, 20, 30]
            "#,
        )
        .unwrap();
        assert!(matches!(
            cfg.grid.to_grid().unwrap_err(),
            ConfigError::MissingSecondaryGrid
        ));

        let half = OptimizerConfig::from_toml(
            r#"
            [grid]
            ma_lengths = [10, 20, 30]
            take_profit_percents = [9.0]
            "#,
        )
        .unwrap();
        assert!(matches!(
            half.grid.to_grid().unwrap_err(),
            ConfigError::MissingSecondaryGrid
        ));
    }

    #[test]
    fn invalid_simulation_values_fail_validation() {
        let cfg = OptimizerConfig::from_toml(
            r#"
            [grid]
            ma_lengths = [10, 20, 30]
            reentry_gaps = [12.0]

            [simulation]
            initial_balance = -1.0
            "#,
        )
        .unwrap();
        assert!(cfg.validate().is_err());
    }
}

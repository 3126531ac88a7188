//! Simulation configuration and parameter combinations.
//!
//! `SimConfig` holds the fixed strategy options for a whole optimization run;
//! `ParameterCombination` holds the values swept by the grid. Both are
//! immutable for the duration of a run and passed explicitly; the engine
//! never reads ambient state, which keeps parallel runs isolated.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::indicators::MaKind;
use crate::ledger::CostModel;

/// What happens to open positions when the short MA crosses below the mid MA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrossdownPolicy {
    /// Liquidate every open position.
    CloseAll,
    /// Liquidate only positions whose unrealized profit exceeds the buffer.
    CloseProfitable { buffer_percent: f64 },
    /// Keep positions; only the accumulation plan is aborted.
    Hold,
}

/// Which MA ordering qualifies a bar for entry.
///
/// Both variants exist across deployed strategy versions; neither is
/// canonical, so the choice is configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStacking {
    /// `short > mid > long`.
    ShortAboveMidAboveLong,
    /// `short > long && mid > long` (mid may sit below short or above it).
    BothAboveLong,
}

/// Fixed strategy options, identical for every combination in a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub ma_kind: MaKind,
    pub initial_balance: f64,
    /// Percent of current equity committed per accumulation cycle.
    pub position_size_percent: f64,
    /// Number of consecutive-bar buys one cycle is split into.
    pub accumulation_steps: u32,
    /// Percent increase applied to each subsequent cycle's value while
    /// positions remain open (0 disables martingale scaling).
    pub martingale_increment_percent: f64,
    /// Minimum bar-over-bar price change (percent) required for entry.
    pub price_change_threshold_percent: f64,
    pub max_open_positions: usize,
    /// Fallback reentry gap when the grid sweeps take-profit pairs instead.
    pub reentry_gap_percent: f64,
    pub entry_stacking: EntryStacking,
    pub crossdown_policy: CrossdownPolicy,
    /// Fractional slippage per fill (0.0005 = 5 bps).
    pub slippage: f64,
    /// Fractional fee on notional (buys) or proceeds (sells).
    pub fee_rate: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ma_kind: MaKind::Ema,
            initial_balance: 1000.0,
            position_size_percent: 7.5,
            accumulation_steps: 2,
            martingale_increment_percent: 0.0,
            price_change_threshold_percent: 0.01,
            max_open_positions: 15,
            reentry_gap_percent: 12.0,
            entry_stacking: EntryStacking::BothAboveLong,
            crossdown_policy: CrossdownPolicy::CloseProfitable {
                buffer_percent: 5.0,
            },
            slippage: 0.0005,
            fee_rate: 0.001,
        }
    }
}

impl SimConfig {
    /// Validate all fixed options. Fatal before any run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_balance <= 0.0 {
            return Err(ConfigError::InvalidBalance(self.initial_balance));
        }
        if self.accumulation_steps == 0 {
            return Err(ConfigError::InvalidSteps);
        }
        if self.max_open_positions == 0 {
            return Err(ConfigError::InvalidPositionCap);
        }
        check_percent("position_size_percent", self.position_size_percent, 0.0, 100.0)?;
        check_percent("reentry_gap_percent", self.reentry_gap_percent, 0.0, 100.0)?;
        check_percent(
            "martingale_increment_percent",
            self.martingale_increment_percent,
            0.0,
            1000.0,
        )?;
        check_percent("slippage", self.slippage, 0.0, 1.0)?;
        check_percent("fee_rate", self.fee_rate, 0.0, 1.0)?;
        if let CrossdownPolicy::CloseProfitable { buffer_percent } = self.crossdown_policy {
            check_percent("profit_buffer_percent", buffer_percent, 0.0, 1000.0)?;
        }
        Ok(())
    }

    pub fn costs(&self) -> CostModel {
        CostModel {
            slippage: self.slippage,
            fee_rate: self.fee_rate,
        }
    }
}

fn check_percent(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::PercentOutOfRange {
            name,
            min,
            max,
            value,
        });
    }
    Ok(())
}

/// The swept part of a parameter combination besides the MA lengths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecondaryParams {
    /// Minimum percent drop below the last buy price before adding.
    ReentryGap { percent: f64 },
    /// Sell `partial_sell_percent` of a position once its price gain
    /// reaches `percent`.
    TakeProfit {
        percent: f64,
        partial_sell_percent: f64,
    },
}

/// One point of the optimization grid: three MA lengths plus secondary
/// parameters. The `short < mid < long` ordering is enforced at generation,
/// not re-checked during evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterCombination {
    pub short: usize,
    pub mid: usize,
    pub long: usize,
    pub secondary: SecondaryParams,
}

impl ParameterCombination {
    /// Bars to skip before signal evaluation starts.
    pub fn warmup_bars(&self) -> usize {
        self.short.max(self.mid).max(self.long)
    }

    /// Effective reentry gap: swept value if present, otherwise the fixed
    /// config fallback.
    pub fn reentry_gap_percent(&self, config: &SimConfig) -> f64 {
        match self.secondary {
            SecondaryParams::ReentryGap { percent } => percent,
            SecondaryParams::TakeProfit { .. } => config.reentry_gap_percent,
        }
    }

    /// Take-profit settings as (trigger percent, sell ratio percent), when
    /// this combination sweeps them.
    pub fn take_profit(&self) -> Option<(f64, f64)> {
        match self.secondary {
            SecondaryParams::TakeProfit {
                percent,
                partial_sell_percent,
            } => Some((percent, partial_sell_percent)),
            SecondaryParams::ReentryGap { .. } => None,
        }
    }

    /// Stable content hash identifying this combination across runs.
    pub fn combo_id(&self) -> String {
        let json =
            serde_json::to_string(self).expect("ParameterCombination serialization cannot fail");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

impl fmt::Display for ParameterCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.short, self.mid, self.long)?;
        match self.secondary {
            SecondaryParams::ReentryGap { percent } => write!(f, " gap={percent}%"),
            SecondaryParams::TakeProfit {
                percent,
                partial_sell_percent,
            } => write!(f, " tp={percent}% sell={partial_sell_percent}%"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gap_combo(short: usize, mid: usize, long: usize, gap: f64) -> ParameterCombination {
        ParameterCombination {
            short,
            mid,
            long,
            secondary: SecondaryParams::ReentryGap { percent: gap },
        }
    }

    #[test]
    fn default_config_validates() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_steps_rejected() {
        let cfg = SimConfig {
            accumulation_steps: 0,
            ..SimConfig::default()
        };
        assert_eq!(cfg.validate().unwrap_err(), ConfigError::InvalidSteps);
    }

    #[test]
    fn negative_balance_rejected() {
        let cfg = SimConfig {
            initial_balance: -5.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::InvalidBalance(_)
        ));
    }

    #[test]
    fn oversized_percent_rejected() {
        let cfg = SimConfig {
            position_size_percent: 150.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::PercentOutOfRange { name: "position_size_percent", .. }
        ));
    }

    #[test]
    fn combo_id_stable_and_distinct() {
        let a = gap_combo(14, 18, 22, 10.0);
        let b = gap_combo(14, 18, 22, 10.0);
        let c = gap_combo(14, 18, 22, 12.0);
        assert_eq!(a.combo_id(), b.combo_id());
        assert_ne!(a.combo_id(), c.combo_id());
    }

    #[test]
    fn reentry_gap_falls_back_to_config() {
        let cfg = SimConfig::default();
        let swept = gap_combo(14, 18, 22, 10.0);
        assert_eq!(swept.reentry_gap_percent(&cfg), 10.0);

        let tp = ParameterCombination {
            short: 14,
            mid: 18,
            long: 22,
            secondary: SecondaryParams::TakeProfit {
                percent: 9.0,
                partial_sell_percent: 50.0,
            },
        };
        assert_eq!(tp.reentry_gap_percent(&cfg), cfg.reentry_gap_percent);
        assert_eq!(tp.take_profit(), Some((9.0, 50.0)));
    }

    #[test]
    fn config_toml_roundtrip_via_serde() {
        let cfg = SimConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let deser: SimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, deser);
    }
}

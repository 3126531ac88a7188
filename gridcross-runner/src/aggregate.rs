//! Result aggregation and ranking.
//!
//! Summaries are always recomputed from the full result set; nothing is
//! persisted incrementally. Grouping keys go through `BTreeMap` so the
//! summary order is deterministic regardless of worker completion order.

use std::collections::BTreeMap;

use gridcross_core::ParameterCombination;
use serde::{Deserialize, Serialize};

use crate::driver::TaggedResult;

/// Aggregated performance of one combination, optionally per instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSummary {
    pub combination: ParameterCombination,
    pub instrument: Option<String>,
    pub avg_pct_gain: f64,
    pub std_dev_pct_gain: f64,
    pub run_count: usize,
    /// Mean of the runs with a defined profit factor; `None` when no run in
    /// the group has any losing trade.
    pub avg_profit_factor: Option<f64>,
}

/// Ratio of summed winning PnL to summed absolute losing PnL.
/// Undefined (never a division by zero) when there are no losses.
pub fn profit_factor(pnls: &[f64]) -> Option<f64> {
    let gains: f64 = pnls.iter().filter(|&&p| p > 0.0).sum();
    let losses: f64 = -pnls.iter().filter(|&&p| p < 0.0).sum::<f64>();
    if losses > 0.0 {
        Some(gains / losses)
    } else {
        None
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0 for fewer than two observations.
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

fn summarize_group(
    combination: ParameterCombination,
    instrument: Option<String>,
    runs: &[&TaggedResult],
) -> RankedSummary {
    let gains: Vec<f64> = runs.iter().map(|r| r.result.pct_gain()).collect();
    let factors: Vec<f64> = runs
        .iter()
        .filter_map(|r| {
            let pnls: Vec<f64> = r.result.closed_trades.iter().map(|t| t.net_pnl).collect();
            profit_factor(&pnls)
        })
        .collect();

    RankedSummary {
        combination,
        instrument,
        avg_pct_gain: mean(&gains),
        std_dev_pct_gain: std_dev(&gains),
        run_count: runs.len(),
        avg_profit_factor: if factors.is_empty() {
            None
        } else {
            Some(mean(&factors))
        },
    }
}

/// One summary per (combination, instrument) pair.
pub fn summarize_by_instrument(results: &[TaggedResult]) -> Vec<RankedSummary> {
    let mut groups: BTreeMap<(String, String), Vec<&TaggedResult>> = BTreeMap::new();
    for result in results {
        groups
            .entry((result.combination.combo_id(), result.instrument.clone()))
            .or_default()
            .push(result);
    }

    groups
        .into_values()
        .map(|runs| {
            summarize_group(
                runs[0].combination.clone(),
                Some(runs[0].instrument.clone()),
                &runs,
            )
        })
        .collect()
}

/// One summary per combination across all instruments.
pub fn summarize_overall(results: &[TaggedResult]) -> Vec<RankedSummary> {
    let mut groups: BTreeMap<String, Vec<&TaggedResult>> = BTreeMap::new();
    for result in results {
        groups
            .entry(result.combination.combo_id())
            .or_default()
            .push(result);
    }

    groups
        .into_values()
        .map(|runs| summarize_group(runs[0].combination.clone(), None, &runs))
        .collect()
}

/// Sort descending by average percent gain.
pub fn rank_by_gain(mut summaries: Vec<RankedSummary>) -> Vec<RankedSummary> {
    summaries.sort_by(|a, b| {
        b.avg_pct_gain
            .partial_cmp(&a.avg_pct_gain)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    summaries
}

/// Sort descending by average profit factor; groups without one rank last.
pub fn rank_by_profit_factor(mut summaries: Vec<RankedSummary>) -> Vec<RankedSummary> {
    summaries.sort_by(|a, b| match (a.avg_profit_factor, b.avg_profit_factor) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    summaries
}

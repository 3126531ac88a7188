//! Staged-entry accumulation plan.
//!
//! One entry signal does not buy immediately; it opens a plan that is spent
//! over the next `accumulation_steps` bars in equal remaining-value slices.
//! A crossdown aborts the plan, discarding whatever value was not yet spent.

use crate::config::SimConfig;

/// State machine for staged multi-step entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccumulationPlan {
    Idle,
    Staging { steps_left: u32, remaining_value: f64 },
}

/// Owns the plan state plus the martingale memory for one simulation run.
#[derive(Debug, Clone)]
pub struct AccumulationPlanner {
    plan: AccumulationPlan,
    /// Planned value of the last opened cycle; basis for martingale scaling
    /// while positions stay open, reset once the book is flat again.
    last_cycle_value: Option<f64>,
}

impl AccumulationPlanner {
    pub fn new() -> Self {
        Self {
            plan: AccumulationPlan::Idle,
            last_cycle_value: None,
        }
    }

    pub fn plan(&self) -> AccumulationPlan {
        self.plan
    }

    pub fn is_active(&self) -> bool {
        matches!(self.plan, AccumulationPlan::Staging { .. })
    }

    /// Open a new cycle. The planned value is `position_size_percent` of
    /// equity, clamped to the available balance; when `scale_up` is set
    /// (positions already open) the previous cycle's value is scaled by the
    /// martingale increment instead. Returns false if nothing can be planned.
    pub fn open_cycle(
        &mut self,
        equity: f64,
        balance: f64,
        scale_up: bool,
        config: &SimConfig,
    ) -> bool {
        let base = equity * config.position_size_percent / 100.0;
        let planned = match (scale_up, self.last_cycle_value) {
            (true, Some(previous)) => {
                previous * (1.0 + config.martingale_increment_percent / 100.0)
            }
            _ => base,
        };
        let value = planned.min(balance);
        if value <= 0.0 {
            return false;
        }

        self.last_cycle_value = Some(planned);
        self.plan = AccumulationPlan::Staging {
            steps_left: config.accumulation_steps,
            remaining_value: value,
        };
        true
    }

    /// Advance one bar: the notional to buy now, or `None` when idle.
    /// The final step spends the entire remaining value, so rounding never
    /// strands a residual.
    pub fn next_step(&mut self) -> Option<f64> {
        match self.plan {
            AccumulationPlan::Idle => None,
            AccumulationPlan::Staging {
                steps_left,
                remaining_value,
            } => {
                let step_value = remaining_value / steps_left as f64;
                if steps_left == 1 {
                    self.plan = AccumulationPlan::Idle;
                } else {
                    self.plan = AccumulationPlan::Staging {
                        steps_left: steps_left - 1,
                        remaining_value: remaining_value - step_value,
                    };
                }
                Some(step_value)
            }
        }
    }

    /// Abort the active plan, discarding unexecuted value. The balance is
    /// untouched since unexecuted value was never debited.
    pub fn abort(&mut self) {
        self.plan = AccumulationPlan::Idle;
    }

    /// Forget the martingale basis; called once the book is flat again.
    pub fn reset_scaling(&mut self) {
        self.last_cycle_value = None;
    }
}

impl Default for AccumulationPlanner {
    fn default() -> Self {
        Self::new()
    }
}

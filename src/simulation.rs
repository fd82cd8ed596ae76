/// The simulation tick.
///
/// One tick drains the scheduler in rounds. Each round runs every pending
/// propagation, then every pending recalculation; recalculations that
/// change a value enqueue propagations for the next round. The loop stops
/// when both queues are empty or when the configured round limit is hit,
/// in which case all pending work is dropped and the tick reports a cycle.
/// Everything is synchronous and single-threaded.

use tracing::{debug, error, warn};

use crate::circuit::Circuit;
use crate::component::{ComponentId, ComponentState};
use crate::error::{EvaluationError, KernelError, KernelResult};

// ── Reports ───────────────────────────────────────────────────────────

/// Which scheduler phase a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationPhase {
    Propagate,
    Recalculate,
}

/// A behaviour failed; the rest of the round went on without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationFailure {
    pub component: ComponentId,
    pub type_tag: String,
    pub phase: EvaluationPhase,
    pub error: EvaluationError,
}

impl EvaluationFailure {
    pub fn into_error(self) -> KernelError {
        KernelError::Evaluation {
            component: self.component,
            source: self.error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickOutcome {
    /// Nothing was pending.
    #[default]
    Idle,
    /// Both queues drained.
    Settled,
    /// The round limit was reached; the pending work was dropped.
    CycleAborted {
        discarded_propagations: usize,
        discarded_recalculations: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickReport {
    pub rounds: u32,
    pub propagations: usize,
    pub recalculations: usize,
    pub failures: Vec<EvaluationFailure>,
    pub outcome: TickOutcome,
}

impl TickReport {
    pub fn is_cycle(&self) -> bool {
        matches!(self.outcome, TickOutcome::CycleAborted { .. })
    }

    /// Turn a cycle abort into [`KernelError::CircularDependency`].
    ///
    /// Per-component failures stay in the report.
    pub fn into_result(self) -> KernelResult<TickReport> {
        if self.is_cycle() {
            return Err(KernelError::CircularDependency {
                rounds: self.rounds,
            });
        }
        Ok(self)
    }
}

// ── Driver ────────────────────────────────────────────────────────────

impl Circuit {
    /// Run the scheduler until quiescent or until the round limit.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        if self.scheduler.is_quiescent() {
            return report;
        }
        let limit = self.config.round_limit;

        loop {
            report.rounds += 1;
            if report.rounds >= limit {
                self.abort_tick(&mut report);
                break;
            }

            let propagations = self.scheduler.take_propagations();
            report.propagations += propagations.len();
            for id in propagations {
                if let Err(e) = self.propagate_component(id) {
                    self.record_failure(&mut report, id, EvaluationPhase::Propagate, e);
                }
            }

            let recalculations = self.scheduler.take_recalculations();
            report.recalculations += recalculations.len();
            for req in recalculations {
                if let Err(e) = self.recalc_component(req.component, req.force_propagate) {
                    self.record_failure(&mut report, req.component, EvaluationPhase::Recalculate, e);
                }
            }

            debug!(
                round = report.rounds,
                pending_propagations = self.scheduler.pending_propagations(),
                pending_recalculations = self.scheduler.pending_recalculations(),
                "round complete"
            );
            if self.scheduler.is_quiescent() {
                report.outcome = TickOutcome::Settled;
                break;
            }
        }
        report
    }

    /// Run `n` ticks, advancing the clock by one tick after each.
    pub fn run_ticks(&mut self, n: u32) -> Vec<TickReport> {
        let mut reports = Vec::with_capacity(n as usize);
        for _ in 0..n {
            reports.push(self.tick());
            self.advance_time(1);
        }
        reports
    }

    fn abort_tick(&mut self, report: &mut TickReport) {
        let pending = if self.config.invalidate_on_cycle {
            self.scheduler.pending_components()
        } else {
            Default::default()
        };
        let (discarded_propagations, discarded_recalculations) = self.scheduler.discard_all();
        for id in &pending {
            if let Some(comp) = self.components.get_mut(id) {
                if comp.state.takes_part() {
                    comp.state = ComponentState::Invalid;
                }
            }
        }
        warn!(
            rounds = report.rounds,
            discarded_propagations,
            discarded_recalculations,
            invalidated = pending.len(),
            "round limit reached, circular dependency assumed"
        );
        report.outcome = TickOutcome::CycleAborted {
            discarded_propagations,
            discarded_recalculations,
        };
    }

    fn record_failure(
        &self,
        report: &mut TickReport,
        component: ComponentId,
        phase: EvaluationPhase,
        err: EvaluationError,
    ) {
        let type_tag = self
            .components
            .get(&component)
            .map(|c| c.type_tag().to_string())
            .unwrap_or_default();
        error!(component = %component, type_tag = %type_tag, ?phase, error = %err, "evaluation failed");
        report.failures.push(EvaluationFailure {
            component,
            type_tag,
            phase,
            error: err,
        });
    }
}

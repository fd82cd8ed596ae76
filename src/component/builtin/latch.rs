//! `SrLatch`: the bistable part that exercises load stabilisation.

use crate::component::behavior::{Behavior, EvalContext, SavedState};
use crate::error::EvaluationError;
use crate::level::{LogicLevel, Value};
use crate::signal::ShapeDecl;

pub const SR_LATCH_TAG: &str = "sr-latch";

/// Set/reset latch with outputs `Q` and `Qbar`.
///
/// Both inputs low holds the previous state; both high is undefined.
/// The output levels are saved with the circuit so a reload comes back
/// in the same state instead of racing to an arbitrary one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SrLatch;

impl SrLatch {
    fn value(q: LogicLevel) -> Value {
        Value::Bits(vec![q, q.not()])
    }

    fn held(previous: &Value) -> LogicLevel {
        previous
            .levels()
            .first()
            .copied()
            .unwrap_or(LogicLevel::Unknown)
    }
}

impl Behavior for SrLatch {
    fn type_tag(&self) -> &str {
        SR_LATCH_TAG
    }

    fn inputs(&self) -> Vec<ShapeDecl> {
        vec![ShapeDecl::single("S"), ShapeDecl::single("R")]
    }

    fn outputs(&self) -> Vec<ShapeDecl> {
        vec![ShapeDecl::single("Q"), ShapeDecl::single("Qbar")]
    }

    fn initial_value(&self, saved: &SavedState<'_>) -> Value {
        SrLatch::value(saved.output_level(0).unwrap_or(LogicLevel::Unknown))
    }

    fn recompute(&self, ctx: &EvalContext<'_>) -> Result<Value, EvaluationError> {
        use LogicLevel::*;
        let q = match (ctx.input("S")?, ctx.input("R")?) {
            (True, False) => True,
            (False, True) => False,
            (False, False) => SrLatch::held(ctx.previous()),
            _ => Unknown,
        };
        Ok(SrLatch::value(q))
    }

    fn persists_output_levels(&self) -> bool {
        true
    }
}

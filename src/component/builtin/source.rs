//! `ConstantSource` and `Probe`: the two ends of a test circuit.

use serde_json::json;

use crate::component::behavior::{Behavior, EvalContext, SavedState};
use crate::error::EvaluationError;
use crate::level::{LogicLevel, Value};
use crate::signal::ShapeDecl;

pub const SOURCE_TAG: &str = "source";
pub const PROBE_TAG: &str = "probe";

/// A single output holding whatever it was last driven to.
///
/// Recalculation keeps the cached value, so the level only changes
/// through [`Circuit::drive`](crate::Circuit::drive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantSource {
    pub level: LogicLevel,
}

impl ConstantSource {
    pub fn new(level: LogicLevel) -> Self {
        ConstantSource { level }
    }
}

impl Behavior for ConstantSource {
    fn type_tag(&self) -> &str {
        SOURCE_TAG
    }

    fn params(&self) -> serde_json::Value {
        json!({ "level": self.level })
    }

    fn inputs(&self) -> Vec<ShapeDecl> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<ShapeDecl> {
        vec![ShapeDecl::single("out")]
    }

    fn initial_value(&self, saved: &SavedState<'_>) -> Value {
        if let Some(state) = saved.state {
            return state.clone();
        }
        Value::Level(saved.output_level(0).unwrap_or(self.level))
    }

    fn recompute(&self, ctx: &EvalContext<'_>) -> Result<Value, EvaluationError> {
        Ok(ctx.previous().clone())
    }

    fn persisted_state(&self, value: &Value) -> Option<Value> {
        Some(value.clone())
    }
}

/// A sink: caches its single input level, drives nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Probe;

impl Behavior for Probe {
    fn type_tag(&self) -> &str {
        PROBE_TAG
    }

    fn inputs(&self) -> Vec<ShapeDecl> {
        vec![ShapeDecl::single("in")]
    }

    fn outputs(&self) -> Vec<ShapeDecl> {
        Vec::new()
    }

    fn initial_value(&self, _saved: &SavedState<'_>) -> Value {
        Value::Level(LogicLevel::Unknown)
    }

    fn recompute(&self, ctx: &EvalContext<'_>) -> Result<Value, EvaluationError> {
        Ok(Value::Level(ctx.input("in")?))
    }
}

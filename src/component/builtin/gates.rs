//! Combinational gates.

use serde_json::json;

use crate::component::behavior::{Behavior, EvalContext};
use crate::error::EvaluationError;
use crate::level::{LogicLevel, Value};
use crate::signal::ShapeDecl;

pub const NOT_TAG: &str = "not";
pub const AND_TAG: &str = "and";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Inverter;

impl Behavior for Inverter {
    fn type_tag(&self) -> &str {
        NOT_TAG
    }

    fn inputs(&self) -> Vec<ShapeDecl> {
        vec![ShapeDecl::single("in")]
    }

    fn outputs(&self) -> Vec<ShapeDecl> {
        vec![ShapeDecl::single("out")]
    }

    fn recompute(&self, ctx: &EvalContext<'_>) -> Result<Value, EvaluationError> {
        Ok(Value::Level(ctx.input("in")?.not()))
    }
}

/// AND over an `in` bus of `width` bits.
///
/// Changing the width is the typical structural replacement: wires on
/// `in[0..min]` and `out` survive, the rest are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AndGate {
    pub width: usize,
}

impl AndGate {
    pub fn new(width: usize) -> Self {
        AndGate { width }
    }
}

impl Behavior for AndGate {
    fn type_tag(&self) -> &str {
        AND_TAG
    }

    fn params(&self) -> serde_json::Value {
        json!({ "bits": self.width })
    }

    fn inputs(&self) -> Vec<ShapeDecl> {
        vec![ShapeDecl::group("in", self.width)]
    }

    fn outputs(&self) -> Vec<ShapeDecl> {
        vec![ShapeDecl::single("out")]
    }

    fn recompute(&self, ctx: &EvalContext<'_>) -> Result<Value, EvaluationError> {
        let levels = ctx.group("in")?;
        let out = levels.into_iter().fold(LogicLevel::True, LogicLevel::and);
        Ok(Value::Level(out))
    }
}

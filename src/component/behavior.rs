//! `Behavior` — what a component type computes, supplied by the catalog.

use crate::error::EvaluationError;
use crate::level::{LogicLevel, Value};
use crate::registry::TerminalId;
use crate::signal::{ResolvedShape, ShapeDecl, TerminalSet};

// ── Behavior ──────────────────────────────────────────────────────────

/// Trait implemented by every concrete component type.
///
/// The kernel owns the lifecycle around it: terminal identities, the
/// value cache, scheduling and wiring. A behaviour only declares its
/// terminals and maps input levels to a value.
///
/// # Contract
///
/// Implementations **must**:
/// - Keep `recompute` pure given the context: same inputs and previous
///   value, same result.
/// - Return the same shape declarations for the lifetime of the object.
///
/// # Example
///
/// ```rust
/// use voltaic::component::{Behavior, EvalContext};
/// use voltaic::signal::ShapeDecl;
/// use voltaic::{EvaluationError, Value};
///
/// #[derive(Debug)]
/// struct Buffer;
///
/// impl Behavior for Buffer {
///     fn type_tag(&self) -> &str { "buffer" }
///     fn inputs(&self) -> Vec<ShapeDecl> { vec![ShapeDecl::single("in")] }
///     fn outputs(&self) -> Vec<ShapeDecl> { vec![ShapeDecl::single("out")] }
///     fn recompute(&self, ctx: &EvalContext<'_>) -> Result<Value, EvaluationError> {
///         Ok(Value::Level(ctx.input("in")?))
///     }
/// }
/// ```
pub trait Behavior: std::fmt::Debug {
    /// The persisted type tag.
    fn type_tag(&self) -> &str;

    /// Declared parameters, persisted next to the type tag.
    fn params(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn inputs(&self) -> Vec<ShapeDecl>;

    fn outputs(&self) -> Vec<ShapeDecl>;

    /// The value cached at construction.
    ///
    /// The default takes the saved state if any, then the saved output
    /// levels, then all-`Unknown`.
    fn initial_value(&self, saved: &SavedState<'_>) -> Value {
        saved.to_value()
    }

    fn recompute(&self, ctx: &EvalContext<'_>) -> Result<Value, EvaluationError>;

    /// Write `value` to the outputs. The default writes `value.levels()`
    /// to the flat outputs in order; sinks without outputs write nothing.
    fn propagate(&self, value: &Value, out: &mut OutputWriter<'_>) -> Result<(), EvaluationError> {
        out.set_all(&value.levels());
        Ok(())
    }

    /// Persist each output's current level as its power-on level.
    fn persists_output_levels(&self) -> bool {
        false
    }

    /// State worth saving beyond the output levels.
    fn persisted_state(&self, _value: &Value) -> Option<Value> {
        None
    }
}

// ── SavedState ────────────────────────────────────────────────────────

/// What a saved circuit remembers about a component at construction.
#[derive(Debug, Clone)]
pub struct SavedState<'a> {
    pub state: Option<&'a Value>,
    /// Power-on level of each output, in flat order.
    pub outputs: Vec<Option<LogicLevel>>,
}

impl<'a> SavedState<'a> {
    /// Nothing saved: a freshly placed component with `width` outputs.
    pub fn fresh(width: usize) -> Self {
        SavedState {
            state: None,
            outputs: vec![None; width],
        }
    }

    pub fn has_output_levels(&self) -> bool {
        self.outputs.iter().any(Option::is_some)
    }

    pub fn output_level(&self, index: usize) -> Option<LogicLevel> {
        self.outputs.get(index).copied().flatten()
    }

    pub fn to_value(&self) -> Value {
        if let Some(state) = self.state {
            return state.clone();
        }
        let levels: Vec<LogicLevel> = self
            .outputs
            .iter()
            .map(|l| l.unwrap_or(LogicLevel::Unknown))
            .collect();
        match levels.as_slice() {
            [single] => Value::Level(*single),
            _ => Value::Bits(levels),
        }
    }
}

// ── EvalContext ───────────────────────────────────────────────────────

/// Read-only view handed to [`Behavior::recompute`].
#[derive(Debug)]
pub struct EvalContext<'a> {
    inputs: &'a TerminalSet,
    levels: &'a [LogicLevel],
    previous: &'a Value,
}

impl<'a> EvalContext<'a> {
    /// `levels` must be aligned with `inputs.all()`.
    pub fn new(inputs: &'a TerminalSet, levels: &'a [LogicLevel], previous: &'a Value) -> Self {
        EvalContext {
            inputs,
            levels,
            previous,
        }
    }

    /// Observable level of the single input `name`.
    pub fn input(&self, name: &str) -> Result<LogicLevel, EvaluationError> {
        match self.inputs.shape(name) {
            Some(ResolvedShape::Single(i)) => self.level_at(*i),
            _ => Err(EvaluationError::UnknownInput(name.to_string())),
        }
    }

    /// Levels of the bus `name` (inner buses of nested groups: `name.i`).
    pub fn group(&self, name: &str) -> Result<Vec<LogicLevel>, EvaluationError> {
        let group = self
            .inputs
            .group(name)
            .ok_or_else(|| EvaluationError::UnknownInput(name.to_string()))?;
        group.members.iter().map(|t| self.level_of(*t)).collect()
    }

    /// Every input level, flattened.
    pub fn all(&self) -> &[LogicLevel] {
        self.levels
    }

    /// The value cached before this recalculation.
    pub fn previous(&self) -> &Value {
        self.previous
    }

    fn level_at(&self, index: usize) -> Result<LogicLevel, EvaluationError> {
        self.levels
            .get(index)
            .copied()
            .ok_or(EvaluationError::WidthMismatch {
                expected: self.inputs.len(),
                found: self.levels.len(),
            })
    }

    fn level_of(&self, id: TerminalId) -> Result<LogicLevel, EvaluationError> {
        let index = self
            .inputs
            .all()
            .iter()
            .position(|t| *t == id)
            .unwrap_or(usize::MAX);
        self.level_at(index)
    }
}

// ── OutputWriter ──────────────────────────────────────────────────────

/// Collects the output writes of [`Behavior::propagate`]. The kernel
/// applies them through the terminal write path afterwards.
#[derive(Debug)]
pub struct OutputWriter<'a> {
    outputs: &'a TerminalSet,
    writes: Vec<(TerminalId, LogicLevel)>,
}

impl<'a> OutputWriter<'a> {
    pub fn new(outputs: &'a TerminalSet) -> Self {
        OutputWriter {
            outputs,
            writes: Vec::new(),
        }
    }

    /// Write the `index`-th flat output.
    pub fn set(&mut self, index: usize, level: LogicLevel) -> Result<(), EvaluationError> {
        let id = self
            .outputs
            .all()
            .get(index)
            .copied()
            .ok_or(EvaluationError::WidthMismatch {
                expected: self.outputs.len(),
                found: index + 1,
            })?;
        self.writes.push((id, level));
        Ok(())
    }

    pub fn set_named(&mut self, name: &str, level: LogicLevel) -> Result<(), EvaluationError> {
        let id = self
            .outputs
            .single(name)
            .ok_or_else(|| EvaluationError::UnknownOutput(name.to_string()))?;
        self.writes.push((id, level));
        Ok(())
    }

    /// Write a whole bus; `levels` must match its width.
    pub fn set_group(&mut self, name: &str, levels: &[LogicLevel]) -> Result<(), EvaluationError> {
        let group = self
            .outputs
            .group(name)
            .ok_or_else(|| EvaluationError::UnknownOutput(name.to_string()))?;
        if group.len() != levels.len() {
            return Err(EvaluationError::WidthMismatch {
                expected: group.len(),
                found: levels.len(),
            });
        }
        self.writes
            .extend(group.members.iter().copied().zip(levels.iter().copied()));
        Ok(())
    }

    /// Write levels to the flat outputs in order; extra levels are ignored.
    pub fn set_all(&mut self, levels: &[LogicLevel]) {
        self.writes.extend(
            self.outputs
                .all()
                .iter()
                .copied()
                .zip(levels.iter().copied()),
        );
    }

    pub fn into_writes(self) -> Vec<(TerminalId, LogicLevel)> {
        self.writes
    }
}

//! Components: a value cache wrapped around a catalog behaviour.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`ComponentId`] newtype and generator |
//! | [`behavior`] | [`Behavior`] trait, [`EvalContext`], [`OutputWriter`] |
//! | [`lifecycle`] | create / restore / remove / recalc / propagate on [`Circuit`](crate::Circuit) |
//! | [`replace`] | in-place replacement with wire reattachment |
//! | [`builtin`] | reference behaviours |

pub mod behavior;
pub mod builtin;
pub mod id;
pub mod lifecycle;
pub mod replace;

pub use behavior::{Behavior, EvalContext, OutputWriter, SavedState};
pub use id::{ComponentId, ComponentIdGen};
pub use lifecycle::Restored;
pub use replace::{ReplaceOutcome, Reattachment};

use crate::level::Value;
use crate::registry::TerminalId;
use crate::signal::TerminalSet;

// ── ComponentState ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentState {
    /// Being placed interactively; already simulated.
    Spawning,
    Spawned,
    /// Removed from the circuit. Terminal.
    Dead,
    /// Caught in an unresolvable cycle; skipped by recalculation.
    Invalid,
}

impl ComponentState {
    /// Whether recalculation requests for the component are honoured.
    pub fn takes_part(self) -> bool {
        matches!(self, ComponentState::Spawning | ComponentState::Spawned)
    }
}

// ── Component ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Component {
    pub(crate) id: ComponentId,
    pub(crate) state: ComponentState,
    pub(crate) inputs: TerminalSet,
    pub(crate) outputs: TerminalSet,
    pub(crate) value: Value,
    pub(crate) behavior: Box<dyn Behavior>,
    /// Externally visible name, kept across structural replacement.
    pub(crate) reference: Option<String>,
}

impl Component {
    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn state(&self) -> ComponentState {
        self.state
    }

    pub fn type_tag(&self) -> &str {
        self.behavior.type_tag()
    }

    pub fn behavior(&self) -> &dyn Behavior {
        self.behavior.as_ref()
    }

    pub fn inputs(&self) -> &TerminalSet {
        &self.inputs
    }

    pub fn outputs(&self) -> &TerminalSet {
        &self.outputs
    }

    /// The cached value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn set_reference(&mut self, reference: Option<String>) {
        self.reference = reference;
    }

    /// Flat inputs then flat outputs.
    pub fn terminals(&self) -> impl Iterator<Item = TerminalId> + '_ {
        self.inputs.all().iter().chain(self.outputs.all()).copied()
    }
}

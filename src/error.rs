//! Structured error types for the circuit kernel.
//!
//! All fallible public APIs return `Result<T, KernelError>`. Recoverable
//! conditions that do not stop an operation (identity anomalies, failed
//! evaluations inside a tick) are reported as values in the operation's
//! report instead.

use thiserror::Error;

use crate::codec::CodecError;
use crate::component::ComponentId;
use crate::registry::TerminalId;
use crate::wire::WireId;

/// The top-level error type for the kernel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    // ── Lookup errors ─────────────────────────────────────

    #[error("component {0} not found")]
    ComponentNotFound(ComponentId),

    #[error("terminal {0} not found")]
    TerminalNotFound(TerminalId),

    #[error("wire {0} not found")]
    WireNotFound(WireId),

    // ── Structural errors ─────────────────────────────────

    #[error("terminal {0} is not an output")]
    NotAnOutput(TerminalId),

    #[error("terminal {0} is not an input")]
    NotAnInput(TerminalId),

    /// An input terminal owns at most one incoming wire.
    #[error("input {input} is already driven by wire {wire}")]
    InputAlreadyConnected { input: TerminalId, wire: WireId },

    /// Saved terminal ids do not fit the shape the behaviour declares.
    #[error("{type_tag}: expected {expected} {direction} terminals, found {found}")]
    TerminalCountMismatch {
        type_tag: String,
        direction: &'static str,
        expected: usize,
        found: usize,
    },

    // ── Identity errors ───────────────────────────────────

    /// A persisted id collided with a live one and the policy rejects it.
    #[error("terminal id {0} collides with a live terminal")]
    IdCollision(TerminalId),

    // ── Loading errors ────────────────────────────────────

    #[error("unknown component type {0:?}")]
    UnknownComponentType(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("invalid configuration: {0}")]
    Config(String),

    // ── Simulation errors ─────────────────────────────────

    /// The round limit was hit; all pending work was dropped.
    #[error("circular dependency: propagation did not settle within {rounds} rounds")]
    CircularDependency { rounds: u32 },

    #[error("component {component} failed to evaluate: {source}")]
    Evaluation {
        component: ComponentId,
        #[source]
        source: EvaluationError,
    },
}

/// Raised by a behaviour's `recompute` or `propagate`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("input {0:?} is not declared")]
    UnknownInput(String),

    #[error("output {0:?} is not declared")]
    UnknownOutput(String),

    #[error("expected {expected} levels, got {found}")]
    WidthMismatch { expected: usize, found: usize },

    #[error("{0}")]
    Failed(String),
}

/// Convenience alias for `Result<T, KernelError>`.
pub type KernelResult<T> = Result<T, KernelError>;

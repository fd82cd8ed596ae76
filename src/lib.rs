//! # Voltaic — Digital-Logic Simulation Kernel
//!
//! The simulation core of a graphical circuit editor. Components hold a
//! cached value computed from their input terminals; wires carry logic
//! levels from one output to one input; a two-phase round-based scheduler
//! drives every change to a fixed point. No async, no threads, no
//! wall-clock time: the host supplies a logical clock and calls `tick`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │              Circuit                │ ← editor-facing façade
//! │  ┌───────────────────────────────┐  │
//! │  │  PropagationScheduler          │  │ ← propagate / recalc FIFOs
//! │  └───────────────────────────────┘  │
//! │  ┌────────────┐   ┌─────────────┐   │
//! │  │ Components │ → │ Terminals   │   │ ← value cache, shapes
//! │  └────────────┘   └─────────────┘   │
//! │        ↑               │            │
//! │        │         ┌─────────────┐    │
//! │        └──────── │   Wires     │    │ ← in-flight history
//! │                  └─────────────┘    │
//! │  ┌───────────────────────────────┐  │
//! │  │  IdRegistry                   │  │ ← ids, remap sessions
//! │  └───────────────────────────────┘  │
//! │  ┌───────────────────────────────┐  │
//! │  │  LogicalTime                  │  │ ← external clock
//! │  └───────────────────────────────┘  │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use voltaic::component::builtin::{ConstantSource, Inverter};
//! use voltaic::{Circuit, LogicLevel};
//!
//! let mut circuit = Circuit::new();
//! let src = circuit.add_component(Box::new(ConstantSource::new(LogicLevel::True)));
//! let not = circuit.add_component(Box::new(Inverter));
//! let src_out = circuit.component(src).unwrap().outputs().all()[0];
//! let not_in = circuit.component(not).unwrap().inputs().all()[0];
//! let not_out = circuit.component(not).unwrap().outputs().all()[0];
//! circuit.connect(src_out, not_in).unwrap();
//!
//! circuit.tick();
//! assert_eq!(circuit.level(not_out), Ok(LogicLevel::False));
//! ```

pub mod circuit;
pub mod codec;
pub mod component;
pub mod config;
pub mod error;
pub mod level;
pub mod persist;
pub mod registry;
pub mod scheduler;
pub mod signal;
pub mod simulation;
pub mod time;
pub mod wire;

// Re-exports for convenience.
pub use circuit::Circuit;
pub use codec::{CodecError, CompactIds, IdRange, TerminalDescriptor};
pub use component::{Behavior, Component, ComponentId, ComponentState, ReplaceOutcome};
pub use config::{CollisionPolicy, KernelConfig};
pub use error::{EvaluationError, KernelError, KernelResult};
pub use level::{LogicLevel, Value};
pub use persist::{Catalog, CircuitSnapshot, ComponentDescriptor, LoadReport, WireDescriptor};
pub use registry::{IdAnomaly, IdMapping, IdRegistry, TerminalId};
pub use scheduler::PropagationScheduler;
pub use simulation::{EvaluationFailure, TickOutcome, TickReport};
pub use time::LogicalTime;
pub use wire::{InTransit, WireId};

//! Terminals: the connection points components expose to wires.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`terminal`] | [`Terminal`], [`TerminalDirection`], [`TerminalLabel`] |
//! | [`shape`] | shape declarations, [`BusGroup`], [`TerminalSet`] |
//! | [`write`] | the value write path on [`Circuit`](crate::Circuit) |

pub mod shape;
pub mod terminal;
pub mod write;

pub use shape::{flat_labels, flat_width, BusGroup, ResolvedShape, Shape, ShapeDecl, TerminalSet};
pub use terminal::{Terminal, TerminalDirection, TerminalLabel};

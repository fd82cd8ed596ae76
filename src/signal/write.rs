//! The terminal write path.
//!
//! Every level change in the circuit goes through here: an input change
//! schedules its owner for recalculation, an output change is pushed into
//! each outgoing wire, which writes the wire's end input in turn.

use tracing::trace;

use crate::circuit::Circuit;
use crate::error::{KernelError, KernelResult};
use crate::level::LogicLevel;
use crate::registry::TerminalId;

use super::terminal::TerminalDirection;

impl Circuit {
    /// Write the intrinsic level of a terminal.
    ///
    /// A write of the current level does nothing. Otherwise followers are
    /// notified only if the observable level changed, i.e. the write was
    /// not masked by a force override.
    pub fn set_level(&mut self, id: TerminalId, level: LogicLevel) -> KernelResult<()> {
        if !self.registry.is_live(id) {
            return Err(KernelError::TerminalNotFound(id));
        }
        self.write_terminal(id, level);
        Ok(())
    }

    /// Set or clear the force override of an output terminal.
    ///
    /// The owner is flagged for redraw whether or not the observable
    /// level changed.
    pub fn force_output(&mut self, id: TerminalId, force: Option<LogicLevel>) -> KernelResult<()> {
        let terminal = self
            .registry
            .get_mut(id)
            .ok_or(KernelError::TerminalNotFound(id))?;
        if !terminal.is_output() {
            return Err(KernelError::NotAnOutput(id));
        }
        let owner = terminal.owner();
        let changed = terminal.set_force(force);
        self.redraw.insert(owner);
        if let Some(level) = changed {
            self.notify_followers(id, level);
        }
        Ok(())
    }

    pub(crate) fn write_terminal(&mut self, id: TerminalId, level: LogicLevel) {
        let Some(terminal) = self.registry.get_mut(id) else {
            return;
        };
        if let Some(observable) = terminal.set_intrinsic(level) {
            trace!(terminal = %id, level = %observable, "level changed");
            self.notify_followers(id, observable);
        }
    }

    /// Re-read the level an input should hold from its incoming wire, or
    /// `False` when it has none.
    pub(crate) fn sample_incoming(&mut self, input: TerminalId) {
        let Some(terminal) = self.registry.get(input) else {
            return;
        };
        let level = terminal
            .incoming()
            .and_then(|w| self.wires.get(&w))
            .map_or(LogicLevel::False, |w| self.observable(w.start()));
        self.write_terminal(input, level);
    }

    fn notify_followers(&mut self, id: TerminalId, level: LogicLevel) {
        let Some(terminal) = self.registry.get(id) else {
            return;
        };
        match terminal.direction() {
            TerminalDirection::Input => {
                let owner = terminal.owner();
                self.scheduler.enqueue_recalc(owner, false);
            }
            TerminalDirection::Output => {
                let outgoing = terminal.outgoing().to_vec();
                for wire in outgoing {
                    self.propagate_wire(wire, level);
                }
            }
        }
    }
}

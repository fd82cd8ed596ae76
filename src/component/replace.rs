//! Structural replacement: swap a component for a differently
//! parameterised one and carry its wiring across by terminal label.

use tracing::debug;

use crate::circuit::Circuit;
use crate::error::{KernelError, KernelResult};
use crate::registry::TerminalId;
use crate::signal::{TerminalLabel, TerminalSet};
use crate::wire::WireId;

use super::behavior::Behavior;
use super::id::ComponentId;

/// A wire moved onto the replacement component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reattachment {
    pub label: TerminalLabel,
    pub wire: WireId,
    /// The terminal on the new component the wire now attaches to.
    pub terminal: TerminalId,
}

/// Outcome of [`Circuit::replace_component`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub component: ComponentId,
    pub reattached: Vec<Reattachment>,
    /// Wires whose endpoint label has no counterpart on the new component.
    pub dropped: Vec<WireId>,
}

impl Circuit {
    /// Replace `old` with a new component built from `behavior`.
    ///
    /// Wires on terminals whose label (`name`, or group and index) exists
    /// on the new component are moved to it; the rest are disconnected.
    /// The reference name and lifecycle state carry over, then the old
    /// component is removed.
    pub fn replace_component(
        &mut self,
        old: ComponentId,
        behavior: Box<dyn Behavior>,
    ) -> KernelResult<ReplaceOutcome> {
        let (old_inputs, old_outputs, state, reference) = {
            let comp = self
                .components
                .get(&old)
                .ok_or(KernelError::ComponentNotFound(old))?;
            (
                comp.inputs.clone(),
                comp.outputs.clone(),
                comp.state,
                comp.reference.clone(),
            )
        };

        let new = self.add_component(behavior);
        let (new_inputs, new_outputs) = match self.components.get(&new) {
            Some(c) => (c.inputs.clone(), c.outputs.clone()),
            None => return Err(KernelError::ComponentNotFound(new)),
        };

        let mut outcome = ReplaceOutcome {
            component: new,
            reattached: Vec::new(),
            dropped: Vec::new(),
        };

        for (terminal, label) in old_inputs.iter() {
            let Some(wire) = self.registry.get(terminal).and_then(|t| t.incoming()) else {
                continue;
            };
            self.move_wire(wire, label, &new_inputs, &mut outcome, Circuit::set_wire_end)?;
        }
        for (terminal, label) in old_outputs.iter() {
            let outgoing = self
                .registry
                .get(terminal)
                .map(|t| t.outgoing().to_vec())
                .unwrap_or_default();
            for wire in outgoing {
                self.move_wire(wire, label, &new_outputs, &mut outcome, Circuit::set_wire_start)?;
            }
        }

        if let Some(comp) = self.components.get_mut(&new) {
            comp.state = state;
            comp.reference = reference;
        }
        self.remove_component(old)?;
        debug!(
            old = %old,
            new = %new,
            reattached = outcome.reattached.len(),
            dropped = outcome.dropped.len(),
            "component replaced"
        );
        Ok(outcome)
    }

    fn move_wire(
        &mut self,
        wire: WireId,
        label: &TerminalLabel,
        targets: &TerminalSet,
        outcome: &mut ReplaceOutcome,
        reattach: fn(&mut Circuit, WireId, TerminalId) -> KernelResult<()>,
    ) -> KernelResult<()> {
        match targets.find_label(label) {
            Some(terminal) => {
                reattach(self, wire, terminal)?;
                outcome.reattached.push(Reattachment {
                    label: label.clone(),
                    wire,
                    terminal,
                });
            }
            None => {
                self.disconnect(wire)?;
                outcome.dropped.push(wire);
            }
        }
        Ok(())
    }
}

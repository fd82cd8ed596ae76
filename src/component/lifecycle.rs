//! Component lifecycle on the circuit: create, restore, remove, and the
//! recalc / propagate pair the scheduler drives.

use tracing::{debug, warn};

use crate::circuit::Circuit;
use crate::codec::{self, CompactIds, TerminalDescriptor};
use crate::config::CollisionPolicy;
use crate::error::{EvaluationError, KernelError, KernelResult};
use crate::level::{LogicLevel, Value};
use crate::persist::ComponentDescriptor;
use crate::registry::{IdAnomaly, IdMapping, IdRegistry, Resolved};
use crate::signal::{flat_labels, flat_width, ShapeDecl, Terminal, TerminalDirection, TerminalSet};

use super::behavior::{Behavior, EvalContext, OutputWriter, SavedState};
use super::id::ComponentId;
use super::{Component, ComponentState};

/// Outcome of [`Circuit::restore_component`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub id: ComponentId,
    pub anomalies: Vec<IdAnomaly>,
    /// Persisted ids that collided and were given fresh ids.
    pub reassigned: IdMapping,
}

/// Terminal placement decided before the component exists.
struct Placement {
    inputs: Vec<TerminalDescriptor>,
    outputs: Vec<TerminalDescriptor>,
}

impl Circuit {
    // ── Construction ──────────────────────────────────────────────

    /// Place a new component with fresh terminal ids.
    ///
    /// It starts in `Spawning` and is recalculated with forced propagation
    /// on the next tick.
    pub fn add_component(&mut self, behavior: Box<dyn Behavior>) -> ComponentId {
        let in_decls = behavior.inputs();
        let out_decls = behavior.outputs();
        let placement = Placement {
            inputs: fresh_terminals(flat_width(&in_decls), &mut self.registry),
            outputs: fresh_terminals(flat_width(&out_decls), &mut self.registry),
        };
        let (id, _) = self.install(
            behavior,
            &in_decls,
            &out_decls,
            placement,
            ComponentState::Spawning,
            None,
            None,
        );
        id
    }

    /// Rebuild a component from saved data. It starts in `Spawned`.
    ///
    /// If any output carries a saved power-on level the component is not
    /// recalculated: its cached value is taken from the saved data and
    /// only propagated, so bistable parts come back in the state they
    /// were saved in.
    pub fn restore_component(
        &mut self,
        desc: &ComponentDescriptor,
        behavior: Box<dyn Behavior>,
    ) -> KernelResult<Restored> {
        let in_decls = behavior.inputs();
        let out_decls = behavior.outputs();
        // Counted before expanding: a saved range may be arbitrarily wide.
        let tag = behavior.type_tag();
        check_count(tag, "input", &in_decls, saved_count(desc.inputs.as_ref()))?;
        check_count(tag, "output", &out_decls, saved_count(desc.outputs.as_ref()))?;
        let saved_inputs = desc.inputs.as_ref().map(codec::expand).unwrap_or_default();
        let saved_outputs = desc.outputs.as_ref().map(codec::expand).unwrap_or_default();

        let mut anomalies = Vec::new();
        let mut reassigned = IdMapping::new();
        let inputs = self.reserve_persisted(&saved_inputs, &mut anomalies, &mut reassigned)?;
        let outputs = match self.reserve_persisted(&saved_outputs, &mut anomalies, &mut reassigned) {
            Ok(outputs) => outputs,
            Err(e) => {
                for t in &inputs {
                    self.registry.release(t.id);
                }
                return Err(e);
            }
        };

        let (id, install_anomalies) = self.install(
            behavior,
            &in_decls,
            &out_decls,
            Placement { inputs, outputs },
            ComponentState::Spawned,
            desc.state.as_ref(),
            desc.reference.clone(),
        );
        anomalies.extend(install_anomalies);
        Ok(Restored {
            id,
            anomalies,
            reassigned,
        })
    }

    /// Reserve persisted ids, applying the collision policy.
    fn reserve_persisted(
        &mut self,
        saved: &[TerminalDescriptor],
        anomalies: &mut Vec<IdAnomaly>,
        reassigned: &mut IdMapping,
    ) -> KernelResult<Vec<TerminalDescriptor>> {
        let decoded = codec::resolve_all(saved, &mut self.registry);
        if self.config.collision_policy == CollisionPolicy::Reject {
            if let Some(collided) = decoded.iter().find(|d| d.resolved.is_collision()) {
                let id = collided.id();
                for d in decoded.iter().filter(|d| !d.resolved.is_collision()) {
                    self.registry.release(d.id());
                }
                return Err(KernelError::IdCollision(id));
            }
        }
        let mut placed = Vec::with_capacity(decoded.len());
        for d in decoded {
            let id = match d.resolved {
                Resolved::Collision(source) => {
                    let fresh = self.registry.allocate();
                    warn!(source = %source, fresh = %fresh, "colliding terminal id reassigned");
                    anomalies.push(IdAnomaly::Collision(source));
                    reassigned.insert(source, fresh);
                    fresh
                }
                other => other.id(),
            };
            placed.push(TerminalDescriptor {
                id,
                force: d.force,
                initial_value: d.initial_value,
            });
        }
        Ok(placed)
    }

    #[allow(clippy::too_many_arguments)]
    fn install(
        &mut self,
        behavior: Box<dyn Behavior>,
        in_decls: &[ShapeDecl],
        out_decls: &[ShapeDecl],
        placement: Placement,
        state: ComponentState,
        saved_state: Option<&Value>,
        reference: Option<String>,
    ) -> (ComponentId, Vec<IdAnomaly>) {
        let id = self.component_ids.next_id();
        let mut anomalies = Vec::new();

        let mut register = |placed: &[TerminalDescriptor],
                            decls: &[ShapeDecl],
                            direction: TerminalDirection,
                            circuit: &mut Circuit| {
            for (p, label) in placed.iter().zip(flat_labels(decls)) {
                let terminal =
                    Terminal::new(p.id, direction, id, label).with_saved(p.force, p.initial_value);
                if let Some(a) = circuit.registry.register(terminal) {
                    anomalies.push(a);
                }
            }
            TerminalSet::resolve(direction, decls, placed.iter().map(|p| p.id).collect())
        };
        let inputs = register(&placement.inputs, in_decls, TerminalDirection::Input, &mut *self);
        let outputs = register(&placement.outputs, out_decls, TerminalDirection::Output, &mut *self);

        let saved = SavedState {
            state: saved_state,
            outputs: placement.outputs.iter().map(|p| p.initial_value).collect(),
        };
        let value = behavior.initial_value(&saved);
        let stabilize = saved.has_output_levels();

        debug!(
            component = %id,
            type_tag = behavior.type_tag(),
            inputs = inputs.len(),
            outputs = outputs.len(),
            stabilize,
            "component installed"
        );
        self.components.insert(
            id,
            Component {
                id,
                state,
                inputs,
                outputs,
                value,
                behavior,
                reference,
            },
        );
        if stabilize {
            self.scheduler.enqueue_propagate(id);
        } else {
            self.scheduler.enqueue_recalc(id, true);
        }
        (id, anomalies)
    }

    // ── State transitions ─────────────────────────────────────────

    /// Finish interactive placement: `Spawning → Spawned`.
    pub fn commit_component(&mut self, id: ComponentId) -> KernelResult<()> {
        let comp = self
            .components
            .get_mut(&id)
            .ok_or(KernelError::ComponentNotFound(id))?;
        if comp.state == ComponentState::Spawning {
            comp.state = ComponentState::Spawned;
        }
        Ok(())
    }

    /// Bring an `Invalid` component back and recalculate it.
    pub fn revalidate(&mut self, id: ComponentId) -> KernelResult<()> {
        let comp = self
            .components
            .get_mut(&id)
            .ok_or(KernelError::ComponentNotFound(id))?;
        if comp.state == ComponentState::Invalid {
            comp.state = ComponentState::Spawned;
            self.scheduler.enqueue_recalc(id, true);
        }
        Ok(())
    }

    pub fn set_reference(&mut self, id: ComponentId, reference: Option<String>) -> KernelResult<()> {
        let comp = self
            .components
            .get_mut(&id)
            .ok_or(KernelError::ComponentNotFound(id))?;
        comp.set_reference(reference);
        Ok(())
    }

    /// Delete a component: detach every wire, release its terminal ids.
    ///
    /// Returns the component in the `Dead` state.
    pub fn remove_component(&mut self, id: ComponentId) -> KernelResult<Component> {
        let mut comp = self
            .components
            .remove(&id)
            .ok_or(KernelError::ComponentNotFound(id))?;
        let terminals: Vec<_> = comp.terminals().collect();
        for t in terminals {
            let wires = self.registry.get(t).map(|t| t.wires()).unwrap_or_default();
            for wire in wires {
                // The wire is attached to a live terminal, so it exists.
                let _ = self.disconnect(wire);
            }
            self.registry.unregister(t);
        }
        comp.state = ComponentState::Dead;
        self.redraw.remove(&id);
        debug!(component = %id, "component removed");
        Ok(comp)
    }

    /// Overwrite a component's cached value from outside and propagate it.
    ///
    /// This is how the editor toggles an input component.
    pub fn drive(&mut self, id: ComponentId, value: Value) -> KernelResult<()> {
        let comp = self
            .components
            .get_mut(&id)
            .ok_or(KernelError::ComponentNotFound(id))?;
        comp.value = value;
        self.scheduler.enqueue_propagate(id);
        Ok(())
    }

    // ── Scheduler callbacks ───────────────────────────────────────

    /// Recompute a component's value and schedule a propagate if it
    /// changed or `force_propagate` is set.
    pub(crate) fn recalc_component(
        &mut self,
        id: ComponentId,
        force_propagate: bool,
    ) -> Result<(), EvaluationError> {
        let Some(comp) = self.components.get(&id) else {
            return Ok(());
        };
        if !comp.state.takes_part() {
            return Ok(());
        }
        let levels: Vec<LogicLevel> = comp
            .inputs
            .all()
            .iter()
            .map(|t| self.observable(*t))
            .collect();
        let ctx = EvalContext::new(&comp.inputs, &levels, &comp.value);
        let value = comp.behavior.recompute(&ctx)?;

        if force_propagate || value != comp.value {
            if let Some(comp) = self.components.get_mut(&id) {
                comp.value = value;
            }
            self.scheduler.enqueue_propagate(id);
        }
        Ok(())
    }

    /// Write a component's cached value to its outputs.
    pub(crate) fn propagate_component(&mut self, id: ComponentId) -> Result<(), EvaluationError> {
        let Some(comp) = self.components.get(&id) else {
            return Ok(());
        };
        let mut out = OutputWriter::new(&comp.outputs);
        comp.behavior.propagate(&comp.value, &mut out)?;
        for (terminal, level) in out.into_writes() {
            self.write_terminal(terminal, level);
        }
        Ok(())
    }
}

fn fresh_terminals(n: usize, registry: &mut IdRegistry) -> Vec<TerminalDescriptor> {
    (0..n)
        .map(|_| TerminalDescriptor::bare(registry.allocate()))
        .collect()
}

fn saved_count(saved: Option<&CompactIds>) -> usize {
    saved.map_or(0, CompactIds::terminal_count)
}

fn check_count(
    type_tag: &str,
    direction: &'static str,
    decls: &[ShapeDecl],
    found: usize,
) -> KernelResult<()> {
    let expected = flat_width(decls);
    if expected != found {
        return Err(KernelError::TerminalCountMismatch {
            type_tag: type_tag.to_string(),
            direction,
            expected,
            found,
        });
    }
    Ok(())
}

//! The circuit: one self-contained simulation instance.
//!
//! A `Circuit` owns its identifier registry (and through it every live
//! terminal), its wires, its components, its scheduler, its logical clock
//! and its configuration. Nothing is shared between circuits, so any
//! number of them can live side by side.
//!
//! The operations are spread over the modules that own each concern:
//! the terminal write path in [`signal::write`](crate::signal), wiring in
//! [`wire`](crate::wire), the component lifecycle in
//! [`component`](crate::component), the tick in
//! [`simulation`](crate::simulation) and saving/loading in
//! [`persist`](crate::persist).

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::component::{Component, ComponentId, ComponentIdGen};
use crate::config::KernelConfig;
use crate::error::{KernelError, KernelResult};
use crate::level::LogicLevel;
use crate::registry::{IdMapping, IdRegistry, Recording, TerminalId};
use crate::scheduler::PropagationScheduler;
use crate::signal::Terminal;
use crate::time::LogicalTime;
use crate::wire::{Wire, WireId};

#[derive(Debug)]
pub struct Circuit {
    pub(crate) registry: IdRegistry,
    pub(crate) wires: BTreeMap<WireId, Wire>,
    pub(crate) components: BTreeMap<ComponentId, Component>,
    pub(crate) scheduler: PropagationScheduler,
    pub(crate) now: LogicalTime,
    pub(crate) config: KernelConfig,
    pub(crate) component_ids: ComponentIdGen,
    pub(crate) next_wire: u64,
    /// Components whose look changed outside a tick (forced outputs).
    pub(crate) redraw: BTreeSet<ComponentId>,
}

impl Circuit {
    /// An empty circuit with the default configuration.
    pub fn new() -> Self {
        Circuit::build(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> KernelResult<Self> {
        config.validate()?;
        Ok(Circuit::build(config))
    }

    fn build(config: KernelConfig) -> Self {
        Circuit {
            registry: IdRegistry::new(),
            wires: BTreeMap::new(),
            components: BTreeMap::new(),
            scheduler: PropagationScheduler::new(),
            now: LogicalTime::ZERO,
            config,
            component_ids: ComponentIdGen::new(),
            next_wire: 0,
            redraw: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    // ── Clock ─────────────────────────────────────────────────────

    #[inline]
    pub fn now(&self) -> LogicalTime {
        self.now
    }

    /// Move the clock to `t`. The clock never goes backward; an earlier
    /// time is ignored.
    pub fn set_time(&mut self, t: LogicalTime) {
        if t < self.now {
            warn!(now = %self.now, requested = %t, "ignoring backward clock move");
            return;
        }
        self.now = t;
    }

    pub fn advance_time(&mut self, delta: u64) {
        self.now = self.now.plus(delta);
    }

    // ── Queries ───────────────────────────────────────────────────

    pub fn registry(&self) -> &IdRegistry {
        &self.registry
    }

    pub fn terminal(&self, id: TerminalId) -> Option<&Terminal> {
        self.registry.get(id)
    }

    /// Observable level of a terminal.
    pub fn level(&self, id: TerminalId) -> KernelResult<LogicLevel> {
        self.registry
            .get(id)
            .map(Terminal::observable)
            .ok_or(KernelError::TerminalNotFound(id))
    }

    /// Observable level, `False` for an unknown terminal.
    pub(crate) fn observable(&self, id: TerminalId) -> LogicLevel {
        self.registry
            .get(id)
            .map_or(LogicLevel::False, Terminal::observable)
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    /// Live components in creation order.
    pub fn components(&self) -> impl Iterator<Item = &Component> + '_ {
        self.components.values()
    }

    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(&id)
    }

    pub fn wires(&self) -> impl Iterator<Item = &Wire> + '_ {
        self.wires.values()
    }

    pub fn scheduler(&self) -> &PropagationScheduler {
        &self.scheduler
    }

    #[inline]
    pub fn is_quiescent(&self) -> bool {
        self.scheduler.is_quiescent()
    }

    /// Drain the components flagged for redraw since the last call.
    pub fn take_redraw_requests(&mut self) -> Vec<ComponentId> {
        std::mem::take(&mut self.redraw).into_iter().collect()
    }

    // ── Identity ──────────────────────────────────────────────────

    /// Run `op` inside a remap session: persisted ids that are already
    /// taken get fresh ids, and the translations are returned.
    pub fn record_mapping<R>(&mut self, op: impl FnOnce(&mut Circuit) -> R) -> Recording<R> {
        let (outer, anomaly) = self.registry.open_session();
        let output = op(self);
        let mapping = self.registry.close_session(outer);
        Recording {
            output,
            mapping,
            anomaly,
        }
    }

    /// Look up a live terminal by a possibly persisted id.
    pub fn resolve(&self, id: TerminalId, mapping: Option<&IdMapping>) -> Option<&Terminal> {
        self.registry.resolve(id, mapping)
    }

    /// Drop everything: components, wires, pending work and every id.
    ///
    /// The clock and configuration are kept.
    pub fn clear(&mut self) {
        self.components.clear();
        self.wires.clear();
        self.scheduler.discard_all();
        self.registry.reset_all();
        self.redraw.clear();
        debug!("circuit cleared");
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

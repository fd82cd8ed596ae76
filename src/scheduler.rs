/// Propagation work queues.
///
/// Two plain FIFOs: components whose cached value must be written to
/// their outputs, and components that must recompute their value. The
/// tick driver in [`crate::simulation`] drains them round by round.
/// Enqueuing the same component twice before it is drained is legal and
/// runs it twice.

use std::collections::{BTreeSet, VecDeque};

use crate::component::ComponentId;

/// One recalculation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecalcRequest {
    pub component: ComponentId,
    /// Propagate even if the recomputed value equals the cached one.
    pub force_propagate: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PropagationScheduler {
    propagate_queue: VecDeque<ComponentId>,
    recalc_queue: VecDeque<RecalcRequest>,
}

impl PropagationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_propagate(&mut self, component: ComponentId) {
        self.propagate_queue.push_back(component);
    }

    pub fn enqueue_recalc(&mut self, component: ComponentId, force_propagate: bool) {
        self.recalc_queue.push_back(RecalcRequest {
            component,
            force_propagate,
        });
    }

    /// Snapshot and clear the propagate queue.
    pub fn take_propagations(&mut self) -> Vec<ComponentId> {
        self.propagate_queue.drain(..).collect()
    }

    /// Snapshot and clear the recalc queue.
    pub fn take_recalculations(&mut self) -> Vec<RecalcRequest> {
        self.recalc_queue.drain(..).collect()
    }

    /// Both queues are empty.
    pub fn is_quiescent(&self) -> bool {
        self.propagate_queue.is_empty() && self.recalc_queue.is_empty()
    }

    pub fn pending_propagations(&self) -> usize {
        self.propagate_queue.len()
    }

    pub fn pending_recalculations(&self) -> usize {
        self.recalc_queue.len()
    }

    /// Every component with pending work, in id order.
    pub fn pending_components(&self) -> BTreeSet<ComponentId> {
        self.propagate_queue
            .iter()
            .copied()
            .chain(self.recalc_queue.iter().map(|r| r.component))
            .collect()
    }

    /// Drop all pending work. Returns `(propagations, recalculations)`
    /// discarded.
    pub fn discard_all(&mut self) -> (usize, usize) {
        let dropped = (self.propagate_queue.len(), self.recalc_queue.len());
        self.propagate_queue.clear();
        self.recalc_queue.clear();
        dropped
    }
}

//! Terminal identity registry.
//!
//! Hands out terminal ids, keeps every live terminal addressable by its
//! id, and remaps persisted ids while a structural load is being
//! recorded so that one saved template can be stamped out many times
//! without two live terminals ever sharing an id.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::signal::Terminal;

// ── TerminalId ────────────────────────────────────────────────────────

/// The persisted identity of a terminal.
///
/// Unique among live terminals of one circuit; recycled only after the
/// terminal is unregistered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerminalId(u32);

impl TerminalId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        TerminalId(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TerminalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── IdMapping ─────────────────────────────────────────────────────────

/// Persisted id → live id translations recorded during one load.
///
/// Ids that were free at load time are kept unchanged and therefore do
/// not appear here; lookups fall back to the identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMapping {
    entries: BTreeMap<TerminalId, TerminalId>,
}

impl IdMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: TerminalId, live: TerminalId) {
        self.entries.insert(source, live);
    }

    /// Translate `source`, defaulting to the identity.
    pub fn translate(&self, source: TerminalId) -> TerminalId {
        self.entries.get(&source).copied().unwrap_or(source)
    }

    pub fn get(&self, source: TerminalId) -> Option<TerminalId> {
        self.entries.get(&source).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TerminalId, TerminalId)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }
}

// ── Resolution outcomes ───────────────────────────────────────────────

/// Result of [`IdRegistry::resolve_or_remap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    /// The persisted id was free and is now reserved unchanged.
    Reserved(TerminalId),
    /// The persisted id was taken; a fresh id was reserved and recorded.
    Remapped { source: TerminalId, id: TerminalId },
    /// The persisted id was taken and no session was recording. The id is
    /// returned unchanged; the caller decides what to do with it.
    Collision(TerminalId),
}

impl Resolved {
    pub fn id(self) -> TerminalId {
        match self {
            Resolved::Reserved(id) | Resolved::Collision(id) => id,
            Resolved::Remapped { id, .. } => id,
        }
    }

    pub fn is_collision(self) -> bool {
        matches!(self, Resolved::Collision(_))
    }
}

/// A non-fatal identity problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdAnomaly {
    /// A persisted id was already live while no remap session was open.
    Collision(TerminalId),
    /// A terminal was registered under an id nobody reserved.
    Unreserved(TerminalId),
    /// A live terminal was displaced from its slot by another one.
    Displaced(TerminalId),
    /// A remap session was opened while another one was recording.
    NestedSession,
}

impl std::fmt::Display for IdAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdAnomaly::Collision(id) => write!(f, "id {} collides outside a remap session", id),
            IdAnomaly::Unreserved(id) => write!(f, "id {} registered without reservation", id),
            IdAnomaly::Displaced(id) => write!(f, "live terminal {} displaced", id),
            IdAnomaly::NestedSession => write!(f, "remap session opened inside another"),
        }
    }
}

/// Output of [`IdRegistry::record_mapping`].
#[derive(Debug)]
pub struct Recording<R> {
    pub output: R,
    pub mapping: IdMapping,
    /// Set when the session was opened inside another one.
    pub anomaly: Option<IdAnomaly>,
}

// ── IdRegistry ────────────────────────────────────────────────────────

/// Owns every live terminal of one circuit, keyed by id.
///
/// One registry per circuit; nothing here is process-wide.
#[derive(Debug, Default)]
pub struct IdRegistry {
    /// Every id below this checkpoint is in `used`.
    checkpoint: u32,
    used: BTreeSet<TerminalId>,
    live: BTreeMap<TerminalId, Terminal>,
    session: Option<IdMapping>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the smallest free id.
    ///
    /// The scan resumes from a checkpoint rather than from zero; freeing an
    /// id below the checkpoint moves the checkpoint back to it, so the scan
    /// never skips a hole.
    pub fn allocate(&mut self) -> TerminalId {
        while self.used.contains(&TerminalId(self.checkpoint)) {
            self.checkpoint += 1;
        }
        let id = TerminalId(self.checkpoint);
        self.used.insert(id);
        self.checkpoint += 1;
        id
    }

    /// Reserve a persisted id, remapping it if it is taken and a session
    /// is recording.
    pub fn resolve_or_remap(&mut self, source: TerminalId) -> Resolved {
        if self.used.insert(source) {
            return Resolved::Reserved(source);
        }
        if self.session.is_none() {
            warn!(id = source.raw(), "terminal id collision while loading without a remap session");
            return Resolved::Collision(source);
        }
        let fresh = self.allocate();
        if let Some(session) = self.session.as_mut() {
            session.insert(source, fresh);
        }
        Resolved::Remapped { source, id: fresh }
    }

    /// Attach a live terminal at its id slot.
    ///
    /// The terminal is registered in every case; the returned anomaly
    /// tells the caller that the id was never reserved or that another
    /// live terminal was displaced from the slot.
    pub fn register(&mut self, terminal: Terminal) -> Option<IdAnomaly> {
        let id = terminal.id();
        let mut anomaly = None;
        if self.used.insert(id) {
            warn!(id = id.raw(), "terminal registered without a reserved id");
            anomaly = Some(IdAnomaly::Unreserved(id));
        }
        if self.live.insert(id, terminal).is_some() {
            warn!(id = id.raw(), "live terminal displaced by registration");
            anomaly = Some(IdAnomaly::Displaced(id));
        }
        anomaly
    }

    /// Detach a live terminal and free its id.
    pub fn unregister(&mut self, id: TerminalId) -> Option<Terminal> {
        let terminal = self.live.remove(&id);
        self.release(id);
        terminal
    }

    /// Free a reserved id that never got a live terminal.
    pub fn release(&mut self, id: TerminalId) {
        if self.live.contains_key(&id) {
            return;
        }
        if self.used.remove(&id) && id.raw() < self.checkpoint {
            self.checkpoint = id.raw();
        }
    }

    /// Drop every terminal, every reservation and any open session.
    pub fn reset_all(&mut self) {
        self.checkpoint = 0;
        self.used.clear();
        self.live.clear();
        self.session = None;
    }

    /// Look up a live terminal, translating `id` through `mapping` first.
    pub fn resolve(&self, id: TerminalId, mapping: Option<&IdMapping>) -> Option<&Terminal> {
        let id = mapping.map_or(id, |m| m.translate(id));
        self.live.get(&id)
    }

    /// Run one structural load inside a fresh remap session and return
    /// the translations it recorded.
    ///
    /// Opening a session while another is recording is reported, and the
    /// outer session is put back once the inner one finishes.
    pub fn record_mapping<R>(&mut self, op: impl FnOnce(&mut Self) -> R) -> Recording<R> {
        let (outer, anomaly) = self.open_session();
        let output = op(self);
        let mapping = self.close_session(outer);
        Recording {
            output,
            mapping,
            anomaly,
        }
    }

    /// Start a fresh session, handing back the one it replaces.
    pub(crate) fn open_session(&mut self) -> (Option<IdMapping>, Option<IdAnomaly>) {
        let outer = self.session.replace(IdMapping::new());
        let anomaly = outer.as_ref().map(|_| {
            warn!("remap session opened while another one is recording");
            IdAnomaly::NestedSession
        });
        (outer, anomaly)
    }

    /// End the current session and put `outer` back.
    pub(crate) fn close_session(&mut self, outer: Option<IdMapping>) -> IdMapping {
        let mapping = self.session.take().unwrap_or_default();
        self.session = outer;
        mapping
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    pub fn get(&self, id: TerminalId) -> Option<&Terminal> {
        self.live.get(&id)
    }

    pub fn get_mut(&mut self, id: TerminalId) -> Option<&mut Terminal> {
        self.live.get_mut(&id)
    }

    pub fn is_used(&self, id: TerminalId) -> bool {
        self.used.contains(&id)
    }

    pub fn is_live(&self, id: TerminalId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Live ids in ascending order.
    pub fn live_ids(&self) -> impl Iterator<Item = TerminalId> + '_ {
        self.live.keys().copied()
    }
}

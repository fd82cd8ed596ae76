/// Wires: directed, delayed connections from one output to one input.
///
/// A wire writes every new level straight through to its end terminal.
/// The delay only shapes the in-flight history kept for inspection: a
/// level is considered "in transit" until `delay` ticks have passed
/// since it was sent.

use std::collections::VecDeque;

use tracing::debug;

use crate::circuit::Circuit;
use crate::error::{KernelError, KernelResult};
use crate::level::LogicLevel;
use crate::registry::TerminalId;
use crate::signal::TerminalDirection;
use crate::time::LogicalTime;

// ── Wire ID ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WireId(u64);

impl WireId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        WireId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WireId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "W{}", self.0)
    }
}

// ── In-flight history ─────────────────────────────────────────────────

/// A level sent down a wire at `sent_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlight {
    pub level: LogicLevel,
    pub sent_at: LogicalTime,
}

/// What a wire looks like at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InTransit {
    /// The level that has arrived at the end terminal after the delay.
    pub visible: LogicLevel,
    /// Later levels still travelling, oldest first.
    pub pending: Vec<InFlight>,
}

// ── Wire ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Wire {
    id: WireId,
    start: TerminalId,
    end: TerminalId,
    /// Never empty. Consecutive entries always differ in level.
    history: VecDeque<InFlight>,
    custom_delay: Option<u64>,
}

impl Wire {
    /// A wire whose history starts with `level` already settled, so only
    /// later changes are ever in transit.
    pub(crate) fn new(
        id: WireId,
        start: TerminalId,
        end: TerminalId,
        level: LogicLevel,
        now: LogicalTime,
    ) -> Self {
        let mut history = VecDeque::new();
        history.push_back(InFlight {
            level,
            sent_at: LogicalTime::DISTANT_PAST,
        });
        let mut wire = Wire {
            id,
            start,
            end,
            history,
            custom_delay: None,
        };
        wire.record(level, now);
        wire
    }

    pub fn id(&self) -> WireId {
        self.id
    }

    pub fn start(&self) -> TerminalId {
        self.start
    }

    pub fn end(&self) -> TerminalId {
        self.end
    }

    pub fn custom_delay(&self) -> Option<u64> {
        self.custom_delay
    }

    pub fn delay(&self, default_delay: u64) -> u64 {
        self.custom_delay.unwrap_or(default_delay)
    }

    /// The most recently sent level.
    pub fn latest(&self) -> LogicLevel {
        self.history
            .back()
            .map_or(LogicLevel::False, |entry| entry.level)
    }

    pub fn history(&self) -> impl Iterator<Item = &InFlight> + '_ {
        self.history.iter()
    }

    /// Append a level unless it equals the latest one. Returns whether an
    /// entry was added.
    pub(crate) fn record(&mut self, level: LogicLevel, now: LogicalTime) -> bool {
        if self.history.back().is_some_and(|last| last.level == level) {
            return false;
        }
        self.history.push_back(InFlight { level, sent_at: now });
        true
    }

    /// Drop entries that have been overtaken by a later arrived entry.
    pub(crate) fn prune(&mut self, now: LogicalTime, delay: u64) {
        while self.history.len() > 1
            && self
                .history
                .get(1)
                .is_some_and(|next| now.has_elapsed(next.sent_at, delay))
        {
            self.history.pop_front();
        }
    }

    /// Prune, then report the visible level and what is still travelling.
    pub(crate) fn in_transit(&mut self, now: LogicalTime, delay: u64) -> InTransit {
        self.prune(now, delay);
        let visible = self
            .history
            .front()
            .map_or(LogicLevel::False, |entry| entry.level);
        InTransit {
            visible,
            pending: self.history.iter().skip(1).copied().collect(),
        }
    }

    pub(crate) fn set_start(&mut self, start: TerminalId) {
        self.start = start;
    }

    pub(crate) fn set_end(&mut self, end: TerminalId) {
        self.end = end;
    }

    pub(crate) fn set_custom_delay(&mut self, delay: Option<u64>) {
        self.custom_delay = delay;
    }
}

// ── Circuit wiring operations ─────────────────────────────────────────

impl Circuit {
    fn expect_direction(&self, id: TerminalId, direction: TerminalDirection) -> KernelResult<()> {
        let terminal = self
            .registry
            .get(id)
            .ok_or(KernelError::TerminalNotFound(id))?;
        match (direction, terminal.direction()) {
            (TerminalDirection::Output, TerminalDirection::Output)
            | (TerminalDirection::Input, TerminalDirection::Input) => Ok(()),
            (TerminalDirection::Output, _) => Err(KernelError::NotAnOutput(id)),
            (TerminalDirection::Input, _) => Err(KernelError::NotAnInput(id)),
        }
    }

    fn ensure_free_input(&self, input: TerminalId) -> KernelResult<()> {
        self.expect_direction(input, TerminalDirection::Input)?;
        match self.registry.get(input).and_then(|t| t.incoming()) {
            Some(wire) => Err(KernelError::InputAlreadyConnected { input, wire }),
            None => Ok(()),
        }
    }

    /// Connect `output` to `input`.
    ///
    /// The input takes the output's current level immediately; only later
    /// changes travel with a delay.
    pub fn connect(&mut self, output: TerminalId, input: TerminalId) -> KernelResult<WireId> {
        self.expect_direction(output, TerminalDirection::Output)?;
        self.ensure_free_input(input)?;

        let level = self.observable(output);
        let id = WireId::new(self.next_wire);
        self.next_wire += 1;
        self.wires
            .insert(id, Wire::new(id, output, input, level, self.now));
        if let Some(t) = self.registry.get_mut(output) {
            t.add_outgoing(id);
        }
        if let Some(t) = self.registry.get_mut(input) {
            t.set_incoming(Some(id));
        }
        debug!(wire = %id, from = %output, to = %input, "connected");
        self.write_terminal(input, level);
        Ok(id)
    }

    /// Remove a wire. Its end input falls back to `False`.
    pub fn disconnect(&mut self, wire: WireId) -> KernelResult<()> {
        let removed = self
            .wires
            .remove(&wire)
            .ok_or(KernelError::WireNotFound(wire))?;
        if let Some(t) = self.registry.get_mut(removed.start()) {
            t.remove_outgoing(wire);
        }
        if let Some(t) = self.registry.get_mut(removed.end()) {
            t.set_incoming(None);
        }
        debug!(wire = %wire, "disconnected");
        self.sample_incoming(removed.end());
        Ok(())
    }

    /// Re-point a wire at a different output and push that output's level
    /// through at once.
    pub fn set_wire_start(&mut self, wire: WireId, output: TerminalId) -> KernelResult<()> {
        self.expect_direction(output, TerminalDirection::Output)?;
        let old = self
            .wires
            .get(&wire)
            .ok_or(KernelError::WireNotFound(wire))?
            .start();
        if let Some(t) = self.registry.get_mut(old) {
            t.remove_outgoing(wire);
        }
        if let Some(t) = self.registry.get_mut(output) {
            t.add_outgoing(wire);
        }
        if let Some(w) = self.wires.get_mut(&wire) {
            w.set_start(output);
        }
        let level = self.observable(output);
        self.propagate_wire(wire, level);
        Ok(())
    }

    /// Re-point a wire at a different input. The old input falls back to
    /// `False`; the new one takes the wire's source level at once.
    ///
    /// Re-pointing a wire at the input it already ends on only pushes the
    /// source level through again.
    pub fn set_wire_end(&mut self, wire: WireId, input: TerminalId) -> KernelResult<()> {
        let (old, start) = {
            let w = self.wires.get(&wire).ok_or(KernelError::WireNotFound(wire))?;
            (w.end(), w.start())
        };
        if old == input {
            let level = self.observable(start);
            self.propagate_wire(wire, level);
            return Ok(());
        }
        self.ensure_free_input(input)?;
        if let Some(t) = self.registry.get_mut(old) {
            t.set_incoming(None);
        }
        if let Some(t) = self.registry.get_mut(input) {
            t.set_incoming(Some(wire));
        }
        if let Some(w) = self.wires.get_mut(&wire) {
            w.set_end(input);
        }
        self.sample_incoming(old);
        let level = self.observable(start);
        self.propagate_wire(wire, level);
        Ok(())
    }

    /// Override the default delay for one wire (`None` restores it).
    pub fn set_wire_delay(&mut self, wire: WireId, delay: Option<u64>) -> KernelResult<()> {
        let w = self
            .wires
            .get_mut(&wire)
            .ok_or(KernelError::WireNotFound(wire))?;
        w.set_custom_delay(delay);
        Ok(())
    }

    /// The visible level of a wire and the levels still travelling on it.
    ///
    /// Purely informational: the end terminal already holds the latest
    /// level.
    pub fn wire_in_transit(&mut self, wire: WireId) -> KernelResult<InTransit> {
        let now = self.now;
        let default_delay = self.config.default_wire_delay;
        let w = self
            .wires
            .get_mut(&wire)
            .ok_or(KernelError::WireNotFound(wire))?;
        let delay = w.delay(default_delay);
        Ok(w.in_transit(now, delay))
    }

    /// Record `level` on the wire and write it to the end terminal.
    pub(crate) fn propagate_wire(&mut self, wire: WireId, level: LogicLevel) {
        let now = self.now;
        let Some(w) = self.wires.get_mut(&wire) else {
            return;
        };
        w.record(level, now);
        let end = w.end();
        self.write_terminal(end, level);
    }
}

//! Compact encoding of terminal id sequences.
//!
//! Saved circuits list terminal ids in construction order, so long runs
//! of consecutive ids are common. A run of three or more collapses to a
//! `"start-end"` string; shorter runs stay as bare integers. Terminals
//! that carry force or power-on metadata are written as full descriptor
//! objects and break any run.
//!
//! ```text
//! [4, 5, 6, 9, 10]  ⇄  ["4-6", 9, 10]
//! [7]               ⇄  7
//! ```

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::level::LogicLevel;
use crate::registry::{IdRegistry, Resolved, TerminalId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("invalid id range {0:?}")]
    InvalidRange(String),

    #[error("malformed id list: {0}")]
    Malformed(String),
}

// ── Entries ───────────────────────────────────────────────────────────

/// An inclusive, ascending run of ids, written as `"start-end"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    start: u32,
    end: u32,
}

impl IdRange {
    pub fn new(start: u32, end: u32) -> Result<Self, CodecError> {
        if start > end {
            return Err(CodecError::InvalidRange(format!("{}-{}", start, end)));
        }
        Ok(IdRange { start, end })
    }

    pub fn start(self) -> u32 {
        self.start
    }

    pub fn end(self) -> u32 {
        self.end
    }

    pub fn iter(self) -> impl Iterator<Item = TerminalId> {
        (self.start..=self.end).map(TerminalId::new)
    }
}

impl std::fmt::Display for IdRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for IdRange {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CodecError::InvalidRange(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        let start = start.trim().parse::<u32>().map_err(|_| invalid())?;
        let end = end.trim().parse::<u32>().map_err(|_| invalid())?;
        IdRange::new(start, end).map_err(|_| invalid())
    }
}

impl Serialize for IdRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IdRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A terminal written with its persisted metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalDescriptor {
    pub id: TerminalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<LogicLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<LogicLevel>,
}

impl TerminalDescriptor {
    pub fn bare(id: TerminalId) -> Self {
        TerminalDescriptor {
            id,
            force: None,
            initial_value: None,
        }
    }

    pub fn has_metadata(&self) -> bool {
        self.force.is_some() || self.initial_value.is_some()
    }
}

/// One element of an encoded id list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdEntry {
    Id(TerminalId),
    Range(IdRange),
    Terminal(TerminalDescriptor),
}

/// An encoded id list. A list of exactly one entry is written bare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompactIds {
    One(IdEntry),
    Many(Vec<IdEntry>),
}

impl CompactIds {
    pub fn from_json(value: serde_json::Value) -> Result<Self, CodecError> {
        serde_json::from_value(value).map_err(|e| CodecError::Malformed(e.to_string()))
    }

    pub fn entries(&self) -> &[IdEntry] {
        match self {
            CompactIds::One(entry) => std::slice::from_ref(entry),
            CompactIds::Many(entries) => entries,
        }
    }

    /// Number of terminals the list expands to.
    pub fn terminal_count(&self) -> usize {
        self.entries()
            .iter()
            .map(|e| match e {
                IdEntry::Range(r) => (r.end - r.start) as usize + 1,
                IdEntry::Id(_) | IdEntry::Terminal(_) => 1,
            })
            .fold(0usize, usize::saturating_add)
    }
}

// ── Encoding ──────────────────────────────────────────────────────────

fn flush_run(run: &mut Vec<TerminalId>, out: &mut Vec<IdEntry>) {
    match run.as_slice() {
        [] => {}
        [first, .., last] if run.len() >= 3 => {
            // A run is consecutive by construction, so start <= end.
            out.push(IdEntry::Range(IdRange {
                start: first.raw(),
                end: last.raw(),
            }));
        }
        ids => out.extend(ids.iter().copied().map(IdEntry::Id)),
    }
    run.clear();
}

/// Encode terminals in order, collapsing runs of consecutive bare ids.
pub fn encode<I>(terminals: I) -> CompactIds
where
    I: IntoIterator<Item = TerminalDescriptor>,
{
    let mut out = Vec::new();
    let mut run: Vec<TerminalId> = Vec::new();
    for terminal in terminals {
        if terminal.has_metadata() {
            flush_run(&mut run, &mut out);
            out.push(IdEntry::Terminal(terminal));
            continue;
        }
        let extends = run
            .last()
            .is_some_and(|last| last.raw().checked_add(1) == Some(terminal.id.raw()));
        if !extends {
            flush_run(&mut run, &mut out);
        }
        run.push(terminal.id);
    }
    flush_run(&mut run, &mut out);

    if out.len() == 1 {
        if let Some(entry) = out.pop() {
            return CompactIds::One(entry);
        }
    }
    CompactIds::Many(out)
}

/// Encode plain ids.
pub fn encode_ids<I>(ids: I) -> CompactIds
where
    I: IntoIterator<Item = TerminalId>,
{
    encode(ids.into_iter().map(TerminalDescriptor::bare))
}

// ── Decoding ──────────────────────────────────────────────────────────

/// Expand to one descriptor per terminal, in order, without touching
/// any registry.
pub fn expand(compact: &CompactIds) -> Vec<TerminalDescriptor> {
    let mut out = Vec::with_capacity(compact.terminal_count());
    for entry in compact.entries() {
        match entry {
            IdEntry::Id(id) => out.push(TerminalDescriptor::bare(*id)),
            IdEntry::Range(range) => out.extend(range.iter().map(TerminalDescriptor::bare)),
            IdEntry::Terminal(desc) => out.push(*desc),
        }
    }
    out
}

/// A persisted terminal after its id went through the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedTerminal {
    pub resolved: Resolved,
    pub force: Option<LogicLevel>,
    pub initial_value: Option<LogicLevel>,
}

impl DecodedTerminal {
    pub fn id(&self) -> TerminalId {
        self.resolved.id()
    }
}

/// Reserve every expanded id through [`IdRegistry::resolve_or_remap`].
pub fn resolve_all(
    terminals: &[TerminalDescriptor],
    registry: &mut IdRegistry,
) -> Vec<DecodedTerminal> {
    terminals
        .iter()
        .map(|t| DecodedTerminal {
            resolved: registry.resolve_or_remap(t.id),
            force: t.force,
            initial_value: t.initial_value,
        })
        .collect()
}

/// Expand and reserve, preserving order.
pub fn decode(compact: &CompactIds, registry: &mut IdRegistry) -> Vec<DecodedTerminal> {
    resolve_all(&expand(compact), registry)
}

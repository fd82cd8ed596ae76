//! `Terminal` — an input or output connection point.

use crate::component::ComponentId;
use crate::level::LogicLevel;
use crate::registry::TerminalId;
use crate::wire::WireId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalDirection {
    Input,
    Output,
}

impl std::fmt::Display for TerminalDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminalDirection::Input => f.write_str("input"),
            TerminalDirection::Output => f.write_str("output"),
        }
    }
}

/// How a terminal is named inside its component.
///
/// Structural replacement matches old and new terminals by label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TerminalLabel {
    Single(String),
    Grouped { group: String, index: usize },
}

impl std::fmt::Display for TerminalLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminalLabel::Single(name) => f.write_str(name),
            TerminalLabel::Grouped { group, index } => write!(f, "{}[{}]", group, index),
        }
    }
}

#[derive(Debug, Clone)]
enum Link {
    Input { incoming: Option<WireId> },
    Output { outgoing: Vec<WireId> },
}

/// A terminal owned by one component.
///
/// The observable level is the force override when one is set, else the
/// intrinsic level. Propagation only ever writes the intrinsic level.
#[derive(Debug, Clone)]
pub struct Terminal {
    id: TerminalId,
    owner: ComponentId,
    label: TerminalLabel,
    value: LogicLevel,
    force: Option<LogicLevel>,
    initial: Option<LogicLevel>,
    link: Link,
}

impl Terminal {
    /// A fresh terminal at `False` with no wires.
    pub fn new(
        id: TerminalId,
        direction: TerminalDirection,
        owner: ComponentId,
        label: TerminalLabel,
    ) -> Self {
        let link = match direction {
            TerminalDirection::Input => Link::Input { incoming: None },
            TerminalDirection::Output => Link::Output { outgoing: Vec::new() },
        };
        Terminal {
            id,
            owner,
            label,
            value: LogicLevel::False,
            force: None,
            initial: None,
            link,
        }
    }

    /// Apply persisted power-on metadata. The initial level becomes the
    /// intrinsic level straight away.
    pub fn with_saved(mut self, force: Option<LogicLevel>, initial: Option<LogicLevel>) -> Self {
        self.force = force;
        if let Some(level) = initial {
            self.value = level;
        }
        self.initial = initial;
        self
    }

    pub fn id(&self) -> TerminalId {
        self.id
    }

    pub fn owner(&self) -> ComponentId {
        self.owner
    }

    pub fn label(&self) -> &TerminalLabel {
        &self.label
    }

    pub fn direction(&self) -> TerminalDirection {
        match self.link {
            Link::Input { .. } => TerminalDirection::Input,
            Link::Output { .. } => TerminalDirection::Output,
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self.link, Link::Input { .. })
    }

    pub fn is_output(&self) -> bool {
        matches!(self.link, Link::Output { .. })
    }

    /// The intrinsic level, ignoring any force override.
    pub fn intrinsic(&self) -> LogicLevel {
        self.value
    }

    /// What readers of this terminal see.
    pub fn observable(&self) -> LogicLevel {
        self.force.unwrap_or(self.value)
    }

    pub fn force(&self) -> Option<LogicLevel> {
        self.force
    }

    pub fn initial(&self) -> Option<LogicLevel> {
        self.initial
    }

    /// The wire driving this input, if any. Always `None` for outputs.
    pub fn incoming(&self) -> Option<WireId> {
        match &self.link {
            Link::Input { incoming } => *incoming,
            Link::Output { .. } => None,
        }
    }

    /// Wires driven by this output, in connection order. Empty for inputs.
    pub fn outgoing(&self) -> &[WireId] {
        match &self.link {
            Link::Output { outgoing } => outgoing,
            Link::Input { .. } => &[],
        }
    }

    /// Every wire touching this terminal.
    pub fn wires(&self) -> Vec<WireId> {
        match &self.link {
            Link::Input { incoming } => incoming.iter().copied().collect(),
            Link::Output { outgoing } => outgoing.clone(),
        }
    }

    // ── Mutation (kernel only) ────────────────────────────────────

    /// Write the intrinsic level. Returns the new observable level when
    /// the observable level changed.
    pub(crate) fn set_intrinsic(&mut self, level: LogicLevel) -> Option<LogicLevel> {
        if self.value == level {
            return None;
        }
        let before = self.observable();
        self.value = level;
        let after = self.observable();
        (after != before).then_some(after)
    }

    /// Set or clear the force override. Returns the new observable level
    /// when the observable level changed.
    pub(crate) fn set_force(&mut self, force: Option<LogicLevel>) -> Option<LogicLevel> {
        let before = self.observable();
        self.force = force;
        let after = self.observable();
        (after != before).then_some(after)
    }

    pub(crate) fn set_incoming(&mut self, wire: Option<WireId>) {
        if let Link::Input { incoming } = &mut self.link {
            *incoming = wire;
        }
    }

    /// Adding a wire that is already attached is a no-op.
    pub(crate) fn add_outgoing(&mut self, wire: WireId) {
        if let Link::Output { outgoing } = &mut self.link {
            if !outgoing.contains(&wire) {
                outgoing.push(wire);
            }
        }
    }

    pub(crate) fn remove_outgoing(&mut self, wire: WireId) {
        if let Link::Output { outgoing } = &mut self.link {
            outgoing.retain(|w| *w != wire);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output() -> Terminal {
        Terminal::new(
            TerminalId::new(1),
            TerminalDirection::Output,
            ComponentId::new(0),
            TerminalLabel::Single("out".into()),
        )
    }

    #[test]
    fn test_same_level_is_noop() {
        let mut t = output();
        assert_eq!(t.set_intrinsic(LogicLevel::False), None);
        assert_eq!(t.set_intrinsic(LogicLevel::Unknown), Some(LogicLevel::Unknown));
        assert_eq!(t.set_intrinsic(LogicLevel::HighImpedance), Some(LogicLevel::HighImpedance));
    }

    #[test]
    fn test_force_masks_intrinsic_writes() {
        let mut t = output();
        assert_eq!(t.set_force(Some(LogicLevel::True)), Some(LogicLevel::True));
        assert_eq!(t.set_intrinsic(LogicLevel::True), None);
        assert_eq!(t.intrinsic(), LogicLevel::True);
        assert_eq!(t.set_intrinsic(LogicLevel::False), None);
        assert_eq!(t.set_force(None), Some(LogicLevel::False));
    }

    #[test]
    fn test_outgoing_has_no_duplicates() {
        let mut t = output();
        t.add_outgoing(WireId::new(3));
        t.add_outgoing(WireId::new(3));
        t.add_outgoing(WireId::new(4));
        assert_eq!(t.outgoing(), &[WireId::new(3), WireId::new(4)]);
        t.remove_outgoing(WireId::new(3));
        assert_eq!(t.outgoing(), &[WireId::new(4)]);
        assert_eq!(t.incoming(), None);
    }

    #[test]
    fn test_saved_initial_level_applies() {
        let t = output().with_saved(None, Some(LogicLevel::True));
        assert_eq!(t.observable(), LogicLevel::True);
        assert_eq!(t.initial(), Some(LogicLevel::True));
    }

    #[test]
    fn test_label_display() {
        let l = TerminalLabel::Grouped { group: "D".into(), index: 3 };
        assert_eq!(l.to_string(), "D[3]");
    }
}

//! Component ids and their generator.

/// Identifies a component within one circuit.
///
/// Never persisted: saved circuits refer to terminals, not components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u64);

impl ComponentId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        ComponentId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Strictly increasing component-id generator, one per circuit.
#[derive(Debug, Clone, Default)]
pub struct ComponentIdGen {
    next: u64,
}

impl ComponentIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ComponentId {
        let id = ComponentId(self.next);
        self.next += 1;
        id
    }

    pub fn peek(&self) -> ComponentId {
        ComponentId(self.next)
    }
}

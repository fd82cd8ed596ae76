/// Logical time for the circuit kernel.
///
/// Timestamps stamped on in-flight wire values. The clock is supplied
/// by the caller and only moves when the caller says so; nothing here
/// reads wall-clock time.

/// A logical tick in circuit time.
///
/// Signed so that a wire can seed its history with a stamp that is
/// already settled at `ZERO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalTime(i64);

impl LogicalTime {
    /// The start of circuit time.
    pub const ZERO: LogicalTime = LogicalTime(0);

    /// A stamp old enough that any finite delay has elapsed from it.
    pub const DISTANT_PAST: LogicalTime = LogicalTime(i64::MIN / 2);

    /// Create a `LogicalTime` from a raw tick value.
    #[inline]
    pub fn new(ticks: i64) -> Self {
        LogicalTime(ticks)
    }

    /// Return the raw tick value.
    #[inline]
    pub fn ticks(self) -> i64 {
        self.0
    }

    /// The time `delay` ticks after `self`, saturating at the far end.
    #[inline]
    pub fn plus(self, delay: u64) -> LogicalTime {
        let delay = i64::try_from(delay).unwrap_or(i64::MAX);
        LogicalTime(self.0.saturating_add(delay))
    }

    /// `true` once `delay` ticks have passed since `since`, as seen at `self`.
    #[inline]
    pub fn has_elapsed(self, since: LogicalTime, delay: u64) -> bool {
        since.plus(delay) <= self
    }
}

impl Default for LogicalTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t={}", self.0)
    }
}

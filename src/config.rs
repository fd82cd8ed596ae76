/// Kernel configuration.
///
/// The knobs a host application may want to turn: the cycle-breaker
/// bound, the default wire delay, and how loads treat identity
/// collisions. Deserializable so the host can keep it next to its own
/// settings.

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};

/// Round limit used when none is configured.
pub const DEFAULT_ROUND_LIMIT: u32 = 1000;

// ── Collision policy ──────────────────────────────────────────────────

/// What a load does with a persisted id that is already live while no
/// remap session is recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Allocate a fresh id, report the anomaly, keep loading.
    #[default]
    Reassign,
    /// Fail the load with [`KernelError::IdCollision`].
    Reject,
}

// ── Kernel Config ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// A tick that reaches this many rounds is treated as a cycle and aborted.
    pub round_limit: u32,
    /// Delay (logical ticks) of wires without a custom delay.
    pub default_wire_delay: u64,
    pub collision_policy: CollisionPolicy,
    /// Move components still queued at a cycle abort to `Invalid`.
    pub invalidate_on_cycle: bool,
}

impl KernelConfig {
    /// Strict settings for hosts that prefer failing loudly.
    pub fn strict() -> Self {
        KernelConfig {
            collision_policy: CollisionPolicy::Reject,
            invalidate_on_cycle: true,
            ..Self::default()
        }
    }

    pub fn with_round_limit(mut self, round_limit: u32) -> Self {
        self.round_limit = round_limit;
        self
    }

    pub fn with_wire_delay(mut self, delay: u64) -> Self {
        self.default_wire_delay = delay;
        self
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> KernelResult<Self> {
        let config: KernelConfig =
            serde_json::from_str(json).map_err(|e| KernelError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> KernelResult<()> {
        if self.round_limit == 0 {
            return Err(KernelError::Config("round_limit must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            round_limit: DEFAULT_ROUND_LIMIT,
            default_wire_delay: 1,
            collision_policy: CollisionPolicy::Reassign,
            invalidate_on_cycle: false,
        }
    }
}

//! Reference behaviours: a source, two gates, a probe and a latch.
//!
//! Small enough to reason about in tests and the demo. A real editor
//! supplies its own catalog.

pub mod gates;
pub mod latch;
pub mod source;

pub use gates::{AndGate, Inverter};
pub use latch::SrLatch;
pub use source::{ConstantSource, Probe};

use crate::error::{KernelError, KernelResult};
use crate::level::LogicLevel;
use crate::persist::Catalog;

use super::behavior::Behavior;

/// Catalog of the reference behaviours, keyed by type tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl Catalog for BuiltinCatalog {
    fn build(&self, type_tag: &str, params: &serde_json::Value) -> KernelResult<Box<dyn Behavior>> {
        let behavior: Box<dyn Behavior> = match type_tag {
            source::SOURCE_TAG => {
                let level = params
                    .get("level")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<LogicLevel>(v).ok())
                    .unwrap_or_default();
                Box::new(ConstantSource::new(level))
            }
            source::PROBE_TAG => Box::new(Probe),
            gates::NOT_TAG => Box::new(Inverter),
            gates::AND_TAG => {
                let bits = params
                    .get("bits")
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or(2);
                Box::new(AndGate::new(bits as usize))
            }
            latch::SR_LATCH_TAG => Box::new(SrLatch),
            other => return Err(KernelError::UnknownComponentType(other.to_string())),
        };
        Ok(behavior)
    }
}

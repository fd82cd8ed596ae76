//! The kernel's share of the saved-circuit format.
//!
//! A component is saved as its type tag, parameters, optional reference
//! name, the compact encoding of its terminal ids and any extra state.
//! Wires are saved by the persisted ids of their two endpoints.
//!
//! ```json
//! {
//!   "components": [
//!     { "type": "source", "params": { "level": true }, "outputs": 0, "state": { "level": true } },
//!     { "type": "and", "params": { "bits": 3 }, "inputs": ["1-3"], "outputs": 4 }
//!   ],
//!   "wires": [ { "from": 0, "to": 1 } ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::circuit::Circuit;
use crate::codec::{self, CodecError, CompactIds, TerminalDescriptor};
use crate::component::{Behavior, ComponentId};
use crate::error::{KernelError, KernelResult};
use crate::level::{LogicLevel, Value};
use crate::registry::{IdAnomaly, IdMapping, TerminalId};
use crate::signal::{Terminal, TerminalSet};
use crate::wire::WireId;

// ── Descriptors ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<CompactIds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<CompactIds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDescriptor {
    pub from: TerminalId,
    pub to: TerminalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    pub components: Vec<ComponentDescriptor>,
    #[serde(default)]
    pub wires: Vec<WireDescriptor>,
}

impl CircuitSnapshot {
    pub fn from_json_str(json: &str) -> KernelResult<Self> {
        serde_json::from_str(json).map_err(|e| CodecError::Malformed(e.to_string()).into())
    }

    pub fn to_json_string(&self) -> KernelResult<String> {
        serde_json::to_string(self).map_err(|e| CodecError::Malformed(e.to_string()).into())
    }
}

// ── Catalog ───────────────────────────────────────────────────────────

/// Builds behaviours from saved type tags and parameters.
pub trait Catalog {
    fn build(&self, type_tag: &str, params: &serde_json::Value) -> KernelResult<Box<dyn Behavior>>;
}

/// A catalog backed by a closure.
impl<F> Catalog for F
where
    F: Fn(&str, &serde_json::Value) -> KernelResult<Box<dyn Behavior>>,
{
    fn build(&self, type_tag: &str, params: &serde_json::Value) -> KernelResult<Box<dyn Behavior>> {
        (self)(type_tag, params)
    }
}

// ── Load report ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Restored components, in snapshot order.
    pub components: Vec<ComponentId>,
    pub wires: Vec<WireId>,
    /// Persisted id → live id for every id that did not keep its value.
    pub mapping: IdMapping,
    pub anomalies: Vec<IdAnomaly>,
    /// Wires whose endpoints could not be connected.
    pub skipped_wires: Vec<WireDescriptor>,
}

// ── Saving and loading ────────────────────────────────────────────────

impl Circuit {
    pub fn save_component(&self, id: ComponentId) -> KernelResult<ComponentDescriptor> {
        let comp = self
            .components
            .get(&id)
            .ok_or(KernelError::ComponentNotFound(id))?;
        let behavior = comp.behavior();
        let persist_levels = behavior.persists_output_levels();

        let inputs = self.encode_terminals(comp.inputs(), |_| None);
        let outputs = self.encode_terminals(comp.outputs(), |t| {
            if persist_levels {
                Some(t.intrinsic())
            } else {
                t.initial()
            }
        });

        Ok(ComponentDescriptor {
            type_tag: behavior.type_tag().to_string(),
            params: behavior.params(),
            reference: comp.reference.clone(),
            inputs,
            outputs,
            state: behavior.persisted_state(comp.value()),
        })
    }

    fn encode_terminals(
        &self,
        set: &TerminalSet,
        initial: impl Fn(&Terminal) -> Option<LogicLevel>,
    ) -> Option<CompactIds> {
        if set.is_empty() {
            return None;
        }
        let descriptors = set.all().iter().map(|id| match self.registry.get(*id) {
            Some(t) => TerminalDescriptor {
                id: *id,
                force: t.force(),
                initial_value: initial(t),
            },
            None => TerminalDescriptor::bare(*id),
        });
        Some(codec::encode(descriptors))
    }

    /// Save every live component and wire.
    pub fn snapshot(&self) -> KernelResult<CircuitSnapshot> {
        let components = self
            .components
            .keys()
            .map(|id| self.save_component(*id))
            .collect::<KernelResult<Vec<_>>>()?;
        let wires = self
            .wires
            .values()
            .map(|w| WireDescriptor {
                from: w.start(),
                to: w.end(),
                delay: w.custom_delay(),
            })
            .collect();
        Ok(CircuitSnapshot { components, wires })
    }

    /// Load a snapshot keeping its persisted ids.
    ///
    /// No remap session is opened: an id that is already live is handled
    /// by the configured collision policy. On error every component
    /// restored so far is removed again.
    pub fn load(
        &mut self,
        snapshot: &CircuitSnapshot,
        catalog: &dyn Catalog,
    ) -> KernelResult<LoadReport> {
        let mut report = self.restore_all(&snapshot.components, catalog)?;
        self.connect_all(&snapshot.wires, &mut report);
        debug!(
            components = report.components.len(),
            wires = report.wires.len(),
            anomalies = report.anomalies.len(),
            "snapshot loaded"
        );
        Ok(report)
    }

    /// Stamp out a copy of a snapshot inside a remap session.
    ///
    /// Every persisted id that is already taken gets a fresh id, so the
    /// same snapshot can be instantiated any number of times. Wires are
    /// resolved through this instance's mapping.
    pub fn instantiate(
        &mut self,
        snapshot: &CircuitSnapshot,
        catalog: &dyn Catalog,
    ) -> KernelResult<LoadReport> {
        let recording = self.record_mapping(|c| c.restore_all(&snapshot.components, catalog));
        let mut report = recording.output?;
        report.anomalies.extend(recording.anomaly);
        for (source, live) in recording.mapping.iter() {
            report.mapping.insert(source, live);
        }
        self.connect_all(&snapshot.wires, &mut report);
        debug!(
            components = report.components.len(),
            remapped = report.mapping.len(),
            "snapshot instantiated"
        );
        Ok(report)
    }

    fn restore_all(
        &mut self,
        components: &[ComponentDescriptor],
        catalog: &dyn Catalog,
    ) -> KernelResult<LoadReport> {
        let mut report = LoadReport::default();
        for desc in components {
            let restored = catalog
                .build(&desc.type_tag, &desc.params)
                .and_then(|behavior| self.restore_component(desc, behavior));
            match restored {
                Ok(restored) => {
                    report.components.push(restored.id);
                    report.anomalies.extend(restored.anomalies);
                    for (source, live) in restored.reassigned.iter() {
                        report.mapping.insert(source, live);
                    }
                }
                Err(e) => {
                    warn!(type_tag = %desc.type_tag, error = %e, "load failed, rolling back");
                    for id in report.components.iter().rev() {
                        let _ = self.remove_component(*id);
                    }
                    return Err(e);
                }
            }
        }
        Ok(report)
    }

    fn connect_all(&mut self, wires: &[WireDescriptor], report: &mut LoadReport) {
        for desc in wires {
            let from = report.mapping.translate(desc.from);
            let to = report.mapping.translate(desc.to);
            match self.connect(from, to) {
                Ok(wire) => {
                    if desc.delay.is_some() {
                        // The wire was just created.
                        let _ = self.set_wire_delay(wire, desc.delay);
                    }
                    report.wires.push(wire);
                }
                Err(e) => {
                    warn!(from = %from, to = %to, error = %e, "saved wire skipped");
                    report.skipped_wires.push(*desc);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::IdEntry;
    use crate::component::builtin::BuiltinCatalog;
    use serde_json::json;

    #[test]
    fn test_descriptor_json_shape() {
        let desc: ComponentDescriptor = serde_json::from_value(json!({
            "type": "and",
            "params": { "bits": 3 },
            "ref": "U1",
            "inputs": ["1-3"],
            "outputs": 4
        }))
        .unwrap();
        assert_eq!(desc.type_tag, "and");
        assert_eq!(desc.reference.as_deref(), Some("U1"));
        assert_eq!(desc.outputs, Some(CompactIds::One(IdEntry::Id(TerminalId::new(4)))));
        assert!(desc.state.is_none());

        let back = serde_json::to_value(&desc).unwrap();
        assert_eq!(back["ref"], json!("U1"));
        assert!(back.get("state").is_none());
    }

    #[test]
    fn test_wire_descriptor_delay_optional() {
        let wire: WireDescriptor = serde_json::from_value(json!({"from": 1, "to": 2})).unwrap();
        assert_eq!(wire.delay, None);
        assert_eq!(serde_json::to_value(wire).unwrap(), json!({"from": 1, "to": 2}));
    }

    #[test]
    fn test_closure_catalog() {
        let catalog = |tag: &str, params: &serde_json::Value| BuiltinCatalog.build(tag, params);
        let snapshot = CircuitSnapshot {
            components: vec![ComponentDescriptor {
                type_tag: "not".into(),
                params: serde_json::Value::Null,
                reference: None,
                inputs: Some(codec::encode_ids([TerminalId::new(0)])),
                outputs: Some(codec::encode_ids([TerminalId::new(1)])),
                state: None,
            }],
            wires: Vec::new(),
        };
        let mut circuit = Circuit::new();
        let report = circuit.load(&snapshot, &catalog).unwrap();
        assert_eq!(report.components.len(), 1);
        assert!(circuit.registry().is_live(TerminalId::new(1)));
    }

    #[test]
    fn test_malformed_snapshot() {
        assert!(matches!(
            CircuitSnapshot::from_json_str("{\"components\": [{}]}"),
            Err(KernelError::Codec(CodecError::Malformed(_)))
        ));
    }
}

//! Multi-component scenarios on a whole circuit.

use std::cell::Cell;
use std::rc::Rc;

use crate::codec::{self, TerminalDescriptor};
use crate::component::builtin::{AndGate, BuiltinCatalog, ConstantSource, Inverter, Probe, SrLatch};
use crate::component::{Behavior, ComponentId, ComponentState, EvalContext, SavedState};
use crate::config::KernelConfig;
use crate::error::{EvaluationError, KernelError};
use crate::level::{LogicLevel, Value};
use crate::persist::{CircuitSnapshot, ComponentDescriptor, WireDescriptor};
use crate::registry::{IdAnomaly, TerminalId};
use crate::signal::{ShapeDecl, TerminalLabel};
use crate::simulation::{EvaluationPhase, TickOutcome};
use crate::time::LogicalTime;

use super::Circuit;

fn input(c: &Circuit, id: ComponentId, i: usize) -> TerminalId {
    c.component(id).unwrap().inputs().all()[i]
}

fn output(c: &Circuit, id: ComponentId, i: usize) -> TerminalId {
    c.component(id).unwrap().outputs().all()[i]
}

fn tid(raw: u32) -> TerminalId {
    TerminalId::new(raw)
}

/// Wraps a behaviour and counts its recomputations.
#[derive(Debug)]
struct Counted<B> {
    inner: B,
    calls: Rc<Cell<u32>>,
}

impl<B: Behavior> Behavior for Counted<B> {
    fn type_tag(&self) -> &str {
        self.inner.type_tag()
    }

    fn inputs(&self) -> Vec<ShapeDecl> {
        self.inner.inputs()
    }

    fn outputs(&self) -> Vec<ShapeDecl> {
        self.inner.outputs()
    }

    fn initial_value(&self, saved: &SavedState<'_>) -> Value {
        self.inner.initial_value(saved)
    }

    fn recompute(&self, ctx: &EvalContext<'_>) -> Result<Value, EvaluationError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.recompute(ctx)
    }

    fn persists_output_levels(&self) -> bool {
        self.inner.persists_output_levels()
    }
}

#[derive(Debug)]
struct Faulty;

impl Behavior for Faulty {
    fn type_tag(&self) -> &str {
        "faulty"
    }

    fn inputs(&self) -> Vec<ShapeDecl> {
        vec![ShapeDecl::single("in")]
    }

    fn outputs(&self) -> Vec<ShapeDecl> {
        vec![ShapeDecl::single("out")]
    }

    fn recompute(&self, _ctx: &EvalContext<'_>) -> Result<Value, EvaluationError> {
        Err(EvaluationError::Failed("boom".into()))
    }
}

/// source(true) → not → probe, saved with persisted ids 0, 1-2, 3.
fn template() -> CircuitSnapshot {
    CircuitSnapshot {
        components: vec![
            ComponentDescriptor {
                type_tag: "source".into(),
                params: serde_json::json!({ "level": true }),
                reference: None,
                inputs: None,
                outputs: Some(codec::encode_ids([tid(0)])),
                state: None,
            },
            ComponentDescriptor {
                type_tag: "not".into(),
                params: serde_json::Value::Null,
                reference: None,
                inputs: Some(codec::encode_ids([tid(1)])),
                outputs: Some(codec::encode_ids([tid(2)])),
                state: None,
            },
        ],
        wires: vec![WireDescriptor {
            from: tid(0),
            to: tid(1),
            delay: None,
        }],
    }
}

// ── Signal propagation ────────────────────────────────────────────────

#[test]
fn test_connection_samples_synchronously() {
    let mut c = Circuit::new();
    let a = c.add_component(Box::new(ConstantSource::new(LogicLevel::False)));
    let b = c.add_component(Box::new(Probe));
    let (a_out, b_in) = (output(&c, a, 0), input(&c, b, 0));
    c.connect(a_out, b_in).unwrap();
    c.tick();
    assert!(c.is_quiescent());

    c.set_level(a_out, LogicLevel::True).unwrap();
    assert_eq!(c.level(b_in), Ok(LogicLevel::True));
    assert_eq!(c.scheduler().pending_recalculations(), 1);

    c.tick();
    assert_eq!(c.component(b).unwrap().value(), &Value::Level(LogicLevel::True));

    c.set_level(a_out, LogicLevel::True).unwrap();
    assert!(c.is_quiescent());
}

#[test]
fn test_connect_samples_current_level() {
    let mut c = Circuit::new();
    let a = c.add_component(Box::new(ConstantSource::new(LogicLevel::True)));
    let b = c.add_component(Box::new(Probe));
    c.tick();
    c.connect(output(&c, a, 0), input(&c, b, 0)).unwrap();
    assert_eq!(c.level(input(&c, b, 0)), Ok(LogicLevel::True));
}

#[test]
fn test_acyclic_chain_reaches_quiescence() {
    let mut c = Circuit::new();
    let src = c.add_component(Box::new(ConstantSource::new(LogicLevel::True)));
    let mut prev = output(&c, src, 0);
    let mut inverters = Vec::new();
    for _ in 0..3 {
        let not = c.add_component(Box::new(Inverter));
        c.connect(prev, input(&c, not, 0)).unwrap();
        prev = output(&c, not, 0);
        inverters.push(not);
    }
    let probe = c.add_component(Box::new(Probe));
    c.connect(prev, input(&c, probe, 0)).unwrap();

    let report = c.tick();
    assert_eq!(report.outcome, TickOutcome::Settled);
    assert!(report.rounds < 10);
    assert!(c.is_quiescent());
    assert_eq!(c.level(output(&c, inverters[0], 0)), Ok(LogicLevel::False));
    assert_eq!(c.level(output(&c, inverters[1], 0)), Ok(LogicLevel::True));
    assert_eq!(c.component(probe).unwrap().value(), &Value::Level(LogicLevel::False));
}

#[test]
fn test_disconnect_resets_input() {
    let mut c = Circuit::new();
    let a = c.add_component(Box::new(ConstantSource::new(LogicLevel::True)));
    let b = c.add_component(Box::new(Probe));
    c.tick();
    let w = c.connect(output(&c, a, 0), input(&c, b, 0)).unwrap();
    c.disconnect(w).unwrap();
    assert_eq!(c.level(input(&c, b, 0)), Ok(LogicLevel::False));
    assert!(c.wire(w).is_none());
    assert_eq!(c.disconnect(w), Err(KernelError::WireNotFound(w)));
}

#[test]
fn test_input_takes_one_wire() {
    let mut c = Circuit::new();
    let a = c.add_component(Box::new(ConstantSource::new(LogicLevel::True)));
    let b = c.add_component(Box::new(Probe));
    let w = c.connect(output(&c, a, 0), input(&c, b, 0)).unwrap();
    let err = c.connect(output(&c, a, 0), input(&c, b, 0)).unwrap_err();
    assert_eq!(
        err,
        KernelError::InputAlreadyConnected {
            input: input(&c, b, 0),
            wire: w
        }
    );
    assert_eq!(
        c.connect(input(&c, b, 0), output(&c, a, 0)),
        Err(KernelError::NotAnOutput(input(&c, b, 0)))
    );
}

#[test]
fn test_set_wire_end_onto_current_end() {
    let mut c = Circuit::new();
    let a = c.add_component(Box::new(ConstantSource::new(LogicLevel::True)));
    let b = c.add_component(Box::new(Probe));
    let w = c.connect(output(&c, a, 0), input(&c, b, 0)).unwrap();
    c.tick();

    c.set_wire_end(w, input(&c, b, 0)).unwrap();
    assert_eq!(c.wire(w).unwrap().end(), input(&c, b, 0));
    assert_eq!(c.level(input(&c, b, 0)), Ok(LogicLevel::True));
}

#[test]
fn test_wire_in_transit_follows_clock() {
    let mut c = Circuit::new();
    let a = c.add_component(Box::new(ConstantSource::new(LogicLevel::False)));
    let b = c.add_component(Box::new(Probe));
    let w = c.connect(output(&c, a, 0), input(&c, b, 0)).unwrap();
    c.set_wire_delay(w, Some(2)).unwrap();

    c.set_level(output(&c, a, 0), LogicLevel::True).unwrap();
    // The end terminal is written at once; only the history lags.
    assert_eq!(c.level(input(&c, b, 0)), Ok(LogicLevel::True));
    let transit = c.wire_in_transit(w).unwrap();
    assert_eq!(transit.visible, LogicLevel::False);
    assert_eq!(transit.pending.len(), 1);

    c.advance_time(2);
    let transit = c.wire_in_transit(w).unwrap();
    assert_eq!(transit.visible, LogicLevel::True);
    assert!(transit.pending.is_empty());
}

#[test]
fn test_clock_never_moves_backward() {
    let mut c = Circuit::new();
    c.set_time(LogicalTime::new(10));
    c.set_time(LogicalTime::new(3));
    assert_eq!(c.now(), LogicalTime::new(10));
}

// ── Cycle breaking ────────────────────────────────────────────────────

fn self_loop(c: &mut Circuit) -> ComponentId {
    let not = c.add_component(Box::new(Inverter));
    let (i, o) = (input(c, not, 0), output(c, not, 0));
    c.connect(o, i).unwrap();
    not
}

#[test]
fn test_zero_delay_loop_aborts_at_round_limit() {
    let mut c = Circuit::new();
    let not = self_loop(&mut c);

    let report = c.tick();
    assert_eq!(report.rounds, c.config().round_limit);
    assert!(report.is_cycle());
    assert!(c.is_quiescent());
    assert_eq!(c.scheduler().pending_propagations(), 0);
    assert_eq!(c.scheduler().pending_recalculations(), 0);

    // Left intact and reachable.
    assert_eq!(c.component(not).unwrap().state(), ComponentState::Spawning);
    c.drive(not, Value::Level(LogicLevel::True)).unwrap();
    assert!(!c.is_quiescent());
}

#[test]
fn test_cycle_invalidates_when_configured() {
    let config = KernelConfig::strict().with_round_limit(20);
    let mut c = Circuit::with_config(config).unwrap();
    let not = self_loop(&mut c);

    let report = c.tick();
    assert!(matches!(report.outcome, TickOutcome::CycleAborted { .. }));
    assert_eq!(c.component(not).unwrap().state(), ComponentState::Invalid);
    assert_eq!(c.tick().outcome, TickOutcome::Idle);

    c.revalidate(not).unwrap();
    assert_eq!(c.component(not).unwrap().state(), ComponentState::Spawned);
    assert!(!c.is_quiescent());
}

#[test]
fn test_zero_round_limit_rejected() {
    let config = KernelConfig::default().with_round_limit(0);
    assert!(matches!(Circuit::with_config(config), Err(KernelError::Config(_))));
}

// ── Failures ──────────────────────────────────────────────────────────

#[test]
fn test_failure_is_isolated_per_component() {
    let mut c = Circuit::new();
    let bad = c.add_component(Box::new(Faulty));
    let not = c.add_component(Box::new(Inverter));

    let report = c.tick();
    assert_eq!(report.outcome, TickOutcome::Settled);
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.component, bad);
    assert_eq!(failure.type_tag, "faulty");
    assert_eq!(failure.phase, EvaluationPhase::Recalculate);
    assert_eq!(c.level(output(&c, not, 0)), Ok(LogicLevel::True));
}

// ── Force overrides ───────────────────────────────────────────────────

#[test]
fn test_force_output_masks_and_requests_redraw() {
    let mut c = Circuit::new();
    let not = c.add_component(Box::new(Inverter));
    let probe = c.add_component(Box::new(Probe));
    c.tick();
    let out = output(&c, not, 0);
    c.connect(out, input(&c, probe, 0)).unwrap();
    assert_eq!(c.level(input(&c, probe, 0)), Ok(LogicLevel::True));

    c.force_output(out, Some(LogicLevel::False)).unwrap();
    assert_eq!(c.level(out), Ok(LogicLevel::False));
    assert_eq!(c.level(input(&c, probe, 0)), Ok(LogicLevel::False));
    assert_eq!(c.take_redraw_requests(), vec![not]);
    assert!(c.take_redraw_requests().is_empty());

    c.force_output(out, None).unwrap();
    assert_eq!(c.level(input(&c, probe, 0)), Ok(LogicLevel::True));

    let probe_in = input(&c, probe, 0);
    assert_eq!(
        c.force_output(probe_in, Some(LogicLevel::True)),
        Err(KernelError::NotAnOutput(probe_in))
    );
}

// ── Lifecycle ─────────────────────────────────────────────────────────

#[test]
fn test_commit_moves_to_spawned() {
    let mut c = Circuit::new();
    let not = c.add_component(Box::new(Inverter));
    assert_eq!(c.component(not).unwrap().state(), ComponentState::Spawning);
    c.commit_component(not).unwrap();
    assert_eq!(c.component(not).unwrap().state(), ComponentState::Spawned);
}

#[test]
fn test_remove_detaches_and_releases_ids() {
    let mut c = Circuit::new();
    let first = c.add_component(Box::new(Inverter));
    let second = c.add_component(Box::new(Inverter));
    c.connect(output(&c, first, 0), input(&c, second, 0)).unwrap();

    let dead = c.remove_component(first).unwrap();
    assert_eq!(dead.state(), ComponentState::Dead);
    assert_eq!(c.wires().count(), 0);
    assert_eq!(c.terminal(tid(2)).unwrap().incoming(), None);
    assert!(!c.registry().is_used(tid(0)));
    assert!(!c.registry().is_used(tid(1)));

    let probe = c.add_component(Box::new(Probe));
    assert_eq!(input(&c, probe, 0), tid(0));
    assert_eq!(c.remove_component(first).unwrap_err(), KernelError::ComponentNotFound(first));
}

#[test]
fn test_restore_with_saved_levels_skips_recompute() {
    let calls = Rc::new(Cell::new(0));
    let desc = ComponentDescriptor {
        type_tag: "sr-latch".into(),
        params: serde_json::Value::Null,
        reference: None,
        inputs: Some(codec::encode_ids([tid(0), tid(1)])),
        outputs: Some(codec::encode([
            TerminalDescriptor {
                id: tid(2),
                force: None,
                initial_value: Some(LogicLevel::True),
            },
            TerminalDescriptor {
                id: tid(3),
                force: None,
                initial_value: Some(LogicLevel::False),
            },
        ])),
        state: None,
    };

    let mut c = Circuit::new();
    let restored = c
        .restore_component(
            &desc,
            Box::new(Counted {
                inner: SrLatch,
                calls: calls.clone(),
            }),
        )
        .unwrap();
    assert!(restored.anomalies.is_empty());
    assert_eq!(c.component(restored.id).unwrap().state(), ComponentState::Spawned);
    assert_eq!(c.scheduler().pending_propagations(), 1);
    assert_eq!(c.scheduler().pending_recalculations(), 0);

    c.tick();
    assert_eq!(calls.get(), 0);
    assert_eq!(c.level(tid(2)), Ok(LogicLevel::True));
    assert_eq!(c.level(tid(3)), Ok(LogicLevel::False));
}

#[test]
fn test_restore_with_one_saved_level_skips_recompute() {
    let calls = Rc::new(Cell::new(0));
    let desc = ComponentDescriptor {
        type_tag: "sr-latch".into(),
        params: serde_json::Value::Null,
        reference: None,
        inputs: Some(codec::encode_ids([tid(0), tid(1)])),
        outputs: Some(codec::encode([
            TerminalDescriptor {
                id: tid(2),
                force: None,
                initial_value: Some(LogicLevel::True),
            },
            TerminalDescriptor::bare(tid(3)),
        ])),
        state: None,
    };

    let mut c = Circuit::new();
    c.restore_component(
        &desc,
        Box::new(Counted {
            inner: SrLatch,
            calls: calls.clone(),
        }),
    )
    .unwrap();
    assert_eq!(c.scheduler().pending_recalculations(), 0);
    assert_eq!(c.scheduler().pending_propagations(), 1);

    c.tick();
    assert_eq!(calls.get(), 0);
    assert_eq!(c.level(tid(2)), Ok(LogicLevel::True));
}

#[test]
fn test_restore_without_saved_levels_recomputes() {
    let calls = Rc::new(Cell::new(0));
    let desc = ComponentDescriptor {
        type_tag: "not".into(),
        params: serde_json::Value::Null,
        reference: None,
        inputs: Some(codec::encode_ids([tid(7)])),
        outputs: Some(codec::encode_ids([tid(8)])),
        state: None,
    };
    let mut c = Circuit::new();
    c.restore_component(
        &desc,
        Box::new(Counted {
            inner: Inverter,
            calls: calls.clone(),
        }),
    )
    .unwrap();
    c.tick();
    assert_eq!(calls.get(), 1);
    assert_eq!(c.level(tid(8)), Ok(LogicLevel::True));
}

#[test]
fn test_restore_rejects_wrong_terminal_count() {
    let desc = ComponentDescriptor {
        type_tag: "not".into(),
        params: serde_json::Value::Null,
        reference: None,
        inputs: Some(codec::encode_ids([tid(0), tid(1)])),
        outputs: Some(codec::encode_ids([tid(2)])),
        state: None,
    };
    let mut c = Circuit::new();
    let err = c.restore_component(&desc, Box::new(Inverter)).unwrap_err();
    assert!(matches!(
        err,
        KernelError::TerminalCountMismatch { expected: 1, found: 2, .. }
    ));
    assert_eq!(c.registry().live_count(), 0);
}

#[test]
fn test_load_rejects_oversized_range_before_expanding() {
    let snapshot = CircuitSnapshot::from_json_str(
        r#"{"components":[{"type":"not","inputs":"0-4294967295","outputs":7}]}"#,
    )
    .unwrap();
    let mut c = Circuit::new();
    let err = c.load(&snapshot, &BuiltinCatalog).unwrap_err();
    assert!(matches!(
        err,
        KernelError::TerminalCountMismatch {
            expected: 1,
            found: 4_294_967_296,
            ..
        }
    ));
    assert_eq!(c.registry().live_count(), 0);
    assert_eq!(c.components().count(), 0);
}

// ── Structural replacement ────────────────────────────────────────────

#[test]
fn test_replace_reattaches_by_label() {
    let mut c = Circuit::new();
    let s0 = c.add_component(Box::new(ConstantSource::new(LogicLevel::True)));
    let s1 = c.add_component(Box::new(ConstantSource::new(LogicLevel::True)));
    let and = c.add_component(Box::new(AndGate::new(2)));
    let probe = c.add_component(Box::new(Probe));
    let w0 = c.connect(output(&c, s0, 0), input(&c, and, 0)).unwrap();
    let w1 = c.connect(output(&c, s1, 0), input(&c, and, 1)).unwrap();
    let w_out = c.connect(output(&c, and, 0), input(&c, probe, 0)).unwrap();
    c.set_reference(and, Some("U1".into())).unwrap();
    c.tick();

    let outcome = c.replace_component(and, Box::new(AndGate::new(1))).unwrap();
    let new = outcome.component;
    assert!(c.component(and).is_none());
    assert_eq!(c.component(new).unwrap().reference(), Some("U1"));

    assert_eq!(outcome.reattached.len(), 2);
    assert_eq!(
        outcome.reattached[0].label,
        TerminalLabel::Grouped {
            group: "in".into(),
            index: 0
        }
    );
    assert_eq!(outcome.reattached[0].wire, w0);
    assert_eq!(outcome.reattached[1].wire, w_out);
    assert_eq!(outcome.dropped, vec![w1]);

    assert_eq!(c.wire(w0).unwrap().end(), input(&c, new, 0));
    assert_eq!(c.wire(w_out).unwrap().start(), output(&c, new, 0));
    assert!(c.wire(w1).is_none());
    assert_eq!(c.level(input(&c, new, 0)), Ok(LogicLevel::True));

    c.tick();
    assert_eq!(c.component(probe).unwrap().value(), &Value::Level(LogicLevel::True));
}

// ── Persistence ───────────────────────────────────────────────────────

#[test]
fn test_template_instantiated_twice() {
    let mut c = Circuit::new();
    let first = c.instantiate(&template(), &BuiltinCatalog).unwrap();
    let second = c.instantiate(&template(), &BuiltinCatalog).unwrap();

    assert!(first.mapping.is_empty());
    assert_eq!(second.mapping.len(), 3);
    assert_eq!(second.mapping.translate(tid(0)), tid(3));
    assert_eq!(second.mapping.translate(tid(2)), tid(5));
    assert_eq!(first.wires.len(), 1);
    assert_eq!(second.wires.len(), 1);
    assert_eq!(c.wire(second.wires[0]).unwrap().start(), tid(3));
    assert_eq!(c.wire(second.wires[0]).unwrap().end(), tid(4));

    c.tick();
    assert_eq!(c.level(tid(2)), Ok(LogicLevel::False));
    let resolved = c.resolve(tid(2), Some(&second.mapping)).unwrap();
    assert_eq!(resolved.id(), tid(5));
    assert_eq!(resolved.observable(), LogicLevel::False);
}

#[test]
fn test_load_collision_reassigns_by_default() {
    let mut c = Circuit::new();
    c.load(&template(), &BuiltinCatalog).unwrap();
    let report = c.load(&template(), &BuiltinCatalog).unwrap();

    assert_eq!(report.components.len(), 2);
    assert_eq!(
        report.anomalies,
        vec![
            IdAnomaly::Collision(tid(0)),
            IdAnomaly::Collision(tid(1)),
            IdAnomaly::Collision(tid(2)),
        ]
    );
    assert_eq!(report.mapping.translate(tid(1)), tid(4));
    assert!(report.skipped_wires.is_empty());
    assert_eq!(c.registry().live_count(), 6);
}

#[test]
fn test_load_collision_rejected_when_strict() {
    let mut c = Circuit::with_config(KernelConfig::strict()).unwrap();
    c.load(&template(), &BuiltinCatalog).unwrap();
    let err = c.load(&template(), &BuiltinCatalog).unwrap_err();
    assert_eq!(err, KernelError::IdCollision(tid(0)));
    assert_eq!(c.components().count(), 2);
    assert_eq!(c.registry().live_count(), 3);
}

#[test]
fn test_load_rolls_back_on_unknown_type() {
    let mut snapshot = template();
    snapshot.components.push(ComponentDescriptor {
        type_tag: "mux".into(),
        params: serde_json::Value::Null,
        reference: None,
        inputs: None,
        outputs: None,
        state: None,
    });
    let mut c = Circuit::new();
    let err = c.load(&snapshot, &BuiltinCatalog).unwrap_err();
    assert_eq!(err, KernelError::UnknownComponentType("mux".into()));
    assert_eq!(c.components().count(), 0);
    assert_eq!(c.registry().live_count(), 0);
}

#[test]
fn test_snapshot_round_trip_keeps_latch_state() {
    let mut c = Circuit::new();
    let set = c.add_component(Box::new(ConstantSource::new(LogicLevel::True)));
    let latch = c.add_component(Box::new(SrLatch));
    c.connect(output(&c, set, 0), input(&c, latch, 0)).unwrap();
    c.tick();
    c.drive(set, Value::Level(LogicLevel::False)).unwrap();
    c.tick();
    let q = output(&c, latch, 0);
    assert_eq!(c.level(q), Ok(LogicLevel::True));

    let json = c.snapshot().unwrap().to_json_string().unwrap();
    let snapshot = CircuitSnapshot::from_json_str(&json).unwrap();
    assert_eq!(snapshot.components[0].state, Some(Value::Level(LogicLevel::False)));

    let mut reloaded = Circuit::new();
    let report = reloaded.load(&snapshot, &BuiltinCatalog).unwrap();
    assert!(report.anomalies.is_empty());
    assert_eq!(report.wires.len(), 1);
    reloaded.tick();
    assert_eq!(reloaded.level(q), Ok(LogicLevel::True));
    assert_eq!(reloaded.level(output(&reloaded, report.components[0], 0)), Ok(LogicLevel::False));
}

#[test]
fn test_record_mapping_nested_session_reported() {
    let mut c = Circuit::new();
    let outer = c.record_mapping(|c| c.record_mapping(|_| ()).anomaly);
    assert_eq!(outer.output, Some(IdAnomaly::NestedSession));
    assert!(outer.anomaly.is_none());
    assert!(!c.registry().is_recording());
}

#[test]
fn test_clear_resets_ids() {
    let mut c = Circuit::new();
    c.instantiate(&template(), &BuiltinCatalog).unwrap();
    c.clear();
    assert_eq!(c.components().count(), 0);
    assert_eq!(c.registry().live_count(), 0);
    assert!(c.is_quiescent());
    let not = c.add_component(Box::new(Inverter));
    assert_eq!(input(&c, not, 0), tid(0));
}

//! voltaic-demo - builds a few small circuits and runs them.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voltaic::codec;
use voltaic::component::builtin::{BuiltinCatalog, ConstantSource, Inverter, Probe};
use voltaic::{
    Circuit, CircuitSnapshot, ComponentId, KernelConfig, KernelError, KernelResult, LogicLevel,
    TerminalId,
};

#[derive(Parser, Debug)]
#[command(name = "voltaic-demo")]
#[command(about = "Run the voltaic kernel on a few demonstration circuits")]
struct Cli {
    /// Ticks to run each circuit for
    #[arg(long, default_value = "3")]
    ticks: u32,

    /// Override the cycle-breaker round limit
    #[arg(long)]
    round_limit: Option<u32>,

    /// Path to a JSON kernel configuration
    #[arg(long)]
    config: Option<PathBuf>,
}

/// A latch saved in the set state, driven by two low sources.
const SAVED_LATCH: &str = r#"{
  "components": [
    { "type": "source", "params": { "level": false }, "outputs": 0 },
    { "type": "source", "params": { "level": false }, "outputs": 1 },
    { "type": "sr-latch", "inputs": [2, 3],
      "outputs": [{ "id": 4, "initialValue": true }, { "id": 5, "initialValue": false }] }
  ],
  "wires": [ { "from": 0, "to": 2 }, { "from": 1, "to": 3 } ]
}"#;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        error!("demo failed: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> KernelResult<KernelConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| KernelError::Config(format!("{}: {}", path.display(), e)))?;
            KernelConfig::from_json_str(&json)?
        }
        None => KernelConfig::default(),
    };
    if let Some(limit) = cli.round_limit {
        config = config.with_round_limit(limit);
    }
    Ok(config)
}

fn run(cli: &Cli) -> KernelResult<()> {
    let config = load_config(cli)?;
    info!(round_limit = config.round_limit, "kernel configured");

    chain(cli, config.clone())?;
    saved_latch(cli, config.clone())?;
    ring_oscillator(config)?;
    Ok(())
}

fn first_output(circuit: &Circuit, id: ComponentId) -> Option<TerminalId> {
    circuit.component(id)?.outputs().all().first().copied()
}

fn first_input(circuit: &Circuit, id: ComponentId) -> Option<TerminalId> {
    circuit.component(id)?.inputs().all().first().copied()
}

fn link(circuit: &mut Circuit, from: ComponentId, to: ComponentId) -> KernelResult<()> {
    let output = first_output(circuit, from).ok_or(KernelError::ComponentNotFound(from))?;
    let input = first_input(circuit, to).ok_or(KernelError::ComponentNotFound(to))?;
    circuit.connect(output, input)?;
    Ok(())
}

/// source → inverter → probe, then toggle the source.
fn chain(cli: &Cli, config: KernelConfig) -> KernelResult<()> {
    println!("── source → inverter → probe ──");
    let mut circuit = Circuit::with_config(config)?;
    let src = circuit.add_component(Box::new(ConstantSource::new(LogicLevel::True)));
    let not = circuit.add_component(Box::new(Inverter));
    let probe = circuit.add_component(Box::new(Probe));
    link(&mut circuit, src, not)?;
    link(&mut circuit, not, probe)?;

    for report in circuit.run_ticks(cli.ticks) {
        println!("  tick: {:?} in {} rounds", report.outcome, report.rounds);
    }
    print_probe(&circuit, probe);

    circuit.drive(src, LogicLevel::False.into())?;
    circuit.tick();
    print_probe(&circuit, probe);

    let ids = codec::encode_ids(circuit.registry().live_ids());
    println!(
        "  live terminal ids: {}",
        serde_json::to_string(&ids).unwrap_or_default()
    );
    println!();
    Ok(())
}

fn print_probe(circuit: &Circuit, probe: ComponentId) {
    if let Some(comp) = circuit.component(probe) {
        println!("  probe sees {:?}", comp.value());
    }
}

/// Reload a latch saved in the set state; it must come back set.
fn saved_latch(cli: &Cli, config: KernelConfig) -> KernelResult<()> {
    println!("── saved SR latch ──");
    let snapshot = CircuitSnapshot::from_json_str(SAVED_LATCH)?;
    let mut circuit = Circuit::with_config(config)?;
    let report = circuit.load(&snapshot, &BuiltinCatalog)?;
    circuit.run_ticks(cli.ticks);

    let q = circuit.level(TerminalId::new(4))?;
    let qbar = circuit.level(TerminalId::new(5))?;
    println!(
        "  {} components, {} wires: Q={} Qbar={}",
        report.components.len(),
        report.wires.len(),
        q,
        qbar
    );
    println!();
    Ok(())
}

/// Three inverters in a loop never settle; the round limit breaks it.
fn ring_oscillator(config: KernelConfig) -> KernelResult<()> {
    println!("── ring oscillator ──");
    let mut circuit = Circuit::with_config(config)?;
    let ring: Vec<ComponentId> = (0..3)
        .map(|_| circuit.add_component(Box::new(Inverter)))
        .collect();
    for (i, id) in ring.iter().enumerate() {
        link(&mut circuit, *id, ring[(i + 1) % ring.len()])?;
    }

    let report = circuit.tick();
    println!("  outcome: {:?}", report.outcome);
    println!("  rounds:  {}", report.rounds);
    println!("  quiescent afterwards: {}", circuit.is_quiescent());
    if let Err(e) = report.into_result() {
        println!("  as error: {}", e);
    }
    Ok(())
}

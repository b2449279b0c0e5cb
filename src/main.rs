use gatesim::*;

use anyhow::{anyhow, Context};
use clap::Parser;
use std::collections::BTreeMap;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Circuit description (JSON).
    filename: String,

    /// Custom component library (JSON).
    #[arg(long)]
    library: Option<String>,

    /// Input pin assignment, eg `--set 0=1 --set 3=0b1010`.
    #[arg(long = "set", value_name = "ID=VALUE")]
    sets: Vec<String>,

    /// Pack the netlist and run it on a compute thread instead of the
    /// reference evaluator. Only plain gate circuits qualify.
    #[arg(long, default_value_t = false)]
    fast: bool,

    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(args.debug)?;

    let text = std::fs::read_to_string(&args.filename).with_context(|| format!("reading {}", args.filename))?;
    let circuit: Circuit = serde_json::from_str(&text).context("parsing circuit")?;

    let library: Library = match &args.library {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&text).context("parsing library")?
        }
        None => Library::new(),
    };
    if let Err(errors) = library.check() {
        for error in &errors {
            eprintln!("{error}");
        }
        eprintln!("Library has {} errors.", errors.len());
        std::process::exit(1);
    }

    let netlist = compile(&circuit, &library);
    for finding in &netlist.findings {
        eprintln!("{finding}");
    }
    if !netlist.valid {
        eprintln!("Circuit has hard findings.");
        std::process::exit(1);
    }

    let inputs = parse_inputs(&args.sets, &circuit)?;

    if args.fast {
        run_fast(&netlist, &inputs)
    } else {
        let mut sim = Sim::new();
        let outputs = sim.evaluate(&netlist, &inputs, &library);
        for (pin, value) in &outputs {
            println!("{pin} = {value}");
        }
        Ok(())
    }
}

fn run_fast(netlist: &Netlist, inputs: &BTreeMap<PinId, Value>) -> anyhow::Result<()> {
    let packed = match pack(netlist, &PackOptions::default()) {
        Ok(packed) => packed,
        Err(errors) => {
            for error in &errors {
                eprintln!("{error}");
            }
            std::process::exit(1);
        }
    };
    let output_pins: Vec<PinId> = packed.outputs.iter().map(|&(pin, _)| pin).collect();

    let worker = Worker::spawn();
    worker.send(Request::Init { packed, shared: SharedConfig::default() });
    match worker.recv()? {
        Response::Ready { comp_count, net_count, .. } => {
            log::info!("compute thread ready: {comp_count} gates, {net_count} nets");
        }
        Response::Error { message, details } => {
            return Err(anyhow!("init failed: {message} {details:?}"));
        }
        other => return Err(anyhow!("unexpected reply: {other:?}")),
    }

    let pins: Vec<PinId> = inputs.keys().copied().collect();
    let values: Vec<bool> = inputs.values().map(|v| v.bit0()).collect();
    worker.send(Request::SetInputs { pins, values });
    worker.send(Request::Run { max_steps: None });
    match worker.recv()? {
        Response::Outputs(values) => {
            for (pin, value) in output_pins.iter().zip(values.iter()) {
                println!("{pin} = {}", Value::bit(*value));
            }
        }
        Response::Error { message, details } => {
            return Err(anyhow!("run failed: {message} {details:?}"));
        }
        other => return Err(anyhow!("unexpected reply: {other:?}")),
    }
    worker.shutdown();
    Ok(())
}

fn parse_inputs(sets: &[String], circuit: &Circuit) -> anyhow::Result<BTreeMap<PinId, Value>> {
    let mut inputs = BTreeMap::new();
    for set in sets {
        let (pin, value) = set
            .split_once('=')
            .ok_or_else(|| anyhow!("malformed --set {set}; expected ID=VALUE"))?;
        let pin: PinId = pin.parse().with_context(|| format!("pin id in --set {set}"))?;
        let bits = parse_bits(value).with_context(|| format!("value in --set {set}"))?;
        inputs.insert(pin, Value::new(circuit.input_width(pin), bits));
    }
    Ok(inputs)
}

fn parse_bits(text: &str) -> anyhow::Result<u64> {
    let bits = if let Some(hex) = text.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)?
    } else if let Some(bin) = text.strip_prefix("0b") {
        u64::from_str_radix(bin, 2)?
    } else {
        text.parse()?
    };
    Ok(bits)
}

fn init_logger(debug: bool) -> anyhow::Result<()> {
    let level = if debug { log::LevelFilter::Debug } else { log::LevelFilter::Warn };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

use anyhow::{Context, Result, anyhow, bail};
use dsdna::engine::{DnaEngine, Engine, Operation, ProjectState, Workflow};
use serde::Serialize;
use std::{env, fs};

const DEFAULT_STATE_PATH: &str = ".dsdna_state.json";

#[derive(Serialize)]
struct SequenceSummary {
    id: String,
    name: String,
    length: usize,
    circular: bool,
    features: usize,
}

#[derive(Serialize)]
struct StateSummary {
    sequence_count: usize,
    sequences: Vec<SequenceSummary>,
    parameters: dsdna::engine::EngineParameters,
}

#[derive(Serialize)]
struct SequenceDetails {
    id: String,
    display: String,
    watson: String,
    crick: String,
    overhang: isize,
    seguid: String,
    /// `lseguid` for linear molecules, `cseguid` for circular ones.
    topology_seguid: String,
}

fn usage() {
    eprintln!(
        "Usage:\n  \
  dsdna_cli --version\n  \
  dsdna_cli [--state PATH] capabilities\n  \
  dsdna_cli [--state PATH] op '<operation-json>'\n  \
  dsdna_cli [--state PATH] workflow '<workflow-json>'\n  \
  dsdna_cli [--state PATH] state-summary\n  \
  dsdna_cli [--state PATH] show SEQ_ID\n  \
  dsdna_cli [--state PATH] export-state PATH\n  \
  dsdna_cli [--state PATH] import-state PATH\n\n  \
  Tip: pass @file.json instead of inline JSON"
    );
}

fn load_json_arg(value: &str) -> Result<String> {
    if let Some(path) = value.strip_prefix('@') {
        fs::read_to_string(path).with_context(|| format!("Could not read JSON file '{path}'"))
    } else {
        Ok(value.to_string())
    }
}

fn load_state(path: &str) -> Result<ProjectState> {
    if std::path::Path::new(path).exists() {
        Ok(ProjectState::load_from_path(path)?)
    } else {
        Ok(ProjectState::default())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Could not serialize JSON output")?;
    println!("{text}");
    Ok(())
}

fn parse_global_state_arg(args: &[String]) -> (String, usize) {
    if args.len() >= 3 && args[1] == "--state" {
        return (args[2].clone(), 3);
    }
    (DEFAULT_STATE_PATH.to_string(), 1)
}

fn summarize_state(engine: &DnaEngine) -> StateSummary {
    let mut sequences: Vec<SequenceSummary> = engine
        .state()
        .sequences
        .iter()
        .map(|(id, record)| SequenceSummary {
            id: id.to_string(),
            name: record.name.clone(),
            length: record.len(),
            circular: record.is_circular(),
            features: record.features().len(),
        })
        .collect();
    sequences.sort_by(|a, b| a.id.cmp(&b.id));

    StateSummary {
        sequence_count: sequences.len(),
        sequences,
        parameters: engine.state().parameters.clone(),
    }
}

fn argument<'a>(args: &'a [String], idx: usize, what: &str) -> Result<&'a String> {
    args.get(idx).ok_or_else(|| {
        usage();
        anyhow!("Missing {what}")
    })
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        usage();
        bail!("Missing command");
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("dsdna {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (state_path, cmd_idx) = parse_global_state_arg(&args);
    let command = argument(&args, cmd_idx, "command")?;

    match command.as_str() {
        "capabilities" => print_json(&DnaEngine::capabilities()),
        "import-state" => {
            let source = argument(&args, cmd_idx + 1, "path for import-state")?;
            let state = ProjectState::load_from_path(source)?;
            state.save_to_path(&state_path)?;
            println!("Loaded state from '{source}' into '{state_path}'");
            Ok(())
        }
        "export-state" => {
            let target = argument(&args, cmd_idx + 1, "path for export-state")?;
            let state = load_state(&state_path)?;
            state.save_to_path(target)?;
            println!("Saved state from '{state_path}' to '{target}'");
            Ok(())
        }
        "state-summary" => {
            let engine = DnaEngine::from_state(load_state(&state_path)?);
            print_json(&summarize_state(&engine))
        }
        "show" => {
            let seq_id = argument(&args, cmd_idx + 1, "SEQ_ID")?;
            let state = load_state(&state_path)?;
            let record = state
                .sequences
                .get(seq_id)
                .ok_or_else(|| anyhow!("Sequence '{seq_id}' not found in state '{state_path}'"))?;
            let topology_seguid = if record.is_circular() {
                record.cseguid()?
            } else {
                record.lseguid()?
            };
            print_json(&SequenceDetails {
                id: seq_id.to_string(),
                display: record.to_string(),
                watson: record.seq().watson_string(),
                crick: record.seq().crick_string(),
                overhang: record.seq().overhang(),
                seguid: record.seguid(),
                topology_seguid,
            })
        }
        "op" => {
            let json = load_json_arg(argument(&args, cmd_idx + 1, "operation JSON")?)?;
            let op: Operation = serde_json::from_str(&json).context("Invalid operation JSON")?;

            let mut engine = DnaEngine::from_state(load_state(&state_path)?);
            let result = engine.apply(op)?;
            engine.state().save_to_path(&state_path)?;
            print_json(&result)
        }
        "workflow" => {
            let json = load_json_arg(argument(&args, cmd_idx + 1, "workflow JSON")?)?;
            let workflow: Workflow =
                serde_json::from_str(&json).context("Invalid workflow JSON")?;

            let mut engine = DnaEngine::from_state(load_state(&state_path)?);
            let results = engine.apply_workflow(workflow)?;
            engine.state().save_to_path(&state_path)?;
            print_json(&results)
        }
        _ => {
            usage();
            bail!("Unknown command '{command}'")
        }
    }
}

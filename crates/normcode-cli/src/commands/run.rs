//! `normcode run` / `resume` / `fork` — the run lifecycle.

use std::path::PathBuf;

use clap::ArgMatches;

use normcode_core::ConceptId;
use normcode_runtime::{CheckpointStore, ReconciliationMode, RunState, Runtime};

use super::common::{compile_plan, default_router, load_paradigms};

fn store_from(matches: &ArgMatches) -> CheckpointStore {
    let dir = matches
        .get_one::<PathBuf>("store")
        .expect("store has a default")
        .clone();
    CheckpointStore::new(dir)
}

fn runtime_from(matches: &ArgMatches) -> Result<Runtime, i32> {
    let compiled = compile_plan(matches)?;
    let paradigms = load_paradigms(matches)?;
    Ok(Runtime::new(
        store_from(matches),
        compiled.concept_repo,
        compiled.inference_repo,
        default_router(),
        paradigms,
    ))
}

fn report(state: RunState, run_id: &str, cycles: u64) -> i32 {
    eprintln!("run {run_id}: {state:?} after {cycles} cycles");
    match state {
        RunState::Completed => 0,
        _ => 1,
    }
}

pub fn start(matches: &ArgMatches) -> i32 {
    let compiled = match compile_plan(matches) {
        Ok(compiled) => compiled,
        Err(code) => return code,
    };
    let finals: Vec<(String, ConceptId)> = compiled
        .concept_repo
        .iter()
        .filter(|(_, c)| c.is_final)
        .map(|(id, c)| (c.name.clone(), id.clone()))
        .collect();
    let paradigms = match load_paradigms(matches) {
        Ok(paradigms) => paradigms,
        Err(code) => return code,
    };
    let runtime = Runtime::new(
        store_from(matches),
        compiled.concept_repo,
        compiled.inference_repo,
        default_router(),
        paradigms,
    );
    match runtime.start() {
        Ok((run_id, outcome)) => {
            if let Ok(snapshot) = runtime.snapshot(&run_id) {
                for (name, id) in &finals {
                    if let Some(reference) = snapshot.bindings.get(id) {
                        println!("{name} = {}", reference.to_nested_json());
                    }
                }
            }
            for flow in &outcome.unsettled {
                eprintln!("unsettled: {flow}");
            }
            report(outcome.state, &run_id, outcome.cycles)
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

pub fn resume(matches: &ArgMatches) -> i32 {
    let runtime = match runtime_from(matches) {
        Ok(runtime) => runtime,
        Err(code) => return code,
    };
    let run_id = matches
        .get_one::<String>("run_id")
        .expect("run-id is required");
    let mode = match matches
        .get_one::<String>("mode")
        .map(String::as_str)
        .unwrap_or("patch")
    {
        "overwrite" => ReconciliationMode::Overwrite,
        "fill-gaps" => ReconciliationMode::FillGaps,
        _ => ReconciliationMode::Patch,
    };
    match runtime.resume(run_id, mode) {
        Ok(outcome) => report(outcome.state, run_id, outcome.cycles),
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

pub fn fork(matches: &ArgMatches) -> i32 {
    let store = store_from(matches);
    let run_id = matches
        .get_one::<String>("run_id")
        .expect("run-id is required");
    match store.fork(run_id) {
        Ok(new_id) => {
            println!("{new_id}");
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

//! Shared plumbing for the commands.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use clap::ArgMatches;

use normcode_compiler::{CompiledPlan, PlanBuilder};
use normcode_runtime::{LiteralFaculty, ParadigmLibrary, PerceptionRouter};

pub fn use_color(matches: &ArgMatches) -> bool {
    match matches
        .get_one::<String>("color")
        .map(String::as_str)
        .unwrap_or("auto")
    {
        "always" => true,
        "never" => false,
        _ => std::io::stderr().is_terminal(),
    }
}

pub fn read_plan(matches: &ArgMatches) -> Result<(PathBuf, String), i32> {
    let path = matches
        .get_one::<PathBuf>("plan")
        .expect("plan arg is required")
        .clone();
    match std::fs::read_to_string(&path) {
        Ok(source) => Ok((path, source)),
        Err(e) => {
            eprintln!("error: cannot read {}: {e}", path.display());
            Err(1)
        }
    }
}

pub fn builder_from(matches: &ArgMatches, source: String) -> PlanBuilder {
    let mut builder = PlanBuilder::new(source);
    if matches
        .try_get_one::<bool>("no_validate")
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
    {
        builder = builder.validate_provisions(false);
    }
    if let Ok(Some(dir)) = matches.try_get_one::<PathBuf>("base_dir") {
        builder = builder.base_dir(dir.clone());
    }
    builder
}

pub fn compile_plan(matches: &ArgMatches) -> Result<CompiledPlan, i32> {
    let (path, source) = read_plan(matches)?;
    let colored = use_color(matches);
    match builder_from(matches, source.clone()).compile() {
        Ok(compiled) => {
            if !compiled.diagnostics.is_empty() {
                eprint!(
                    "{}",
                    compiled
                        .diagnostics
                        .printer(&source)
                        .path(&path.display().to_string())
                        .colored(colored)
                        .render()
                );
            }
            Ok(compiled)
        }
        Err(normcode_compiler::Error::ParseFailed(diag))
        | Err(normcode_compiler::Error::CompileFailed(diag)) => {
            eprint!(
                "{}",
                diag.printer(&source)
                    .path(&path.display().to_string())
                    .colored(colored)
                    .render()
            );
            Err(1)
        }
        Err(e) => {
            eprintln!("error: {e}");
            Err(1)
        }
    }
}

pub fn load_paradigms(matches: &ArgMatches) -> Result<Arc<ParadigmLibrary>, i32> {
    match matches.try_get_one::<PathBuf>("paradigms") {
        Ok(Some(dir)) => match ParadigmLibrary::from_dir(dir) {
            Ok(library) => Ok(Arc::new(library)),
            Err(e) => {
                eprintln!("error: cannot load paradigms from {}: {e}", dir.display());
                Err(1)
            }
        },
        _ => Ok(Arc::new(ParadigmLibrary::new())),
    }
}

pub fn default_router() -> Arc<PerceptionRouter> {
    Arc::new(
        PerceptionRouter::builder()
            .faculty(
                Arc::new(LiteralFaculty::new()),
                &["literal", "truth_value", "in-memory"],
            )
            .build(),
    )
}

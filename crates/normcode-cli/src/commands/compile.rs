//! `normcode compile` — lower a plan to the two repositories.

use std::path::PathBuf;

use clap::ArgMatches;

use super::common::compile_plan;

pub fn run(matches: &ArgMatches) -> i32 {
    let compiled = match compile_plan(matches) {
        Ok(compiled) => compiled,
        Err(code) => return code,
    };
    let out = matches
        .get_one::<PathBuf>("out")
        .expect("out has a default")
        .clone();
    if let Err(e) = compiled.save_to_dir(&out) {
        eprintln!("error: cannot write {}: {e}", out.display());
        return 1;
    }
    eprintln!(
        "wrote {} concepts and {} inferences to {}",
        compiled.concept_repo.len(),
        compiled.inference_repo.len(),
        out.display()
    );
    0
}

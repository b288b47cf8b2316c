//! CLI surface: shared argument builders and the command tree.

pub mod args;

use clap::Command;

use args::{
    base_dir_arg, color_arg, mode_arg, no_validate_arg, out_dir_arg, paradigms_arg, plan_path_arg,
    run_id_arg, store_arg, text_arg,
};

pub fn build_cli() -> Command {
    Command::new("normcode")
        .about("Compile and run NormCode agent plans")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("check")
                .about("Parse and validate a plan, reporting diagnostics")
                .arg(plan_path_arg())
                .arg(color_arg()),
        )
        .subcommand(
            Command::new("compile")
                .about("Lower a plan to concept_repo.json and inference_repo.json")
                .arg(plan_path_arg())
                .arg(out_dir_arg())
                .arg(base_dir_arg())
                .arg(no_validate_arg())
                .arg(color_arg()),
        )
        .subcommand(
            Command::new("dump")
                .about("Show the formalized inference tree")
                .arg(plan_path_arg())
                .arg(text_arg())
                .arg(color_arg()),
        )
        .subcommand(
            Command::new("run")
                .about("Compile and execute a plan")
                .arg(plan_path_arg())
                .arg(paradigms_arg())
                .arg(store_arg())
                .arg(base_dir_arg())
                .arg(no_validate_arg())
                .arg(color_arg()),
        )
        .subcommand(
            Command::new("resume")
                .about("Resume a checkpointed run")
                .arg(plan_path_arg())
                .arg(run_id_arg())
                .arg(mode_arg())
                .arg(paradigms_arg())
                .arg(store_arg()),
        )
        .subcommand(
            Command::new("fork")
                .about("Fork a run at its last checkpoint")
                .arg(run_id_arg())
                .arg(store_arg()),
        )
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn all_subcommands_parse() {
        for argv in [
            vec!["normcode", "check", "plan.ncd"],
            vec!["normcode", "compile", "plan.ncd", "--out", "build"],
            vec!["normcode", "dump", "plan.ncd", "--text"],
            vec!["normcode", "run", "plan.ncd", "--store", "runs"],
            vec![
                "normcode", "resume", "plan.ncd", "--run-id", "r1", "--mode", "overwrite",
            ],
            vec!["normcode", "fork", "--run-id", "r1", "--store", "runs"],
        ] {
            build_cli()
                .try_get_matches_from(&argv)
                .unwrap_or_else(|e| panic!("{argv:?} should parse: {e}"));
        }
    }

    #[test]
    fn missing_subcommand_is_an_error() {
        assert!(build_cli().try_get_matches_from(["normcode"]).is_err());
    }

    #[test]
    fn bad_mode_is_rejected() {
        assert!(
            build_cli()
                .try_get_matches_from([
                    "normcode", "resume", "plan.ncd", "--run-id", "r1", "--mode", "merge",
                ])
                .is_err()
        );
    }
}

//! Shared argument builders, composed into commands by `build_cli`.

use std::path::PathBuf;

use clap::{Arg, ArgAction, value_parser};

/// Plan source file (positional).
pub fn plan_path_arg() -> Arg {
    Arg::new("plan")
        .value_name("PLAN")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Plan source file (.ncds, .ncd, or .pf.ncd)")
}

/// Output directory for compiled repositories (--out).
pub fn out_dir_arg() -> Arg {
    Arg::new("out")
        .long("out")
        .value_name("DIR")
        .default_value("build")
        .value_parser(value_parser!(PathBuf))
        .help("Directory for concept_repo.json and inference_repo.json")
}

/// Paradigm library directory (--paradigms).
pub fn paradigms_arg() -> Arg {
    Arg::new("paradigms")
        .long("paradigms")
        .value_name("DIR")
        .value_parser(value_parser!(PathBuf))
        .help("Directory of paradigm JSON documents")
}

/// Checkpoint store directory (--store).
pub fn store_arg() -> Arg {
    Arg::new("store")
        .long("store")
        .value_name("DIR")
        .default_value("runs")
        .value_parser(value_parser!(PathBuf))
        .help("Checkpoint store directory")
}

/// Base directory for provision paths (--base-dir).
pub fn base_dir_arg() -> Arg {
    Arg::new("base_dir")
        .long("base-dir")
        .value_name("DIR")
        .value_parser(value_parser!(PathBuf))
        .help("Directory provision paths resolve against")
}

/// Skip provision path validation (--no-validate-provisions).
pub fn no_validate_arg() -> Arg {
    Arg::new("no_validate")
        .long("no-validate-provisions")
        .action(ArgAction::SetTrue)
        .help("Do not check provisioned paths against the filesystem")
}

/// Emit plan text instead of the tree dump (--text).
pub fn text_arg() -> Arg {
    Arg::new("text")
        .long("text")
        .action(ArgAction::SetTrue)
        .help("Re-emit formalized plan text instead of the tree dump")
}

/// Run id (--run-id).
pub fn run_id_arg() -> Arg {
    Arg::new("run_id")
        .long("run-id")
        .value_name("ID")
        .required(true)
        .help("Run id of a stored snapshot")
}

/// Reconciliation mode (--mode).
pub fn mode_arg() -> Arg {
    Arg::new("mode")
        .long("mode")
        .value_name("MODE")
        .default_value("patch")
        .value_parser(["patch", "overwrite", "fill-gaps"])
        .help("How to reconcile the snapshot with the plan")
}

/// Colorize diagnostics (--color).
pub fn color_arg() -> Arg {
    Arg::new("color")
        .long("color")
        .value_name("WHEN")
        .default_value("auto")
        .value_parser(["auto", "always", "never"])
        .help("Colorize output")
}

//! `normcode check` — parse and validate without producing artifacts.

use clap::ArgMatches;

use super::common::{builder_from, read_plan, use_color};

pub fn run(matches: &ArgMatches) -> i32 {
    let Ok((path, source)) = read_plan(matches) else {
        return 1;
    };
    let colored = use_color(matches);

    let parsed = match builder_from(matches, source.clone())
        .validate_provisions(false)
        .parse()
    {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    let annotated = parsed.formalize().post_formalize();

    if annotated.diagnostics().is_empty() {
        eprintln!("{}: ok", path.display());
        return 0;
    }

    eprint!(
        "{}",
        annotated
            .diagnostics()
            .printer(&source)
            .path(&path.display().to_string())
            .colored(colored)
            .render()
    );
    if annotated.is_valid() { 0 } else { 1 }
}

//! `normcode dump` — show the formalized tree or re-emitted text.

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
    let formalized = parsed.formalize();

    if !formalized.is_valid() {
        eprint!(
            "{}",
            formalized
                .diagnostics()
                .printer(&source)
                .path(&path.display().to_string())
                .colored(colored)
                .render()
        );
        return 1;
    }

    if matches.get_flag("text") {
        print!("{}", formalized.emit());
    } else {
        print!("{}", formalized.dump());
    }
    0
}

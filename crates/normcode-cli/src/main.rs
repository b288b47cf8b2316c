mod cli;
mod commands;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli::build_cli().get_matches();

    let code = match matches.subcommand() {
        Some(("check", m)) => commands::check::run(m),
        Some(("compile", m)) => commands::compile::run(m),
        Some(("dump", m)) => commands::dump::run(m),
        Some(("run", m)) => commands::run::start(m),
        Some(("resume", m)) => commands::run::resume(m),
        Some(("fork", m)) => commands::run::fork(m),
        _ => unreachable!("clap should have caught this"),
    };
    std::process::exit(code);
}

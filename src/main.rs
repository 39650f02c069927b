mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing(verbose: bool) {
    let default = if verbose { "pe=debug" } else { "pe=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Eval {
            config,
            config_flag,
            output,
            format,
            dry_run,
            timeout,
        } => commands::eval::run(config.or(config_flag), output, format, dry_run, timeout),
        Commands::Render {
            template,
            data,
            vars,
            base_dir,
            check,
        } => commands::render::run(template, data, vars, base_dir, check),
        Commands::Vet { paths, exclude } => commands::vet::run(paths, exclude),
        Commands::Fmt {
            files,
            write,
            output,
            check,
        } => commands::fmt::run(files, write, output, check),
        Commands::Convert {
            input,
            output,
            format,
        } => commands::convert::run(input, output, format),
        Commands::View { file } => commands::view::run(file),
        Commands::Benchmark {
            config,
            config_flag,
            iterations,
            concurrency,
            format,
            output,
            timeout,
        } => commands::benchmark::run(
            config.or(config_flag),
            iterations,
            concurrency,
            format,
            output,
            timeout,
        ),
    }
}

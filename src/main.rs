//! getpack - resource materialization CLI
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use getpack::cli::{commands, AppContext, Cli, Commands};
use getpack::error::{GetpackError, GetpackResult};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        // the program already reported its own failure
        Err(GetpackError::ChildExit(code)) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> GetpackResult<()> {
    let cli = Cli::parse();

    // Completions need neither config nor logging
    if let Commands::Completions(args) = cli.command {
        commands::completions(args);
        return Ok(());
    }

    let manager = AppContext::config_manager(&cli);
    let config = manager.load().await?;
    init_logging(cli.verbose, &config.general.log_format);
    getpack::ui::init_theme();

    let app = AppContext::new(&cli, config, manager.path().to_path_buf())?;

    match cli.command {
        Commands::Completions(_) => unreachable!("Completions handled above"),
        Commands::Fetch(args) => commands::fetch(args, &app).await,
        Commands::Path(args) => commands::path(args, &app).await,
        Commands::List(args) => commands::list(args, &app).await,
        Commands::Catalog(args) => commands::catalog(args, &app).await,
        Commands::Remove(args) => commands::remove(args, &app).await,
        Commands::Clean(args) => commands::clean(args, &app).await,
        Commands::Run(args) => commands::run(args, &app).await,
        Commands::Config(args) => commands::config(args, &app).await,
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug. Logs go to stderr.
fn init_logging(verbose: u8, format: &str) {
    let filter = match verbose {
        0 => EnvFilter::new("getpack=warn"),
        1 => EnvFilter::new("getpack=info"),
        _ => EnvFilter::new("getpack=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}

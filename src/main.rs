mod cli;
mod commands;
mod config;
mod context;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, ProvidersCommand};
use context::AppContext;
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(&format!("{e:#}"));
            if let Some(err) = e.downcast_ref::<providers::Error>() {
                ui::dim(err.category().advice());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Completions don't need detection
    if let Command::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "outfit", &mut io::stdout());
        return Ok(());
    }

    let ctx = AppContext::new(&cli)?;

    match cli.command {
        Command::Detect { json } => commands::detect::run(&ctx, json),
        Command::Providers(cmd) => match cmd {
            ProvidersCommand::List { all } => commands::providers::list(&ctx, all),
            ProvidersCommand::Show { name } => commands::providers::show(&ctx, &name),
        },
        Command::Setup { providers } => commands::setup::setup(&ctx, &providers),
        Command::Teardown { provider } => commands::setup::teardown(&ctx, &provider),
        Command::Packages(cmd) => commands::packages::run(&ctx, cmd),
        Command::Repo(cmd) => commands::repo::run(&ctx, cmd),
        Command::Completions { .. } => Ok(()),
    }
}

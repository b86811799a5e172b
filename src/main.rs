mod cli;
mod commands;
mod config;
mod discovery;
mod engine;
mod error;
mod resource;
mod template;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
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

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    let config = cli.config.as_deref();

    match cli.command {
        Command::Plan(args) => commands::reconcile::plan(&ctx, config, &args),
        Command::Apply(args) => commands::reconcile::apply(&ctx, config, &args),
        Command::Destroy(args) => commands::reconcile::destroy(&ctx, config, &args),
        Command::Status { groups } => commands::status::run(&ctx, config, &groups),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "guacform", &mut io::stdout());
            Ok(())
        }
    }
}

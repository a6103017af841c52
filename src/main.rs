//! htmpload-worker main executable

pub mod annotation;
pub mod common;
pub mod db;
pub mod err;
pub mod genotype;
pub mod htmp;
pub mod postload;
pub mod report;
pub mod strains;

use std::process::{ExitCode, Termination};

use clap::{Args as ClapArgs, Parser, Subcommand};
use console::{Emoji, Term};

use crate::err::ExitStatus;

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "High-throughput mouse phenotype load worker",
    long_about = "Batch stages of the high-throughput MP/LacZ annotation load"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// HTMP source adapter commands.
    Htmp(Htmp),
    /// Genotype resolution and deduplication.
    Genotype(genotype::Args),
    /// Annotation load file emission.
    Annotation(annotation::Args),
    /// Strain load commands.
    Strains(Strains),
    /// Post-load database housekeeping.
    PostMp(postload::Args),
}

/// Parsing of "htmp *" sub commands.
#[derive(Debug, ClapArgs)]
#[command(args_conflicts_with_subcommands = true)]
struct Htmp {
    /// The sub command to run
    #[command(subcommand)]
    command: HtmpCommands,
}

/// Enum supporting the parsing of "htmp *" sub commands.
#[derive(Debug, Subcommand)]
enum HtmpCommands {
    Europheno(htmp::europheno::Args),
    Sanger(htmp::sanger::Args),
    Preprocess(htmp::preprocess::Args),
}

/// Parsing of "strains *" sub commands.
#[derive(Debug, ClapArgs)]
#[command(args_conflicts_with_subcommands = true)]
struct Strains {
    /// The sub command to run
    #[command(subcommand)]
    command: StrainsCommands,
}

/// Enum supporting the parsing of "strains *" sub commands.
#[derive(Debug, Subcommand)]
enum StrainsCommands {
    Load(strains::Args),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let term = Term::stderr();
    let result = tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Htmp(htmp) => match &htmp.command {
                HtmpCommands::Europheno(args) => htmp::europheno::run(&cli.common, args)?,
                HtmpCommands::Sanger(args) => htmp::sanger::run(&cli.common, args)?,
                HtmpCommands::Preprocess(args) => {
                    return htmp::preprocess::run(&cli.common, args);
                }
            },
            Commands::Genotype(args) => genotype::run(&cli.common, args)?,
            Commands::Annotation(args) => annotation::run(&cli.common, args)?,
            Commands::Strains(strains) => match &strains.command {
                StrainsCommands::Load(args) => strains::run(&cli.common, args)?,
            },
            Commands::PostMp(args) => postload::run(&cli.common, args)?,
        }

        Ok::<ExitStatus, anyhow::Error>(ExitStatus::Clean)
    });

    match result {
        Ok(status) => {
            term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))
                .ok();
            status.report()
        }
        Err(e) => {
            term.write_line(&format!("error: {e:#}")).ok();
            ExitCode::from(1)
        }
    }
}

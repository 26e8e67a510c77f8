use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod utils;

#[derive(Parser)]
#[command(name = "runmerge-cmd")]
#[command(about = "Merges sorted index runs into an inverted file and lexicon")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v for info, -vv for debug); RUST_LOG applies otherwise
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge run files into an inverted file and its lexicon
    Merge {
        /// Run files in creation order (can be specified multiple times)
        #[arg(short, long, required = true)]
        run: Vec<PathBuf>,

        /// Output inverted file
        #[arg(long)]
        inverted: PathBuf,

        /// Output lexicon file
        #[arg(long)]
        lexicon: PathBuf,

        /// JSON file with merge options
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip the check that runs cover ascending, non-overlapping document ranges
        #[arg(long)]
        no_verify_ranges: bool,

        /// Number of terms between progress log lines
        #[arg(long)]
        progress_interval: Option<u64>,
    },

    /// Display the header and entries of a run file
    InspectRun {
        /// Show postings as well as terms
        #[arg(long)]
        postings: bool,

        /// Run file to inspect
        run_path: PathBuf,
    },

    /// Print lexicon entries, optionally with their decoded postings
    DumpLexicon {
        /// Inverted file the lexicon points into
        #[arg(long)]
        inverted: Option<PathBuf>,

        /// Lexicon file to dump
        lexicon_path: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Merge {
            run,
            inverted,
            lexicon,
            config,
            no_verify_ranges,
            progress_interval,
        } => commands::merge::run(commands::merge::MergeArgs {
            runs: run,
            inverted,
            lexicon,
            config,
            no_verify_ranges,
            progress_interval,
        }),
        Commands::InspectRun {
            postings,
            run_path,
        } => commands::inspect_run::run(cli.verbose, postings, run_path),
        Commands::DumpLexicon {
            inverted,
            lexicon_path,
        } => commands::dump_lexicon::run(lexicon_path, inverted),
    }
}

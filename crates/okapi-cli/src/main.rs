//! CLI frontend for Okapi dialogue scripts.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "okapi",
    about = "Check, inspect and play Okapi dialogue scripts",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log more (-v debug, -vv trace). RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse scripts and report diagnostics
    Check {
        /// Script files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// TOML speaker list (default: accept any speaker name)
        #[arg(short, long)]
        speakers: Option<PathBuf>,
    },

    /// List the dialogues of a script
    Keys {
        /// Script file
        file: PathBuf,

        /// TOML speaker list
        #[arg(short, long)]
        speakers: Option<PathBuf>,
    },

    /// Print a script in normalised form
    Dump {
        /// Script file
        file: PathBuf,

        /// Print the parsed dialogue graph as JSON instead
        #[arg(long)]
        json: bool,

        /// TOML speaker list
        #[arg(short, long)]
        speakers: Option<PathBuf>,
    },

    /// Play a dialogue interactively on the terminal
    Play {
        /// Script file
        file: PathBuf,

        /// Key of the dialogue to start
        key: String,

        /// Set a variable before starting (name=value, repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        vars: Vec<String>,

        /// TOML speaker list
        #[arg(short, long)]
        speakers: Option<PathBuf>,

        /// RNG seed for random dialogues
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Check { files, speakers } => commands::check::run(&files, speakers.as_deref()),
        Commands::Keys { file, speakers } => commands::keys::run(&file, speakers.as_deref()),
        Commands::Dump {
            file,
            json,
            speakers,
        } => commands::dump::run(&file, json, speakers.as_deref()),
        Commands::Play {
            file,
            key,
            vars,
            speakers,
            seed,
        } => commands::play::run(&file, &key, &vars, speakers.as_deref(), seed),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

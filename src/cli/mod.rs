use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_CONFIG: &str = "./config.yml";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Check every watched branch once and submit runs for new commits.
    Check {
        #[arg(short = 'c', long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// State file (defaults to the user data directory).
        #[arg(short = 's', long)]
        state: Option<PathBuf>,

        /// Append the log to this file instead of stdout.
        #[arg(short = 'l', long)]
        log_file: Option<PathBuf>,
    },

    /// List the measurement machines known to the job queue.
    Machines {
        #[arg(short = 'c', long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Include inactive machines.
        #[arg(short = 'a', long)]
        all: bool,
    },

    /// Show the last commit recorded for each watch.
    State {
        #[arg(short = 's', long)]
        state: Option<PathBuf>,
    },

    /// Forget the recorded commit of a watch so its tip is submitted again.
    Forget {
        repo: String,
        branch: String,

        #[arg(short = 's', long)]
        state: Option<PathBuf>,
    },
}

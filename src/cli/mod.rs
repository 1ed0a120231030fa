//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "vellum",
    version,
    about = "Ask questions about a local document tree",
    long_about = "Vellum indexes the documents under a directory by semantic similarity and \
                  answers natural-language questions from them, citing the files each answer \
                  is grounded in."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/vellum/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question against the documents under a directory
    Ask {
        /// Question to answer
        question: String,

        /// Document root to index
        #[arg(short, long)]
        root: PathBuf,

        /// Number of context chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Emit the answer as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the ranked chunks a question would be grounded on
    Search {
        /// Search query text
        query: String,

        /// Document root to index
        #[arg(short, long)]
        root: PathBuf,

        /// Maximum number of results to return
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the document sources that would be indexed
    Sources {
        /// Document root to index
        #[arg(short, long)]
        root: PathBuf,
    },

    /// Show index statistics for a document root
    Stats {
        /// Document root to index
        #[arg(short, long)]
        root: PathBuf,

        /// Emit statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive question loop over one index
    ///
    /// Builds the index once, then reads questions from stdin.
    /// `/refresh` re-indexes the root, `/sources` lists documents,
    /// `/quit` exits.
    Chat {
        /// Document root to index
        #[arg(short, long)]
        root: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write the default configuration to the default path
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Validate the configuration and report every problem
    Validate,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

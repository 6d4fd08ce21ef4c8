//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// parqstream command-line interface
#[derive(Parser, Debug)]
#[command(name = "parqstream")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Store configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the storage root directory
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a JSON or JSONL file
    Ingest {
        /// File to ingest
        file: PathBuf,

        /// Logical date for the batch (YYYY-MM-DD or RFC 3339); defaults to now
        #[arg(long)]
        date: Option<String>,

        /// Data type tag (log, event, transaction, ...)
        #[arg(short = 't', long)]
        data_type: Option<String>,

        /// Records per write
        #[arg(long, default_value = "10000")]
        chunk_size: usize,
    },

    /// Execute a SQL query against the `all_records` view
    Query {
        /// SQL statement
        sql: String,

        /// Maximum rows to return
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Free-text search across text columns
    Search {
        /// Text to search for
        term: String,

        /// Restrict the search to one column
        #[arg(short = 'C', long)]
        column: Option<String>,

        /// Maximum rows to return
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show dataset statistics
    Stats,

    /// List partition files with metadata
    Files,

    /// Seed the store with generated records
    Seed {
        /// Record kind: user, transaction, or event
        #[arg(default_value = "event")]
        kind: String,

        /// Number of records to generate
        #[arg(short = 'n', long, default_value = "100")]
        count: usize,

        /// Logical date for the batch; defaults to now
        #[arg(long)]
        date: Option<String>,

        /// Data type tag; defaults to the record kind
        #[arg(short = 't', long)]
        data_type: Option<String>,
    },

    /// Start HTTP server mode
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },
}

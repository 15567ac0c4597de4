use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "synapse")]
#[command(version)]
#[command(about = "Periodic jobs and inspection for the adaptive routing-bias engine")]
pub struct Cli {
    /// Data directory (defaults to $SYNAPSE_HOME, then ~/.synapse)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Database file, overriding the data directory
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file, overriding the data directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Rebuild temporal patterns from the full trace history
    Mine,

    /// Relax pathways that have not fired recently
    Decay {
        /// Staleness threshold (defaults to the configured value)
        #[arg(long)]
        days: Option<i64>,
    },

    /// Predict the next category and record the top candidates
    Predict,

    /// Resolve open predictions against the category that actually came next
    Resolve { actual: String },

    /// Show self-measured prediction accuracy
    Accuracy,

    /// Show pathway and feedback counters
    Stats,

    /// List the most used pathways
    Pathways {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// List open predictions
    Pending {
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Show routing bias for a category or for request text
    Bias {
        #[arg(long, conflicts_with = "text", required_unless_present = "text")]
        category: Option<String>,

        #[arg(long)]
        text: Option<String>,
    },

    /// Categorize request text against the worker profiles
    Categorize { text: String },

    /// Record an out-of-band rejection of an answer
    Reject {
        text: String,

        /// Worker that produced the rejected answer (repeatable)
        #[arg(short, long = "worker", required = true)]
        workers: Vec<String>,
    },

    /// Seed an external pattern to prime predictions
    #[command(name = "register-pattern")]
    RegisterPattern {
        category: String,

        #[arg(long)]
        slot: Option<String>,
    },

    /// Print version information
    Version,
}

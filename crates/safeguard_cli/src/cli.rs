//! Command-line definition (clap derive).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const MAX_DRILL_SECONDS: u64 = 60 * 60;

#[derive(Parser)]
#[command(name = "safeguard", about = "Personal safety toolkit", version)]
pub struct Cli {
    /// Config file path (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file; overrides `db_path` from the config
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print core health and version
    Ping,
    /// Manage emergency contacts
    Contacts {
        #[command(subcommand)]
        action: ContactAction,
    },
    /// Track lost items
    Items {
        #[command(subcommand)]
        action: ItemAction,
    },
    /// Manage to-do tasks
    Todos {
        #[command(subcommand)]
        action: TodoAction,
    },
    /// Run a simulated emergency against the stored contacts
    Drill {
        /// How long the session stays active (1..=3600)
        #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..=MAX_DRILL_SECONDS))]
        seconds: u64,
        #[arg(long, default_value = "37.7749", allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, default_value = "-122.4194", allow_hyphen_values = true)]
        lon: f64,
    },
    /// Dump every stored key as JSON
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Restore keys from a JSON dump produced by `export`
    Import {
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ContactAction {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long, default_value = "")]
        relationship: String,
        /// Mark as the primary contact
        #[arg(long)]
        primary: bool,
    },
    List,
    Remove {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ItemAction {
    Report {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "other")]
        category: String,
        /// Where the item was last seen
        #[arg(long, default_value = "")]
        location: String,
        /// Report date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    List {
        /// lost | found | recovered
        #[arg(long)]
        status: Option<String>,
    },
    Status {
        id: String,
        /// lost | found | recovered
        status: String,
    },
}

#[derive(Subcommand)]
pub enum TodoAction {
    Add {
        title: String,
        /// Due time (RFC 3339)
        #[arg(long, conflicts_with = "due_in_hours")]
        due: Option<String>,
        /// Due time relative to now
        #[arg(long)]
        due_in_hours: Option<i64>,
        /// low | medium | high
        #[arg(long, default_value = "medium")]
        priority: String,
    },
    List,
    Done {
        id: String,
    },
}

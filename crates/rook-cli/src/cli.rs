use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "rook",
    about = "Rook -- typed object store for game state",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// JSON snapshot file holding the store (default: rook.json)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Which collection a command addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Kind {
    Users,
    Lobbies,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a record; fails if the key is taken
    Register(RecordArgs),
    /// Modify an existing record; fails if absent
    Update(RecordArgs),
    /// Create or overwrite a record
    Set(RecordArgs),
    /// Show one or more records; fails if any is missing
    Get(GetArgs),
    /// Show every record of a kind
    List(KindArgs),
    /// List every key of a kind
    Keys(KindArgs),
    /// Check whether a record exists
    Exists(KeyArgs),
    /// Delete a record
    Remove(KeyArgs),
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    pub kind: Kind,
    /// The record as JSON, e.g. '{"key":"alice","name":"Alice"}'
    pub json: String,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    pub kind: Kind,
    #[arg(required = true)]
    pub keys: Vec<String>,
}

#[derive(Args, Debug)]
pub struct KindArgs {
    pub kind: Kind,
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    pub kind: Kind,
    pub key: String,
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "satchel",
    about = "Inspect and edit file-backed satchel sessions",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding one JSON document per namespace
    #[arg(long, global = true, default_value = ".satchel")]
    pub dir: PathBuf,

    /// Session namespace to operate on
    #[arg(long, global = true, default_value = satchel_store::DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Log at debug level, overriding RUST_LOG
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as human-readable text or JSON
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the models stored in the namespace
    List,
    /// Print one stored model
    Show(KeyArgs),
    /// Delete one stored model
    Remove(KeyArgs),
    /// Delete every model in the namespace
    Wipe,
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Type key of the model
    pub key: String,
}

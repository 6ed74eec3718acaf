use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AuthMode;

#[derive(Parser, Debug)]
#[command(
    name = "case-intake",
    version,
    about = "Organize legal-case intake folders and classify service events"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Route a source folder into today's Data/Documents layout.
    Run(RunArgs),
    /// Write the judgment tag file for a source folder without moving anything.
    Tag(TagArgs),
    /// Classify service events in a single spreadsheet.
    Classify(ClassifyArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Folder holding the intake files. Prompted for when omitted.
    #[arg(long)]
    pub source: Option<PathBuf>,

    #[command(flatten)]
    pub database: DatabaseArgs,
}

#[derive(Args, Debug, Clone)]
pub struct TagArgs {
    #[arg(long)]
    pub source: PathBuf,

    /// Defaults to `xjmtr.txt` inside the source folder.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    #[arg(long)]
    pub spreadsheet: PathBuf,

    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub database: DatabaseArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// JSON file with `server`, `database`, `auth_mode` and optional `table`.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub db_server: Option<PathBuf>,

    #[arg(long)]
    pub db_name: Option<String>,

    #[arg(long, value_enum)]
    pub db_auth_mode: Option<AuthMode>,

    #[arg(long)]
    pub db_table: Option<String>,
}

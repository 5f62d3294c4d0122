use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use netcfg_diff_core::Model;

#[derive(Parser, Debug)]
#[command(name = "netcfg-sync")]
#[command(about = "Compute commands that bring a device configuration in line with its target")]
pub struct Cli {
    /// Increase log output, may be repeated.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Read settings from this TOML file instead of the built-in defaults.
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Compare two generated target files and show the commands between them.
    Compare(CompareArgs),
    /// Compare a saved device configuration with a generated target file.
    Diff(DiffArgs),
    /// Show parsed objects of one configuration file.
    Inspect(InspectArgs),
    /// Show the command descriptors of a device family.
    Grammar(GrammarArgs),
}

#[derive(Parser, Debug)]
pub struct CompareArgs {
    pub file1: PathBuf,
    pub file2: PathBuf,
    #[command(flatten)]
    pub output: ReportArgs,
}

#[derive(Parser, Debug)]
pub struct DiffArgs {
    /// Configuration as saved from device.
    pub device: PathBuf,
    /// Generated target file; ipv6/ and .raw companions are read as well.
    pub target: PathBuf,
    #[command(flatten)]
    pub output: ReportArgs,
}

#[derive(clap::Args, Debug)]
pub struct ReportArgs {
    /// Device family, overrides .info files and settings.
    #[arg(long)]
    pub model: Option<Model>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Only print changes and warnings.
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    pub file: PathBuf,
    #[arg(long)]
    pub model: Option<Model>,
    /// Only show objects with this prefix, e.g. "object-group".
    #[arg(long)]
    pub prefix: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct GrammarArgs {
    #[arg(long)]
    pub model: Option<Model>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

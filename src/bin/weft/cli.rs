//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Weft - dependency resolution for Python monorepos
#[derive(Parser)]
#[command(name = "weft")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Repository root
    #[arg(long, global = true, env = "WEFT_ROOT", default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register every target and check for dependency cycles
    Check(CheckArgs),

    /// Print the dependencies of a target in build order
    Deps(DepsArgs),

    /// Print descriptor blocks as JSON
    Describe(DescribeArgs),

    /// List registered targets
    Targets(TargetsArgs),

    /// Compare the import map against requirements.txt
    ImportMap(ImportMapArgs),
}

#[derive(Args)]
pub struct CheckArgs {
    /// Fail if any file could not be scanned
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct DepsArgs {
    /// Target key
    #[arg(long)]
    pub target: String,

    /// Include third-party requirements
    #[arg(long = "include-3rdparty")]
    pub include_third_party: bool,

    /// Only list direct dependencies, sorted by key
    #[arg(long)]
    pub direct: bool,
}

#[derive(Args)]
pub struct DescribeArgs {
    /// Only describe targets whose key matches this regex
    #[arg(long)]
    pub target_pattern: Option<String>,
}

#[derive(Args)]
pub struct TargetsArgs {
    /// Only list targets of this kind (library, test, binary, ...)
    #[arg(long)]
    pub kind: Option<String>,
}

#[derive(Args)]
pub struct ImportMapArgs {}

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "rondo",
    about = "Resolve R package dependency stacks across CRAN, Bioconductor, and GitHub",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prime the metadata cache for selected sources
    UpdateCache(UpdateCacheArgs),
    /// Resolve package versions for a project config
    Solve(SolveArgs),
}

#[derive(Args, Debug)]
pub struct UpdateCacheArgs {
    /// Directory where metadata cache files are stored
    #[arg(long = "cache-root", default_value = "cache")]
    pub cache_root: PathBuf,

    /// CRAN package to fetch metadata for (repeatable)
    #[arg(long = "package")]
    pub package: Vec<String>,

    /// Bioconductor release to cache (repeatable)
    #[arg(long = "bioc-release")]
    pub bioc_release: Vec<String>,

    /// Project configuration file to scan for dependencies
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SolveArgs {
    /// Path to the project configuration file
    pub config: PathBuf,

    /// Directory where metadata cache files are stored
    #[arg(long = "cache-root", default_value = "cache")]
    pub cache_root: PathBuf,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Override the R version to lock during resolution
    #[arg(long = "lock-r")]
    pub lock_r: Option<String>,

    /// Preferred Bioconductor release to evaluate against
    #[arg(long = "prefer-bioc")]
    pub prefer_bioc: Option<String>,

    /// Include Suggests dependencies where possible
    #[arg(long = "include-optional")]
    pub include_optional: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// extbuild - build native extensions with the right toolchain
#[derive(Parser)]
#[command(name = "extbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build extensions and install them into the package
    Build(BuildArgs),

    /// Run each extension's clean step
    Clean(CleanArgs),

    /// Check that the tools each adapter needs are installed
    Doctor(DoctorArgs),

    /// List registered adapters in resolution order
    Adapters(AdaptersArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Extension descriptors, relative to the package root
    #[arg(required = true)]
    pub descriptors: Vec<PathBuf>,

    /// Package root (defaults to the current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Destination for compiled extensions
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Library directory to install into
    #[arg(long)]
    pub lib_dir: Option<PathBuf>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Run the toolchain's clean step before compiling
    #[arg(long)]
    pub clean_first: bool,

    /// Continue with remaining extensions after a failure
    #[arg(long)]
    pub keep_going: bool,

    /// Path to the ruby executable
    #[arg(long, env = "EXTBUILD_RUBY")]
    pub ruby: Option<PathBuf>,

    /// Ruby version to build for (detected when omitted)
    #[arg(long)]
    pub ruby_version: Option<String>,

    /// Ruby engine (ruby, jruby, truffleruby)
    #[arg(long)]
    pub engine: Option<String>,

    /// Build only; don't copy libraries into the package
    #[arg(long)]
    pub no_install: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub message_format: MessageFormat,

    /// Extra arguments passed to the toolchain
    #[arg(last = true)]
    pub build_args: Vec<String>,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Extension descriptors, relative to the package root
    #[arg(required = true)]
    pub descriptors: Vec<PathBuf>,

    /// Package root (defaults to the current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Args)]
pub struct DoctorArgs {
    /// Package root whose configured adapters are checked too
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub message_format: MessageFormat,
}

#[derive(Args)]
pub struct AdaptersArgs {
    /// Package root whose configured adapters are listed too
    #[arg(long)]
    pub root: Option<PathBuf>,
}

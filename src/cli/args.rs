use std::path::PathBuf;

use clap::Parser;

use crate::model::library::Linkage;

/// Resolves module substitutions and native library binaries declared by a build descriptor.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub cmd: Command,
    /// Build descriptor to read [default: build.toml]
    #[clap(short, long)]
    pub descriptor: Option<PathBuf>,
    /// Target platform binaries are selected for
    #[clap(short, long)]
    pub platform: Option<String>,
    /// Target flavor binaries are selected for
    #[clap(short, long)]
    pub flavor: Option<String>,
    /// Target build type binaries are selected for
    #[clap(short, long)]
    pub build_type: Option<String>,
    /// Only select binaries with this linkage
    #[clap(short, long)]
    pub linkage: Option<Linkage>,
}

#[derive(Debug, Parser)]
pub enum Command {
    /// Resolves every module and library dependency of the project
    Resolve,
    /// Shows what each module dependency is substituted with
    Modules,
    /// Lists the components that may provide a library
    Candidates {
        /// Library name
        library: String,
    },
}

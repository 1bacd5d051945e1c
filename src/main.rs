use std::path::PathBuf;

use clap::Parser;
use subresolve::{
    cli::{
        args::{CliArgs, Command},
        command_handlers::{do_candidates, do_modules, do_resolve, load_engine},
    },
    config::SubresolveConfig,
    model::descriptor::DEFAULT_DESCRIPTOR_FILE,
    selector::VariantBinarySelector,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli_args = CliArgs::parse();
    let config = SubresolveConfig::load()?;

    let descriptor_path = cli_args
        .descriptor
        .or(config.descriptor_file)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DESCRIPTOR_FILE));
    // Flags take precedence over the environment.
    let target = VariantBinarySelector {
        platform: cli_args.platform.or(config.target.platform),
        flavor: cli_args.flavor.or(config.target.flavor),
        build_type: cli_args.build_type.or(config.target.build_type),
        linkage: cli_args.linkage.or(config.target.linkage),
    };

    let (descriptor, engine) = load_engine(&descriptor_path, target)?;

    match cli_args.cmd {
        Command::Resolve => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(do_resolve(engine, descriptor))
        }
        Command::Modules => do_modules(&engine, &descriptor),
        Command::Candidates { library } => do_candidates(&engine, &descriptor, &library),
    }
}

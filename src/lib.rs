pub mod apply;
pub mod audit;
pub mod canon;
pub mod clean;
pub mod cli;
pub mod columns;
pub mod data;
pub mod fixes;
pub mod ingest;
pub mod layout;
pub mod report;
pub mod standardize;
pub mod star;
pub mod store;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, info};

use crate::cli::{Cli, Commands, RunArgs};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("medallion_managed", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Ingest(args) => ingest::execute(&args),
        Commands::Audit(args) => audit::execute(&args),
        Commands::Clean(args) => clean::execute(&args),
        Commands::Standardize(args) => standardize::execute(&args),
        Commands::Fixes(args) => fixes::execute(&args),
        Commands::Apply(args) => apply::execute(&args),
        Commands::Star(args) => star::execute(&args),
        Commands::Validate(args) => validate::execute(&args),
        Commands::Run(args) => handle_run(&args),
    }
}

/// Thin orchestration: the stages in dependency order, nothing more. Each
/// stage still re-reads its upstream table from the warehouse, so this is
/// exactly equivalent to invoking the commands one by one.
fn handle_run(args: &RunArgs) -> Result<()> {
    info!("Running the full pipeline into {:?}", args.warehouse);
    ingest::execute(&cli::IngestArgs {
        input: args.input.clone(),
        warehouse: args.warehouse.clone(),
        delimiter: args.delimiter,
        input_encoding: args.input_encoding.clone(),
    })?;
    audit::execute(&cli::AuditArgs {
        warehouse: args.warehouse.clone(),
        batch_id: args.batch_id.clone(),
    })?;
    clean::execute(&cli::CleanArgs {
        warehouse: args.warehouse.clone(),
    })?;
    standardize::execute(&cli::StandardizeArgs {
        warehouse: args.warehouse.clone(),
    })?;
    if args.seed.is_some() {
        fixes::execute(&cli::FixesArgs {
            warehouse: args.warehouse.clone(),
            upsert: Vec::new(),
            seed: args.seed.clone(),
            list: false,
        })?;
    }
    apply::execute(&cli::ApplyArgs {
        warehouse: args.warehouse.clone(),
    })?;
    star::execute(&cli::StarArgs {
        warehouse: args.warehouse.clone(),
    })?;
    validate::execute(&cli::ValidateArgs {
        warehouse: args.warehouse.clone(),
        json: false,
    })?;
    Ok(())
}

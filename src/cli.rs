use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Run the bronze/silver/gold cleaning pipeline over the supply-chain extract",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load the source extract into bronze with cleaned column names
    Ingest(IngestArgs),
    /// Stamp the bronze rows with ingestion provenance
    Audit(AuditArgs),
    /// Build silver v1: typed casts and resolved timestamps
    Clean(CleanArgs),
    /// Build silver v2: canonical _std and _key text tiers
    Standardize(StandardizeArgs),
    /// Maintain the curated reference-correction store
    Fixes(FixesArgs),
    /// Build silver v3: substitute curated corrections and re-key
    Apply(ApplyArgs),
    /// Build the gold star schema and validate referential integrity
    Star(StarArgs),
    /// Report data-quality metrics across every tier
    Validate(ValidateArgs),
    /// Run every stage in dependency order
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Source extract CSV file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Warehouse directory
    #[arg(short = 'w', long = "warehouse")]
    pub warehouse: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the extract (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Warehouse directory
    #[arg(short = 'w', long = "warehouse")]
    pub warehouse: PathBuf,
    /// Batch label recorded on every row (defaults to a generated run id)
    #[arg(long = "batch-id")]
    pub batch_id: Option<String>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Warehouse directory
    #[arg(short = 'w', long = "warehouse")]
    pub warehouse: PathBuf,
}

#[derive(Debug, Args)]
pub struct StandardizeArgs {
    /// Warehouse directory
    #[arg(short = 'w', long = "warehouse")]
    pub warehouse: PathBuf,
}

#[derive(Debug, Args)]
pub struct FixesArgs {
    /// Warehouse directory
    #[arg(short = 'w', long = "warehouse")]
    pub warehouse: PathBuf,
    /// Upsert one correction, written as field:bad=good (repeatable)
    #[arg(long = "upsert", action = clap::ArgAction::Append)]
    pub upsert: Vec<String>,
    /// Merge a curated YAML seed file of corrections
    #[arg(long = "seed")]
    pub seed: Option<PathBuf>,
    /// Render the store contents as a table
    #[arg(long = "list")]
    pub list: bool,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Warehouse directory
    #[arg(short = 'w', long = "warehouse")]
    pub warehouse: PathBuf,
}

#[derive(Debug, Args)]
pub struct StarArgs {
    /// Warehouse directory
    #[arg(short = 'w', long = "warehouse")]
    pub warehouse: PathBuf,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Warehouse directory
    #[arg(short = 'w', long = "warehouse")]
    pub warehouse: PathBuf,
    /// Emit the report as JSON instead of a table
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Source extract CSV file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Warehouse directory
    #[arg(short = 'w', long = "warehouse")]
    pub warehouse: PathBuf,
    /// Batch label recorded on every row (defaults to a generated run id)
    #[arg(long = "batch-id")]
    pub batch_id: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the extract (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Correction seed file to merge before the apply stage
    #[arg(long = "seed")]
    pub seed: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

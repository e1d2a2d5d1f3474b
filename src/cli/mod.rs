//! CLI module for mdr-sheet
//!
//! Provides command-line access to:
//! - layout: print the column-position table of a schema
//! - export: records JSON to register workbook
//! - import: register workbook to records JSON

mod args;
mod commands;

pub use args::{Cli, Command, ConfigArgs};
pub use commands::{export, import, layout, load_config};

use crate::record::CollectionInfo;
use anyhow::Context;
use anyhow::Result;

/// Parses the command line and runs the selected command.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let (schema, options) = load_config(&cli.config)?;
    match cli.command {
        Command::Layout { json } => {
            println!("{}", layout(&schema, json)?);
        }
        Command::Export {
            records,
            output,
            name,
            code,
            client,
        } => {
            let collection = name.map(|name| CollectionInfo { name, code, client });
            let count = export(&schema, &options, &records, &output, collection.as_ref())?;
            log::info!("Wrote {} records to {}", count, output.display());
        }
        Command::Import { input, output } => {
            let (json, summary) = import(&schema, &options, &input)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json).with_context(|| format!("Writing {}", path.display()))?;
                }
                None => println!("{}", json),
            }
            eprintln!("{}", summary);
        }
    }
    Ok(())
}

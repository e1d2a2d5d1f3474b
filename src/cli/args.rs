//! CLI argument definitions using clap
//!
//! Commands:
//! - mdr-sheet layout [--schema <path>] [--json]
//! - mdr-sheet export --records <path> --output <path>
//! - mdr-sheet import --input <path> [--output <path>]

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

/// Master document register workbook codec
#[derive(Parser, Debug)]
#[command(name = "mdr-sheet")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Schema and codec options shared by every command
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Stage schema JSON; the standard eight-stage schema when omitted
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    /// Codec options JSON; defaults when omitted
    #[arg(long, global = true)]
    pub options: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the column of every field
    Layout {
        /// Print a JSON object instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Write a register workbook from a records JSON file
    Export {
        /// Category groups as JSON: [{"name": ..., "records": [...]}]
        #[arg(long)]
        records: PathBuf,

        /// Workbook to write
        #[arg(long)]
        output: PathBuf,

        /// Collection name shown in the banner and document properties
        #[arg(long)]
        name: Option<String>,

        /// Collection (project) code
        #[arg(long, default_value = "")]
        code: String,

        /// Client of the collection
        #[arg(long, default_value = "")]
        client: String,
    },

    /// Read a register workbook back into records JSON
    Import {
        /// Workbook to read
        #[arg(long)]
        input: PathBuf,

        /// Records JSON to write; printed to stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

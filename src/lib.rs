//! # Master Document Register Workbook Codec
//!
//! Tracks engineering deliverables through an ordered sequence of
//! review/approval stages and moves that state in and out of the register
//! workbook exchanged between organizations.
//!
//! ## Features
//!
//! - **Schema-driven layout**: any ordered list of stages, each eight or nine
//!   columns wide, maps to one deterministic column-position table
//! - **Merged three-row header**: stage codes, feedback blocks and field
//!   labels laid out exactly as the register expects
//! - **Lossless round trip**: records encoded under a schema decode back to
//!   the same records, category grouping included
//! - **Tolerant import**: stray blank rows are ignored, rows with unreadable
//!   values are skipped and reported, rows before any category are kept
//! - **Schema fingerprint**: workbooks carry the stage list they were written
//!   with, and decoding under a different one fails instead of misreading
//! - **Pure Rust xlsx**: reading and writing built on `zip` and `quick-xml`
//!
//! ## Example
//!
//! ```no_run
//! use mdr_sheet::{CodecOptions, GridRecordDecoder, RecordGridEncoder, RecordsByCategory, StageSchema};
//!
//! let schema = StageSchema::standard();
//! let options = CodecOptions::default();
//! let grid = RecordGridEncoder::new(&schema, &options).encode(&RecordsByCategory::new(), None);
//! let outcome = GridRecordDecoder::new(&schema, &options).decode(&grid)?;
//! assert!(outcome.records.is_empty());
//! # Ok::<(), mdr_sheet::MdrError>(())
//! ```
pub mod cli;
pub mod codec;
pub mod error;
pub mod grid;
mod helpers;
pub mod record;
pub mod schema;
pub mod service;
pub mod spreadsheet;

pub use codec::{
    decode_workbook, encode_workbook, CodecOptions, DecodeOutcome, GridHeaderBuilder, GridRecordDecoder,
    RecordGridEncoder, RowCoercionError,
};
pub use error::MdrError;
pub use grid::{Cell, CellStyle, CellValue, Grid, MergeRegion, RowKind, WorkbookMetadata};
pub use record::{CategoryGroup, CollectionInfo, DocumentRecord, RecordsByCategory, StageRecord};
pub use schema::layout::{compute_layout, ColumnPositionTable, FieldKey, StageColumns, StageField};
pub use schema::{CurrentStateField, LeadingField, SchemaError, StageDefinition, StageSchema};
pub use service::{AccessPolicy, Action, AllowAll, MemoryStore, RecordStore, RegisterService};
pub use spreadsheet::{read_workbook, write_workbook, SpreadsheetError};

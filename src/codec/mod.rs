//! # Register Codec
//!
//! Renders category-grouped document records into the register grid and
//! parses such a grid back. Encoder and decoder derive the same
//! [`ColumnPositionTable`](crate::schema::layout::ColumnPositionTable) from
//! the [`StageSchema`] they are given, which is what makes the round trip
//! lossless.
mod decoder;
mod encoder;
mod header;
mod options;

pub use decoder::{DecodeOutcome, GridRecordDecoder, RowCoercionError};
pub use encoder::{RecordGridEncoder, CREATOR};
pub use header::{GridHeaderBuilder, HEADER_ROWS};
pub use options::CodecOptions;

use crate::error::MdrError;
use crate::record::CollectionInfo;
use crate::record::RecordsByCategory;
use crate::schema::StageSchema;
use crate::spreadsheet;

/// Encodes records and serializes the grid as xlsx bytes.
pub fn encode_workbook(
    schema: &StageSchema,
    options: &CodecOptions,
    records: &RecordsByCategory,
    collection: Option<&CollectionInfo>,
) -> Result<Vec<u8>, MdrError> {
    let grid = RecordGridEncoder::new(schema, options).encode(records, collection);
    spreadsheet::write_workbook(&grid)
}

/// Parses xlsx bytes and decodes the register sheet.
pub fn decode_workbook(schema: &StageSchema, options: &CodecOptions, bytes: &[u8]) -> Result<DecodeOutcome, MdrError> {
    let grid = spreadsheet::read_workbook(bytes, Some(&options.sheet_name))?;
    GridRecordDecoder::new(schema, options).decode(&grid)
}

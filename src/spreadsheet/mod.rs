//! # Workbook Module
//!
//! Reads and writes Office Open XML workbooks (`.xlsx`) as [`Grid`]s.
//! Only the first worksheet (or a named one when reading) takes part; the
//! rest of the package is limited to what the register needs: inline and
//! shared strings, numbers, booleans, error literals, date number formats,
//! merged ranges, column widths, row heights and document properties.
pub(crate) mod cell;
pub(crate) mod reference;
mod styles;
mod writer;
mod xlsx;

use crate::error::MdrError;
use crate::grid::Grid;
use thiserror::Error;

/// Name of the custom document property holding the stage schema fingerprint
pub const SCHEMA_PROPERTY: &str = "StageSchema";

/// Errors raised while reading a workbook package
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Workbook part '{0}' is missing")]
    MissingPart(String),

    #[error("Workbook contains no worksheet")]
    EmptyWorkbook,

    #[error("File is a legacy or password protected workbook, not an xlsx package")]
    NotAnXlsxPackage,

    #[error("Invalid cell reference '{0}'")]
    InvalidCellReference(String),

    #[error("Shared string index {0} is out of range")]
    SharedStringOutOfRange(usize),
}

/// Parses xlsx bytes into a grid.
///
/// Reads the sheet named `preferred_sheet` when the workbook has one,
/// otherwise its first sheet.
pub fn read_workbook(bytes: &[u8], preferred_sheet: Option<&str>) -> Result<Grid, MdrError> {
    xlsx::read_workbook(bytes, preferred_sheet)
}

/// Serializes a grid as xlsx bytes.
pub fn write_workbook(grid: &Grid) -> Result<Vec<u8>, MdrError> {
    writer::write_workbook(grid)
}

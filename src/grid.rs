//! In-memory grid: the two-dimensional cell model the codec writes to and
//! reads from, independent of the workbook file format.
//!
//! Rows and columns are 1-based. A merge region's top-left cell holds the
//! displayed value; the other cells of the region are empty placeholders.
use crate::spreadsheet::reference::index_to_reference;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Scalar value of a cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    /// Spreadsheet error literal such as `#REF!`
    Error(String),
}

impl CellValue {
    pub fn text(value: &str) -> Self {
        CellValue::Text(value.to_owned())
    }

    /// True for `Empty` and for text that is blank after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Rendered text, as used for width estimation and loose comparisons.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.to_owned(),
            CellValue::Number(number) => format_number(*number),
            CellValue::Boolean(value) => if *value { "TRUE" } else { "FALSE" }.to_owned(),
            CellValue::Date(date) => date.format("%Y-%m-%d").to_string(),
            CellValue::Error(error) => error.to_owned(),
        }
    }
}

/// Formats a number without a trailing `.0` for integral values.
pub(crate) fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

/// Visual style of a cell. Each variant maps to one workbook cell format.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CellStyle {
    #[default]
    Plain,
    /// Small wrapped text on the header fill (row 1 banner)
    Banner,
    /// Bold centered label on the header fill
    Header,
    /// Bold left-aligned label on the category fill
    Category,
    /// Bold centered value with border (S/No, document number)
    Identifier,
    /// Centered value with border
    Centered,
    /// Left-aligned value with border (title, remarks)
    Text,
    /// Centered date with border
    Date,
}

impl CellStyle {
    pub const ALL: [CellStyle; 8] = [
        CellStyle::Plain,
        CellStyle::Banner,
        CellStyle::Header,
        CellStyle::Category,
        CellStyle::Identifier,
        CellStyle::Centered,
        CellStyle::Text,
        CellStyle::Date,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
}

/// Rectangular block of cells displayed as one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MergeRegion {
    pub first_row: usize,
    pub first_col: usize,
    pub last_row: usize,
    pub last_col: usize,
}

impl MergeRegion {
    pub fn new(first_row: usize, first_col: usize, last_row: usize, last_col: usize) -> Self {
        Self {
            first_row: first_row.min(last_row),
            first_col: first_col.min(last_col),
            last_row: first_row.max(last_row),
            last_col: first_col.max(last_col),
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row) && (self.first_col..=self.last_col).contains(&col)
    }

    pub fn column_span(&self) -> usize {
        self.last_col - self.first_col + 1
    }

    pub fn row_span(&self) -> usize {
        self.last_row - self.first_row + 1
    }

    pub fn is_single_cell(&self) -> bool {
        self.column_span() == 1 && self.row_span() == 1
    }

    /// Excel-style reference, e.g. `A1:F1`.
    pub fn reference(&self) -> String {
        format!(
            "{}:{}",
            index_to_reference(self.first_row - 1, self.first_col - 1),
            index_to_reference(self.last_row - 1, self.last_col - 1)
        )
    }
}

/// Explicit classification of a grid row, carried alongside the cells.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RowKind {
    Header,
    Category,
    Document,
}

/// Workbook-level document properties.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkbookMetadata {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    /// Stage schema fingerprint the grid was encoded with
    pub schema_fingerprint: Option<String>,
}

/// Sparse two-dimensional cell store with merge regions, row tags and
/// column/row dimensions.
#[derive(Clone, Debug, Default)]
pub struct Grid {
    pub sheet_name: String,
    pub metadata: WorkbookMetadata,
    cells: BTreeMap<(usize, usize), Cell>,
    merges: Vec<MergeRegion>,
    row_kinds: BTreeMap<usize, RowKind>,
    column_widths: BTreeMap<usize, f64>,
    row_heights: BTreeMap<usize, f64>,
}

impl Grid {
    pub fn new(sheet_name: &str) -> Self {
        Self {
            sheet_name: sheet_name.to_owned(),
            ..Default::default()
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: CellValue, style: CellStyle) {
        debug_assert!(row > 0 && col > 0, "grid coordinates are 1-based");
        self.cells.insert((row, col), Cell { value, style });
    }

    pub fn set_text(&mut self, row: usize, col: usize, value: &str, style: CellStyle) {
        self.set(row, col, CellValue::text(value), style);
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Value at a position; missing cells read as `Empty`.
    pub fn value(&self, row: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(&(row, col)).map(|cell| &cell.value).unwrap_or(&EMPTY)
    }

    /// Merges a region. Cells inside it other than the top-left one become
    /// empty placeholders carrying `style`, so the fill is uniform.
    pub fn merge(&mut self, region: MergeRegion, style: CellStyle) {
        for row in region.first_row..=region.last_row {
            for col in region.first_col..=region.last_col {
                if row == region.first_row && col == region.first_col {
                    self.cells.entry((row, col)).or_default().style = style;
                } else {
                    self.set(row, col, CellValue::Empty, style);
                }
            }
        }
        if !region.is_single_cell() {
            self.merges.push(region);
        }
    }

    /// Records a merge region without touching cell values (used by readers).
    pub fn add_merge(&mut self, region: MergeRegion) {
        if !region.is_single_cell() {
            self.merges.push(region);
        }
    }

    pub fn merges(&self) -> &[MergeRegion] {
        &self.merges
    }

    pub fn merge_containing(&self, row: usize, col: usize) -> Option<&MergeRegion> {
        self.merges.iter().find(|region| region.contains(row, col))
    }

    pub fn tag_row(&mut self, row: usize, kind: RowKind) {
        self.row_kinds.insert(row, kind);
    }

    pub fn row_kind(&self, row: usize) -> Option<RowKind> {
        self.row_kinds.get(&row).copied()
    }

    pub fn has_row_kinds(&self) -> bool {
        !self.row_kinds.is_empty()
    }

    /// Drops every row tag, leaving classification to merge inspection.
    pub fn clear_row_kinds(&mut self) {
        self.row_kinds.clear();
    }

    pub fn set_column_width(&mut self, col: usize, width: f64) {
        self.column_widths.insert(col, width);
    }

    pub fn column_width(&self, col: usize) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    pub fn column_widths(&self) -> &BTreeMap<usize, f64> {
        &self.column_widths
    }

    pub fn set_row_height(&mut self, row: usize, height: f64) {
        self.row_heights.insert(row, height);
    }

    pub fn row_height(&self, row: usize) -> Option<f64> {
        self.row_heights.get(&row).copied()
    }

    /// Highest row holding a cell, 0 for an empty grid.
    pub fn max_row(&self) -> usize {
        self.cells.keys().map(|(row, _)| *row).max().unwrap_or(0)
    }

    /// Highest column holding a cell, 0 for an empty grid.
    pub fn max_col(&self) -> usize {
        self.cells.keys().map(|(_, col)| *col).max().unwrap_or(0)
    }

    /// Cells of one row in column order.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, &Cell)> {
        self.cells
            .range((row, 0)..(row + 1, 0))
            .map(|((_, col), cell)| (*col, cell))
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = ((usize, usize), &Cell)> {
        self.cells.iter().map(|(position, cell)| (*position, cell))
    }

    /// True when every cell of `row` up to `width` is blank.
    pub fn is_row_blank(&self, row: usize, width: usize) -> bool {
        self.row(row)
            .take_while(|(col, _)| *col <= width)
            .all(|(_, cell)| cell.value.is_blank())
    }
}

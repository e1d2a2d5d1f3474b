use crate::codec::options::CodecOptions;
use crate::error::MdrError;
use crate::grid::format_number;
use crate::grid::CellValue;
use crate::grid::Grid;
use crate::grid::RowKind;
use crate::record::CollectionInfo;
use crate::record::DocumentRecord;
use crate::record::RecordsByCategory;
use crate::record::StageRecord;
use crate::schema::layout::compute_layout;
use crate::schema::layout::ColumnPositionTable;
use crate::schema::CurrentStateField;
use crate::schema::LeadingField;
use crate::schema::StageSchema;
use crate::spreadsheet::cell::serial_to_date;
use crate::spreadsheet::reference::index_to_reference;
use thiserror::Error;

/// Rows of column A searched for collection details when the workbook has
/// no document properties
const COLLECTION_SCAN_ROWS: usize = 10;

/// A document row whose values could not be interpreted. The row is
/// skipped and decoding continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Row {row}, cell {cell} ({field}): {reason}")]
pub struct RowCoercionError {
    pub row: usize,
    pub cell: String,
    pub field: String,
    pub reason: String,
}

/// Result of decoding a grid.
#[derive(Clone, Debug)]
pub struct DecodeOutcome {
    pub layout: ColumnPositionTable,
    pub records: RecordsByCategory,
    /// Rows dropped because a value could not be coerced
    pub skipped: Vec<RowCoercionError>,
    /// Collection details recovered from the workbook, if any
    pub collection: Option<CollectionInfo>,
}

impl DecodeOutcome {
    /// Number of records recovered.
    pub fn imported(&self) -> usize {
        self.records.len()
    }
}

/// Reads category-grouped records back out of a register grid.
pub struct GridRecordDecoder<'a> {
    schema: &'a StageSchema,
    options: &'a CodecOptions,
    layout: ColumnPositionTable,
}

impl<'a> GridRecordDecoder<'a> {
    pub fn new(schema: &'a StageSchema, options: &'a CodecOptions) -> Self {
        Self {
            schema,
            options,
            layout: compute_layout(schema),
        }
    }

    pub fn layout(&self) -> &ColumnPositionTable {
        &self.layout
    }

    pub fn decode(&self, grid: &Grid) -> Result<DecodeOutcome, MdrError> {
        if let Some(found) = &grid.metadata.schema_fingerprint {
            if !self.schema.matches_fingerprint(found) {
                return Err(MdrError::SchemaMismatch {
                    expected: self.schema.fingerprint(),
                    found: found.to_owned(),
                });
            }
        }

        let header_row = self.find_header(grid)?;
        let first_row = grid
            .merge_containing(header_row, 1)
            .map(|region| region.last_row)
            .unwrap_or(header_row)
            + 1;
        log::debug!("Header sentinel found on row {}, data starts on row {}", header_row, first_row);

        let width = self.layout.width();
        let mut records = RecordsByCategory::new();
        let mut skipped = Vec::new();
        let mut category = None::<String>;
        for row in first_row..=grid.max_row() {
            let Some(kind) = self.classify(grid, row, width) else {
                continue;
            };
            match kind {
                RowKind::Header => log::debug!("Ignoring header-tagged row {}", row),
                RowKind::Category => {
                    let name = grid.value(row, 1).display();
                    let name = if name.trim().is_empty() { self.options.default_category.to_owned() } else { name };
                    records.ensure(&name);
                    category = Some(name);
                }
                RowKind::Document => match self.read_record(grid, row) {
                    Ok(record) if record.is_blank() => {
                        log::debug!("Skipping row {} without document number and title", row);
                    }
                    Ok(record) => {
                        let name = category.as_deref().unwrap_or(&self.options.default_category);
                        records.push(name, record);
                    }
                    Err(error) => {
                        log::warn!("Skipping row: {}", error);
                        skipped.push(error);
                    }
                },
            }
        }

        Ok(DecodeOutcome {
            layout: self.layout.clone(),
            records,
            skipped,
            collection: collection_info(grid),
        })
    }

    /// Row of the header sentinel within the scan depth.
    fn find_header(&self, grid: &Grid) -> Result<usize, MdrError> {
        let sentinel = self.options.header_sentinel.as_str();
        (1..=self.options.header_scan_depth)
            .find(|row| grid.value(*row, 1).as_text().map(str::trim) == Some(sentinel))
            .ok_or_else(|| MdrError::HeaderNotFound {
                sentinel: sentinel.to_owned(),
                scanned: self.options.header_scan_depth,
            })
    }

    /// Uses the row tag when the grid carries one; otherwise a row whose
    /// first cell starts a multi-column merge is a category row, and any
    /// other row is a document row unless it is blank.
    fn classify(&self, grid: &Grid, row: usize, width: usize) -> Option<RowKind> {
        if let Some(kind) = grid.row_kind(row) {
            return Some(kind);
        }
        let is_category = grid
            .merge_containing(row, 1)
            .map(|region| region.first_row == row && region.first_col == 1 && region.column_span() > 1)
            .unwrap_or(false);
        if is_category {
            Some(RowKind::Category)
        } else if grid.is_row_blank(row, width) {
            None
        } else {
            Some(RowKind::Document)
        }
    }

    fn read_record(&self, grid: &Grid, row: usize) -> Result<DocumentRecord, RowCoercionError> {
        let layout = &self.layout;
        let reader = RowReader {
            grid,
            row,
            options: self.options,
        };

        // the serial number is regenerated on encode, only its readability is checked
        reader.text(layout.leading(LeadingField::SerialNumber), LeadingField::SerialNumber.key())?;

        let mut record = DocumentRecord::new(
            &reader.text(layout.leading(LeadingField::DocumentNumber), LeadingField::DocumentNumber.key())?,
            &reader.text(layout.leading(LeadingField::DocumentTitle), LeadingField::DocumentTitle.key())?,
        );
        for field in CurrentStateField::ALL {
            record.set_current(field, reader.text(layout.current(field), field.key())?);
        }

        for stage in layout.stages() {
            let mut values = StageRecord::empty(stage.has_follow_up_revision_field);
            for field in stage.fields() {
                let Some(col) = stage.column(field) else {
                    continue;
                };
                let key = format!("{}.{}", stage.code, field.key());
                let value = if field.is_date() {
                    reader.date(col, &key)?
                } else {
                    reader.text(col, &key)?
                };
                values.set(field, value);
            }
            record.stages.insert(stage.code.to_owned(), values);
        }

        record.remarks = reader.text(layout.remarks(), "remarks")?;
        Ok(record)
    }
}

/// Typed cell access for one grid row.
struct RowReader<'a> {
    grid: &'a Grid,
    row: usize,
    options: &'a CodecOptions,
}

impl RowReader<'_> {
    fn error(&self, col: usize, field: &str, reason: String) -> RowCoercionError {
        RowCoercionError {
            row: self.row,
            cell: index_to_reference(self.row - 1, col - 1),
            field: field.to_owned(),
            reason,
        }
    }

    fn text(&self, col: usize, field: &str) -> Result<String, RowCoercionError> {
        match self.grid.value(self.row, col) {
            CellValue::Empty => Ok(String::new()),
            CellValue::Text(text) => Ok(text.to_owned()),
            CellValue::Number(number) => Ok(format_number(*number)),
            CellValue::Boolean(value) => Ok(if *value { "TRUE" } else { "FALSE" }.to_owned()),
            CellValue::Date(date) => Ok(date.format("%Y-%m-%d").to_string()),
            CellValue::Error(error) => Err(self.error(col, field, format!("error value {error}"))),
        }
    }

    fn date(&self, col: usize, field: &str) -> Result<String, RowCoercionError> {
        match self.grid.value(self.row, col) {
            CellValue::Empty => Ok(String::new()),
            CellValue::Text(text) if text.trim().is_empty() => Ok(String::new()),
            CellValue::Text(text) if self.options.is_date_text(text) || self.options.is_date_placeholder(text) => {
                Ok(text.to_owned())
            }
            CellValue::Text(text) => Err(self.error(col, field, format!("'{text}' is not a date"))),
            CellValue::Date(date) => Ok(date.format("%Y-%m-%d").to_string()),
            CellValue::Number(number) => serial_to_date(*number, false)
                .map(|date| date.format("%Y-%m-%d").to_string())
                .ok_or_else(|| self.error(col, field, format!("{number} is not a date serial"))),
            CellValue::Boolean(value) => Err(self.error(col, field, format!("boolean {value} is not a date"))),
            CellValue::Error(error) => Err(self.error(col, field, format!("error value {error}"))),
        }
    }
}

/// Collection details from the document properties, or failing that from
/// `Project:`/`Portfolio:`, `Project Code:` and `Client:` lines in the
/// first rows of column A.
fn collection_info(grid: &Grid) -> Option<CollectionInfo> {
    collection_from_metadata(grid).or_else(|| collection_from_rows(grid))
}

fn collection_from_metadata(grid: &Grid) -> Option<CollectionInfo> {
    let metadata = &grid.metadata;
    let Some(name) = metadata.title.as_deref().map(str::trim).filter(|name| !name.is_empty()) else {
        return None;
    };
    let strip = |value: &Option<String>, prefix: &str| {
        value
            .as_deref()
            .map(|value| value.strip_prefix(prefix).unwrap_or(value).trim().to_owned())
            .unwrap_or_default()
    };
    Some(CollectionInfo {
        name: name.to_owned(),
        code: strip(&metadata.subject, "Project Code:"),
        client: strip(&metadata.description, "Client:"),
    })
}

fn collection_from_rows(grid: &Grid) -> Option<CollectionInfo> {
    let mut info = CollectionInfo::default();
    for row in 1..=COLLECTION_SCAN_ROWS {
        let Some(text) = grid.value(row, 1).as_text() else {
            continue;
        };
        for line in text.lines().map(str::trim) {
            if let Some(code) = line.strip_prefix("Project Code:") {
                info.code = code.trim().to_owned();
            } else if let Some(name) = line.strip_prefix("Project:").or_else(|| line.strip_prefix("Portfolio:")) {
                info.name = name.trim().to_owned();
            } else if let Some(client) = line.strip_prefix("Client:") {
                info.client = client.trim().to_owned();
            }
        }
    }
    (info != CollectionInfo::default()).then_some(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encoder::RecordGridEncoder;
    use crate::grid::CellStyle;
    use crate::grid::MergeRegion;
    use crate::schema::layout::StageField;
    use crate::schema::StageDefinition;
    use chrono::NaiveDate;

    fn schema() -> StageSchema {
        StageSchema::new(vec![
            StageDefinition::new("IFR", "Review", false),
            StageDefinition::new("IFA", "Approval", true),
        ])
        .unwrap()
    }

    /// Minimal externally authored grid: sentinel on row 1, no merges, no tags.
    fn flat_grid(rows: &[&[(usize, CellValue)]]) -> Grid {
        let mut grid = Grid::new("Sheet1");
        grid.set_text(1, 1, "S/No", CellStyle::Plain);
        for (index, cells) in rows.iter().enumerate() {
            for (col, value) in cells.iter() {
                grid.set(index + 2, *col, value.clone(), CellStyle::Plain);
            }
        }
        grid
    }

    #[test]
    fn header_not_found_beyond_scan_depth() {
        let schema = schema();
        let options = CodecOptions::default();
        let mut grid = Grid::new("Sheet1");
        grid.set_text(21, 1, "S/No", CellStyle::Plain);
        let error = GridRecordDecoder::new(&schema, &options).decode(&grid).unwrap_err();
        assert!(matches!(error, MdrError::HeaderNotFound { scanned: 20, .. }));
    }

    #[test]
    fn mismatched_fingerprint_fails_fast() {
        let schema = schema();
        let options = CodecOptions::default();
        let mut grid = flat_grid(&[]);
        grid.metadata.schema_fingerprint = Some("IFR:0".to_owned());
        let error = GridRecordDecoder::new(&schema, &options).decode(&grid).unwrap_err();
        match error {
            MdrError::SchemaMismatch { expected, found } => {
                assert_eq!(expected, "IFR:0;IFA:1");
                assert_eq!(found, "IFR:0");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn rows_before_any_category_use_the_fallback() {
        let schema = schema();
        let options = CodecOptions::default();
        let grid = flat_grid(&[&[(1, CellValue::Number(1.0)), (2, CellValue::text("D-1")), (3, CellValue::text("Spec"))]]);
        let outcome = GridRecordDecoder::new(&schema, &options).decode(&grid).unwrap();

        assert_eq!(outcome.records.groups().len(), 1);
        let group = outcome.records.get("Unassigned").unwrap();
        assert_eq!(group.records.len(), 1);
        assert_eq!(group.records[0].document_number, "D-1");
        assert_eq!(group.records[0].stage("IFA").unwrap().next_revision, Some(String::new()));
    }

    #[test]
    fn merged_first_cell_marks_a_category_row() {
        let schema = schema();
        let options = CodecOptions::default();
        let mut grid = flat_grid(&[
            &[(1, CellValue::text("Electrical"))],
            &[(2, CellValue::text("E-1")), (3, CellValue::text("Single Line"))],
            &[(1, CellValue::text("Unmerged")), (2, CellValue::text("E-2"))],
        ]);
        grid.add_merge(MergeRegion::new(2, 1, 2, 24));
        let outcome = GridRecordDecoder::new(&schema, &options).decode(&grid).unwrap();

        let group = outcome.records.get("Electrical").unwrap();
        let numbers: Vec<&str> = group.records.iter().map(|record| record.document_number.as_str()).collect();
        assert_eq!(numbers, vec!["E-1", "E-2"]);
        assert!(outcome.records.get("Unmerged").is_none());
    }

    #[test]
    fn bad_date_skips_only_that_row() {
        let schema = schema();
        let options = CodecOptions::default();
        let layout = compute_layout(&schema);
        let planned = layout.stage("IFR").unwrap().column(StageField::DatePlanned).unwrap();
        let received = layout.stage("IFA").unwrap().column(StageField::DateReceived).unwrap();
        let grid = flat_grid(&[
            &[(2, CellValue::text("D-1")), (planned, CellValue::text("not a date"))],
            &[(2, CellValue::text("D-2")), (planned, CellValue::Number(45292.0))],
            &[(2, CellValue::text("D-3")), (received, CellValue::text("TBC"))],
            &[(2, CellValue::text("D-4")), (planned, CellValue::Boolean(true))],
        ]);
        let outcome = GridRecordDecoder::new(&schema, &options).decode(&grid).unwrap();

        let numbers: Vec<&str> = outcome.records.records().map(|record| record.document_number.as_str()).collect();
        assert_eq!(numbers, vec!["D-2", "D-3"]);
        assert_eq!(outcome.imported(), 2);
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(outcome.skipped[0].row, 2);
        assert_eq!(outcome.skipped[0].field, "IFR.datePlanned");
        assert_eq!(outcome.skipped[1].row, 5);
        let d2 = outcome.records.records().next().unwrap();
        assert_eq!(d2.stage("IFR").unwrap().date_planned, "2024-01-01");
        let d3 = outcome.records.records().nth(1).unwrap();
        assert_eq!(d3.stage("IFA").unwrap().date_received, "TBC");
    }

    #[test]
    fn merged_row_without_label_starts_the_fallback_category() {
        let schema = schema();
        let options = CodecOptions::default();
        let mut grid = flat_grid(&[
            &[(1, CellValue::text("Civil"))],
            &[(2, CellValue::text("C-1"))],
            &[],
            &[(2, CellValue::text("X-1"))],
        ]);
        grid.add_merge(MergeRegion::new(2, 1, 2, 24));
        grid.add_merge(MergeRegion::new(4, 1, 4, 24));
        let outcome = GridRecordDecoder::new(&schema, &options).decode(&grid).unwrap();

        let names: Vec<&str> = outcome.records.groups().iter().map(|group| group.name.as_str()).collect();
        assert_eq!(names, vec!["Civil", "Unassigned"]);
        assert_eq!(outcome.records.get("Unassigned").unwrap().records[0].document_number, "X-1");
    }

    #[test]
    fn huge_serial_in_a_date_column_is_a_coercion_error() {
        let schema = schema();
        let options = CodecOptions::default();
        let layout = compute_layout(&schema);
        let planned = layout.stage("IFR").unwrap().column(StageField::DatePlanned).unwrap();
        let grid = flat_grid(&[
            &[(2, CellValue::text("D-1")), (planned, CellValue::Number(1e20))],
            &[(2, CellValue::text("D-2")), (planned, CellValue::Number(f64::MAX))],
            &[(2, CellValue::text("D-3"))],
        ]);
        let outcome = GridRecordDecoder::new(&schema, &options).decode(&grid).unwrap();

        let numbers: Vec<&str> = outcome.records.records().map(|record| record.document_number.as_str()).collect();
        assert_eq!(numbers, vec!["D-3"]);
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(outcome.skipped[0].field, "IFR.datePlanned");
        assert_eq!(outcome.skipped[1].row, 3);
    }

    #[test]
    fn blank_identity_rows_are_skipped_silently() {
        let schema = schema();
        let options = CodecOptions::default();
        let grid = flat_grid(&[&[(1, CellValue::Number(1.0)), (24, CellValue::text("stray remark"))]]);
        let outcome = GridRecordDecoder::new(&schema, &options).decode(&grid).unwrap();
        assert!(outcome.records.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn tags_override_merge_inspection() {
        let schema = schema();
        let options = CodecOptions::default();
        let mut records = RecordsByCategory::new();
        records.push("Civil", DocumentRecord::new("C-1", "Plan"));
        let generated = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let mut grid = RecordGridEncoder::new(&schema, &options).encode_at(&records, None, generated);

        // a document row that happens to look merged still reads as a document
        grid.add_merge(MergeRegion::new(5, 1, 5, 2));
        let outcome = GridRecordDecoder::new(&schema, &options).decode(&grid).unwrap();
        assert_eq!(outcome.records.get("Civil").unwrap().records.len(), 1);
    }

    #[test]
    fn collection_from_properties_or_rows() {
        let mut grid = Grid::new("Sheet1");
        grid.metadata.title = Some("Harbour".to_owned());
        grid.metadata.subject = Some("Project Code: HX-01".to_owned());
        let info = collection_info(&grid).unwrap();
        assert_eq!(info.name, "Harbour");
        assert_eq!(info.code, "HX-01");
        assert_eq!(info.client, "");

        let mut grid = Grid::new("Sheet1");
        grid.set_text(1, 1, "Project: Harbour", CellStyle::Plain);
        grid.set_text(2, 1, "Project Code: HX-01", CellStyle::Plain);
        grid.set_text(3, 1, "Client: Port Authority", CellStyle::Plain);
        let info = collection_info(&grid).unwrap();
        assert_eq!(info.name, "Harbour");
        assert_eq!(info.code, "HX-01");
        assert_eq!(info.client, "Port Authority");

        assert_eq!(collection_info(&Grid::new("Sheet1")), None);
    }
}

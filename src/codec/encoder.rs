use crate::codec::header::GridHeaderBuilder;
use crate::codec::options::CodecOptions;
use crate::grid::CellStyle;
use crate::grid::CellValue;
use crate::grid::Grid;
use crate::grid::MergeRegion;
use crate::grid::RowKind;
use crate::grid::WorkbookMetadata;
use crate::record::CollectionInfo;
use crate::record::DocumentRecord;
use crate::record::RecordsByCategory;
use crate::schema::layout::compute_layout;
use crate::schema::layout::ColumnPositionTable;
use crate::schema::layout::StageField;
use crate::schema::CurrentStateField;
use crate::schema::LeadingField;
use crate::schema::StageSchema;
use crate::spreadsheet::cell::has_date_serial;
use chrono::Local;
use chrono::NaiveDate;
use chrono::NaiveDateTime;

/// Creator recorded in the document properties of written workbooks
pub const CREATOR: &str = "MDR Portfolio Manager";

/// Writes category-grouped records below the header block.
pub struct RecordGridEncoder<'a> {
    schema: &'a StageSchema,
    options: &'a CodecOptions,
    layout: ColumnPositionTable,
}

impl<'a> RecordGridEncoder<'a> {
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

    /// Encodes with the current local time in the banner.
    pub fn encode(&self, records: &RecordsByCategory, collection: Option<&CollectionInfo>) -> Grid {
        self.encode_at(records, collection, Local::now().naive_local())
    }

    /// Encodes with a fixed generation time.
    pub fn encode_at(
        &self,
        records: &RecordsByCategory,
        collection: Option<&CollectionInfo>,
        generated: NaiveDateTime,
    ) -> Grid {
        let mut grid = Grid::new(&self.options.sheet_name);
        grid.metadata = self.metadata(collection);

        let mut banner = format!("Generated: {}", generated.format("%d/%m/%Y %H:%M"));
        if let Some(collection) = collection {
            banner.push_str(&format!("\nPortfolio: {}", collection.name));
        }
        let mut row = GridHeaderBuilder::new(&self.layout, self.options)
            .with_banner(&banner)
            .build(&mut grid);

        let width = self.layout.width();
        for group in records.groups() {
            // blank labels are written as the fallback category
            let name = if group.name.trim().is_empty() { &self.options.default_category } else { &group.name };
            grid.set_text(row, 1, name, CellStyle::Category);
            grid.merge(MergeRegion::new(row, 1, row, width), CellStyle::Category);
            grid.tag_row(row, RowKind::Category);
            row += 1;

            for (index, record) in group.records.iter().enumerate() {
                self.write_record(&mut grid, row, index + 1, record);
                grid.tag_row(row, RowKind::Document);
                row += 1;
            }
            // blank spacer row after each category
            row += 1;
        }

        self.apply_column_widths(&mut grid);
        log::debug!(
            "Encoded {} records in {} categories over {} columns",
            records.len(),
            records.groups().len(),
            width
        );
        grid
    }

    fn metadata(&self, collection: Option<&CollectionInfo>) -> WorkbookMetadata {
        let mut metadata = WorkbookMetadata {
            creator: Some(CREATOR.to_owned()),
            schema_fingerprint: Some(self.schema.fingerprint()),
            ..Default::default()
        };
        if let Some(collection) = collection {
            metadata.title = Some(collection.name.to_owned());
            metadata.subject = Some(format!("Project Code: {}", collection.code));
            metadata.description = Some(format!("Client: {}", collection.client));
            metadata.keywords = Some(format!("MDR,{}", collection.code));
        }
        metadata
    }

    fn write_record(&self, grid: &mut Grid, row: usize, serial: usize, record: &DocumentRecord) {
        let layout = &self.layout;
        grid.set(
            row,
            layout.leading(LeadingField::SerialNumber),
            CellValue::Number(serial as f64),
            CellStyle::Identifier,
        );
        grid.set_text(row, layout.leading(LeadingField::DocumentNumber), &record.document_number, CellStyle::Identifier);
        grid.set_text(row, layout.leading(LeadingField::DocumentTitle), &record.document_title, CellStyle::Text);
        for field in CurrentStateField::ALL {
            grid.set_text(row, layout.current(field), record.current(field), CellStyle::Centered);
        }

        for stage in layout.stages() {
            let values = record.stage(&stage.code);
            for field in stage.fields() {
                let Some(col) = stage.column(field) else {
                    continue;
                };
                let value = values.and_then(|values| values.get(field)).unwrap_or_default();
                if field.is_date() {
                    grid.set(row, col, date_cell(value), CellStyle::Date);
                } else {
                    grid.set_text(row, col, value, CellStyle::Centered);
                }
            }
        }

        grid.set_text(row, layout.remarks(), &record.remarks, CellStyle::Text);
    }

    /// Sizes every column to its longest rendered value, then applies the
    /// fixed overrides. Merge placeholders are empty and add nothing.
    fn apply_column_widths(&self, grid: &mut Grid) {
        let options = self.options;
        let mut longest = vec![0usize; self.layout.width() + 1];
        for ((_, col), cell) in grid.cells() {
            if col >= longest.len() {
                continue;
            }
            let length = cell
                .value
                .display()
                .lines()
                .map(|line| line.chars().count())
                .max()
                .unwrap_or(0);
            longest[col] = longest[col].max(length);
        }

        for (col, length) in longest.into_iter().enumerate().skip(1) {
            let width = (length as f64 + options.column_padding).clamp(options.min_column_width, options.max_column_width);
            grid.set_column_width(col, width);
        }
        grid.set_column_width(self.layout.leading(LeadingField::SerialNumber), options.serial_number_width);
        grid.set_column_width(self.layout.leading(LeadingField::DocumentTitle), options.title_width);
        grid.set_column_width(self.layout.remarks(), options.remarks_width);
    }
}

/// Canonical ISO dates a workbook can hold become date cells; any other
/// text is kept verbatim.
fn date_cell(value: &str) -> CellValue {
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) if date.format("%Y-%m-%d").to_string() == value && has_date_serial(date) => CellValue::Date(date),
        _ => CellValue::text(value),
    }
}

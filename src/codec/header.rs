use crate::codec::options::CodecOptions;
use crate::grid::CellStyle;
use crate::grid::Grid;
use crate::grid::MergeRegion;
use crate::grid::RowKind;
use crate::schema::layout::ColumnPositionTable;
use crate::schema::layout::StageField;
use crate::schema::CurrentStateField;
use crate::schema::LeadingField;

/// Number of rows the header block occupies.
pub const HEADER_ROWS: usize = 3;

const REMARKS_LABEL: &str = "REMARKS";
const CURRENT_STATUS_LABEL: &str = "Current Status";

/// Emits the three-row merged header block for a column layout.
pub struct GridHeaderBuilder<'a> {
    layout: &'a ColumnPositionTable,
    options: &'a CodecOptions,
    banner: String,
}

impl<'a> GridHeaderBuilder<'a> {
    pub fn new(layout: &'a ColumnPositionTable, options: &'a CodecOptions) -> Self {
        Self {
            layout,
            options,
            banner: String::new(),
        }
    }

    /// Free text shown over the leading and current-state columns of row 1.
    pub fn with_banner(mut self, banner: &str) -> Self {
        self.banner = banner.to_owned();
        self
    }

    /// Writes rows 1 to 3 into `grid` and returns the first free row.
    pub fn build(&self, grid: &mut Grid) -> usize {
        let layout = self.layout;
        let current_end = layout.current(CurrentStateField::TransmittalReference);

        // Row 1
        grid.set_text(1, 1, &self.banner, CellStyle::Banner);
        grid.merge(MergeRegion::new(1, 1, 1, current_end), CellStyle::Banner);
        for stage in layout.stages() {
            let submission_end = stage.feedback_start() - 1;
            label(grid, (1, stage.start), (1, submission_end), &stage.code);
            let feedback = format!("Client's Feedback ({} Stage)", stage.code);
            label(grid, (1, stage.feedback_start()), (1, stage.end()), &feedback);
        }
        label(grid, (1, layout.remarks()), (HEADER_ROWS, layout.remarks()), REMARKS_LABEL);

        // Rows 2 and 3
        for field in LeadingField::ALL {
            let col = layout.leading(field);
            label(grid, (2, col), (3, col), field.label());
        }
        label(grid, (2, layout.current_start()), (2, current_end), CURRENT_STATUS_LABEL);
        for field in CurrentStateField::ALL {
            let col = layout.current(field);
            label(grid, (3, col), (3, col), field.label());
        }
        for stage in layout.stages() {
            let date_label = format!("{} Date", stage.code);
            let planned = stage.start + StageField::DatePlanned.offset();
            let actual = stage.start + StageField::DateActual.offset();
            label(grid, (2, planned), (2, actual), &date_label);
            label(grid, (3, planned), (3, planned), StageField::DatePlanned.label());
            label(grid, (3, actual), (3, actual), StageField::DateActual.label());
            for field in stage.fields().skip(2) {
                if let Some(col) = stage.column(field) {
                    label(grid, (2, col), (3, col), field.label());
                }
            }
        }

        for (row, height) in (1..=HEADER_ROWS).zip(self.options.header_row_heights) {
            grid.set_row_height(row, height);
            grid.tag_row(row, RowKind::Header);
        }
        log::debug!("Header spans {} columns", layout.width());
        HEADER_ROWS + 1
    }
}

/// Writes a header label into the top-left cell and merges the region.
fn label(grid: &mut Grid, (first_row, first_col): (usize, usize), (last_row, last_col): (usize, usize), text: &str) {
    grid.set_text(first_row, first_col, text, CellStyle::Header);
    grid.merge(MergeRegion::new(first_row, first_col, last_row, last_col), CellStyle::Header);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellValue;
    use crate::schema::layout::compute_layout;
    use crate::schema::StageDefinition;
    use crate::schema::StageSchema;

    fn build(schema: &StageSchema) -> Grid {
        let layout = compute_layout(schema);
        let options = CodecOptions::default();
        let mut grid = Grid::new("Register");
        let next = GridHeaderBuilder::new(&layout, &options)
            .with_banner("Generated: 01/01/2024 09:00")
            .build(&mut grid);
        assert_eq!(next, 4);
        grid
    }

    fn schema() -> StageSchema {
        StageSchema::new(vec![
            StageDefinition::new("IFR", "Review", false),
            StageDefinition::new("IFA", "Approval", true),
        ])
        .unwrap()
    }

    #[test]
    fn labels_sit_where_the_layout_says() {
        let grid = build(&schema());
        assert_eq!(grid.value(1, 1), &CellValue::text("Generated: 01/01/2024 09:00"));
        assert_eq!(grid.value(2, 1), &CellValue::text("S/No"));
        assert_eq!(grid.value(2, 3), &CellValue::text("DOC Title"));
        assert_eq!(grid.value(2, 4), &CellValue::text("Current Status"));
        assert_eq!(grid.value(3, 6), &CellValue::text("Current Transmittal No."));
        // IFR occupies 7..=14, IFA 15..=23, remarks 24
        assert_eq!(grid.value(1, 7), &CellValue::text("IFR"));
        assert_eq!(grid.value(1, 11), &CellValue::text("Client's Feedback (IFR Stage)"));
        assert_eq!(grid.value(2, 7), &CellValue::text("IFR Date"));
        assert_eq!(grid.value(3, 8), &CellValue::text("Actual"));
        assert_eq!(grid.value(2, 9), &CellValue::text("TR No."));
        assert_eq!(grid.value(2, 23), &CellValue::text("Next Rev."));
        assert_eq!(grid.value(1, 24), &CellValue::text("REMARKS"));
    }

    #[test]
    fn merges_cover_the_expected_regions() {
        let grid = build(&schema());
        let merges = grid.merges();
        assert!(merges.contains(&MergeRegion::new(1, 1, 1, 6)));
        assert!(merges.contains(&MergeRegion::new(2, 1, 3, 1)));
        assert!(merges.contains(&MergeRegion::new(2, 4, 2, 6)));
        assert!(merges.contains(&MergeRegion::new(1, 7, 1, 10)));
        assert!(merges.contains(&MergeRegion::new(1, 11, 1, 14)));
        assert!(merges.contains(&MergeRegion::new(1, 19, 1, 23)));
        assert!(merges.contains(&MergeRegion::new(2, 7, 2, 8)));
        assert!(merges.contains(&MergeRegion::new(2, 23, 3, 23)));
        assert!(merges.contains(&MergeRegion::new(1, 24, 3, 24)));
        assert!(!merges.iter().any(|region| region.row_span() == 1 && region.column_span() == 1));
    }

    #[test]
    fn every_header_cell_is_filled() {
        let grid = build(&schema());
        for row in 1..=HEADER_ROWS {
            for col in 1..=24 {
                let style = grid.get(row, col).map(|cell| cell.style);
                assert!(
                    matches!(style, Some(CellStyle::Header) | Some(CellStyle::Banner)),
                    "row {row} col {col} has {style:?}"
                );
            }
            assert_eq!(grid.row_kind(row), Some(RowKind::Header));
        }
        assert_eq!(grid.row_height(1), Some(60.0));
        assert_eq!(grid.row_height(3), Some(20.0));
    }
}

//! Serializes a [`Grid`] into an xlsx package with a single worksheet.
use crate::error::MdrError;
use crate::grid::Cell;
use crate::grid::CellStyle;
use crate::grid::CellValue;
use crate::grid::Grid;
use crate::grid::WorkbookMetadata;
use crate::grid::format_number;
use crate::helpers::xml::XmlWriter;
use crate::helpers::zip::ZipWriterHelper;
use crate::spreadsheet::cell::date_to_serial;
use crate::spreadsheet::reference::index_to_col;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::styles::write_styles;
use crate::spreadsheet::SCHEMA_PROPERTY;
use std::io::Cursor;
use zip::ZipWriter;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PACKAGE_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const NS_CORE: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
const NS_EXTENDED: &str = "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";
const NS_CUSTOM: &str = "http://schemas.openxmlformats.org/officeDocument/2006/custom-properties";
const NS_VARIANT_TYPES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes";

const REL_OFFICE_DOCUMENT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE: &str = "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_EXTENDED: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_CUSTOM: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/custom-properties";
const REL_WORKSHEET: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

/// Format id of custom document properties
const CUSTOM_PROPERTY_FMTID: &str = "{D5CDD505-2E9C-101B-9397-08002B2CF9AE}";

const MAX_SHEET_NAME: usize = 31;

/// Writes the grid as an xlsx package and returns its bytes.
pub(crate) fn write_workbook(grid: &Grid) -> Result<Vec<u8>, MdrError> {
    let has_custom = grid.metadata.schema_fingerprint.is_some();
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.write_part("[Content_Types].xml", &content_types(has_custom)?)?;
    zip.write_part("_rels/.rels", &package_relationships(has_custom)?)?;
    zip.write_part("docProps/core.xml", &core_properties(&grid.metadata)?)?;
    zip.write_part("docProps/app.xml", &app_properties()?)?;
    if let Some(fingerprint) = &grid.metadata.schema_fingerprint {
        zip.write_part("docProps/custom.xml", &custom_properties(fingerprint)?)?;
    }
    zip.write_part("xl/workbook.xml", &workbook(&grid.sheet_name)?)?;
    zip.write_part("xl/_rels/workbook.xml.rels", &workbook_relationships()?)?;
    zip.write_part("xl/styles.xml", &write_styles()?)?;
    zip.write_part("xl/worksheets/sheet1.xml", &worksheet(grid)?)?;
    Ok(zip.finish()?.into_inner())
}

fn content_types(has_custom: bool) -> Result<Vec<u8>, MdrError> {
    let mut xml = XmlWriter::new()?;
    xml.start("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    xml.empty("Default", &[("Extension", "rels"), ("ContentType", "application/vnd.openxmlformats-package.relationships+xml")])?;
    xml.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    let mut overrides = vec![
        ("/xl/workbook.xml", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"),
        ("/xl/worksheets/sheet1.xml", "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"),
        ("/xl/styles.xml", "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"),
        ("/docProps/core.xml", "application/vnd.openxmlformats-package.core-properties+xml"),
        ("/docProps/app.xml", "application/vnd.openxmlformats-officedocument.extended-properties+xml"),
    ];
    if has_custom {
        overrides.push(("/docProps/custom.xml", "application/vnd.openxmlformats-officedocument.custom-properties+xml"));
    }
    for (part, content_type) in overrides {
        xml.empty("Override", &[("PartName", part), ("ContentType", content_type)])?;
    }
    xml.end("Types")?;
    Ok(xml.into_bytes())
}

fn relationships(targets: &[(&str, &str)]) -> Result<Vec<u8>, MdrError> {
    let mut xml = XmlWriter::new()?;
    xml.start("Relationships", &[("xmlns", NS_PACKAGE_RELATIONSHIPS)])?;
    for (index, (kind, target)) in targets.iter().enumerate() {
        let id = format!("rId{}", index + 1);
        xml.empty("Relationship", &[("Id", &id), ("Type", kind), ("Target", target)])?;
    }
    xml.end("Relationships")?;
    Ok(xml.into_bytes())
}

fn package_relationships(has_custom: bool) -> Result<Vec<u8>, MdrError> {
    let mut targets = vec![
        (REL_OFFICE_DOCUMENT, "xl/workbook.xml"),
        (REL_CORE, "docProps/core.xml"),
        (REL_EXTENDED, "docProps/app.xml"),
    ];
    if has_custom {
        targets.push((REL_CUSTOM, "docProps/custom.xml"));
    }
    relationships(&targets)
}

fn workbook_relationships() -> Result<Vec<u8>, MdrError> {
    relationships(&[(REL_WORKSHEET, "worksheets/sheet1.xml"), (REL_STYLES, "styles.xml")])
}

fn core_properties(metadata: &WorkbookMetadata) -> Result<Vec<u8>, MdrError> {
    let mut xml = XmlWriter::new()?;
    xml.start("cp:coreProperties", &[
        ("xmlns:cp", NS_CORE),
        ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
        ("xmlns:dcterms", "http://purl.org/dc/terms/"),
        ("xmlns:dcmitype", "http://purl.org/dc/dcmitype/"),
        ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
    ])?;
    let fields = [
        ("dc:title", &metadata.title),
        ("dc:subject", &metadata.subject),
        ("dc:creator", &metadata.creator),
        ("cp:keywords", &metadata.keywords),
        ("dc:description", &metadata.description),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            xml.element(name, &[], value)?;
        }
    }
    let created = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    xml.element("dcterms:created", &[("xsi:type", "dcterms:W3CDTF")], &created)?;
    xml.end("cp:coreProperties")?;
    Ok(xml.into_bytes())
}

fn app_properties() -> Result<Vec<u8>, MdrError> {
    let mut xml = XmlWriter::new()?;
    xml.start("Properties", &[("xmlns", NS_EXTENDED)])?;
    xml.element("Application", &[], env!("CARGO_PKG_NAME"))?;
    xml.end("Properties")?;
    Ok(xml.into_bytes())
}

fn custom_properties(fingerprint: &str) -> Result<Vec<u8>, MdrError> {
    let mut xml = XmlWriter::new()?;
    xml.start("Properties", &[("xmlns", NS_CUSTOM), ("xmlns:vt", NS_VARIANT_TYPES)])?;
    xml.start("property", &[("fmtid", CUSTOM_PROPERTY_FMTID), ("pid", "2"), ("name", SCHEMA_PROPERTY)])?;
    xml.element("vt:lpwstr", &[], fingerprint)?;
    xml.end("property")?;
    xml.end("Properties")?;
    Ok(xml.into_bytes())
}

/// Replaces characters worksheet names may not contain and clips the length
fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect();
    if cleaned.trim().is_empty() {
        "Sheet1".to_owned()
    } else {
        cleaned
    }
}

fn workbook(sheet_name: &str) -> Result<Vec<u8>, MdrError> {
    let mut xml = XmlWriter::new()?;
    xml.start("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_RELATIONSHIPS)])?;
    xml.empty("workbookPr", &[("date1904", "0")])?;
    xml.start("sheets", &[])?;
    let name = sanitize_sheet_name(sheet_name);
    xml.empty("sheet", &[("name", &name), ("sheetId", "1"), ("r:id", "rId1")])?;
    xml.end("sheets")?;
    xml.end("workbook")?;
    Ok(xml.into_bytes())
}

fn worksheet(grid: &Grid) -> Result<Vec<u8>, MdrError> {
    let mut xml = XmlWriter::new()?;
    xml.start("worksheet", &[("xmlns", NS_MAIN), ("xmlns:r", NS_RELATIONSHIPS)])?;

    let (max_row, max_col) = (grid.max_row(), grid.max_col());
    let dimension = if max_row == 0 || max_col == 0 {
        "A1".to_owned()
    } else {
        format!("A1:{}", index_to_reference(max_row - 1, max_col - 1))
    };
    xml.empty("dimension", &[("ref", &dimension)])?;
    xml.empty("sheetFormatPr", &[("defaultRowHeight", "15")])?;

    if !grid.column_widths().is_empty() {
        xml.start("cols", &[])?;
        for (col, width) in grid.column_widths() {
            let index = col.to_string();
            let width = width.to_string();
            xml.empty("col", &[("min", &index), ("max", &index), ("width", &width), ("customWidth", "1")])?;
        }
        xml.end("cols")?;
    }

    xml.start("sheetData", &[])?;
    let mut current_row = None::<usize>;
    for ((row, col), cell) in grid.cells() {
        if current_row != Some(row) {
            if current_row.is_some() {
                xml.end("row")?;
            }
            let number = row.to_string();
            let height = grid.row_height(row).map(|height| height.to_string());
            match &height {
                Some(height) => xml.start("row", &[("r", &number), ("ht", height), ("customHeight", "1")])?,
                None => xml.start("row", &[("r", &number)])?,
            }
            current_row = Some(row);
        }
        write_cell(&mut xml, row, col, cell)?;
    }
    if current_row.is_some() {
        xml.end("row")?;
    }
    xml.end("sheetData")?;

    if !grid.merges().is_empty() {
        xml.start("mergeCells", &[("count", &grid.merges().len().to_string())])?;
        for region in grid.merges() {
            xml.empty("mergeCell", &[("ref", &region.reference())])?;
        }
        xml.end("mergeCells")?;
    }

    xml.end("worksheet")?;
    Ok(xml.into_bytes())
}

fn write_cell(xml: &mut XmlWriter, row: usize, col: usize, cell: &Cell) -> Result<(), MdrError> {
    let reference = format!("{}{}", index_to_col(col - 1), row);
    // dates only render as dates under a date number format
    let style = match cell.value {
        CellValue::Date(_) => CellStyle::Date,
        _ => cell.style,
    };
    let style = style.index().to_string();
    let mut attributes = vec![("r", reference.as_str()), ("s", style.as_str())];
    match &cell.value {
        CellValue::Empty => xml.empty("c", &attributes)?,
        CellValue::Text(text) => {
            attributes.push(("t", "inlineStr"));
            xml.start("c", &attributes)?;
            xml.start("is", &[])?;
            xml.element("t", &[("xml:space", "preserve")], text)?;
            xml.end("is")?;
            xml.end("c")?;
        }
        CellValue::Number(number) => {
            xml.start("c", &attributes)?;
            xml.element("v", &[], &format_number(*number))?;
            xml.end("c")?;
        }
        CellValue::Date(date) => {
            xml.start("c", &attributes)?;
            xml.element("v", &[], &format_number(date_to_serial(*date)))?;
            xml.end("c")?;
        }
        CellValue::Boolean(value) => {
            attributes.push(("t", "b"));
            xml.start("c", &attributes)?;
            xml.element("v", &[], if *value { "1" } else { "0" })?;
            xml.end("c")?;
        }
        CellValue::Error(error) => {
            attributes.push(("t", "e"));
            xml.start("c", &attributes)?;
            xml.element("v", &[], error)?;
            xml.end("c")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MergeRegion;
    use crate::spreadsheet::xlsx::read_workbook;
    use chrono::NaiveDate;

    #[test]
    fn sheet_names_are_sanitized() {
        assert_eq!(sanitize_sheet_name("Plan [A/B]"), "Plan _A_B_");
        assert_eq!(sanitize_sheet_name(""), "Sheet1");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).len(), MAX_SHEET_NAME);
    }

    #[test]
    fn worksheet_lists_rows_cells_and_merges() {
        let mut grid = Grid::new("Register");
        grid.set_text(1, 1, "Banner", CellStyle::Banner);
        grid.merge(MergeRegion::new(1, 1, 1, 3), CellStyle::Banner);
        grid.set(2, 2, CellValue::Number(7.0), CellStyle::Centered);
        grid.set_row_height(1, 60.0);
        grid.set_column_width(1, 8.0);

        let xml = String::from_utf8(worksheet(&grid).unwrap()).unwrap();
        assert!(xml.contains("<dimension ref=\"A1:C2\"/>"));
        assert!(xml.contains("<row r=\"1\" ht=\"60\" customHeight=\"1\">"));
        assert!(xml.contains("<c r=\"B1\" s=\"1\"/>"));
        assert!(xml.contains("<c r=\"B2\" s=\"5\"><v>7</v></c>"));
        assert!(xml.contains("<col min=\"1\" max=\"1\" width=\"8\" customWidth=\"1\"/>"));
        assert!(xml.contains("<mergeCell ref=\"A1:C1\"/>"));
    }

    #[test]
    fn written_package_reads_back() -> Result<(), MdrError> {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let mut grid = Grid::new("Master Document Register");
        grid.metadata = WorkbookMetadata {
            title: Some("Harbour".to_owned()),
            subject: Some("Project Code: HX-01".to_owned()),
            creator: Some("MDR Portfolio Manager".to_owned()),
            schema_fingerprint: Some("IFR:0".to_owned()),
            ..Default::default()
        };
        grid.set_text(1, 1, "  padded & <escaped>  ", CellStyle::Text);
        grid.set(1, 2, CellValue::Date(date), CellStyle::Centered);
        grid.set(2, 1, CellValue::Boolean(false), CellStyle::Plain);
        grid.set(2, 2, CellValue::Error("#DIV/0!".to_owned()), CellStyle::Plain);
        grid.set(2, 3, CellValue::Number(2.25), CellStyle::Plain);
        grid.merge(MergeRegion::new(3, 1, 4, 1), CellStyle::Header);

        let bytes = write_workbook(&grid)?;
        let read = read_workbook(&bytes, None)?;

        assert_eq!(read.sheet_name, "Master Document Register");
        assert_eq!(read.value(1, 1), &CellValue::text("  padded & <escaped>  "));
        assert_eq!(read.value(1, 2), &CellValue::Date(date));
        assert_eq!(read.value(2, 1), &CellValue::Boolean(false));
        assert_eq!(read.value(2, 2), &CellValue::Error("#DIV/0!".to_owned()));
        assert_eq!(read.value(2, 3), &CellValue::Number(2.25));
        assert_eq!(read.merges(), grid.merges());
        assert_eq!(read.metadata.title.as_deref(), Some("Harbour"));
        assert_eq!(read.metadata.creator.as_deref(), Some("MDR Portfolio Manager"));
        assert_eq!(read.metadata.schema_fingerprint.as_deref(), Some("IFR:0"));
        Ok(())
    }
}

use crate::error::MdrError;
use crate::error::ResultMessage;
use crate::grid::CellStyle;
use crate::grid::CellValue;
use crate::grid::Grid;
use crate::grid::MergeRegion;
use crate::grid::WorkbookMetadata;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::is_error_literal;
use crate::spreadsheet::cell::serial_to_date;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::range_to_index;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::SCHEMA_PROPERTY;
use chrono::NaiveDate;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");   // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_COLUMN: QName = QName(b"col");              // Column dimensions
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content
const TAG_MERGE_CELL: QName = QName(b"mergeCell");    // Merged range
const TAG_PROPERTY: &[u8] = b"property";              // Custom document property

/// Leading bytes of a compound file (legacy `.xls` or an encrypted package)
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Highest column index a worksheet may address
const MAX_COLUMN: usize = 16_384;

/// Raw cell kind from the `t` attribute
#[derive(Copy, Clone, Debug, PartialEq)]
enum ValueKind {
    Number,
    SharedString,
    InlineString,
    FormulaString,
    Boolean,
    Error,
    IsoDate,
}

impl ValueKind {
    fn parse(kind: Option<&str>) -> Self {
        match kind {
            Some("s") => ValueKind::SharedString,
            Some("inlineStr") => ValueKind::InlineString,
            Some("str") => ValueKind::FormulaString,
            Some("b") => ValueKind::Boolean,
            Some("e") => ValueKind::Error,
            Some("d") => ValueKind::IsoDate,
            _ => ValueKind::Number,
        }
    }
}

/// Workbook-wide lookup tables needed to resolve cell values
struct WorkbookContext {
    shared_strings: Vec<String>,
    number_formats: Vec<CellType>,
    is_1904: bool,
}

/// Reads one worksheet of an xlsx package into a [`Grid`].
///
/// The sheet called `preferred_sheet` is read when present, otherwise the
/// first sheet of the workbook. Document properties and the stage schema
/// fingerprint are carried over into [`Grid::metadata`].
pub(crate) fn read_workbook(bytes: &[u8], preferred_sheet: Option<&str>) -> Result<Grid, MdrError> {
    if bytes.starts_with(&CFB_SIGNATURE) {
        Err(SpreadsheetError::NotAnXlsxPackage)?
    }

    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let (sheets, is_1904) = load_workbook(&mut zip)?;
    let (sheet_name, sheet_path) = preferred_sheet
        .and_then(|name| sheets.iter().find(|(sheet, _)| sheet == name))
        .or_else(|| sheets.first())
        .cloned()
        .ok_or(SpreadsheetError::EmptyWorkbook)?;
    log::debug!("Reading worksheet '{}' from {}", sheet_name, sheet_path);

    let context = WorkbookContext {
        shared_strings: load_shared_strings(&mut zip)?,
        number_formats: load_number_formats(&mut zip)?,
        is_1904,
    };

    let mut grid = Grid::new(&sheet_name);
    read_sheet(&mut zip, &sheet_path, &context, &mut grid).with_prefix(&sheet_name)?;
    grid.metadata = load_metadata(&mut zip)?;
    Ok(grid)
}

/// Loads worksheet relationships of the workbook part
///
/// # Returns
/// Mapping of relationship IDs to worksheet paths
fn load_relationships<RS: Read + Seek>(zip: &mut ZipArchive<RS>, path: &str) -> Result<HashMap<String, String>, MdrError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::MissingPart(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // Only process worksheet relationships
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Normalizes a relationship target to a path inside the package
fn to_zip_path(path: Cow<'_, str>) -> String {
    if path.starts_with("/xl/") {
        path[1..].to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Loads worksheet names with their part paths, and whether the workbook
/// uses the 1904 date system
fn load_workbook<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<(Vec<(String, String)>, bool), MdrError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::MissingPart("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&id.to_string()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads the number format of every cell style, indexed by style ID
fn load_number_formats<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<CellType>, MdrError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => break,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?.unwrap_or(Cow::Borrowed("0"));
            format_indexes.push(id.to_string());
        }
    });

    Ok(format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id))
                .unwrap_or(CellType::Number)
        })
        .collect())
}

/// Loads the shared string table; a package without one has no shared strings
fn load_shared_strings<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<String>, MdrError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Reads cells, merged ranges, column widths and row heights of one worksheet
fn read_sheet<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    path: &str,
    context: &WorkbookContext,
    grid: &mut Grid,
) -> Result<(), MdrError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::MissingPart(path.to_string()))?;

    let mut row_count = 0usize;
    let mut col_count = 0usize;
    let mut row = 0usize;
    let mut col = 0usize;
    let mut kind = ValueKind::Number;
    let mut style = None::<usize>;
    let mut value = String::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_COLUMN => {
            let min = event.parse_attribute_value::<usize>("min")?;
            let max = event.parse_attribute_value::<usize>("max")?;
            let width = event.parse_attribute_value::<f64>("width")?;
            if let (Some(min), Some(width)) = (min, width) {
                let max = max.unwrap_or(min).min(MAX_COLUMN);
                for index in min..=max {
                    grid.set_column_width(index, width);
                }
            }
        }
        Event::Start(event) if event.name() == TAG_ROW => {
            row_count = event.parse_attribute_value::<usize>("r")?
                .map(|number| number.saturating_sub(1))
                .unwrap_or(row_count);
            col_count = 0;
            if let Some(height) = event.parse_attribute_value::<f64>("ht")? {
                grid.set_row_height(row_count + 1, height);
            }
        }
        Event::End(event) if event.name() == TAG_ROW => {
            row_count += 1;
        }
        Event::Start(event) if event.name() == TAG_CELL => {
            (row, col) = event.get_attribute_value("r")?
                .and_then(|reference| reference_to_index(&reference))
                .unwrap_or((row_count, col_count));
            col_count = col + 1;
            kind = ValueKind::parse(event.get_attribute_value("t")?.as_deref());
            style = event.get_attribute_value("s")?
                .filter(|index| !index.is_empty())
                .map(|index| index.parse::<usize>())
                .transpose()?;
            value.clear();
        }
        Event::Start(event) if event.name() == TAG_INLINE_STRING => {
            value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
        }
        Event::Start(event) if event.name() == TAG_VALUE => {
            value = read_string_value(&mut reader, TAG_VALUE, true)?;
        }
        Event::End(event) if event.name() == TAG_CELL => {
            if !value.is_empty() {
                let cell = to_cell_value(kind, &value, style, context)
                    .with_prefix(&index_to_reference(row, col))?;
                let cell_style = match cell {
                    CellValue::Date(_) => CellStyle::Date,
                    _ => CellStyle::Plain,
                };
                grid.set(row + 1, col + 1, cell, cell_style);
            }
        }
        Event::Start(event) if event.name() == TAG_MERGE_CELL => {
            if let Some(range) = event.get_attribute_value("ref")? {
                let ((first_row, first_col), (last_row, last_col)) = range_to_index(&range)
                    .ok_or_else(|| SpreadsheetError::InvalidCellReference(range.to_string()))?;
                grid.add_merge(MergeRegion::new(first_row + 1, first_col + 1, last_row + 1, last_col + 1));
            }
        }
    });
    Ok(())
}

/// Converts the raw text of a `<v>` or `<is>` element to a cell value
fn to_cell_value(kind: ValueKind, value: &str, style: Option<usize>, context: &WorkbookContext) -> Result<CellValue, MdrError> {
    let cell = match kind {
        ValueKind::SharedString => {
            let index = value.trim().parse::<usize>()?;
            let string = context.shared_strings
                .get(index)
                .ok_or(SpreadsheetError::SharedStringOutOfRange(index))?;
            CellValue::Text(string.to_owned())
        }
        ValueKind::InlineString => CellValue::Text(value.to_owned()),
        ValueKind::FormulaString if is_error_literal(value) => CellValue::Error(value.to_owned()),
        ValueKind::FormulaString => CellValue::Text(value.to_owned()),
        ValueKind::Boolean => CellValue::Boolean(value.trim() == "1" || value.trim().eq_ignore_ascii_case("true")),
        ValueKind::Error => CellValue::Error(value.to_owned()),
        ValueKind::IsoDate => value
            .get(..10)
            .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(value.to_owned())),
        ValueKind::Number => {
            let number = value.trim().parse::<f64>()?;
            let cell_type = style
                .and_then(|index| context.number_formats.get(index))
                .copied()
                .unwrap_or_default();
            match cell_type.is_date().then(|| serial_to_date(number, context.is_1904)).flatten() {
                Some(date) => CellValue::Date(date),
                None => CellValue::Number(number),
            }
        }
    };
    Ok(cell)
}

/// Reads string value from XML content, skipping phonetic annotations
///
/// # Arguments
/// * `reader` - XML reader positioned at the start of the string content
/// * `end_tag` - XML tag that marks the end of the string content
/// * `is_text_content` - Whether to treat the content as text by default
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, MdrError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

/// Reads the text of an element whose start tag was just consumed,
/// matching the end tag by local name so namespace prefixes may vary
fn read_element_text<R: BufRead>(reader: &mut XmlReader<R>, local_name: &[u8]) -> Result<String, MdrError> {
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.local_name().as_ref() == local_name => break,
        Event::Text(event) => text.push_bytes_text(&event)?,
        Event::GeneralRef(event) => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

/// Loads core and custom document properties
fn load_metadata<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<WorkbookMetadata, MdrError> {
    let mut metadata = WorkbookMetadata::default();

    if let Some(mut reader) = zip.xml_reader("docProps/core.xml")? {
        while let Some(result) = reader.next()? {
            let name = match result {
                Event::Start(event) => event.local_name().as_ref().to_vec(),
                _ => continue,
            };
            let slot = match name.as_slice() {
                b"title" => &mut metadata.title,
                b"subject" => &mut metadata.subject,
                b"description" => &mut metadata.description,
                b"keywords" => &mut metadata.keywords,
                b"creator" => &mut metadata.creator,
                _ => continue,
            };
            let text = read_element_text(&mut reader, &name)?;
            *slot = Some(text).filter(|text| !text.is_empty());
        }
    }

    if let Some(mut reader) = zip.xml_reader("docProps/custom.xml")? {
        while let Some(result) = reader.next()? {
            let is_schema = match result {
                Event::Start(event) if event.local_name().as_ref() == TAG_PROPERTY => event
                    .get_attribute_value("name")?
                    .map(|name| name == SCHEMA_PROPERTY)
                    .unwrap_or(false),
                _ => false,
            };
            if is_schema {
                let text = read_element_text(&mut reader, TAG_PROPERTY)?;
                metadata.schema_fingerprint = Some(text.trim().to_owned());
            }
        }
    }

    Ok(metadata)
}

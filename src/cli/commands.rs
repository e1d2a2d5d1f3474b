//! CLI command implementations

use crate::codec;
use crate::codec::CodecOptions;
use crate::record::CollectionInfo;
use crate::record::RecordsByCategory;
use crate::schema::layout::compute_layout;
use crate::schema::StageSchema;
use crate::spreadsheet::reference::index_to_col;
use anyhow::Context;
use anyhow::Result;
use std::fs;
use std::path::Path;

use super::args::ConfigArgs;

/// Loads the schema and options named on the command line.
pub fn load_config(config: &ConfigArgs) -> Result<(StageSchema, CodecOptions)> {
    let schema = match &config.schema {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("Reading schema {}", path.display()))?;
            StageSchema::from_json(&json).with_context(|| format!("Parsing schema {}", path.display()))?
        }
        None => StageSchema::standard(),
    };
    let options = match &config.options {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("Reading options {}", path.display()))?;
            CodecOptions::from_json(&json).with_context(|| format!("Parsing options {}", path.display()))?
        }
        None => CodecOptions::default(),
    };
    Ok((schema, options))
}

/// Renders the column-position table, one `column  letter  key` line per field.
pub fn layout(schema: &StageSchema, json: bool) -> Result<String> {
    let layout = compute_layout(schema);
    if json {
        let map: serde_json::Map<String, serde_json::Value> = layout
            .entries()
            .into_iter()
            .map(|(key, column)| (key.to_string(), column.into()))
            .collect();
        return Ok(serde_json::to_string_pretty(&map)?);
    }
    let lines: Vec<String> = layout
        .entries()
        .into_iter()
        .map(|(key, column)| format!("{:>4}  {:<3}  {}", column, index_to_col(column - 1), key))
        .collect();
    Ok(lines.join("\n"))
}

/// Encodes the records file into a workbook; returns the number of records written.
pub fn export(
    schema: &StageSchema,
    options: &CodecOptions,
    records: &Path,
    output: &Path,
    collection: Option<&CollectionInfo>,
) -> Result<usize> {
    let json = fs::read_to_string(records).with_context(|| format!("Reading records {}", records.display()))?;
    let records: RecordsByCategory =
        serde_json::from_str(&json).with_context(|| format!("Parsing records {}", records.display()))?;
    let bytes = codec::encode_workbook(schema, options, &records, collection)?;
    fs::write(output, bytes).with_context(|| format!("Writing {}", output.display()))?;
    Ok(records.len())
}

/// Decodes a workbook; returns the records JSON and the decode summary line.
pub fn import(schema: &StageSchema, options: &CodecOptions, input: &Path) -> Result<(String, String)> {
    let bytes = fs::read(input).with_context(|| format!("Reading {}", input.display()))?;
    let outcome = codec::decode_workbook(schema, options, &bytes).with_context(|| format!("Decoding {}", input.display()))?;
    let json = serde_json::to_string_pretty(&outcome.records)?;
    let summary = format!("{} records imported", outcome.imported());
    Ok((json, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RECORDS: &str = r#"[
        {"name": "Process", "records": [
            {"documentNumber": "P-001", "documentTitle": "Process Flow Diagram",
             "stages": {"IFR": {"datePlanned": "2024-01-01", "referenceNumber": "TR-9"}}}
        ]},
        {"name": "Civil", "records": []}
    ]"#;

    #[test]
    fn layout_lists_every_field() {
        let schema = StageSchema::standard();
        let table = layout(&schema, false).unwrap();
        assert_eq!(table.lines().count(), compute_layout(&schema).entries().len());
        assert!(table.lines().next().unwrap().ends_with("sNo"));
        assert!(table.lines().last().unwrap().contains("BY"));

        let json: serde_json::Value = serde_json::from_str(&layout(&schema, true).unwrap()).unwrap();
        assert_eq!(json["remarks"], 77);
        assert_eq!(json["IFR.datePlanned"], 7);
    }

    #[test]
    fn export_then_import_through_files() {
        let temp_dir = TempDir::new().unwrap();
        let records = temp_dir.path().join("records.json");
        let workbook = temp_dir.path().join("register.xlsx");
        fs::write(&records, RECORDS).unwrap();

        let schema = StageSchema::standard();
        let options = CodecOptions::default();
        let written = export(&schema, &options, &records, &workbook, None).unwrap();
        assert_eq!(written, 1);

        let (json, summary) = import(&schema, &options, &workbook).unwrap();
        assert_eq!(summary, "1 records imported");
        let decoded: RecordsByCategory = serde_json::from_str(&json).unwrap();
        let original: RecordsByCategory = serde_json::from_str(RECORDS).unwrap();
        assert_eq!(decoded, original.normalized(&schema));
    }

    #[test]
    fn config_files_are_loaded() {
        let temp_dir = TempDir::new().unwrap();
        let schema_path = temp_dir.path().join("schema.json");
        let options_path = temp_dir.path().join("options.json");
        fs::write(&schema_path, r#"{"stages":[{"code":"IFR","displayName":"Review"}]}"#).unwrap();
        fs::write(&options_path, r#"{"sheetName":"Register"}"#).unwrap();

        let config = ConfigArgs {
            schema: Some(schema_path),
            options: Some(options_path),
        };
        let (schema, options) = load_config(&config).unwrap();
        assert_eq!(schema.fingerprint(), "IFR:0");
        assert_eq!(options.sheet_name, "Register");

        let missing = ConfigArgs {
            schema: Some(temp_dir.path().join("missing.json")),
            options: None,
        };
        assert!(load_config(&missing).is_err());
    }
}

use crate::error::MdrError;
use serde::Deserialize;
use serde::Serialize;

/// Tunables of the register layout shared by encoder and decoder.
///
/// Every field has a default, so a JSON options file only needs to name the
/// values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodecOptions {
    /// Worksheet name written, and preferred when reading
    pub sheet_name: String,
    /// Column A label of the header's last row
    pub header_sentinel: String,
    /// How many rows from the top are searched for the sentinel
    pub header_scan_depth: usize,
    /// Category for document rows that precede any category row
    pub default_category: String,
    pub min_column_width: f64,
    pub max_column_width: f64,
    /// Added to the longest rendered value when auto-sizing
    pub column_padding: f64,
    pub serial_number_width: f64,
    pub title_width: f64,
    pub remarks_width: f64,
    /// Heights of header rows 1, 2 and 3
    pub header_row_heights: [f64; 3],
    /// `chrono` formats accepted as date text in date columns
    pub date_formats: Vec<String>,
    /// Non-date tokens accepted in date columns
    pub date_placeholders: Vec<String>,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            sheet_name: "Master Document Register".to_owned(),
            header_sentinel: "S/No".to_owned(),
            header_scan_depth: 20,
            default_category: "Unassigned".to_owned(),
            min_column_width: 8.0,
            max_column_width: 50.0,
            column_padding: 2.0,
            serial_number_width: 8.0,
            title_width: 40.0,
            remarks_width: 30.0,
            header_row_heights: [60.0, 20.0, 20.0],
            date_formats: ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d-%b-%Y", "%d-%b-%y", "%d %b %Y"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            date_placeholders: ["TBA", "TBC", "N/A", "-"].into_iter().map(str::to_owned).collect(),
        }
    }
}

impl CodecOptions {
    pub fn from_json(json: &str) -> Result<Self, MdrError> {
        Ok(serde_json::from_str(json)?)
    }

    /// True when `value` is an accepted placeholder, compared case-insensitively.
    pub fn is_date_placeholder(&self, value: &str) -> bool {
        let value = value.trim();
        self.date_placeholders
            .iter()
            .any(|placeholder| placeholder.eq_ignore_ascii_case(value))
    }

    /// True when `value` parses with one of the accepted date formats.
    pub fn is_date_text(&self, value: &str) -> bool {
        let value = value.trim();
        self.date_formats
            .iter()
            .any(|format| chrono::NaiveDate::parse_from_str(value, format).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let options = CodecOptions::from_json(r#"{"defaultCategory":"General","headerScanDepth":5}"#).unwrap();
        assert_eq!(options.default_category, "General");
        assert_eq!(options.header_scan_depth, 5);
        assert_eq!(options.header_sentinel, "S/No");
        assert_eq!(options.header_row_heights, [60.0, 20.0, 20.0]);
    }

    #[test]
    fn date_text_and_placeholders() {
        let options = CodecOptions::default();
        assert!(options.is_date_text("2024-01-01"));
        assert!(options.is_date_text("15/03/2024"));
        assert!(options.is_date_text("15-Mar-2024"));
        assert!(!options.is_date_text("next week"));
        assert!(!options.is_date_text("2024-13-01"));
        assert!(options.is_date_placeholder("tba"));
        assert!(options.is_date_placeholder(" - "));
        assert!(!options.is_date_placeholder("soon"));
    }
}

use thiserror::Error;

/// Main error type for the MDR sheet codec.
/// Aggregates errors from various sources including standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum MdrError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    // Codec errors
    #[error("{0}")]
    SchemaError(#[from] crate::schema::SchemaError),

    #[error("Header row with '{sentinel}' in column A not found within the first {scanned} rows")]
    HeaderNotFound { sentinel: String, scanned: usize },

    #[error("Workbook was written for stages '{found}' but the current schema is '{expected}'")]
    SchemaMismatch { expected: String, found: String },

    // Service errors
    #[error("Access denied: {action} on collection '{collection}'")]
    AccessDenied { action: String, collection: String },

    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, MdrError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| MdrError::WithContextError(format!("{}: {}", message, e)))
    }
}

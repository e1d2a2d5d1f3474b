//! # Stage Schema
//!
//! Immutable description of the review/approval stage sequence a register
//! tracks. A schema is validated once when it is built and then shared by
//! reference with the layout calculator, the encoder and the decoder.
//!
//! The column layout derived from a schema lives in [`layout`].
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Display;
use thiserror::Error;

pub mod layout;

/// Errors raised while building a [`StageSchema`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Stage schema must contain at least one stage")]
    EmptyStageList,

    #[error("Duplicate stage code '{0}'")]
    DuplicateStageCode(String),

    #[error("Invalid stage code '{0}': expect non-empty ASCII letters or digits")]
    InvalidStageCode(String),

    #[error("Invalid schema fingerprint '{0}'")]
    InvalidFingerprint(String),
}

/// One step of the review sequence, e.g. `IFR` (Information For Review).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDefinition {
    /// Short identifier printed in the header, e.g. "IFA"
    pub code: String,
    /// Human readable name
    #[serde(default)]
    pub display_name: String,
    /// Whether the feedback block carries a trailing "Next Rev." column
    #[serde(default)]
    pub has_follow_up_revision_field: bool,
}

impl StageDefinition {
    pub fn new(code: &str, display_name: &str, has_follow_up_revision_field: bool) -> Self {
        Self {
            code: code.to_owned(),
            display_name: display_name.to_owned(),
            has_follow_up_revision_field,
        }
    }
}

/// The fixed leading columns of every register row.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LeadingField {
    SerialNumber,
    DocumentNumber,
    DocumentTitle,
}

impl LeadingField {
    pub const ALL: [LeadingField; 3] = [
        LeadingField::SerialNumber,
        LeadingField::DocumentNumber,
        LeadingField::DocumentTitle,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            LeadingField::SerialNumber => "sNo",
            LeadingField::DocumentNumber => "docNumber",
            LeadingField::DocumentTitle => "docTitle",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LeadingField::SerialNumber => "S/No",
            LeadingField::DocumentNumber => "Doc Number",
            LeadingField::DocumentTitle => "DOC Title",
        }
    }
}

/// The "Current Status" block that follows the leading columns.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CurrentStateField {
    Revision,
    Status,
    TransmittalReference,
}

impl CurrentStateField {
    pub const ALL: [CurrentStateField; 3] = [
        CurrentStateField::Revision,
        CurrentStateField::Status,
        CurrentStateField::TransmittalReference,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            CurrentStateField::Revision => "currentStatus.revision",
            CurrentStateField::Status => "currentStatus.status",
            CurrentStateField::TransmittalReference => "currentStatus.transmittal",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CurrentStateField::Revision => "Current Rev",
            CurrentStateField::Status => "Status",
            CurrentStateField::TransmittalReference => "Current Transmittal No.",
        }
    }
}

/// Ordered, validated list of stages.
///
/// Order is significant: reordering stages moves their columns. Equality
/// also compares display names; use [`StageSchema::fingerprint`] to ask
/// whether two schemas produce the same column layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SchemaConfig", into = "SchemaConfig")]
pub struct StageSchema {
    stages: Vec<StageDefinition>,
}

/// Serialized form of a schema, validated through `TryFrom`.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct SchemaConfig {
    stages: Vec<StageDefinition>,
}

impl TryFrom<SchemaConfig> for StageSchema {
    type Error = SchemaError;

    fn try_from(config: SchemaConfig) -> Result<Self, Self::Error> {
        StageSchema::new(config.stages)
    }
}

impl From<StageSchema> for SchemaConfig {
    fn from(schema: StageSchema) -> Self {
        SchemaConfig { stages: schema.stages }
    }
}

impl StageSchema {
    /// Builds a schema, rejecting an empty stage list, malformed codes and duplicates.
    pub fn new(stages: Vec<StageDefinition>) -> Result<Self, SchemaError> {
        if stages.is_empty() {
            return Err(SchemaError::EmptyStageList);
        }
        let mut codes = HashSet::new();
        for stage in &stages {
            let valid = !stage.code.is_empty() && stage.code.chars().all(|c| c.is_ascii_alphanumeric());
            if !valid {
                return Err(SchemaError::InvalidStageCode(stage.code.to_owned()));
            }
            if !codes.insert(stage.code.to_ascii_uppercase()) {
                return Err(SchemaError::DuplicateStageCode(stage.code.to_owned()));
            }
        }
        Ok(Self { stages })
    }

    /// The eight-stage sequence used by EPC master document registers:
    /// IFR → IFH → IFD → IFT → IFP → IFA → IFC → AFC.
    pub fn standard() -> Self {
        Self {
            stages: vec![
                StageDefinition::new("IFR", "Information For Review", false),
                StageDefinition::new("IFH", "Information For HAZOP", true),
                StageDefinition::new("IFD", "Information For Design", true),
                StageDefinition::new("IFT", "Information For Tender", true),
                StageDefinition::new("IFP", "Information For Procurement", true),
                StageDefinition::new("IFA", "Information For Approval", true),
                StageDefinition::new("IFC", "Information For Construction", true),
                StageDefinition::new("AFC", "Approved For Construction", false),
            ],
        }
    }

    /// Parses a schema from its JSON configuration form.
    pub fn from_json(json: &str) -> Result<Self, crate::error::MdrError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    pub fn stage(&self, code: &str) -> Option<&StageDefinition> {
        self.stages.iter().find(|stage| stage.code == code)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Compact, order-preserving description of the stage list, e.g. `IFR:0;IFH:1`.
    /// Stored in workbook metadata so a decode can detect a foreign layout.
    pub fn fingerprint(&self) -> String {
        self.stages
            .iter()
            .map(|stage| format!("{}:{}", stage.code, u8::from(stage.has_follow_up_revision_field)))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Rebuilds a schema from a fingerprint. Display names are not part of
    /// the fingerprint and come back empty.
    pub fn from_fingerprint(fingerprint: &str) -> Result<Self, SchemaError> {
        let invalid = || SchemaError::InvalidFingerprint(fingerprint.to_owned());
        let stages = fingerprint
            .split(';')
            .map(|part| {
                let (code, flag) = part.trim().split_once(':').ok_or_else(invalid)?;
                let flag = match flag {
                    "0" => false,
                    "1" => true,
                    _ => return Err(invalid()),
                };
                Ok(StageDefinition::new(code, "", flag))
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;
        Self::new(stages)
    }

    /// True when `fingerprint` describes the same ordered codes and flags.
    pub fn matches_fingerprint(&self, fingerprint: &str) -> bool {
        fingerprint.trim() == self.fingerprint()
    }
}

impl Default for StageSchema {
    fn default() -> Self {
        Self::standard()
    }
}

impl Display for StageSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fingerprint())
    }
}

//! Column layout arithmetic.
//!
//! [`compute_layout`] maps a [`StageSchema`] to a [`ColumnPositionTable`]:
//! three leading columns, three "current status" columns, then each stage
//! in schema order (four submission columns, four feedback columns and an
//! optional "Next Rev." column), and finally the remarks column.
//! Columns are 1-based, matching the spreadsheet's A=1 convention.
use crate::schema::CurrentStateField;
use crate::schema::LeadingField;
use crate::schema::StageSchema;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

/// Per-stage field, in column order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageField {
    DatePlanned,
    DateActual,
    ReferenceNumber,
    DateSent,
    RevisionStatus,
    IssuedFor,
    DateReceived,
    ReferenceReceived,
    NextRevision,
}

impl StageField {
    /// Columns sent to the client.
    pub const SUBMISSION: [StageField; 4] = [
        StageField::DatePlanned,
        StageField::DateActual,
        StageField::ReferenceNumber,
        StageField::DateSent,
    ];

    /// Columns received back from the client, without the optional "Next Rev.".
    pub const FEEDBACK: [StageField; 4] = [
        StageField::RevisionStatus,
        StageField::IssuedFor,
        StageField::DateReceived,
        StageField::ReferenceReceived,
    ];

    pub const ALL: [StageField; 9] = [
        StageField::DatePlanned,
        StageField::DateActual,
        StageField::ReferenceNumber,
        StageField::DateSent,
        StageField::RevisionStatus,
        StageField::IssuedFor,
        StageField::DateReceived,
        StageField::ReferenceReceived,
        StageField::NextRevision,
    ];

    /// Offset of the field from the stage's first column.
    pub fn offset(&self) -> usize {
        *self as usize
    }

    pub fn key(&self) -> &'static str {
        match self {
            StageField::DatePlanned => "datePlanned",
            StageField::DateActual => "dateActual",
            StageField::ReferenceNumber => "referenceNumber",
            StageField::DateSent => "dateSent",
            StageField::RevisionStatus => "revisionStatus",
            StageField::IssuedFor => "issuedFor",
            StageField::DateReceived => "dateReceived",
            StageField::ReferenceReceived => "referenceReceived",
            StageField::NextRevision => "nextRevision",
        }
    }

    /// Header label. Planned/Actual sit under the merged "<code> Date" label.
    pub fn label(&self) -> &'static str {
        match self {
            StageField::DatePlanned => "Planned",
            StageField::DateActual => "Actual",
            StageField::ReferenceNumber => "TR No.",
            StageField::DateSent => "Date Sent",
            StageField::RevisionStatus => "Rev. Status",
            StageField::IssuedFor => "Issue For",
            StageField::DateReceived => "Date Received",
            StageField::ReferenceReceived => "Transmittal Received",
            StageField::NextRevision => "Next Rev.",
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(
            self,
            StageField::DatePlanned | StageField::DateActual | StageField::DateSent | StageField::DateReceived
        )
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

/// Logical field of a register row.
///
/// Displays as the string keys used in reports and configuration:
/// `sNo`, `docNumber`, `currentStatus.revision`, `IFR.datePlanned`, `remarks`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    Leading(LeadingField),
    Current(CurrentStateField),
    Stage(String, StageField),
    Remarks,
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKey::Leading(field) => write!(f, "{}", field.key()),
            FieldKey::Current(field) => write!(f, "{}", field.key()),
            FieldKey::Stage(code, field) => write!(f, "{}.{}", code, field.key()),
            FieldKey::Remarks => write!(f, "remarks"),
        }
    }
}

impl FromStr for FieldKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "remarks" {
            return Ok(FieldKey::Remarks);
        }
        if let Some(field) = LeadingField::ALL.into_iter().find(|field| field.key() == value) {
            return Ok(FieldKey::Leading(field));
        }
        if let Some(field) = CurrentStateField::ALL.into_iter().find(|field| field.key() == value) {
            return Ok(FieldKey::Current(field));
        }
        value
            .split_once('.')
            .and_then(|(code, key)| StageField::from_key(key).map(|field| FieldKey::Stage(code.to_owned(), field)))
            .ok_or_else(|| format!("Unknown field key '{value}'"))
    }
}

/// Column block of one stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageColumns {
    pub code: String,
    /// First (Planned) column
    pub start: usize,
    pub has_follow_up_revision_field: bool,
}

impl StageColumns {
    /// Number of columns the stage occupies: 8, or 9 with "Next Rev.".
    pub fn width(&self) -> usize {
        StageField::SUBMISSION.len() + self.feedback_width()
    }

    pub fn feedback_width(&self) -> usize {
        StageField::FEEDBACK.len() + usize::from(self.has_follow_up_revision_field)
    }

    pub fn feedback_start(&self) -> usize {
        self.start + StageField::SUBMISSION.len()
    }

    pub fn end(&self) -> usize {
        self.start + self.width() - 1
    }

    /// Fields present for this stage, in column order.
    pub fn fields(&self) -> impl Iterator<Item = StageField> + '_ {
        StageField::ALL
            .into_iter()
            .filter(|field| *field != StageField::NextRevision || self.has_follow_up_revision_field)
    }

    /// Column of `field`, or `None` for "Next Rev." on a stage without it.
    pub fn column(&self, field: StageField) -> Option<usize> {
        if field == StageField::NextRevision && !self.has_follow_up_revision_field {
            None
        } else {
            Some(self.start + field.offset())
        }
    }
}

/// Deterministic mapping from [`FieldKey`] to 1-based column index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnPositionTable {
    leading: [usize; 3],
    current: [usize; 3],
    stages: Vec<StageColumns>,
    remarks: usize,
}

/// Computes the column layout of `schema`. Pure and total.
pub fn compute_layout(schema: &StageSchema) -> ColumnPositionTable {
    let mut cursor = 1usize;
    let mut leading = [0usize; 3];
    for slot in leading.iter_mut() {
        *slot = cursor;
        cursor += 1;
    }
    let mut current = [0usize; 3];
    for slot in current.iter_mut() {
        *slot = cursor;
        cursor += 1;
    }
    let mut stages = Vec::with_capacity(schema.len());
    for stage in schema.stages() {
        let columns = StageColumns {
            code: stage.code.to_owned(),
            start: cursor,
            has_follow_up_revision_field: stage.has_follow_up_revision_field,
        };
        cursor += columns.width();
        stages.push(columns);
    }
    ColumnPositionTable {
        leading,
        current,
        stages,
        remarks: cursor,
    }
}

impl ColumnPositionTable {
    pub fn leading(&self, field: LeadingField) -> usize {
        self.leading[field as usize]
    }

    pub fn current(&self, field: CurrentStateField) -> usize {
        self.current[field as usize]
    }

    pub fn current_start(&self) -> usize {
        self.current[0]
    }

    /// Column of the remarks field, which is also the last column.
    pub fn remarks(&self) -> usize {
        self.remarks
    }

    /// Total number of columns.
    pub fn width(&self) -> usize {
        self.remarks
    }

    pub fn stages(&self) -> &[StageColumns] {
        &self.stages
    }

    pub fn stage(&self, code: &str) -> Option<&StageColumns> {
        self.stages.iter().find(|stage| stage.code == code)
    }

    /// Column of a field key, `None` when the key is not part of this layout.
    pub fn position(&self, key: &FieldKey) -> Option<usize> {
        match key {
            FieldKey::Leading(field) => Some(self.leading(*field)),
            FieldKey::Current(field) => Some(self.current(*field)),
            FieldKey::Stage(code, field) => self.stage(code).and_then(|stage| stage.column(*field)),
            FieldKey::Remarks => Some(self.remarks),
        }
    }

    /// Column of a string key such as `"IFA.nextRevision"`.
    pub fn get(&self, key: &str) -> Option<usize> {
        key.parse::<FieldKey>().ok().and_then(|key| self.position(&key))
    }

    /// Every field key with its column, in column order.
    pub fn entries(&self) -> Vec<(FieldKey, usize)> {
        let mut entries = Vec::with_capacity(self.width());
        for field in LeadingField::ALL {
            entries.push((FieldKey::Leading(field), self.leading(field)));
        }
        for field in CurrentStateField::ALL {
            entries.push((FieldKey::Current(field), self.current(field)));
        }
        for stage in &self.stages {
            for field in stage.fields() {
                if let Some(column) = stage.column(field) {
                    entries.push((FieldKey::Stage(stage.code.to_owned(), field), column));
                }
            }
        }
        entries.push((FieldKey::Remarks, self.remarks));
        entries
    }

    /// String-keyed view of [`entries`](Self::entries).
    pub fn to_map(&self) -> HashMap<String, usize> {
        self.entries()
            .into_iter()
            .map(|(key, column)| (key.to_string(), column))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StageDefinition;
    use std::collections::HashSet;

    fn single_stage(has_next: bool) -> StageSchema {
        StageSchema::new(vec![StageDefinition::new("IFR", "Review", has_next)]).unwrap()
    }

    #[test]
    fn leading_and_current_columns_come_first() {
        let layout = compute_layout(&single_stage(false));
        assert_eq!(layout.get("sNo"), Some(1));
        assert_eq!(layout.get("docNumber"), Some(2));
        assert_eq!(layout.get("docTitle"), Some(3));
        assert_eq!(layout.get("currentStatus.revision"), Some(4));
        assert_eq!(layout.get("currentStatus.status"), Some(5));
        assert_eq!(layout.get("currentStatus.transmittal"), Some(6));
        assert_eq!(layout.get("IFR.datePlanned"), Some(7));
        assert_eq!(layout.get("IFR.referenceReceived"), Some(14));
        assert_eq!(layout.get("IFR.nextRevision"), None);
        assert_eq!(layout.get("remarks"), Some(15));
    }

    #[test]
    fn follow_up_revision_adds_one_column() {
        let layout = compute_layout(&single_stage(true));
        assert_eq!(layout.get("IFR.nextRevision"), Some(15));
        assert_eq!(layout.remarks(), 16);
        assert_eq!(layout.stage("IFR").unwrap().feedback_width(), 5);
    }

    #[test]
    fn standard_schema_total_width() {
        let layout = compute_layout(&StageSchema::standard());
        // 3 leading + 3 current + 2 stages x 8 + 6 stages x 9 + 1 remarks
        let expected = 3 + 3 + 2 * 8 + 6 * 9 + 1;
        assert_eq!(layout.width(), expected);
        assert_eq!(layout.remarks(), expected);
        assert_eq!(layout.stage("IFH").unwrap().start, 15);
        assert_eq!(layout.stage("AFC").unwrap().end(), expected - 1);
    }

    #[test]
    fn layout_is_deterministic() {
        let first = compute_layout(&StageSchema::standard());
        let second = compute_layout(&StageSchema::from_fingerprint(&StageSchema::standard().fingerprint()).unwrap());
        assert_eq!(first, second);
        assert_eq!(first.to_map(), second.to_map());
    }

    #[test]
    fn layout_is_injective_and_dense() {
        let layout = compute_layout(&StageSchema::standard());
        let entries = layout.entries();
        let columns: HashSet<usize> = entries.iter().map(|(_, column)| *column).collect();
        assert_eq!(columns.len(), entries.len());
        assert_eq!(entries.len(), layout.width());
        assert_eq!(columns, (1..=layout.width()).collect());
    }

    #[test]
    fn field_keys_round_trip_through_strings() {
        let layout = compute_layout(&StageSchema::standard());
        for (key, column) in layout.entries() {
            let parsed: FieldKey = key.to_string().parse().unwrap();
            assert_eq!(parsed, key);
            assert_eq!(layout.position(&parsed), Some(column));
        }
        assert!("IFR.unknown".parse::<FieldKey>().is_err());
        assert_eq!(layout.get("XYZ.datePlanned"), None);
    }
}

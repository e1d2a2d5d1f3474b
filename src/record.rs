//! Document records and their category grouping.
use crate::schema::layout::StageField;
use crate::schema::CurrentStateField;
use crate::schema::StageSchema;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// Submission and feedback values of one document for one stage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageRecord {
    pub date_planned: String,
    pub date_actual: String,
    pub reference_number: String,
    pub date_sent: String,
    pub revision_status: String,
    pub issued_for: String,
    pub date_received: String,
    pub reference_received: String,
    /// Only meaningful on stages flagged with a follow-up revision column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_revision: Option<String>,
}

impl StageRecord {
    pub fn get(&self, field: StageField) -> Option<&str> {
        match field {
            StageField::DatePlanned => Some(&self.date_planned),
            StageField::DateActual => Some(&self.date_actual),
            StageField::ReferenceNumber => Some(&self.reference_number),
            StageField::DateSent => Some(&self.date_sent),
            StageField::RevisionStatus => Some(&self.revision_status),
            StageField::IssuedFor => Some(&self.issued_for),
            StageField::DateReceived => Some(&self.date_received),
            StageField::ReferenceReceived => Some(&self.reference_received),
            StageField::NextRevision => self.next_revision.as_deref(),
        }
    }

    pub fn set(&mut self, field: StageField, value: String) {
        match field {
            StageField::DatePlanned => self.date_planned = value,
            StageField::DateActual => self.date_actual = value,
            StageField::ReferenceNumber => self.reference_number = value,
            StageField::DateSent => self.date_sent = value,
            StageField::RevisionStatus => self.revision_status = value,
            StageField::IssuedFor => self.issued_for = value,
            StageField::DateReceived => self.date_received = value,
            StageField::ReferenceReceived => self.reference_received = value,
            StageField::NextRevision => self.next_revision = Some(value),
        }
    }

    /// Empty record shaped for a stage: `next_revision` is `Some("")` only
    /// when the stage carries the column.
    pub fn empty(has_follow_up_revision_field: bool) -> Self {
        Self {
            next_revision: has_follow_up_revision_field.then(String::new),
            ..Default::default()
        }
    }
}

/// One deliverable document in the register.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentRecord {
    pub document_number: String,
    pub document_title: String,
    /// Grouping label (discipline); the group a record is encoded under wins.
    pub category: String,
    pub current_revision: String,
    pub current_status: String,
    pub current_transmittal: String,
    /// Stage sub-records keyed by stage code.
    pub stages: BTreeMap<String, StageRecord>,
    pub remarks: String,
}

impl DocumentRecord {
    pub fn new(document_number: &str, document_title: &str) -> Self {
        Self {
            document_number: document_number.to_owned(),
            document_title: document_title.to_owned(),
            ..Default::default()
        }
    }

    pub fn current(&self, field: CurrentStateField) -> &str {
        match field {
            CurrentStateField::Revision => &self.current_revision,
            CurrentStateField::Status => &self.current_status,
            CurrentStateField::TransmittalReference => &self.current_transmittal,
        }
    }

    pub fn set_current(&mut self, field: CurrentStateField, value: String) {
        match field {
            CurrentStateField::Revision => self.current_revision = value,
            CurrentStateField::Status => self.current_status = value,
            CurrentStateField::TransmittalReference => self.current_transmittal = value,
        }
    }

    pub fn stage(&self, code: &str) -> Option<&StageRecord> {
        self.stages.get(code)
    }

    /// Mutable access to a stage sub-record, created empty on first use.
    pub fn stage_mut(&mut self, code: &str) -> &mut StageRecord {
        self.stages.entry(code.to_owned()).or_default()
    }

    /// Builder-style setter for a single stage field.
    pub fn with_stage_field(mut self, code: &str, field: StageField, value: &str) -> Self {
        self.stage_mut(code).set(field, value.to_owned());
        self
    }

    /// The canonical form a decode yields under `schema`: every schema
    /// stage present, `next_revision` only on flagged stages and unknown
    /// stages dropped.
    pub fn normalized(&self, schema: &StageSchema) -> Self {
        let mut stages = BTreeMap::new();
        for definition in schema.stages() {
            let mut stage = self.stages.get(&definition.code).cloned().unwrap_or_default();
            stage.next_revision = if definition.has_follow_up_revision_field {
                Some(stage.next_revision.unwrap_or_default())
            } else {
                None
            };
            stages.insert(definition.code.to_owned(), stage);
        }
        Self {
            stages,
            ..self.clone()
        }
    }

    /// A row whose number and title are both blank carries no document.
    pub fn is_blank(&self) -> bool {
        self.document_number.trim().is_empty() && self.document_title.trim().is_empty()
    }
}

/// Records of one category, in row order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub name: String,
    pub records: Vec<DocumentRecord>,
}

/// Records grouped by category, in caller-supplied (or grid) order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordsByCategory {
    groups: Vec<CategoryGroup>,
}

impl RecordsByCategory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups records by their `category` label, keeping first-seen order.
    /// Records with a blank label go to `fallback`.
    pub fn group(records: impl IntoIterator<Item = DocumentRecord>, fallback: &str) -> Self {
        let mut grouped = Self::new();
        for record in records {
            let name = if record.category.trim().is_empty() {
                fallback.to_owned()
            } else {
                record.category.to_owned()
            };
            grouped.push(&name, record);
        }
        grouped
    }

    pub fn groups(&self) -> &[CategoryGroup] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<CategoryGroup> {
        self.groups
    }

    pub fn get(&self, name: &str) -> Option<&CategoryGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// Ensures a (possibly empty) group exists and returns it.
    pub fn ensure(&mut self, name: &str) -> &mut CategoryGroup {
        let index = match self.groups.iter().position(|group| group.name == name) {
            Some(index) => index,
            None => {
                self.groups.push(CategoryGroup {
                    name: name.to_owned(),
                    records: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }

    /// Appends a record to `name`, stamping the category label on it.
    pub fn push(&mut self, name: &str, mut record: DocumentRecord) {
        record.category = name.to_owned();
        self.ensure(name).records.push(record);
    }

    /// Appends a whole group; a group with an existing name is merged into it.
    pub fn push_group(&mut self, group: CategoryGroup) {
        let name = group.name.to_owned();
        self.ensure(&name);
        for record in group.records {
            self.push(&name, record);
        }
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|group| group.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.groups.iter().flat_map(|group| group.records.iter())
    }

    /// What a decode of this set returns: duplicate category names merged in
    /// first-seen order, each record stamped with its group and normalized.
    pub fn normalized(&self, schema: &StageSchema) -> Self {
        let mut normalized = Self::new();
        for group in &self.groups {
            normalized.ensure(&group.name);
            for record in &group.records {
                normalized.push(&group.name, record.normalized(schema));
            }
        }
        normalized
    }
}

impl From<Vec<CategoryGroup>> for RecordsByCategory {
    fn from(groups: Vec<CategoryGroup>) -> Self {
        let mut grouped = Self::new();
        for group in groups {
            grouped.push_group(group);
        }
        grouped
    }
}

/// Identity of the collection (project/portfolio) a register belongs to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionInfo {
    pub name: String,
    pub code: String,
    pub client: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StageDefinition;

    fn schema() -> StageSchema {
        StageSchema::new(vec![
            StageDefinition::new("IFR", "Review", false),
            StageDefinition::new("IFA", "Approval", true),
        ])
        .unwrap()
    }

    #[test]
    fn normalized_fills_every_stage() {
        let record = DocumentRecord::new("D-1", "Spec").with_stage_field("IFR", StageField::DatePlanned, "2024-01-01");
        let normalized = record.normalized(&schema());
        assert_eq!(normalized.stages.len(), 2);
        assert_eq!(normalized.stage("IFR").unwrap().date_planned, "2024-01-01");
        assert_eq!(normalized.stage("IFR").unwrap().next_revision, None);
        assert_eq!(normalized.stage("IFA").unwrap().next_revision, Some(String::new()));
    }

    #[test]
    fn normalized_drops_next_revision_on_unflagged_stage() {
        let record = DocumentRecord::new("D-1", "Spec")
            .with_stage_field("IFR", StageField::NextRevision, "B")
            .with_stage_field("XYZ", StageField::DateSent, "2024-02-02");
        let normalized = record.normalized(&schema());
        assert_eq!(normalized.stage("IFR").unwrap().next_revision, None);
        assert!(normalized.stage("XYZ").is_none());
    }

    #[test]
    fn grouping_keeps_first_seen_order_and_merges_duplicates() {
        let mut first = DocumentRecord::new("P-1", "Process");
        first.category = "Process".to_owned();
        let mut second = DocumentRecord::new("E-1", "Electrical");
        second.category = "Electrical".to_owned();
        let mut third = DocumentRecord::new("P-2", "Process 2");
        third.category = "Process".to_owned();
        let orphan = DocumentRecord::new("X-1", "Orphan");

        let grouped = RecordsByCategory::group(vec![first, second, third, orphan], "Unassigned");
        let names: Vec<&str> = grouped.groups().iter().map(|group| group.name.as_str()).collect();
        assert_eq!(names, vec!["Process", "Electrical", "Unassigned"]);
        assert_eq!(grouped.get("Process").unwrap().records.len(), 2);
        assert_eq!(grouped.get("Unassigned").unwrap().records[0].category, "Unassigned");
        assert_eq!(grouped.len(), 4);
    }

    #[test]
    fn empty_groups_survive_normalization() {
        let grouped = RecordsByCategory::from(vec![CategoryGroup {
            name: "Civil".to_owned(),
            records: vec![],
        }]);
        let normalized = grouped.normalized(&schema());
        assert_eq!(normalized.groups().len(), 1);
        assert!(normalized.is_empty());
    }

    #[test]
    fn records_deserialize_with_missing_fields() {
        let record: DocumentRecord = serde_json::from_str(
            r#"{"documentNumber":"D-1","stages":{"IFR":{"datePlanned":"2024-01-01"}}}"#,
        )
        .unwrap();
        assert_eq!(record.document_title, "");
        assert_eq!(record.stage("IFR").unwrap().date_planned, "2024-01-01");
        assert_eq!(record.stage("IFR").unwrap().next_revision, None);
    }
}

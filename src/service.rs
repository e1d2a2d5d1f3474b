//! Export and import of a collection's register, wired to the external
//! record store and access policy.
use crate::codec;
use crate::codec::CodecOptions;
use crate::error::MdrError;
use crate::record::CollectionInfo;
use crate::record::DocumentRecord;
use crate::record::RecordsByCategory;
use crate::schema::StageSchema;
use std::collections::BTreeMap;
use std::fmt::Display;

/// Operation gated by an [`AccessPolicy`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Export,
    Import,
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Export => write!(f, "export"),
            Action::Import => write!(f, "import"),
        }
    }
}

/// Persistence of document records per collection.
pub trait RecordStore {
    fn collection(&self, collection_id: &str) -> Result<Option<CollectionInfo>, MdrError>;

    fn list_records_grouped_by_category(&self, collection_id: &str) -> Result<RecordsByCategory, MdrError>;

    /// Inserts or replaces records; returns how many were written.
    fn upsert_records(&mut self, collection_id: &str, records: Vec<DocumentRecord>) -> Result<usize, MdrError>;
}

/// Decides who may export or import a collection.
pub trait AccessPolicy {
    fn authorize(&self, action: Action, collection_id: &str) -> bool;
}

/// Policy granting every request.
#[derive(Copy, Clone, Debug, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn authorize(&self, _action: Action, _collection_id: &str) -> bool {
        true
    }
}

/// In-memory [`RecordStore`]; records are keyed by document number.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    fallback_category: String,
    collections: BTreeMap<String, (CollectionInfo, Vec<DocumentRecord>)>,
}

impl MemoryStore {
    pub fn new(fallback_category: &str) -> Self {
        Self {
            fallback_category: fallback_category.to_owned(),
            collections: BTreeMap::new(),
        }
    }

    pub fn add_collection(&mut self, collection_id: &str, info: CollectionInfo) {
        self.collections
            .entry(collection_id.to_owned())
            .or_insert_with(|| (info, Vec::new()));
    }

    pub fn records(&self, collection_id: &str) -> &[DocumentRecord] {
        self.collections
            .get(collection_id)
            .map(|(_, records)| records.as_slice())
            .unwrap_or_default()
    }
}

impl RecordStore for MemoryStore {
    fn collection(&self, collection_id: &str) -> Result<Option<CollectionInfo>, MdrError> {
        Ok(self.collections.get(collection_id).map(|(info, _)| info.clone()))
    }

    fn list_records_grouped_by_category(&self, collection_id: &str) -> Result<RecordsByCategory, MdrError> {
        let (_, records) = self
            .collections
            .get(collection_id)
            .ok_or_else(|| MdrError::CollectionNotFound(collection_id.to_owned()))?;
        Ok(RecordsByCategory::group(records.iter().cloned(), &self.fallback_category))
    }

    fn upsert_records(&mut self, collection_id: &str, records: Vec<DocumentRecord>) -> Result<usize, MdrError> {
        let (_, stored) = self
            .collections
            .get_mut(collection_id)
            .ok_or_else(|| MdrError::CollectionNotFound(collection_id.to_owned()))?;
        let count = records.len();
        for record in records {
            let existing = stored
                .iter()
                .position(|current| !record.document_number.is_empty() && current.document_number == record.document_number);
            match existing {
                Some(index) => stored[index] = record,
                None => stored.push(record),
            }
        }
        Ok(count)
    }
}

/// Exports and imports registers of the collections held by a store.
pub struct RegisterService<S, P> {
    store: S,
    policy: P,
    schema: StageSchema,
    options: CodecOptions,
}

impl<S: RecordStore, P: AccessPolicy> RegisterService<S, P> {
    pub fn new(store: S, policy: P, schema: StageSchema, options: CodecOptions) -> Self {
        Self {
            store,
            policy,
            schema,
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn schema(&self) -> &StageSchema {
        &self.schema
    }

    fn authorize(&self, action: Action, collection_id: &str) -> Result<CollectionInfo, MdrError> {
        if !self.policy.authorize(action, collection_id) {
            return Err(MdrError::AccessDenied {
                action: action.to_string(),
                collection: collection_id.to_owned(),
            });
        }
        self.store
            .collection(collection_id)?
            .ok_or_else(|| MdrError::CollectionNotFound(collection_id.to_owned()))
    }

    /// Renders the collection's register as xlsx bytes.
    pub fn export_to_file(&self, collection_id: &str) -> Result<Vec<u8>, MdrError> {
        let collection = self.authorize(Action::Export, collection_id)?;
        let records = self.store.list_records_grouped_by_category(collection_id)?;
        let bytes = codec::encode_workbook(&self.schema, &self.options, &records, Some(&collection))?;
        log::info!(
            "Exported {} records of '{}' ({} bytes)",
            records.len(),
            collection_id,
            bytes.len()
        );
        Ok(bytes)
    }

    /// Decodes a register workbook into the collection and returns the
    /// number of records imported. Rows that fail to decode are skipped.
    pub fn import_from_file(&mut self, bytes: &[u8], collection_id: &str) -> Result<usize, MdrError> {
        self.authorize(Action::Import, collection_id)?;
        let outcome = codec::decode_workbook(&self.schema, &self.options, bytes)?;
        let records: Vec<DocumentRecord> = outcome
            .records
            .into_groups()
            .into_iter()
            .flat_map(|group| group.records)
            .collect();
        let count = self.store.upsert_records(collection_id, records)?;
        log::info!(
            "{} records imported into '{}', {} rows skipped",
            count,
            collection_id,
            outcome.skipped.len()
        );
        Ok(count)
    }
}

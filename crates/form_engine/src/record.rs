//! Keyed collections of repeated records sharing one schema.
//!
//! Stored records are plain value maps owned by the collection. Viewing or
//! editing a record goes through a transient [`FormDocument`] built from a
//! copy, so an abandoned edit never touches stored data.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::document::FormDocument;
use crate::errors::CollectionError;
use crate::field::SetOptions;
use crate::schema::{CollectionDef, RecordSchema};
use crate::value::FieldValue;

/// Field name to value.
pub type Record = IndexMap<String, FieldValue>;

#[derive(Debug, Clone)]
pub struct RecordCollection {
    name: String,
    label: String,
    schema: Arc<RecordSchema>,
    records: IndexMap<String, Record>,
    enabled: bool,
}

/// An open edit session. Dropping it discards the changes.
#[derive(Debug)]
pub struct RecordEdit {
    origin: Option<String>,
    form: FormDocument,
}

impl RecordEdit {
    /// Key of the record being edited, `None` for a new record.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn form(&self) -> &FormDocument {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormDocument {
        &mut self.form
    }
}

impl RecordCollection {
    pub(crate) fn new(def: &CollectionDef) -> Self {
        Self {
            name: def.name.clone(),
            label: def.label.clone(),
            schema: def.schema.clone(),
            records: IndexMap::new(),
            enabled: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Cleared when a rule disables the frame holding the collection.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.records.iter().map(|(key, record)| (key.as_str(), record))
    }

    pub fn records(&self) -> &IndexMap<String, Record> {
        &self.records
    }

    /// A hidden form holding `record`. Entries that do not fit the schema are
    /// reported by the form and skipped.
    fn form_for(&self, record: &Record) -> Result<FormDocument, CollectionError> {
        let mut form = FormDocument::for_record(&self.schema)?;
        for (name, value) in record {
            // Reported to the form status on failure.
            let _ = form.set(name, value.clone(), SetOptions::forced());
        }
        Ok(form)
    }

    fn key_of(&self, form: &FormDocument) -> Result<String, CollectionError> {
        form.get(&self.schema.key_field)
            .map(|key| key.to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| CollectionError::MissingKey {
                field: self.schema.key_field.clone(),
            })
    }

    /// Store a new record under its key field's value. A record whose key is
    /// already taken is rejected and the collection is left unchanged.
    pub fn add(&mut self, record: Record) -> Result<String, CollectionError> {
        let form = self.form_for(&record)?;
        self.insert(None, &form)
    }

    /// An edit session for a record that does not exist yet.
    pub fn new_record(&self) -> Result<RecordEdit, CollectionError> {
        Ok(RecordEdit {
            origin: None,
            form: FormDocument::for_record(&self.schema)?,
        })
    }

    /// An edit session on a copy of the record stored under `key`.
    pub fn edit(&self, key: &str) -> Result<RecordEdit, CollectionError> {
        let record = self
            .records
            .get(key)
            .ok_or_else(|| CollectionError::UnknownRecord(key.to_string()))?;
        Ok(RecordEdit {
            origin: Some(key.to_string()),
            form: self.form_for(record)?,
        })
    }

    /// Copy the edited values back. If the key changed the old entry is
    /// removed and the record is appended under the new key.
    pub fn commit(&mut self, edit: RecordEdit) -> Result<String, CollectionError> {
        self.insert(edit.origin.as_deref(), &edit.form)
    }

    fn insert(&mut self, origin: Option<&str>, form: &FormDocument) -> Result<String, CollectionError> {
        let key = self.key_of(form)?;
        let record = form.values();

        if origin == Some(key.as_str()) {
            if let Some(slot) = self.records.get_mut(&key) {
                *slot = record;
                tracing::debug!(collection = %self.name, %key, "record updated");
                return Ok(key);
            }
        }
        if self.records.contains_key(&key) {
            return Err(CollectionError::Collision(key));
        }
        if let Some(old) = origin {
            self.records.shift_remove(old);
            tracing::debug!(collection = %self.name, from = old, to = %key, "record renamed");
        }
        self.records.insert(key.clone(), record);
        Ok(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Record> {
        self.records.shift_remove(key)
    }

    /// `"{record}.{output key}"` to value for every active field of every
    /// record that declares `tag`. Stored records are not touched.
    pub fn dump_tagged(&self, tag: &str) -> Result<IndexMap<String, FieldValue>, CollectionError> {
        let mut out = IndexMap::new();
        for (key, record) in &self.records {
            let form = self.form_for(record)?;
            for (output, value) in form.project_by_tag(tag, true) {
                out.insert(format!("{key}.{output}"), value);
            }
        }
        Ok(out)
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bridge_traits::CatalogSource;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::{CatalogError, Result};
use crate::models::MediaDescriptor;

/// Keys under which an object-shaped document may carry its record list.
const LIST_FIELDS: &[&str] = &["entries", "items", "records"];

/// Accepted spellings of the media reference field, in priority order.
const MEDIA_FIELDS: &[&str] = &["mediaKey", "media_key", "sound", "audio", "src", "url"];

/// Read-only identifier → descriptor mapping.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    entries: HashMap<String, Arc<MediaDescriptor>>,
}

impl Catalog {
    /// Fetch and parse the catalog document from `source`.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Unreachable`] if the source fails,
    /// [`CatalogError::Malformed`] if the document is not JSON or carries no
    /// record list. Individual bad records are skipped, not fatal.
    #[instrument(skip(source), fields(source = %source.describe()))]
    pub async fn load(source: &dyn CatalogSource) -> Result<Self> {
        let document = source
            .load_document()
            .await
            .map_err(|error| CatalogError::Unreachable {
                source_name: source.describe(),
                error,
            })?;

        let catalog = Self::from_slice(&document)?;
        info!(entries = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Parse a catalog document.
    pub fn from_slice(document: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(document)
            .map_err(|e| CatalogError::Malformed(format!("invalid JSON: {}", e)))?;

        let records = record_list(&value)?;
        Ok(Self::from_records(records))
    }

    /// Build from already-constructed descriptors. Same id rules as parsing:
    /// ids are trimmed, empty ids skipped, first duplicate wins.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = MediaDescriptor>) -> Self {
        let mut catalog = Self::default();
        for mut descriptor in descriptors {
            descriptor.id = descriptor.id.trim().to_string();
            catalog.insert(descriptor);
        }
        catalog
    }

    fn from_records(records: &[Value]) -> Self {
        let mut catalog = Self::default();
        let mut skipped = 0usize;

        for (index, record) in records.iter().enumerate() {
            match parse_record(record) {
                Some(descriptor) => catalog.insert(descriptor),
                None => {
                    skipped += 1;
                    debug!(index, "Skipping catalog record missing required fields");
                }
            }
        }

        if skipped > 0 {
            warn!(skipped, kept = catalog.len(), "Catalog records skipped");
        }
        catalog
    }

    fn insert(&mut self, descriptor: MediaDescriptor) {
        if descriptor.id.is_empty() {
            return;
        }
        if self.entries.contains_key(&descriptor.id) {
            warn!(id = %descriptor.id, "Duplicate catalog id; keeping first record");
            return;
        }
        self.entries
            .insert(descriptor.id.clone(), Arc::new(descriptor));
    }

    /// Resolve a trimmed identifier.
    pub fn lookup(&self, id: &str) -> Option<Arc<MediaDescriptor>> {
        self.entries.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<MediaDescriptor>> {
        self.entries.values()
    }

    /// Distinct media keys, sorted. Several ids may share one key.
    pub fn media_keys(&self) -> Vec<String> {
        let keys: HashSet<&str> = self
            .entries
            .values()
            .map(|d| d.media_key.as_str())
            .collect();
        let mut keys: Vec<String> = keys.into_iter().map(str::to_string).collect();
        keys.sort_unstable();
        keys
    }
}

fn record_list(value: &Value) -> Result<&[Value]> {
    match value {
        Value::Array(records) => Ok(records),
        Value::Object(map) => LIST_FIELDS
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_array))
            .map(Vec::as_slice)
            .ok_or_else(|| {
                CatalogError::Malformed(format!(
                    "expected a record list or an object with one of {:?}",
                    LIST_FIELDS
                ))
            }),
        other => Err(CatalogError::Malformed(format!(
            "expected a record list, found {}",
            json_kind(other)
        ))),
    }
}

fn parse_record(record: &Value) -> Option<MediaDescriptor> {
    let fields = record.as_object()?;

    let id = string_field(fields, "id")?.trim().to_string();
    if id.is_empty() {
        return None;
    }
    let label = string_field(fields, "label")?;
    let role = string_field(fields, "role")?;
    let media_key = MEDIA_FIELDS
        .iter()
        .find_map(|field| string_field(fields, field))
        .map(str::trim)
        .filter(|key| !key.is_empty())?;

    Some(MediaDescriptor::new(id, label, role, media_key))
}

fn string_field<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    fields.get(name).and_then(Value::as_str)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

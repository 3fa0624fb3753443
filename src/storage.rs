//! Persistence collaborators for variants and entries.
//!
//! The core never touches the filesystem; callers hand it variants and
//! entries loaded through a [`ProfileStorage`] and write results back the same
//! way. [`MemoryStorage`] backs tests, [`JsonStorage`] keeps one directory per
//! template id:
//!
//! ```text
//! <root>/<template_id>/variants.json
//! <root>/<template_id>/entries.json
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::entry::EntryStore;
use crate::model::{Entry, Variant, sanitize_key};

/// Errors from storage backends.
#[derive(Debug, Error, Diagnostic)]
pub enum StorageError {
    #[error("storage I/O failed: {path}")]
    #[diagnostic(
        code(postsmith::storage::io),
        help("Check that the store directory exists and you have read/write permissions.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt storage file: {path}")]
    #[diagnostic(
        code(postsmith::storage::json),
        help("The file is not valid JSON for this format ({message}). Restore it from a backup or delete it.")
    )]
    Json { path: String, message: String },

    #[error("invalid template id: \"{id}\"")]
    #[diagnostic(
        code(postsmith::storage::invalid_id),
        help("Template ids must contain at least one letter, digit, '_' or '-'.")
    )]
    InvalidId { id: String },
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Where variants and entries for each template id are kept.
pub trait ProfileStorage {
    /// Stored variants, or `None` if none were ever saved.
    fn load_variants(&self, template_id: &str) -> StorageResult<Option<Vec<Variant>>>;

    fn save_variants(&mut self, template_id: &str, variants: &[Variant]) -> StorageResult<()>;

    /// Every stored entry, in key order.
    fn load_entries(&self, template_id: &str) -> StorageResult<Vec<Entry>>;

    /// Insert or replace one entry by its sanitized key.
    fn save_entry(&mut self, template_id: &str, entry: &Entry) -> StorageResult<()>;

    /// Explicitly delete an entry. Returns whether it existed.
    fn delete_entry(&mut self, template_id: &str, key: &str) -> StorageResult<bool>;

    /// Stored entries as a keyed store.
    fn load_store(&self, template_id: &str) -> StorageResult<EntryStore> {
        Ok(EntryStore::from_entries(self.load_entries(template_id)?))
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Volatile storage, one slot per template id.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    variants: HashMap<String, Vec<Variant>>,
    entries: HashMap<String, EntryStore>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStorage for MemoryStorage {
    fn load_variants(&self, template_id: &str) -> StorageResult<Option<Vec<Variant>>> {
        Ok(self.variants.get(template_id).cloned())
    }

    fn save_variants(&mut self, template_id: &str, variants: &[Variant]) -> StorageResult<()> {
        self.variants
            .insert(template_id.to_string(), variants.to_vec());
        Ok(())
    }

    fn load_entries(&self, template_id: &str) -> StorageResult<Vec<Entry>> {
        Ok(self
            .entries
            .get(template_id)
            .map(|store| store.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn save_entry(&mut self, template_id: &str, entry: &Entry) -> StorageResult<()> {
        self.entries
            .entry(template_id.to_string())
            .or_default()
            .upsert(entry.clone());
        Ok(())
    }

    fn delete_entry(&mut self, template_id: &str, key: &str) -> StorageResult<bool> {
        Ok(self
            .entries
            .get_mut(template_id)
            .and_then(|store| store.remove(key))
            .is_some())
    }
}

// ---------------------------------------------------------------------------
// JSON directory backend
// ---------------------------------------------------------------------------

const VARIANTS_FILE: &str = "variants.json";
const ENTRIES_FILE: &str = "entries.json";

/// Pretty-printed JSON files under a root directory.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one template id's files.
    pub fn template_dir(&self, template_id: &str) -> StorageResult<PathBuf> {
        let name = sanitize_key(template_id).replace(char::is_whitespace, "_");
        if name.is_empty() {
            return Err(StorageError::InvalidId {
                id: template_id.to_string(),
            });
        }
        Ok(self.root.join(name))
    }

    /// Template ids with a directory under the root.
    pub fn list_templates(&self) -> Vec<String> {
        match std::fs::read_dir(&self.root) {
            Ok(dirs) => {
                let mut ids: Vec<String> = dirs
                    .filter_map(|d| d.ok())
                    .filter(|d| d.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
                    .filter_map(|d| d.file_name().into_string().ok())
                    .collect();
                ids.sort();
                ids
            }
            Err(_) => Vec::new(),
        }
    }

    fn read<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::Io {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::Json {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }

    /// Write through a sibling temp file so a crash never truncates `path`.
    fn write<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
        let io_err = |path: &Path, source| StorageError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let content = serde_json::to_string_pretty(value).map_err(|e| StorageError::Json {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))
    }

    fn save_store(&self, template_id: &str, store: &EntryStore) -> StorageResult<()> {
        let path = self.template_dir(template_id)?.join(ENTRIES_FILE);
        let entries: Vec<&Entry> = store.iter().collect();
        Self::write(&path, &entries)?;
        tracing::debug!(template = template_id, entries = entries.len(), "saved entries");
        Ok(())
    }
}

impl ProfileStorage for JsonStorage {
    fn load_variants(&self, template_id: &str) -> StorageResult<Option<Vec<Variant>>> {
        Self::read(&self.template_dir(template_id)?.join(VARIANTS_FILE))
    }

    fn save_variants(&mut self, template_id: &str, variants: &[Variant]) -> StorageResult<()> {
        Self::write(&self.template_dir(template_id)?.join(VARIANTS_FILE), variants)
    }

    fn load_entries(&self, template_id: &str) -> StorageResult<Vec<Entry>> {
        let entries: Option<Vec<Entry>> =
            Self::read(&self.template_dir(template_id)?.join(ENTRIES_FILE))?;
        Ok(entries.unwrap_or_default())
    }

    fn save_entry(&mut self, template_id: &str, entry: &Entry) -> StorageResult<()> {
        let mut store = self.load_store(template_id)?;
        store.upsert(entry.clone());
        self.save_store(template_id, &store)
    }

    fn delete_entry(&mut self, template_id: &str, key: &str) -> StorageResult<bool> {
        let mut store = self.load_store(template_id)?;
        let removed = store.remove(key).is_some();
        if removed {
            self.save_store(template_id, &store)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(key: &str) -> Entry {
        let mut e = Entry::new(key);
        e.fields.insert("gameName".into(), json!(key));
        e
    }

    #[test]
    fn memory_storage_upserts_by_key() {
        let mut storage = MemoryStorage::new();
        assert!(storage.load_variants("t").unwrap().is_none());
        assert!(storage.load_entries("t").unwrap().is_empty());

        storage.save_entry("t", &entry("Foo")).unwrap();
        storage.save_entry("t", &entry("Foo")).unwrap();
        storage.save_entry("t", &entry("Bar")).unwrap();
        let keys: Vec<_> = storage
            .load_entries("t")
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, ["Bar", "Foo"]);

        assert!(storage.delete_entry("t", "Foo").unwrap());
        assert!(!storage.delete_entry("t", "Foo").unwrap());
        assert!(storage.load_entries("other").unwrap().is_empty());
    }

    #[test]
    fn json_storage_rejects_empty_ids() {
        let storage = JsonStorage::new("/nonexistent");
        assert!(matches!(
            storage.template_dir("!!!"),
            Err(StorageError::InvalidId { .. })
        ));
        assert_eq!(
            storage.template_dir("My Notes").unwrap(),
            PathBuf::from("/nonexistent/My_Notes")
        );
    }

    #[test]
    fn json_storage_reports_corrupt_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path());
        let path = storage.template_dir("t").unwrap();
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join(ENTRIES_FILE), "{ not json").unwrap();
        assert!(matches!(
            storage.load_entries("t"),
            Err(StorageError::Json { .. })
        ));
    }
}

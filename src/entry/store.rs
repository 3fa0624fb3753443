//! In-memory entry store keyed by sanitized primary key.

use std::collections::BTreeMap;

use crate::model::{Entry, sanitize_key};

use super::merge::{MergePolicy, merge_entry};

/// Entries owned by the calling layer, keyed by sanitized primary key.
///
/// The store never deletes on its own: only [`EntryStore::remove`] does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryStore {
    entries: BTreeMap<String, Entry>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from loaded entries; later duplicates replace earlier ones.
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let mut store = Self::new();
        for entry in entries {
            store.upsert(entry);
        }
        store
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(&sanitize_key(key))
    }

    /// Insert or replace `entry`, returning the previous value.
    pub fn upsert(&mut self, mut entry: Entry) -> Option<Entry> {
        entry.key = sanitize_key(&entry.key);
        self.entries.insert(entry.key.clone(), entry)
    }

    /// Merge `incoming` into the stored entry with the same key, then upsert.
    pub fn merge_in(&mut self, incoming: Entry, policy: &MergePolicy) -> &Entry {
        let key = sanitize_key(&incoming.key);
        let merged = merge_entry(self.entries.get(&key), incoming, policy);
        self.upsert(merged);
        &self.entries[&key]
    }

    /// Explicit deletion.
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.entries.remove(&sanitize_key(key))
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Record, SubRecord};
    use serde_json::json;

    fn entry(key: &str, build: &str) -> Entry {
        let mut fields = Record::new();
        fields.insert("platform".into(), json!("Win64"));
        fields.insert("branch".into(), json!("stable"));
        fields.insert("buildId".into(), json!(build));
        let mut e = Entry::new(key);
        e.sub_records.push(SubRecord::new(fields));
        e
    }

    #[test]
    fn upsert_sanitizes_and_replaces() {
        let mut store = EntryStore::new();
        assert!(store.upsert(entry(" Foo! ", "1")).is_none());
        assert_eq!(store.get("Foo").unwrap().key, "Foo");

        let previous = store.upsert(entry("Foo", "2")).unwrap();
        assert_eq!(previous.sub_records[0].get("buildId"), Some(&json!("1")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn merge_in_updates_without_duplicating() {
        let mut store = EntryStore::new();
        let policy = MergePolicy::default();
        store.merge_in(entry("Foo", "1"), &policy);
        let merged = store.merge_in(entry("Foo", "2"), &policy);
        assert_eq!(merged.sub_records.len(), 1);
        assert_eq!(merged.sub_records[0].get("buildId"), Some(&json!("2")));
    }

    #[test]
    fn only_remove_deletes() {
        let mut store = EntryStore::from_entries([entry("Foo", "1"), entry("Bar", "1")]);
        store.merge_in(entry("Baz", "1"), &MergePolicy::default());
        assert_eq!(store.len(), 3);
        assert!(store.remove("Bar").is_some());
        let keys: Vec<_> = store.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["Baz", "Foo"]);
    }
}

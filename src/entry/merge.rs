//! Non-destructive merge of freshly parsed entries into stored ones.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Entry, SubRecord, display_value};

/// How sub-records are matched and ordered during a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergePolicy {
    /// Fields whose values identify a sub-record (e.g. platform + branch).
    ///
    /// Empty means sub-records only match when all their fields are equal.
    pub sub_record_key: Vec<String>,
    /// Field used to rank sub-records after merging.
    pub rank_field: Option<String>,
    /// Ordered families of case-insensitive substrings. A sub-record ranks at
    /// the index of the first family with a needle contained in its
    /// `rank_field` value; unmatched values rank after every family.
    pub rank_groups: Vec<Vec<String>>,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            sub_record_key: vec!["platform".into(), "branch".into()],
            rank_field: Some("platform".into()),
            rank_groups: vec![
                vec!["win".into()],
                vec!["linux".into()],
                vec!["mac".into(), "osx".into()],
            ],
        }
    }
}

impl MergePolicy {
    /// Identity of a sub-record under this policy.
    ///
    /// A sub-record carrying none of the key fields is identified by all of
    /// its fields, so it never matches an unrelated one.
    pub fn key_of(&self, sub: &SubRecord) -> SubRecordKey {
        let keyed = self
            .sub_record_key
            .iter()
            .any(|id| sub.fields.contains_key(id));
        if keyed {
            SubRecordKey::Fields(sub.key_tuple(&self.sub_record_key))
        } else {
            SubRecordKey::Whole(Value::Object(sub.fields.clone()).to_string())
        }
    }

    /// Rank of a sub-record; lower ranks come first.
    pub fn rank(&self, sub: &SubRecord) -> usize {
        let Some(value) = self
            .rank_field
            .as_deref()
            .and_then(|field| sub.get(field))
            .map(|v| display_value(v).to_lowercase())
        else {
            return self.rank_groups.len();
        };

        self.rank_groups
            .iter()
            .position(|family| {
                family
                    .iter()
                    .any(|needle| value.contains(&needle.to_lowercase()))
            })
            .unwrap_or(self.rank_groups.len())
    }

    /// Insert `sub` after the last sub-record ranked at or before it.
    ///
    /// Existing sub-records keep their relative order.
    pub fn insert_ranked(&self, sub_records: &mut Vec<SubRecord>, sub: SubRecord) {
        let rank = self.rank(&sub);
        let at = sub_records
            .iter()
            .rposition(|s| self.rank(s) <= rank)
            .map_or(0, |i| i + 1);
        sub_records.insert(at, sub);
    }
}

/// Identity of a sub-record during a merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubRecordKey {
    /// Display values of the policy's key fields.
    Fields(Vec<String>),
    /// Compact JSON of every field.
    Whole(String),
}

/// Merge `incoming` into `existing`.
///
/// With no existing entry, `incoming` is returned verbatim. Otherwise entry
/// fields overlay the stored ones (incoming wins per field), each incoming
/// sub-record overlays the stored sub-record with the same key tuple or is
/// inserted at its rank position. Stored sub-records are never reordered or
/// deleted.
pub fn merge_entry(existing: Option<&Entry>, incoming: Entry, policy: &MergePolicy) -> Entry {
    let Some(existing) = existing else {
        return incoming;
    };

    let mut merged = existing.clone();
    for (id, value) in incoming.fields {
        merged.fields.insert(id, value);
    }

    let mut updated = 0usize;
    let mut appended = 0usize;
    for sub in incoming.sub_records {
        let key = policy.key_of(&sub);
        match merged
            .sub_records
            .iter_mut()
            .find(|candidate| policy.key_of(candidate) == key)
        {
            Some(target) => {
                for (id, value) in sub.fields {
                    target.fields.insert(id, value);
                }
                updated += 1;
            }
            None => {
                policy.insert_ranked(&mut merged.sub_records, sub);
                appended += 1;
            }
        }
    }

    tracing::debug!(key = %merged.key, updated, appended, "merged entry");
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use serde_json::json;

    fn sub(platform: &str, branch: &str, build: &str) -> SubRecord {
        let mut fields = Record::new();
        fields.insert("platform".into(), json!(platform));
        fields.insert("branch".into(), json!(branch));
        fields.insert("buildId".into(), json!(build));
        SubRecord::new(fields)
    }

    fn entry(subs: Vec<SubRecord>) -> Entry {
        let mut e = Entry::new("Foo");
        e.fields.insert("gameName".into(), json!("Foo"));
        e.sub_records = subs;
        e
    }

    #[test]
    fn absent_existing_takes_incoming_verbatim() {
        let incoming = entry(vec![sub("Mac", "stable", "1"), sub("Win64", "stable", "2")]);
        let merged = merge_entry(None, incoming.clone(), &MergePolicy::default());
        assert_eq!(merged, incoming);
    }

    #[test]
    fn matching_sub_record_is_updated_in_place() {
        let existing = entry(vec![sub("Win64", "stable", "100")]);
        let incoming = entry(vec![sub("Win64", "stable", "123")]);
        let merged = merge_entry(Some(&existing), incoming, &MergePolicy::default());
        assert_eq!(merged.sub_records.len(), 1);
        assert_eq!(merged.sub_records[0].get("buildId"), Some(&json!("123")));
    }

    #[test]
    fn new_sub_records_are_appended_and_ranked() {
        let existing = entry(vec![sub("Win64", "stable", "1"), sub("Mac", "stable", "1")]);
        let incoming = entry(vec![
            sub("Linux", "stable", "2"),
            sub("Win64", "beta", "3"),
            sub("Switch", "stable", "4"),
        ]);
        let merged = merge_entry(Some(&existing), incoming, &MergePolicy::default());

        let key: Vec<String> = vec!["platform".into(), "branch".into()];
        let order: Vec<_> = merged
            .sub_records
            .iter()
            .map(|s| s.key_tuple(&key).join("/"))
            .collect();
        assert_eq!(
            order,
            ["Win64/stable", "Win64/beta", "Linux/stable", "Mac/stable", "Switch/stable"]
        );
    }

    #[test]
    fn stored_fields_survive_when_incoming_lacks_them() {
        let mut existing = entry(vec![]);
        existing.fields.insert("notes".into(), json!("keep me"));
        let mut incoming = entry(vec![]);
        incoming.fields.insert("gameName".into(), json!("Foo Deluxe"));
        let merged = merge_entry(Some(&existing), incoming, &MergePolicy::default());
        assert_eq!(merged.get("notes"), Some(&json!("keep me")));
        assert_eq!(merged.get("gameName"), Some(&json!("Foo Deluxe")));
    }

    #[test]
    fn merging_with_itself_is_a_no_op() {
        let policy = MergePolicy::default();
        let mut e = entry(vec![
            sub("Win64", "stable", "1"),
            sub("Linux", "stable", "2"),
            sub("Mac", "beta", "3"),
        ]);
        e.fields.insert("notes".into(), json!("n"));
        assert_eq!(merge_entry(Some(&e), e.clone(), &policy), e);
    }

    #[test]
    fn merging_unranked_entry_with_itself_keeps_its_order() {
        let policy = MergePolicy::default();
        let e = entry(vec![sub("Mac", "stable", "1"), sub("Win64", "stable", "2")]);
        assert_eq!(merge_entry(Some(&e), e.clone(), &policy), e);
    }

    #[test]
    fn stored_order_is_kept_when_appending() {
        let existing = entry(vec![sub("Mac", "stable", "1"), sub("Win64", "stable", "1")]);
        let incoming = entry(vec![sub("Mac", "stable", "2"), sub("Linux", "stable", "3")]);
        let merged = merge_entry(Some(&existing), incoming, &MergePolicy::default());

        let platforms: Vec<_> = merged
            .sub_records
            .iter()
            .map(|s| s.get("platform").cloned().unwrap_or_default())
            .collect();
        assert_eq!(platforms, [json!("Mac"), json!("Win64"), json!("Linux")]);
        assert_eq!(merged.sub_records[0].get("buildId"), Some(&json!("2")));
    }

    #[test]
    fn sub_records_without_key_fields_do_not_collide() {
        let os = |os: &str, build: &str| {
            let mut fields = Record::new();
            fields.insert("os".into(), json!(os));
            fields.insert("buildId".into(), json!(build));
            SubRecord::new(fields)
        };
        let policy = MergePolicy::default();
        let existing = entry(vec![os("win", "1")]);
        let incoming = entry(vec![os("linux", "2")]);
        let merged = merge_entry(Some(&existing), incoming, &policy);

        assert_eq!(merged.sub_records.len(), 2);
        assert_eq!(merged.sub_records[0].get("os"), Some(&json!("win")));
        assert_eq!(merged.sub_records[1].get("os"), Some(&json!("linux")));

        // Still idempotent.
        assert_eq!(merge_entry(Some(&merged), merged.clone(), &policy), merged);
    }

    #[test]
    fn partial_key_still_matches_by_tuple() {
        let mut fields = Record::new();
        fields.insert("platform".into(), json!("Win64"));
        fields.insert("buildId".into(), json!("1"));
        let existing = entry(vec![SubRecord::new(fields.clone())]);
        fields.insert("buildId".into(), json!("2"));
        let incoming = entry(vec![SubRecord::new(fields)]);

        let merged = merge_entry(Some(&existing), incoming, &MergePolicy::default());
        assert_eq!(merged.sub_records.len(), 1);
        assert_eq!(merged.sub_records[0].get("buildId"), Some(&json!("2")));
    }

    #[test]
    fn empty_key_matches_whole_records() {
        let policy = MergePolicy {
            sub_record_key: Vec::new(),
            rank_field: None,
            rank_groups: Vec::new(),
        };
        let existing = entry(vec![sub("Win64", "stable", "1")]);
        let incoming = entry(vec![sub("Win64", "stable", "1"), sub("Win64", "stable", "2")]);
        let merged = merge_entry(Some(&existing), incoming, &policy);
        assert_eq!(merged.sub_records.len(), 2);
    }

    #[test]
    fn rank_is_case_insensitive() {
        let policy = MergePolicy::default();
        assert_eq!(policy.rank(&sub("WINDOWS x64", "s", "1")), 0);
        assert_eq!(policy.rank(&sub("macOS", "s", "1")), 2);
        assert_eq!(policy.rank(&sub("PS5", "s", "1")), 3);
    }
}

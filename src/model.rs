//! Core data types shared by extraction, merging and rendering.
//!
//! A [`Variant`] describes one shape of pasted release-note text: how to
//! recognise it ([`DetectionRule`]) and which [`Field`]s to pull out of it.
//! Extraction produces [`Entry`] values keyed by the sanitized primary-key
//! field, each optionally carrying repeated [`SubRecord`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered string-keyed mapping used for entry fields and render scopes.
pub type Record = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Extraction rules
// ---------------------------------------------------------------------------

/// How to locate a value in free-form text.
///
/// When `regex` is set it fully overrides the anchor triple. Otherwise the
/// value starts after the `occurrence`-th match of `before` and runs up to the
/// next `after`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(default)]
    pub before: String,
    #[serde(default)]
    pub after: String,
    /// 1-based index of the `before` match that anchors extraction.
    #[serde(default = "default_occurrence")]
    pub occurrence: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

fn default_occurrence() -> u32 {
    1
}

impl Default for Pattern {
    fn default() -> Self {
        Self {
            before: String::new(),
            after: String::new(),
            occurrence: default_occurrence(),
            regex: None,
        }
    }
}

impl Pattern {
    /// Anchor pattern matching the first value between `before` and `after`.
    pub fn anchored(before: &str, after: &str) -> Self {
        Self {
            before: before.to_string(),
            after: after.to_string(),
            ..Default::default()
        }
    }

    /// Anchor pattern using the `occurrence`-th match of `before`.
    pub fn nth(before: &str, after: &str, occurrence: u32) -> Self {
        Self {
            occurrence,
            ..Self::anchored(before, after)
        }
    }

    /// Regex override pattern.
    pub fn regex(regex: &str) -> Self {
        Self {
            regex: Some(regex.to_string()),
            ..Default::default()
        }
    }

    /// Occurrence clamped to the valid 1-based range.
    pub fn effective_occurrence(&self) -> usize {
        self.occurrence.max(1) as usize
    }
}

/// Whether a field is extracted once per entry group or once per block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldScope {
    #[default]
    Entry,
    SubRecord,
}

/// A named, pattern-described value to extract from source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Unique within its variant; becomes the record key.
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, alias = "primary_key")]
    pub is_primary_key: bool,
    #[serde(default)]
    pub pattern: Pattern,
    #[serde(default)]
    pub scope: FieldScope,
}

impl Field {
    pub fn new(id: &str, pattern: Pattern) -> Self {
        Self {
            id: id.to_string(),
            label: id.to_string(),
            is_primary_key: false,
            pattern,
            scope: FieldScope::Entry,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn per_sub_record(mut self) -> Self {
        self.scope = FieldScope::SubRecord;
        self
    }
}

/// Marks entry blocks in multi-entry text: each `before` occurrence (or regex
/// match) starts a block, a non-empty `after` ends it. Named capture groups of
/// a regex anchor become sub-record values.
pub type EntryAnchor = Pattern;

/// A rule contributing to a variant's detection score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DetectionRule {
    /// +1 when the value is a substring of the text.
    Contains(String),
    /// +2 when the pattern matches the text.
    Regex(String),
}

/// One named parser configuration among several alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub detection_rules: Vec<DetectionRule>,
    #[serde(default)]
    pub sample_text: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Marks where each logical entry block starts in multi-entry text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_anchor: Option<EntryAnchor>,
}

impl Variant {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            detection_rules: Vec::new(),
            sample_text: String::new(),
            fields: Vec::new(),
            entry_anchor: None,
        }
    }

    pub fn with_rule(mut self, rule: DetectionRule) -> Self {
        self.detection_rules.push(rule);
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        if field.is_primary_key {
            for sibling in &mut self.fields {
                sibling.is_primary_key = false;
            }
        }
        self.fields.push(field);
        self
    }

    pub fn with_anchor(mut self, anchor: EntryAnchor) -> Self {
        self.entry_anchor = Some(anchor);
        self
    }

    /// The primary-key field, if one is designated.
    pub fn primary_key(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_primary_key)
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Designate `id` as the primary key, clearing the flag on all siblings.
    ///
    /// Returns `false` (and changes nothing) if no field has that id.
    pub fn set_primary_key(&mut self, id: &str) -> bool {
        if self.field(id).is_none() {
            return false;
        }
        for field in &mut self.fields {
            field.is_primary_key = field.id == id;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Structured records
// ---------------------------------------------------------------------------

/// A repeated structure nested inside an entry (e.g. one per platform).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubRecord {
    pub fields: Record,
}

impl SubRecord {
    pub fn new(fields: Record) -> Self {
        Self { fields }
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.fields.get(id)
    }

    /// Display forms of the values named by `key`, missing values as "".
    pub fn key_tuple(&self, key: &[String]) -> Vec<String> {
        key.iter()
            .map(|id| self.get(id).map(display_value).unwrap_or_default())
            .collect()
    }
}

/// One structured record identified by its sanitized primary-key value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub key: String,
    #[serde(default)]
    pub fields: Record,
    #[serde(default)]
    pub sub_records: Vec<SubRecord>,
}

impl Entry {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Default::default()
        }
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.fields.get(id)
    }

    /// Flatten into a render scope: own fields, `key`, and `subRecords`.
    pub fn to_record(&self) -> Record {
        let mut record = self.fields.clone();
        record
            .entry("key".to_string())
            .or_insert_with(|| Value::String(self.key.clone()));
        record.insert(
            "subRecords".to_string(),
            Value::Array(
                self.sub_records
                    .iter()
                    .map(|s| Value::Object(s.fields.clone()))
                    .collect(),
            ),
        );
        record
    }
}

/// Plain-text form of a value as it appears in rendered output.
///
/// `null` is empty, strings are verbatim, arrays join their elements with
/// `", "`, objects serialize as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Reduce a primary-key value to its storage key.
///
/// Keeps ASCII word characters, whitespace and `-`; trims the result.
pub fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

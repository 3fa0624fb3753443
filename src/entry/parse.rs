//! Multi-entry parsing: split pasted text into blocks, group blocks by
//! primary key, and extract every field at its declared scope.

use serde::Serialize;
use serde_json::Value;

use crate::extract::{ExtractError, ExtractResult, Matcher};
use crate::model::{Entry, Field, FieldScope, Record, SubRecord, Variant, sanitize_key};

// ── Report ──────────────────────────────────────────────────────────────

/// What happened to one field of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum FieldStatus {
    Found,
    Missing,
    PatternError { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOutcome {
    /// Sanitized key of the entry the field belongs to, when known.
    pub entry: Option<String>,
    pub field: String,
    #[serde(flatten)]
    pub status: FieldStatus,
}

/// Per-field success/failure summary of an extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    pub outcomes: Vec<FieldOutcome>,
    /// Blocks dropped because no primary key could be extracted.
    pub skipped_blocks: usize,
}

impl ExtractionReport {
    fn record(&mut self, entry: Option<&str>, field: &str, result: &ExtractResult<&str>) {
        let status = match result {
            Ok(_) => FieldStatus::Found,
            Err(ExtractError::Pattern { message, .. }) => FieldStatus::PatternError {
                message: message.clone(),
            },
            Err(_) => FieldStatus::Missing,
        };
        self.outcomes.push(FieldOutcome {
            entry: entry.map(str::to_string),
            field: field.to_string(),
            status,
        });
    }

    pub fn found(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == FieldStatus::Found)
            .count()
    }

    /// Outcomes that are not [`FieldStatus::Found`].
    pub fn failures(&self) -> impl Iterator<Item = &FieldOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status != FieldStatus::Found)
    }

    pub fn is_complete(&self) -> bool {
        self.skipped_blocks == 0 && self.failures().next().is_none()
    }
}

/// Entries parsed from one blob of text plus the extraction summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseOutcome {
    pub entries: Vec<Entry>,
    pub report: ExtractionReport,
}

// ── Compiled fields ─────────────────────────────────────────────────────

struct CompiledField<'v> {
    field: &'v Field,
    matcher: ExtractResult<Matcher<'v>>,
}

impl<'v> CompiledField<'v> {
    fn compile(field: &'v Field) -> Self {
        let matcher = Matcher::compile(&field.id, &field.pattern);
        if let Err(e) = &matcher {
            tracing::warn!(field = %field.id, error = %e, "regex override skipped");
        }
        Self { field, matcher }
    }

    fn find<'t>(&self, text: &'t str) -> ExtractResult<&'t str> {
        match &self.matcher {
            Ok(matcher) => matcher.find(text).ok_or_else(|| ExtractError::NotFound {
                field: self.field.id.clone(),
            }),
            Err(e) => Err(e.clone()),
        }
    }
}

fn compile_all(variant: &Variant) -> Vec<CompiledField<'_>> {
    variant.fields.iter().map(CompiledField::compile).collect()
}

// ── Segmentation ────────────────────────────────────────────────────────

/// One logical entry block in the source text.
#[derive(Debug, Clone)]
struct Block {
    start: usize,
    end: usize,
    /// Values carried by named capture groups of a regex anchor.
    captures: Record,
}

/// Split `text` into blocks using the variant's entry anchor.
///
/// A regex anchor starts a block at each match; a `before` anchor starts a
/// block at each occurrence and, if `after` is set, ends it just past the
/// first `after`. Without an anchor the whole text is a single block.
fn segment(text: &str, variant: &Variant) -> ExtractResult<Vec<Block>> {
    let Some(anchor) = &variant.entry_anchor else {
        return Ok(vec![whole(text)]);
    };

    let matcher = Matcher::compile("entry_anchor", anchor)?;
    let mut blocks = Vec::new();

    if let Some(regex) = matcher.regex() {
        let names: Vec<&str> = regex.capture_names().flatten().collect();
        for caps in regex.captures_iter(text) {
            let Some(m) = caps.get(0) else { continue };
            let mut captures = Record::new();
            for name in &names {
                if let Some(value) = caps.name(name).map(|g| g.as_str().trim()) {
                    if !value.is_empty() {
                        captures.insert(name.to_string(), Value::String(value.to_string()));
                    }
                }
            }
            blocks.push(Block {
                start: m.start(),
                end: text.len(),
                captures,
            });
        }
    } else if anchor.before.is_empty() {
        return Ok(vec![whole(text)]);
    } else {
        for (start, matched) in text.match_indices(anchor.before.as_str()) {
            let body = start + matched.len();
            let end = if anchor.after.is_empty() {
                text.len()
            } else {
                text[body..]
                    .find(anchor.after.as_str())
                    .map(|pos| body + pos + anchor.after.len())
                    .unwrap_or(text.len())
            };
            blocks.push(Block {
                start,
                end,
                captures: Record::new(),
            });
        }
    }

    // A block never runs past the start of the next one.
    for i in 1..blocks.len() {
        let next_start = blocks[i].start;
        let prev = &mut blocks[i - 1];
        prev.end = prev.end.min(next_start);
    }

    tracing::debug!(variant = %variant.id, blocks = blocks.len(), "segmented text");
    Ok(blocks)
}

fn whole(text: &str) -> Block {
    Block {
        start: 0,
        end: text.len(),
        captures: Record::new(),
    }
}

// ── Parsing ─────────────────────────────────────────────────────────────

/// A run of consecutive blocks sharing one sanitized primary key.
struct Group {
    key: String,
    raw_key: String,
    start: usize,
    end: usize,
    sub_records: Vec<SubRecord>,
}

/// Parse every entry in `text` according to `variant`.
///
/// Consecutive blocks with the same sanitized primary key become one entry
/// whose sub-records are one per block. Sub-record fields are extracted per
/// block (named anchor captures win), entry fields once per group. Field
/// failures land in the report; only a missing primary-key field or an
/// unusable anchor regex fails the whole call.
pub fn parse_entries(text: &str, variant: &Variant) -> ExtractResult<ParseOutcome> {
    let pk = variant
        .primary_key()
        .ok_or_else(|| ExtractError::MissingPrimaryKey {
            variant: variant.id.clone(),
        })?;

    let compiled = compile_all(variant);
    let pk_compiled = compiled
        .iter()
        .find(|c| c.field.id == pk.id)
        .ok_or_else(|| ExtractError::MissingPrimaryKey {
            variant: variant.id.clone(),
        })?;

    let blocks = segment(text, variant)?;
    let mut report = ExtractionReport::default();
    let mut groups: Vec<Group> = Vec::new();

    for block in &blocks {
        let block_text = &text[block.start..block.end];

        let raw_key = match block.captures.get(&pk.id).and_then(Value::as_str) {
            Some(captured) => Ok(captured),
            None => pk_compiled.find(block_text),
        };
        let key = raw_key.as_ref().map(|raw| sanitize_key(raw)).unwrap_or_default();
        if key.is_empty() {
            report.record(None, &pk.id, &raw_key.and(Err(not_found(pk))));
            report.skipped_blocks += 1;
            tracing::warn!(
                variant = %variant.id,
                offset = block.start,
                "skipping block without a primary key"
            );
            continue;
        }
        let raw_key = raw_key.unwrap_or_default().to_string();

        let sub_record = extract_sub_record(block, block_text, &compiled, &key, &mut report);

        match groups.last_mut() {
            Some(group) if group.key == key => {
                group.end = block.end;
                group.sub_records.extend(sub_record);
            }
            _ => groups.push(Group {
                key,
                raw_key,
                start: block.start,
                end: block.end,
                sub_records: sub_record.into_iter().collect(),
            }),
        }
    }

    let entries = groups
        .into_iter()
        .map(|group| {
            let group_text = &text[group.start..group.end];
            let mut entry = Entry::new(&group.key);
            entry
                .fields
                .insert(pk.id.clone(), Value::String(group.raw_key));
            report.record(Some(&group.key), &pk.id, &Ok(""));

            for c in compiled
                .iter()
                .filter(|c| c.field.scope == FieldScope::Entry && !c.field.is_primary_key)
            {
                let result = c.find(group_text);
                report.record(Some(&group.key), &c.field.id, &result);
                if let Ok(value) = result {
                    entry
                        .fields
                        .insert(c.field.id.clone(), Value::String(value.to_string()));
                }
            }
            entry.sub_records = group.sub_records;
            entry
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        variant = %variant.id,
        entries = entries.len(),
        found = report.found(),
        skipped = report.skipped_blocks,
        "parsed entries"
    );

    Ok(ParseOutcome { entries, report })
}

fn not_found(field: &Field) -> ExtractError {
    ExtractError::NotFound {
        field: field.id.clone(),
    }
}

/// Sub-record for one block: named captures plus sub-record-scoped fields.
fn extract_sub_record(
    block: &Block,
    block_text: &str,
    compiled: &[CompiledField<'_>],
    key: &str,
    report: &mut ExtractionReport,
) -> Option<SubRecord> {
    let mut fields = Record::new();

    for (name, value) in &block.captures {
        if compiled
            .iter()
            .any(|c| c.field.id == *name && c.field.is_primary_key)
        {
            continue;
        }
        fields.insert(name.clone(), value.clone());
    }

    for c in compiled
        .iter()
        .filter(|c| c.field.scope == FieldScope::SubRecord && !c.field.is_primary_key)
    {
        if fields.contains_key(&c.field.id) {
            report.record(Some(key), &c.field.id, &Ok(""));
            continue;
        }
        let result = c.find(block_text);
        report.record(Some(key), &c.field.id, &result);
        if let Ok(value) = result {
            fields.insert(c.field.id.clone(), Value::String(value.to_string()));
        }
    }

    (!fields.is_empty()).then(|| SubRecord::new(fields))
}

/// Extract every field of `variant` once over the whole text.
pub fn extract_record(text: &str, variant: &Variant) -> (Record, ExtractionReport) {
    let mut record = Record::new();
    let mut report = ExtractionReport::default();

    for c in compile_all(variant) {
        let result = c.find(text);
        report.record(None, &c.field.id, &result);
        if let Ok(value) = result {
            record.insert(c.field.id.clone(), Value::String(value.to_string()));
        }
    }

    (record, report)
}

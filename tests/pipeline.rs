//! End-to-end tests: profile → detection → parsing → merge → rendering.

use serde_json::json;

use postsmith::config::Profile;
use postsmith::entry::{EntryStore, merge_entry, parse_entries};
use postsmith::extract::{InferMode, InferenceConfig, extract_field, infer_pattern, select_variant};
use postsmith::model::{Entry, Field, Record, SubRecord};
use postsmith::template::{Context, RenderRules, Template, TemplateError, render, render_batch};

const RELEASE: &str = "[b]Foo [Win64] [Branch: stable] (Clean Steam Files)[/b] ... \
                       Version:[/b] [i]2024-01-01 [Build 123][/i]";

const PROFILE: &str = r#"
name = "releases"
default_variant = "bbcode"
template = """
[b]{gameName}[/b]
<LOOPOPEN:subRecords>{loop.number}. {platform} ({branch}) build {buildId}<LOOPCLOSE:subRecords>
<OPEN:hasBeta>

Beta builds available on {site}.<CLOSE:hasBeta>
"""

[ambient]
site = "example.org"

[render.conditions.hasBeta]
rule = "any"
path = "subRecords"
field = "branch"
predicate = { op = "equals", value = "beta" }

[[variants]]
id = "plain"
name = "Plain list"
detection_rules = [{ type = "contains", value = "Game:" }]

[[variants.fields]]
id = "gameName"
primary_key = true
pattern = { before = "Game:", after = "\n" }

[[variants]]
id = "bbcode"
name = "BBCode release"
detection_rules = [
    { type = "contains", value = "[Branch:" },
    { type = "regex", value = '\[Build \d+\]' },
]
entry_anchor = { before = "[b]" }

[[variants.fields]]
id = "gameName"
primary_key = true
pattern = { before = "[b]", after = " [" }

[[variants.fields]]
id = "platform"
scope = "sub_record"
pattern = { regex = '\[b\][^\[]*\[([^\]]+)\]' }

[[variants.fields]]
id = "branch"
scope = "sub_record"
pattern = { before = "[Branch: ", after = "]" }

[[variants.fields]]
id = "buildId"
scope = "sub_record"
pattern = { before = "[Build ", after = "]" }
"#;

fn profile() -> Profile {
    Profile::from_toml(PROFILE).unwrap()
}

fn ingest(store: &mut EntryStore, profile: &Profile, text: &str) {
    let variant = select_variant(text, &profile.variants, &profile.default_variant).unwrap();
    let outcome = parse_entries(text, variant).unwrap();
    for entry in outcome.entries {
        store.merge_in(entry, &profile.merge);
    }
}

#[test]
fn release_note_parses_and_reparse_updates_in_place() {
    let profile = profile();
    let variant = select_variant(RELEASE, &profile.variants, &profile.default_variant).unwrap();
    assert_eq!(variant.id, "bbcode");

    let mut store = EntryStore::new();
    ingest(&mut store, &profile, RELEASE);
    assert_eq!(store.len(), 1);
    let foo = store.get("Foo").unwrap();
    assert_eq!(foo.sub_records.len(), 1);
    assert_eq!(
        serde_json::Value::Object(foo.sub_records[0].fields.clone()),
        json!({"platform": "Win64", "branch": "stable", "buildId": "123"})
    );

    // Same text again: nothing changes.
    ingest(&mut store, &profile, RELEASE);
    let again = store.get("Foo").unwrap();
    assert_eq!(again.sub_records.len(), 1);

    // New build for the same platform/branch replaces the value in place.
    ingest(&mut store, &profile, &RELEASE.replace("Build 123", "Build 124"));
    let updated = store.get("Foo").unwrap();
    assert_eq!(updated.sub_records.len(), 1);
    assert_eq!(updated.sub_records[0].get("buildId"), Some(&json!("124")));
}

#[test]
fn multi_entry_text_merges_new_platforms() {
    let profile = profile();
    let mut store = EntryStore::new();
    ingest(&mut store, &profile, RELEASE);

    let more = "[b]Foo [Mac] [Branch: beta][/b] [Build 7]\n\
                [b]Foo [Linux] [Branch: stable][/b] [Build 8]\n\
                [b]Bar [Win64] [Branch: stable][/b] [Build 9]\n";
    ingest(&mut store, &profile, more);

    assert_eq!(store.len(), 2);
    let platforms: Vec<_> = store
        .get("Foo")
        .unwrap()
        .sub_records
        .iter()
        .map(|s| s.get("platform").cloned().unwrap_or_default())
        .collect();
    assert_eq!(platforms, [json!("Win64"), json!("Linux"), json!("Mac")]);
}

#[test]
fn reingesting_unranked_text_keeps_stored_order() {
    let profile = profile();
    let text = "[b]Foo [Mac] [Branch: stable][/b] [Build 1]\n\
                [b]Foo [Win64] [Branch: stable][/b] [Build 2]";
    let variant = select_variant(text, &profile.variants, &profile.default_variant).unwrap();
    let parsed = parse_entries(text, variant).unwrap().entries.remove(0);
    assert_eq!(merge_entry(Some(&parsed), parsed.clone(), &profile.merge), parsed);

    let mut store = EntryStore::new();
    ingest(&mut store, &profile, text);
    let first = store.get("Foo").unwrap().clone();
    ingest(&mut store, &profile, text);
    assert_eq!(store.get("Foo").unwrap(), &first);

    let platforms: Vec<_> = first
        .sub_records
        .iter()
        .map(|s| s.get("platform").cloned().unwrap_or_default())
        .collect();
    assert_eq!(platforms, [json!("Mac"), json!("Win64")]);
}

#[test]
fn rendered_bulletin_uses_ambient_and_conditions() {
    let profile = profile();
    let mut store = EntryStore::new();
    ingest(&mut store, &profile, RELEASE);
    ingest(&mut store, &profile, "[b]Foo [Mac] [Branch: beta][/b] [Build 7]");

    let template = profile.template().unwrap();
    let entries = store.into_entries();
    let out = template.render_batch(&entries, &profile.ambient, &profile.render);
    assert_eq!(
        out,
        "[b]Foo[/b]\n\
         1. Win64 (stable) build 123\n\
         2. Mac (beta) build 7\n\
         \n\
         Beta builds available on example.org."
    );
}

#[test]
fn batch_render_equals_joined_entry_renders() {
    let template = Template::parse(
        "\n{key}\n\n\n<LOOPOPEN:subRecords>- {platform}<LOOPCLOSE:subRecords>\n{missing}\n\n",
    )
    .unwrap();
    let ambient = Record::new();
    let rules = RenderRules::default();

    let entries: Vec<Entry> = ["Alpha", "Beta", "Gamma"]
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let mut entry = Entry::new(key);
            for platform in ["Win64", "Linux"].iter().take(i + 1) {
                let mut fields = Record::new();
                fields.insert("platform".into(), json!(platform));
                entry.sub_records.push(SubRecord::new(fields));
            }
            entry
        })
        .collect();

    let joined = entries
        .iter()
        .map(|entry| {
            let record = entry.to_record();
            render(template.nodes(), &Context::with_ambient(&record, &ambient), &rules)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let batch = render_batch(template.nodes(), &entries, &ambient, &rules);
    assert_eq!(batch, joined);
    assert!(batch.starts_with("Alpha\n\n- Win64\n{missing}\nBeta"));
}

#[test]
fn nested_same_key_loops_render_inner_items() {
    let template = Template::parse(
        "<LOOPOPEN:chapters>== {title} ==\n\
         <LOOPOPEN:chapters>* {title}<LOOPCLOSE:chapters><LOOPCLOSE:chapters>",
    )
    .unwrap();
    let data = json!({
        "chapters": [
            {"title": "Fixes", "chapters": [{"title": "crash"}, {"title": "typo"}]},
            {"title": "Known issues", "chapters": [{"title": "audio"}]},
        ]
    });
    let serde_json::Value::Object(record) = data else {
        unreachable!()
    };

    let out = template.render(&Context::root(&record), &RenderRules::default());
    assert_eq!(out, "== Fixes ==\n* crash\n* typo\n== Known issues ==\n* audio");
}

#[test]
fn inferred_pattern_extracts_the_selection() {
    let text = "Version:[/b] [i]2024-01-01[/i] more";
    let start = text.find("2024").unwrap();
    let inferred = infer_pattern(
        text,
        start,
        start + "2024-01-01".len(),
        InferMode::Auto,
        &InferenceConfig::default(),
    )
    .unwrap();

    let field = Field::new("released", inferred.into_pattern());
    assert_eq!(extract_field(text, &field).unwrap(), "2024-01-01");
    // Same input, same answer.
    assert_eq!(extract_field(text, &field).unwrap(), "2024-01-01");
}

#[test]
fn plain_variant_wins_on_its_own_text() {
    let profile = profile();
    let text = "Game: Foo\nBuild: 1\n";
    let variant = select_variant(text, &profile.variants, &profile.default_variant).unwrap();
    assert_eq!(variant.id, "plain");

    // No rule matches: the default variant wins the tie.
    let variant =
        select_variant("nothing here", &profile.variants, &profile.default_variant).unwrap();
    assert_eq!(variant.id, "bbcode");
}

#[test]
fn mismatched_template_is_a_syntax_error() {
    let err = Template::parse("<LOOPOPEN:a><OPEN:b>x<LOOPCLOSE:a><CLOSE:b>").unwrap_err();
    assert!(matches!(err, TemplateError::Mismatched { .. }));
}

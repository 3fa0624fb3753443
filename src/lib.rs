// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # postsmith
//!
//! Turns pasted release-note text into structured entries and renders them
//! back into bulletin markup through a small directive template language.
//!
//! ## Architecture
//!
//! - **Model** (`model`): fields, patterns, variants, entries
//! - **Extraction** (`extract`): anchor/regex field extraction, pattern
//!   inference from a highlighted span, variant detection
//! - **Entries** (`entry`): multi-entry segmentation and non-destructive merge
//! - **Templates** (`template`): stack-parsed directives rendered over scoped
//!   contexts
//! - **Profiles and storage** (`config`, `storage`, `paths`): TOML profiles,
//!   JSON entry store, XDG layout
//!
//! ## Library usage
//!
//! ```
//! use postsmith::entry::{EntryStore, MergePolicy, parse_entries};
//! use postsmith::model::{Field, Pattern, Record, Variant};
//! use postsmith::template::{RenderRules, Template};
//!
//! let variant = Variant::new("notes", "Release notes")
//!     .with_field(Field::new("game", Pattern::anchored("Game: ", "\n")).primary())
//!     .with_field(Field::new("build", Pattern::anchored("Build: ", "\n")));
//!
//! let parsed = parse_entries("Game: Foo\nBuild: 42\n", &variant).unwrap();
//! let mut store = EntryStore::new();
//! for entry in parsed.entries {
//!     store.merge_in(entry, &MergePolicy::default());
//! }
//!
//! let template = Template::parse("{game} is at build {build}").unwrap();
//! let entries = store.into_entries();
//! let out = template.render_batch(&entries, &Record::new(), &RenderRules::default());
//! assert_eq!(out, "Foo is at build 42");
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod extract;
pub mod model;
pub mod paths;
pub mod storage;
pub mod template;

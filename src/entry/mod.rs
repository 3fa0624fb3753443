//! Multi-entry parsing and merge-by-key.
//!
//! Pasted text flows through [`parse_entries`] into a list of [`Entry`]
//! values, which [`EntryStore::merge_in`] folds into the stored set without
//! ever deleting sub-records the new text does not mention.
//!
//! [`Entry`]: crate::model::Entry

pub mod merge;
pub mod parse;
pub mod store;

pub use merge::{MergePolicy, SubRecordKey, merge_entry};
pub use parse::{
    ExtractionReport, FieldOutcome, FieldStatus, ParseOutcome, extract_record, parse_entries,
};
pub use store::EntryStore;

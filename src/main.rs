//! postsmith CLI: release-note extraction and bulletin rendering.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use postsmith::config::Profile;
use postsmith::entry::{EntryStore, extract_record, parse_entries};
use postsmith::extract::{InferMode, infer_pattern, score_variants, select_variant};
use postsmith::model::{Entry, Variant};
use postsmith::paths::PostsmithPaths;
use postsmith::storage::{JsonStorage, ProfileStorage};
use postsmith::template::referenced_keys;

#[derive(Parser)]
#[command(name = "postsmith", version, about = "Release-note extraction and bulletin rendering")]
struct Cli {
    /// Directory of the JSON entry store (defaults to $XDG_DATA_HOME/postsmith/store).
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a profile and its template.
    Check {
        /// Profile file, or the name of a profile in the profile directory.
        #[arg(long)]
        profile: String,
    },

    /// Score every variant of a profile against some text.
    Detect {
        #[arg(long)]
        profile: String,
        /// Input file ("-" or omitted for stdin).
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Extract every field of one variant once, as a single record.
    Extract {
        #[arg(long)]
        profile: String,
        /// Variant id (detected when omitted).
        #[arg(long)]
        variant: Option<String>,
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Infer before/after anchors for a selected span of the input.
    Infer {
        /// Text to select; its first occurrence in the input is used.
        #[arg(long, conflicts_with_all = ["start", "end"])]
        select: Option<String>,
        /// Selection start, as a byte offset.
        #[arg(long, requires = "end")]
        start: Option<usize>,
        /// Selection end, as a byte offset (exclusive).
        #[arg(long, requires = "start")]
        end: Option<usize>,
        /// Inference mode: simple, nth, auto or regex.
        #[arg(long, default_value = "auto")]
        mode: InferMode,
        /// Profile whose [inference] vocabulary to use.
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Parse entries from text and merge them into the store.
    Ingest {
        #[arg(long)]
        profile: String,
        #[arg(long)]
        variant: Option<String>,
        #[arg(long)]
        input: Option<PathBuf>,
        /// Print the merged entries without saving them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Render stored entries through the profile's template.
    Render {
        #[arg(long)]
        profile: String,
        /// Render only these entry keys (all entries when omitted).
        #[arg(long = "key")]
        keys: Vec<String>,
    },

    /// Inspect or edit stored entries.
    Entries {
        #[arg(long)]
        profile: String,
        #[command(subcommand)]
        action: EntryAction,
    },
}

#[derive(Subcommand)]
enum EntryAction {
    /// List stored entry keys.
    List,
    /// Print one entry as JSON.
    Show { key: String },
    /// Delete one entry.
    Remove { key: String },
    /// Print the variant set recorded by the last ingest.
    Variants,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { profile } => {
            let profile = load_profile(&profile)?;
            let template = profile.template()?;
            println!("Profile \"{}\" is valid.", profile.name);
            println!("  default variant: {}", profile.default_variant);
            for variant in &profile.variants {
                let pk = variant
                    .primary_key()
                    .map(|f| f.id.as_str())
                    .unwrap_or("(none)");
                println!(
                    "  variant {}: {} fields, {} detection rules, primary key {}",
                    variant.id,
                    variant.fields.len(),
                    variant.detection_rules.len(),
                    pk
                );
            }
            println!(
                "  template: {} nodes, references {}",
                template.node_count(),
                referenced_keys(template.nodes()).join(", ")
            );
        }

        Commands::Detect { profile, input } => {
            let profile = load_profile(&profile)?;
            let text = read_input(input.as_deref())?;
            for score in score_variants(&text, &profile.variants) {
                println!("  {:>3}  {} ({})", score.score, score.variant.id, score.variant.name);
            }
            let selected = select_variant(&text, &profile.variants, &profile.default_variant)?;
            println!("Selected: {}", selected.id);
        }

        Commands::Extract {
            profile,
            variant,
            input,
        } => {
            let profile = load_profile(&profile)?;
            let text = read_input(input.as_deref())?;
            let variant = pick_variant(&profile, variant.as_deref(), &text)?;
            let (record, report) = extract_record(&text, variant);
            println!("{}", serde_json::to_string_pretty(&record).into_diagnostic()?);
            for failure in report.failures() {
                eprintln!("  {}: {:?}", failure.field, failure.status);
            }
            eprintln!("{} of {} fields found", report.found(), report.outcomes.len());
        }

        Commands::Infer {
            select,
            start,
            end,
            mode,
            profile,
            input,
        } => {
            let text = read_input(input.as_deref())?;
            let inference = match profile {
                Some(name) => load_profile(&name)?.inference,
                None => Default::default(),
            };
            let (start, end) = match (select, start, end) {
                (Some(selection), _, _) => match text.find(&selection) {
                    Some(pos) => (pos, pos + selection.len()),
                    None => miette::bail!("selection {selection:?} does not occur in the input"),
                },
                (None, Some(start), Some(end)) => (start, end),
                _ => miette::bail!("pass --select or both --start and --end"),
            };
            let inferred = infer_pattern(&text, start, end, mode, &inference)?;
            println!("{}", serde_json::to_string_pretty(&inferred).into_diagnostic()?);
        }

        Commands::Ingest {
            profile,
            variant,
            input,
            dry_run,
        } => {
            let profile = load_profile(&profile)?;
            let text = read_input(input.as_deref())?;
            let variant = pick_variant(&profile, variant.as_deref(), &text)?;
            let outcome = parse_entries(&text, variant)?;
            for failure in outcome.report.failures() {
                eprintln!(
                    "  {} / {}: {:?}",
                    failure.entry.as_deref().unwrap_or("?"),
                    failure.field,
                    failure.status
                );
            }

            let mut storage = open_storage(cli.store_dir)?;
            let mut store = storage.load_store(&profile.name)?;
            let mut merged: Vec<Entry> = Vec::new();
            for entry in outcome.entries {
                merged.push(store.merge_in(entry, &profile.merge).clone());
            }

            if dry_run {
                println!("{}", serde_json::to_string_pretty(&merged).into_diagnostic()?);
            } else {
                for entry in &merged {
                    storage.save_entry(&profile.name, entry)?;
                }
                storage.save_variants(&profile.name, &profile.variants)?;
                tracing::info!(
                    profile = %profile.name,
                    variant = %variant.id,
                    merged = merged.len(),
                    skipped = outcome.report.skipped_blocks,
                    "ingested entries"
                );
                println!("Merged {} entries into \"{}\".", merged.len(), profile.name);
            }
        }

        Commands::Render { profile, keys } => {
            let profile = load_profile(&profile)?;
            let template = profile.template()?;
            let storage = open_storage(cli.store_dir)?;
            let store = storage.load_store(&profile.name)?;
            let entries = select_entries(&store, &keys)?;
            println!(
                "{}",
                template.render_batch(&entries, &profile.ambient, &profile.render)
            );
        }

        Commands::Entries { profile, action } => {
            let profile = load_profile(&profile)?;
            let mut storage = open_storage(cli.store_dir)?;

            match action {
                EntryAction::List => {
                    let store = storage.load_store(&profile.name)?;
                    if store.is_empty() {
                        println!("No entries stored for \"{}\".", profile.name);
                    } else {
                        println!("Entries ({}):", store.len());
                        for entry in store.iter() {
                            println!("  {} [{} sub-records]", entry.key, entry.sub_records.len());
                        }
                    }
                }
                EntryAction::Show { key } => {
                    let store = storage.load_store(&profile.name)?;
                    let entries = select_entries(&store, std::slice::from_ref(&key))?;
                    println!("{}", serde_json::to_string_pretty(&entries[0]).into_diagnostic()?);
                }
                EntryAction::Remove { key } => {
                    if storage.delete_entry(&profile.name, &key)? {
                        println!("Removed \"{key}\".");
                    } else {
                        miette::bail!("no entry \"{key}\" in \"{}\"", profile.name);
                    }
                }
                EntryAction::Variants => match storage.load_variants(&profile.name)? {
                    Some(variants) => {
                        println!("{}", serde_json::to_string_pretty(&variants).into_diagnostic()?)
                    }
                    None => println!("No variants recorded for \"{}\".", profile.name),
                },
            }
        }
    }

    Ok(())
}

/// Load a profile from a path, or by name from the profile directory.
fn load_profile(arg: &str) -> Result<Profile> {
    let path = Path::new(arg);
    if path.is_file() {
        return Ok(Profile::load(path)?);
    }
    let paths = PostsmithPaths::resolve()?;
    Ok(Profile::load(&paths.profile_file(arg))?)
}

fn open_storage(store_dir: Option<PathBuf>) -> Result<JsonStorage> {
    let root = match store_dir {
        Some(dir) => dir,
        None => PostsmithPaths::resolve()?.store_dir(),
    };
    Ok(JsonStorage::new(root))
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path).into_diagnostic(),
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).into_diagnostic()?;
            Ok(text)
        }
    }
}

fn pick_variant<'p>(profile: &'p Profile, id: Option<&str>, text: &str) -> Result<&'p Variant> {
    match id {
        Some(id) => match profile.variant(id) {
            Some(variant) => Ok(variant),
            None => miette::bail!("profile \"{}\" has no variant \"{id}\"", profile.name),
        },
        None => {
            let variant = select_variant(text, &profile.variants, &profile.default_variant)?;
            tracing::info!(variant = %variant.id, "detected variant");
            Ok(variant)
        }
    }
}

fn select_entries(store: &EntryStore, keys: &[String]) -> Result<Vec<Entry>> {
    if keys.is_empty() {
        return Ok(store.iter().cloned().collect());
    }
    keys.iter()
        .map(|key| match store.get(key) {
            Some(entry) => Ok(entry.clone()),
            None => miette::bail!("no stored entry \"{key}\""),
        })
        .collect()
}

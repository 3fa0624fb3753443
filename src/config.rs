//! Profile configuration: variants, template and engine settings.
//!
//! A profile is one TOML file describing how a family of release notes is
//! parsed and rendered. Profiles live in `$XDG_CONFIG_HOME/postsmith/profiles/`
//! by default but can be loaded from any path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entry::MergePolicy;
use crate::extract::InferenceConfig;
use crate::model::{Record, Variant};
use crate::template::{RenderRules, Template, TemplateError};

/// Errors from loading or validating a profile.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read profile: {path}")]
    #[diagnostic(
        code(postsmith::config::read),
        help("Ensure the profile file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile: {path}")]
    #[diagnostic(
        code(postsmith::config::parse),
        help("Check the TOML syntax. {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to write profile: {path}")]
    #[diagnostic(
        code(postsmith::config::write),
        help("Ensure you have write permissions to the profile directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("profile \"{profile}\" defines no variants")]
    #[diagnostic(
        code(postsmith::config::no_variants),
        help("Add at least one [[variants]] table with an id and its fields.")
    )]
    NoVariants { profile: String },

    #[error("default variant \"{id}\" is not defined")]
    #[diagnostic(
        code(postsmith::config::unknown_default),
        help("Set `default_variant` to the id of one of the [[variants]] tables.")
    )]
    UnknownDefault { id: String },

    #[error("variant id \"{id}\" is defined more than once")]
    #[diagnostic(
        code(postsmith::config::duplicate_variant),
        help("Variant ids must be unique within a profile.")
    )]
    DuplicateVariant { id: String },

    #[error("variant \"{variant}\" marks {count} fields as primary key")]
    #[diagnostic(
        code(postsmith::config::multiple_primary_keys),
        help("At most one field per variant may set `primary_key = true`.")
    )]
    MultiplePrimaryKeys { variant: String, count: usize },

    #[error("profile \"{profile}\" has no template")]
    #[diagnostic(
        code(postsmith::config::no_template),
        help("Set `template` inline or point `template_file` at a template source.")
    )]
    NoTemplate { profile: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// A parse-and-render profile, persisted as TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile name; also the storage directory for its entries.
    pub name: String,
    /// Variant chosen when detection scores tie.
    #[serde(default = "default_variant")]
    pub default_variant: String,
    /// Inline template source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Template source file, relative to the profile file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_file: Option<PathBuf>,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub merge: MergePolicy,
    #[serde(default)]
    pub render: RenderRules,
    /// Values visible to every render beneath the entry's own fields.
    #[serde(default)]
    pub ambient: Record,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

fn default_variant() -> String {
    "default".into()
}

impl Profile {
    /// Empty profile with a single variant that becomes the default.
    pub fn new(name: &str, variant: Variant) -> Self {
        Self {
            name: name.to_string(),
            default_variant: variant.id.clone(),
            template: None,
            template_file: None,
            inference: InferenceConfig::default(),
            merge: MergePolicy::default(),
            render: RenderRules::default(),
            ambient: Record::new(),
            variants: vec![variant],
            base_dir: None,
        }
    }

    /// Parse and validate profile TOML.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        Self::parse_at(content, "<inline>")
    }

    fn parse_at(content: &str, path: &str) -> ConfigResult<Self> {
        let profile: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load and validate a profile file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut profile = Self::parse_at(&content, &path.display().to_string())?;
        profile.base_dir = path.parent().map(Path::to_path_buf);
        tracing::debug!(
            profile = %profile.name,
            variants = profile.variants.len(),
            "loaded profile"
        );
        Ok(profile)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Check the variant-set invariants.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.variants.is_empty() {
            return Err(ConfigError::NoVariants {
                profile: self.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        for variant in &self.variants {
            if !seen.insert(variant.id.as_str()) {
                return Err(ConfigError::DuplicateVariant {
                    id: variant.id.clone(),
                });
            }
            let count = variant.fields.iter().filter(|f| f.is_primary_key).count();
            if count > 1 {
                return Err(ConfigError::MultiplePrimaryKeys {
                    variant: variant.id.clone(),
                    count,
                });
            }
        }

        if !seen.contains(self.default_variant.as_str()) {
            return Err(ConfigError::UnknownDefault {
                id: self.default_variant.clone(),
            });
        }

        let keyed = self.merge.sub_record_key.is_empty()
            || self.variants.iter().any(|v| {
                v.fields
                    .iter()
                    .any(|f| self.merge.sub_record_key.contains(&f.id))
            });
        if !keyed {
            tracing::warn!(
                profile = %self.name,
                key = ?self.merge.sub_record_key,
                "merge key names no field of any variant; sub-records match on all fields"
            );
        }
        Ok(())
    }

    pub fn variant(&self, id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    /// Template source, inline or read from `template_file`.
    pub fn template_source(&self) -> ConfigResult<String> {
        if let Some(source) = &self.template {
            return Ok(source.clone());
        }
        let Some(file) = &self.template_file else {
            return Err(ConfigError::NoTemplate {
                profile: self.name.clone(),
            });
        };
        let path = match &self.base_dir {
            Some(dir) if file.is_relative() => dir.join(file),
            _ => file.clone(),
        };
        std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Parsed template.
    pub fn template(&self) -> ConfigResult<Template> {
        Ok(Template::parse(self.template_source()?)?)
    }
}

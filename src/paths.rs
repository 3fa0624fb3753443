//! XDG-compliant path resolution for postsmith.
//!
//! Profiles are read from `$XDG_CONFIG_HOME/postsmith/profiles/` and the
//! JSON entry store lives under `$XDG_DATA_HOME/postsmith/store/`.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(postsmith::paths::no_home),
        help("Set the HOME environment variable, or pass --store-dir and --profile explicitly.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(postsmith::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Global directories for postsmith.
#[derive(Debug, Clone)]
pub struct PostsmithPaths {
    /// `$XDG_CONFIG_HOME/postsmith/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/postsmith/`
    pub data_dir: PathBuf,
}

impl PostsmithPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;

        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config"))
            .join("postsmith");

        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/share"))
            .join("postsmith");

        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    /// Root of the JSON entry store.
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.config_dir.join("profiles")
    }

    /// Path of a named profile.
    pub fn profile_file(&self, name: &str) -> PathBuf {
        self.profiles_dir().join(format!("{name}.toml"))
    }

    /// Names of the profiles in the profile directory.
    pub fn list_profiles(&self) -> Vec<String> {
        match std::fs::read_dir(self.profiles_dir()) {
            Ok(files) => {
                let mut names: Vec<String> = files
                    .filter_map(|f| f.ok())
                    .map(|f| f.path())
                    .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
                    .filter_map(|p| p.file_stem()?.to_str().map(str::to_string))
                    .collect();
                names.sort();
                names
            }
            Err(_) => Vec::new(),
        }
    }

    /// Create the profile and store directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [self.profiles_dir(), self.store_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| PathError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }
}

//! Layered configuration.
//!
//! `defaults/splitmerge.default.toml` is embedded into the binary. User files
//! and CLI overrides are layered on top through [`Loader`] before the result
//! is deserialized into [`AppConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::plan::MetadataMode;

const DEFAULT_TOML: &str = include_str!("../defaults/splitmerge.default.toml");

/// Name of the optional per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = "splitmerge.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub library: LibraryConfig,
    pub preview: DebounceConfig,
    pub input: DebounceConfig,
    pub split_merge: SplitMergeDefaults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryConfig {
    pub root: PathBuf,
    #[serde(default)]
    scratch_dir: Option<PathBuf>,
}

impl LibraryConfig {
    /// The configured scratch directory, or `scratch/` inside the library.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| self.root.join("scratch"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DebounceConfig {
    pub debounce_ms: u64,
}

impl DebounceConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Defaults applied to requests that don't say otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitMergeDefaults {
    pub metadata: MetadataMode,
    pub delete_source: bool,
}

#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_default_config() {
        let config = Loader::new().build().expect("defaults to deserialize");
        assert_eq!(config.preview.window(), Duration::from_millis(400));
        assert_eq!(config.input.debounce_ms, 400);
        assert_eq!(config.split_merge.metadata, MetadataMode::CopyFirst);
        assert!(!config.split_merge.delete_source);
        assert_eq!(config.library.root, PathBuf::from("library"));
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("split_merge.metadata", "redo")
            .and_then(|l| l.set_override("preview.debounce_ms", 50i64))
            .expect("overrides to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.split_merge.metadata, MetadataMode::Redo);
        assert_eq!(config.preview.window(), Duration::from_millis(50));
    }

    #[test]
    fn layers_user_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCAL_CONFIG_FILE);
        std::fs::write(&path, "[library]\nroot = \"/srv/docs\"\n").unwrap();

        let config = Loader::new()
            .with_file(&path)
            .with_optional_file(dir.path().join("absent.toml"))
            .build()
            .unwrap();
        assert_eq!(config.library.root, PathBuf::from("/srv/docs"));
        assert_eq!(config.library.scratch_dir(), PathBuf::from("/srv/docs/scratch"));
    }

    #[test]
    fn explicit_scratch_dir_wins() {
        let config = Loader::new()
            .set_override("library.root", "/srv/docs")
            .and_then(|l| l.set_override("library.scratch_dir", "/tmp/splitmerge"))
            .expect("overrides to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.library.scratch_dir(), PathBuf::from("/tmp/splitmerge"));
    }

    #[test]
    fn missing_required_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Loader::new()
            .with_file(dir.path().join("absent.toml"))
            .build()
            .is_err());
    }
}

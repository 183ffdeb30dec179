pub mod edit;
pub mod execute;
pub mod info;
pub mod library;
pub mod merge;
pub mod pages;
pub mod split;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::RunOptions;
use crate::config::AppConfig;
use crate::merge::SplitMergeOutcome;
use crate::plan::{SplitMergeRequest, TargetSpec};
use crate::store::DocumentStore;

/// Configuration plus the opened library, shared by all commands.
pub struct AppContext {
    pub config: AppConfig,
    pub store: DocumentStore,
    scratch_dir: PathBuf,
}

impl AppContext {
    pub fn open(config: AppConfig) -> Result<Self> {
        let store = DocumentStore::open(&config.library.root).with_context(|| {
            format!("Failed to open library: {}", config.library.root.display())
        })?;
        let scratch_dir = config.library.scratch_dir();
        debug!(
            "Using library at {} (scratch {})",
            store.root().display(),
            scratch_dir.display()
        );
        Ok(AppContext {
            config,
            store,
            scratch_dir,
        })
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Build a request, filling unset options from the configuration.
    pub fn request(&self, plan: Vec<TargetSpec>, options: &RunOptions) -> SplitMergeRequest {
        SplitMergeRequest {
            plan,
            metadata: options
                .metadata
                .unwrap_or(self.config.split_merge.metadata),
            delete_source: options.delete_source || self.config.split_merge.delete_source,
            preview: options.preview,
        }
    }
}

pub fn print_outcome(outcome: &SplitMergeOutcome) {
    for file in &outcome.files {
        println!("Preview: {}", file.display());
    }
    if !outcome.documents.is_empty() {
        let ids: Vec<String> = outcome.documents.iter().map(|id| id.to_string()).collect();
        println!("Created document(s): {}", ids.join(", "));
    }
}

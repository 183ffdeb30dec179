//! Interactive split/merge editing with debounced preview regeneration.
//!
//! Every edit goes through the preview [`Debouncer`]; the owner of the editor
//! listens on the returned receiver and calls [`Editor::start_preview`]
//! whenever it fires. The returned [`PreviewRun`] works on the blocking pool
//! while the owner keeps handling input; its result goes back through
//! [`Editor::complete_preview`].

use lopdf::Document;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

use crate::config::SplitMergeDefaults;
use crate::debounce::Debouncer;
use crate::error::{MergeError, SessionError};
use crate::merge::{execute_split_merge_plan, SplitMergeOutcome};
use crate::page_chooser::PageChooser;
use crate::page_range::{decode, encode};
use crate::pdf::PdfDocument;
use crate::plan::{MetadataMode, SplitMergeRequest};
use crate::session::{DocumentRef, SplitMergeSession};
use crate::store::DocumentStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreviewState {
    pub loading: bool,
    /// One generated PDF per output document.
    pub files: Vec<PathBuf>,
    /// Page count of each preview, once loaded.
    pub num_pages: Vec<Option<u32>>,
    /// Page shown for each preview, once rendered.
    pub current_pages: Vec<Option<u32>>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct Editor {
    session: SplitMergeSession,
    pub delete_source: bool,
    pub metadata: MetadataMode,
    preview: PreviewState,
    trigger: Debouncer<()>,
    /// Bumped whenever in-flight previews stop matching the session.
    generation: u64,
}

/// A preview being generated on the blocking pool.
#[derive(Debug)]
pub struct PreviewRun {
    generation: u64,
    handle: JoinHandle<Result<SplitMergeOutcome, MergeError>>,
}

/// The result of a [`PreviewRun`], to hand to [`Editor::complete_preview`].
#[derive(Debug)]
pub struct PreviewResult {
    generation: u64,
    result: Result<SplitMergeOutcome, MergeError>,
}

impl PreviewRun {
    /// Wait for the run to finish. Cancel safe; must not be called again
    /// once it has returned.
    pub async fn wait(&mut self) -> PreviewResult {
        let result = (&mut self.handle).await.unwrap_or_else(|e| Err(join_error(e)));
        PreviewResult {
            generation: self.generation,
            result,
        }
    }

    /// Let a superseded run finish in the background and remove its files.
    pub fn abandon(self) {
        tokio::spawn(async move {
            if let Ok(Ok(outcome)) = self.handle.await {
                remove_files(&outcome.files);
            }
        });
    }
}

/// Look up a library document along with its page count.
pub fn load_document_ref(store: &DocumentStore, id: u64) -> Result<DocumentRef, MergeError> {
    let doc = store.get(id)?;
    let page_count = match store.pdf_path(&doc) {
        Ok(path) => Some(PdfDocument::from_document(Document::load(path)?).page_count()),
        Err(MergeError::NoPdf(_)) => None,
        Err(e) => return Err(e),
    };
    Ok(DocumentRef {
        id,
        title: doc.record.title,
        page_count,
    })
}

impl Editor {
    /// Create an editor. A first preview is scheduled right away.
    pub fn new(window: Duration, defaults: &SplitMergeDefaults) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (trigger, rx) = Debouncer::new(window);
        let editor = Editor {
            session: SplitMergeSession::new(),
            delete_source: defaults.delete_source,
            metadata: defaults.metadata,
            preview: PreviewState::default(),
            trigger,
            generation: 0,
        };
        editor.changed();
        (editor, rx)
    }

    pub fn session(&self) -> &SplitMergeSession {
        &self.session
    }

    pub fn preview(&self) -> &PreviewState {
        &self.preview
    }

    fn changed(&self) {
        self.trigger.trigger(());
    }

    pub fn add_document(&mut self, document: DocumentRef) {
        self.session.add_document(document);
        self.changed();
    }

    pub fn remove_document(&mut self, index: usize) -> Result<(), SessionError> {
        self.session.remove_document(index)?;
        for slot in [&mut self.preview.num_pages, &mut self.preview.current_pages] {
            if let Some(value) = slot.get_mut(index) {
                *value = None;
            }
        }
        self.changed();
        Ok(())
    }

    /// The part's pages as page range text; empty for whole documents.
    pub fn pages_text(&self, index: usize) -> Result<String, SessionError> {
        let part = self
            .session
            .documents()
            .get(index)
            .ok_or(SessionError::IndexOutOfRange(index))?;
        Ok(part.pages.as_deref().map(encode).unwrap_or_default())
    }

    /// Apply page range text typed by the user.
    pub fn set_pages_text(&mut self, index: usize, text: &str) -> Result<(), SessionError> {
        self.session.set_document_pages(index, decode(text))?;
        self.changed();
        Ok(())
    }

    pub fn choose_pages(&self, index: usize) -> Result<PageChooser, SessionError> {
        self.session
            .documents()
            .get(index)
            .map(PageChooser::select)
            .ok_or(SessionError::IndexOutOfRange(index))
    }

    pub fn choose_split(&self, index: usize) -> Result<PageChooser, SessionError> {
        self.session
            .documents()
            .get(index)
            .map(PageChooser::split)
            .ok_or(SessionError::IndexOutOfRange(index))
    }

    /// Apply a chooser's confirmed pages to part `index`, either as its new
    /// page list or as split points. Returns false if the chooser had already
    /// been confirmed.
    pub fn confirm_chooser(&mut self, index: usize, chooser: &mut PageChooser) -> Result<bool, SessionError> {
        let Some(pages) = chooser.confirm() else {
            return Ok(false);
        };
        if chooser.is_splitting() {
            self.session.split_document(index, &pages)?;
        } else {
            self.session.set_document_pages(index, pages)?;
        }
        self.changed();
        Ok(true)
    }

    pub fn move_part(&mut self, from: usize, to: usize) -> Result<(), SessionError> {
        if self.session.move_part(from, to)? {
            self.changed();
        }
        Ok(())
    }

    /// Drop the session without executing it.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.session.clear();
        self.discard_previews();
        self.preview = PreviewState::default();
    }

    fn discard_previews(&mut self) {
        remove_files(&self.preview.files);
        self.preview.files.clear();
        self.preview.num_pages.clear();
        self.preview.current_pages.clear();
    }

    /// Start a preview run. Returns the request to execute, or `None` when
    /// there is nothing to preview (previews and error are then cleared).
    pub fn begin_preview(&mut self) -> Option<SplitMergeRequest> {
        self.generation += 1;
        self.discard_previews();
        if !self.session.has_documents() {
            self.preview.loading = false;
            self.preview.error = None;
            return None;
        }
        self.preview.loading = true;
        Some(
            self.session
                .to_request(true, self.delete_source, self.metadata),
        )
    }

    pub fn finish_preview(&mut self, result: Result<SplitMergeOutcome, MergeError>) {
        self.preview.loading = false;
        match result {
            Ok(outcome) => {
                self.preview.error = None;
                self.preview.num_pages = vec![None; outcome.files.len()];
                self.preview.current_pages = vec![None; outcome.files.len()];
                self.preview.files = outcome.files;
            }
            Err(e) => {
                warn!("Preview failed: {}", e);
                self.preview.error = Some(e.to_string());
            }
        }
    }

    pub fn preview_loaded(&mut self, index: usize, num_pages: u32) {
        if let Some(slot) = self.preview.num_pages.get_mut(index) {
            *slot = Some(num_pages);
        }
    }

    pub fn page_rendered(&mut self, index: usize, page_number: u32) {
        if page_number > 0 {
            if let Some(slot) = self.preview.current_pages.get_mut(index) {
                if slot.is_none() {
                    *slot = Some(1);
                }
            }
        }
    }

    /// Start regenerating previews on the blocking pool. Returns `None` when
    /// the session is empty.
    pub fn start_preview(
        &mut self,
        store: &DocumentStore,
        scratch_dir: &Path,
    ) -> Option<PreviewRun> {
        let request = self.begin_preview()?;
        Some(PreviewRun {
            generation: self.generation,
            handle: spawn_plan(store, request, scratch_dir),
        })
    }

    /// Apply a finished preview run. Results of runs that were superseded by
    /// a later preview, a save or a cancel are discarded.
    pub fn complete_preview(&mut self, done: PreviewResult) {
        if done.generation != self.generation {
            debug!("Dropping stale preview run {}", done.generation);
            if let Ok(outcome) = done.result {
                remove_files(&outcome.files);
            }
            return;
        }
        self.finish_preview(done.result);

        for index in 0..self.preview.files.len() {
            let file = self.preview.files[index].clone();
            match Document::load(&file) {
                Ok(doc) => {
                    let count = PdfDocument::from_document(doc).page_count();
                    self.preview_loaded(index, count);
                    self.page_rendered(index, 1);
                }
                Err(e) => warn!("Could not load preview {}: {}", file.display(), e),
            }
        }
    }

    /// Execute the session for real. On success the session is cleared and
    /// the ids of the created documents are returned; on failure the error
    /// message is kept for display and the session stays as it was.
    pub async fn save(&mut self, store: &DocumentStore, scratch_dir: &Path) -> Option<Vec<u64>> {
        self.generation += 1;
        self.discard_previews();
        self.preview.loading = true;
        let request = self
            .session
            .to_request(false, self.delete_source, self.metadata);
        let result = spawn_plan(store, request, scratch_dir)
            .await
            .unwrap_or_else(|e| Err(join_error(e)));
        self.preview.loading = false;

        match result {
            Ok(outcome) => {
                self.preview.error = None;
                self.session.clear();
                Some(outcome.documents)
            }
            Err(e) => {
                warn!("Save failed: {}", e);
                self.preview.error = Some(e.to_string());
                None
            }
        }
    }

    pub async fn close(mut self) {
        self.discard_previews();
        self.trigger.close().await;
    }
}

fn spawn_plan(
    store: &DocumentStore,
    request: SplitMergeRequest,
    scratch_dir: &Path,
) -> JoinHandle<Result<SplitMergeOutcome, MergeError>> {
    let store = store.clone();
    let scratch_dir = scratch_dir.to_path_buf();
    tokio::task::spawn_blocking(move || execute_split_merge_plan(&store, &request, &scratch_dir))
}

fn join_error(e: JoinError) -> MergeError {
    MergeError::Io(io::Error::other(e.to_string()))
}

fn remove_files(files: &[PathBuf]) {
    for file in files {
        if let Err(e) = fs::remove_file(file) {
            debug!("Could not remove preview {}: {}", file.display(), e);
        }
    }
}

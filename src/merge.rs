//! Executes split/merge requests against the document library.

use lopdf::Document;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::MergeError;
use crate::page_range::parse_page_list;
use crate::pdf::{PdfAssembler, PdfDocument};
use crate::plan::{MetadataMode, SplitMergeRequest, TargetSpec};
use crate::store::{ConsumeOverrides, DocumentRecord, DocumentStore, StoredDocument};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitMergeOutcome {
    /// Produced files. Only populated for previews; otherwise the files have
    /// been moved into the library.
    pub files: Vec<PathBuf>,
    /// Ids of the library documents created. Empty for previews.
    pub documents: Vec<u64>,
}

/// Source PDFs opened during one execution, keyed by document id.
struct PdfCache {
    cache: HashMap<u64, PdfDocument>,
}

impl PdfCache {
    fn new() -> Self {
        PdfCache {
            cache: HashMap::new(),
        }
    }

    fn open(&mut self, store: &DocumentStore, doc: &StoredDocument) -> Result<&PdfDocument, MergeError> {
        let pdf: &PdfDocument = match self.cache.entry(doc.id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let path = store.pdf_path(doc)?;
                debug!("Opening {} for document {}", path.display(), doc.id);
                entry.insert(PdfDocument::from_document(Document::load(&path)?))
            }
        };
        Ok(pdf)
    }
}

/// Run a split/merge request.
///
/// Each plan entry becomes one PDF written to `scratch_dir`. Previews stop
/// there. Otherwise every output is consumed into the library and, once all
/// of them are stored, the sources are deleted if the request asks for it.
pub fn execute_split_merge_plan(
    store: &DocumentStore,
    request: &SplitMergeRequest,
    scratch_dir: &Path,
) -> Result<SplitMergeOutcome, MergeError> {
    fs::create_dir_all(scratch_dir)?;

    let mut cache = PdfCache::new();
    let mut outputs: Vec<(PathBuf, ConsumeOverrides)> = Vec::new();

    for (index, target) in request.plan.iter().enumerate() {
        match build_target(store, &mut cache, request.metadata, index, target, scratch_dir) {
            Ok(output) => outputs.push(output),
            Err(e) => {
                discard(outputs.iter().map(|(path, _)| path.as_path()));
                return Err(e);
            }
        }
    }

    if request.preview {
        info!("Generated {} preview document(s)", outputs.len());
        return Ok(SplitMergeOutcome {
            files: outputs.into_iter().map(|(path, _)| path).collect(),
            documents: Vec::new(),
        });
    }

    // All outputs are stored, or none of them.
    let mut documents = Vec::new();
    let mut pending = outputs.into_iter();
    while let Some((path, overrides)) = pending.next() {
        match store.consume(&path, overrides) {
            Ok(id) => documents.push(id),
            Err(e) => {
                let unconsumed = pending.as_slice().iter().map(|(path, _)| path.as_path());
                discard(std::iter::once(path.as_path()).chain(unconsumed));
                roll_back(store, &documents);
                return Err(e);
            }
        }
    }

    if request.delete_source {
        for id in request.source_documents() {
            store.delete(id)?;
        }
    }

    info!("Split/merge created {} document(s)", documents.len());
    Ok(SplitMergeOutcome {
        files: Vec::new(),
        documents,
    })
}

fn build_target(
    store: &DocumentStore,
    cache: &mut PdfCache,
    metadata: MetadataMode,
    index: usize,
    target: &TargetSpec,
    scratch_dir: &Path,
) -> Result<(PathBuf, ConsumeOverrides), MergeError> {
    if target.is_empty() {
        return Err(MergeError::EmptyTarget(index));
    }

    let mut assembler = PdfAssembler::new();
    let mut overrides = ConsumeOverrides::default();

    for (i, source) in target.iter().enumerate() {
        let document = store.get(source.document)?;
        let pdf = cache.open(store, &document)?;
        let total = pdf.page_count();
        let pages = match source.pages.as_deref() {
            Some(text) => parse_page_list(text, total)?,
            None => (1..=total).collect(),
        };
        assembler.require_version(pdf.version());

        if i == 0 {
            overrides.title = Some(document.record.title.clone());
            if let Err(e) = assembler.copy_info(pdf, document.id) {
                warn!("Could not copy PDF metadata of document {}: {}", document.id, e);
            }
            if metadata == MetadataMode::CopyFirst {
                copy_document_metadata(&document.record, &mut overrides);
            }
        }

        for page in pages {
            assembler.append_page(pdf, document.id, page)?;
        }
    }

    debug!(
        "Target {} has {} page(s), PDF {}",
        index,
        assembler.page_count(),
        assembler.version()
    );
    let mut output = assembler.finish();
    let mut file = tempfile::Builder::new()
        .prefix("merge_")
        .suffix(".pdf")
        .tempfile_in(scratch_dir)?;
    output.save_to(&mut file)?;
    let (_, path) = file.keep().map_err(|e| e.error)?;

    debug!("Target {} written to {}", index, path.display());
    Ok((path, overrides))
}

fn copy_document_metadata(record: &DocumentRecord, overrides: &mut ConsumeOverrides) {
    overrides.correspondent = record.correspondent;
    overrides.document_type = record.document_type;
    if !record.tags.is_empty() {
        overrides.tags = Some(record.tags.clone());
    }
    overrides.created = record.created.clone();
}

fn discard<'a>(paths: impl Iterator<Item = &'a Path>) {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }
}

/// Delete documents stored by a run that failed part way.
fn roll_back(store: &DocumentStore, documents: &[u64]) {
    for &id in documents {
        if let Err(e) = store.delete(id) {
            warn!("Could not roll back document {}: {}", id, e);
        }
    }
}

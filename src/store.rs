//! On-disk document library.
//!
//! ```text
//! <root>/meta/<id>.json      DocumentRecord
//! <root>/originals/<file>    original upload, named by the record
//! <root>/archive/<id>.pdf    optional PDF rendition of a non-PDF original
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::MergeError;

pub const PDF_MIME_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub title: String,
    pub mime_type: String,
    /// File name under `originals/`.
    pub filename: String,
    #[serde(default)]
    pub correspondent: Option<u64>,
    #[serde(default)]
    pub document_type: Option<u64>,
    #[serde(default)]
    pub tags: Vec<u64>,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub id: u64,
    pub record: DocumentRecord,
}

/// Metadata applied to a consumed document instead of fresh defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumeOverrides {
    pub title: Option<String>,
    pub correspondent: Option<u64>,
    pub document_type: Option<u64>,
    pub tags: Option<Vec<u64>>,
    pub created: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Open a library, creating its directory layout if needed.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, MergeError> {
        let root = root.as_ref().to_path_buf();
        for dir in ["meta", "originals", "archive"] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(DocumentStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn meta_path(&self, id: u64) -> PathBuf {
        self.root.join("meta").join(format!("{}.json", id))
    }

    pub fn original_path(&self, doc: &StoredDocument) -> PathBuf {
        self.root.join("originals").join(&doc.record.filename)
    }

    pub fn archive_path(&self, id: u64) -> PathBuf {
        self.root.join("archive").join(format!("{}.pdf", id))
    }

    pub fn has_archive_version(&self, id: u64) -> bool {
        self.archive_path(id).is_file()
    }

    pub fn get(&self, id: u64) -> Result<StoredDocument, MergeError> {
        let text = match fs::read_to_string(self.meta_path(id)) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MergeError::DocumentNotFound(id))
            }
            Err(e) => return Err(e.into()),
        };
        let record = serde_json::from_str(&text)?;
        Ok(StoredDocument { id, record })
    }

    /// Ids of all documents, ascending.
    fn ids(&self) -> Vec<u64> {
        let mut ids = Vec::new();
        for entry in WalkDir::new(self.root.join("meta"))
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()).map(str::parse) {
                Some(Ok(id)) => ids.push(id),
                _ => warn!("Ignoring unexpected file in library: {}", path.display()),
            }
        }
        ids.sort_unstable();
        ids
    }

    /// All documents, ordered by id.
    pub fn list(&self) -> Result<Vec<StoredDocument>, MergeError> {
        self.ids().into_iter().map(|id| self.get(id)).collect()
    }

    /// Store the record built for the next free id.
    ///
    /// The record file is written aside and linked into place without
    /// replacing an existing one, so concurrent callers never share an id.
    fn create_record(
        &self,
        build: impl Fn(u64) -> DocumentRecord,
    ) -> Result<StoredDocument, MergeError> {
        let mut id = self.ids().last().map_or(1, |last| last + 1);
        loop {
            let record = build(id);
            let mut file = NamedTempFile::new_in(self.root.join("meta"))?;
            serde_json::to_writer_pretty(&mut file, &record)?;
            match file.persist_noclobber(self.meta_path(id)) {
                Ok(_) => return Ok(StoredDocument { id, record }),
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    debug!("Document id {} taken, trying the next one", id);
                    id += 1;
                }
                Err(e) => return Err(e.error.into()),
            }
        }
    }

    /// Undo [`Self::create_record`] after the document's file could not be stored.
    fn abandon_record(&self, id: u64) {
        if let Err(e) = remove_if_exists(&self.meta_path(id)) {
            warn!("Could not remove record of document {}: {}", id, e);
        }
    }

    /// Copy a file into the library as a new document.
    pub fn import<P: AsRef<Path>>(
        &self,
        path: P,
        title: Option<String>,
    ) -> Result<StoredDocument, MergeError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MergeError::MissingFile(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let title = title.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Untitled")
                .to_string()
        });

        let doc = self.create_record(|id| DocumentRecord {
            title: title.clone(),
            mime_type: mime_type_for(extension.as_deref()).to_string(),
            filename: match &extension {
                Some(ext) => format!("{:07}.{}", id, ext),
                None => format!("{:07}", id),
            },
            correspondent: None,
            document_type: None,
            tags: Vec::new(),
            created: None,
        })?;

        if let Err(e) = fs::copy(path, self.original_path(&doc)) {
            self.abandon_record(doc.id);
            return Err(e.into());
        }
        info!("Imported {} as document {}", path.display(), doc.id);
        Ok(doc)
    }

    /// Attach a PDF rendition to an existing document.
    pub fn set_archive_version<P: AsRef<Path>>(&self, id: u64, pdf: P) -> Result<(), MergeError> {
        self.get(id)?;
        fs::copy(pdf.as_ref(), self.archive_path(id))?;
        Ok(())
    }

    /// Move a produced PDF into the library as a new document.
    pub fn consume<P: AsRef<Path>>(
        &self,
        file: P,
        overrides: ConsumeOverrides,
    ) -> Result<u64, MergeError> {
        let file = file.as_ref();
        let doc = self.create_record(|id| DocumentRecord {
            title: overrides
                .title
                .clone()
                .unwrap_or_else(|| format!("Document {}", id)),
            mime_type: PDF_MIME_TYPE.to_string(),
            filename: format!("{:07}.pdf", id),
            correspondent: overrides.correspondent,
            document_type: overrides.document_type,
            tags: overrides.tags.clone().unwrap_or_default(),
            created: overrides.created.clone(),
        })?;
        let target = self.original_path(&doc);

        if let Err(e) = move_file(file, &target) {
            self.abandon_record(doc.id);
            return Err(e.into());
        }
        info!("Consumed {} as document {}", file.display(), doc.id);
        Ok(doc.id)
    }

    pub fn delete(&self, id: u64) -> Result<(), MergeError> {
        let doc = self.get(id)?;
        remove_if_exists(&self.original_path(&doc))?;
        remove_if_exists(&self.archive_path(id))?;
        fs::remove_file(self.meta_path(id))?;
        info!("Deleted document {}", id);
        Ok(())
    }

    /// The PDF file to read pages from: the original when it is a PDF,
    /// otherwise the archived rendition.
    pub fn pdf_path(&self, doc: &StoredDocument) -> Result<PathBuf, MergeError> {
        let path = if doc.record.mime_type == PDF_MIME_TYPE {
            self.original_path(doc)
        } else if self.has_archive_version(doc.id) {
            self.archive_path(doc.id)
        } else {
            return Err(MergeError::NoPdf(doc.id));
        };

        if !path.exists() {
            return Err(MergeError::MissingFile(path));
        }
        debug!("Document {} reads from {}", doc.id, path.display());
        Ok(path)
    }
}

fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_err() {
        // Scratch space may live on another filesystem.
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), MergeError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn mime_type_for(extension: Option<&str>) -> &'static str {
    match extension {
        Some("pdf") => PDF_MIME_TYPE,
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Document {0} does not exist.")]
    DocumentNotFound(u64),

    #[error("Document {0} does not have a PDF.")]
    NoPdf(u64),

    #[error("{} does not exist.", .0.display())]
    MissingFile(PathBuf),

    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    #[error("Page {0} is out of range.")]
    PageOutOfRange(u32),

    #[error("Target document {0} has no source documents.")]
    EmptyTarget(usize),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid document record: {0}")]
    Record(#[from] serde_json::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("No document part at position {0}")]
    IndexOutOfRange(usize),

    #[error("Page count of document {0} is unknown; cannot split it")]
    UnknownPageCount(u64),
}

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use super::AppContext;
use crate::editor::load_document_ref;

pub fn run_import(
    ctx: &AppContext,
    files: &[PathBuf],
    title: Option<String>,
    archive: Option<&Path>,
) -> Result<()> {
    if files.len() > 1 && (title.is_some() || archive.is_some()) {
        bail!("--title and --archive only apply when importing a single file");
    }

    for file in files {
        let doc = ctx
            .store
            .import(file, title.clone())
            .with_context(|| format!("Failed to import {}", file.display()))?;
        if let Some(archive) = archive {
            ctx.store
                .set_archive_version(doc.id, archive)
                .with_context(|| format!("Failed to attach {}", archive.display()))?;
        }
        println!("{}: {}", doc.id, doc.record.title);
    }

    Ok(())
}

pub fn run_list(ctx: &AppContext) -> Result<()> {
    let docs = ctx.store.list()?;
    if docs.is_empty() {
        println!("Library is empty.");
        return Ok(());
    }

    for doc in docs {
        let pages = match load_document_ref(&ctx.store, doc.id) {
            Ok(r) => r
                .page_count
                .map(|n| format!("{} page(s)", n))
                .unwrap_or_else(|| "no PDF".to_string()),
            Err(e) => format!("unreadable: {}", e),
        };
        println!("{:>5}  {}  [{}] ({})", doc.id, doc.record.title, doc.record.mime_type, pages);
    }

    Ok(())
}

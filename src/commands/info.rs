use crate::pdf::PdfDocument;
use anyhow::Result;
use std::path::Path;

pub fn run<P: AsRef<Path>>(path: P) -> Result<()> {
    let doc = PdfDocument::open(&path)?;
    let info = doc.get_info();

    println!("File: {}", path.as_ref().display());
    println!("Version: {}", info.version);
    println!("Pages: {}", info.page_count);

    if let Some(title) = &info.title {
        println!("Title: {}", title);
    }
    if let Some(author) = &info.author {
        println!("Author: {}", author);
    }
    if let Some(subject) = &info.subject {
        println!("Subject: {}", subject);
    }
    if let Some(creator) = &info.creator {
        println!("Creator: {}", creator);
    }
    if let Some(producer) = &info.producer {
        println!("Producer: {}", producer);
    }
    if let Some(creation_date) = &info.creation_date {
        println!("Created: {}", format_pdf_date(creation_date));
    }

    Ok(())
}

/// Render a `D:YYYYMMDDHHmmSS...` date readably; anything else is returned as is.
pub fn format_pdf_date(date: &str) -> String {
    let Some(d) = date.strip_prefix("D:") else {
        return date.to_string();
    };
    if d.len() < 8 || !d.is_ascii() {
        return date.to_string();
    }

    let time = if d.len() >= 14 {
        format!(" {}:{}:{}", &d[8..10], &d[10..12], &d[12..14])
    } else {
        String::new()
    };
    format!("{}-{}-{}{}", &d[0..4], &d[4..6], &d[6..8], time)
}

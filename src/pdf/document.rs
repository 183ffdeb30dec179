use anyhow::{Context, Result};
use lopdf::{Dictionary, Document, Object};
use std::path::Path;

pub struct PdfDocument {
    pub doc: Document,
}

impl PdfDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = Document::load(&path)
            .with_context(|| format!("Failed to open PDF: {}", path.as_ref().display()))?;
        Ok(PdfDocument { doc })
    }

    pub fn from_document(doc: Document) -> Self {
        PdfDocument { doc }
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    pub fn version(&self) -> &str {
        &self.doc.version
    }

    /// The document information dictionary, if the trailer carries one.
    pub fn info_dictionary(&self) -> Option<&Dictionary> {
        match self.doc.trailer.get(b"Info").ok()? {
            Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn get_info(&self) -> PdfInfo {
        let mut info = PdfInfo::default();

        if let Some(dict) = self.info_dictionary() {
            info.title = get_string_from_dict(dict, b"Title");
            info.author = get_string_from_dict(dict, b"Author");
            info.creator = get_string_from_dict(dict, b"Creator");
            info.producer = get_string_from_dict(dict, b"Producer");
            info.creation_date = get_string_from_dict(dict, b"CreationDate");
            info.subject = get_string_from_dict(dict, b"Subject");
        }

        info.page_count = self.page_count();
        info.version = self.doc.version.clone();
        info
    }
}

#[derive(Debug, Default, Clone)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub subject: Option<String>,
    pub page_count: u32,
    pub version: String,
}

fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key).ok().and_then(|obj| match obj {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        _ => None,
    })
}

fn decode_pdf_string(bytes: &[u8]) -> Option<String> {
    // UTF-16 BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let u16_chars: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        String::from_utf16(&u16_chars).ok()
    } else {
        // PDFDocEncoding, approximated as Latin-1
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::sample_pdf;

    #[test]
    fn test_page_count_and_info() {
        let pdf = PdfDocument::from_document(sample_pdf(3, Some("Quarterly report")));
        assert_eq!(pdf.page_count(), 3);

        let info = pdf.get_info();
        assert_eq!(info.title.as_deref(), Some("Quarterly report"));
        assert_eq!(info.page_count, 3);
        assert_eq!(info.version, "1.7");
    }

    #[test]
    fn test_missing_info_dictionary() {
        let pdf = PdfDocument::from_document(sample_pdf(1, None));
        assert!(pdf.info_dictionary().is_none());
        assert_eq!(pdf.get_info().title, None);
    }

    #[test]
    fn test_decode_utf16_string() {
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_pdf_string(&bytes).as_deref(), Some("Hi"));
        assert_eq!(decode_pdf_string(b"caf\xe9").as_deref(), Some("café"));
    }
}

//! The set of document parts being split or merged.

use serde::Serialize;
use tracing::debug;

use crate::error::SessionError;
use crate::page_range::encode;
use crate::plan::{MetadataMode, SourceSpec, SplitMergeRequest};

/// A library document as the editing surface sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRef {
    pub id: u64,
    pub title: String,
    /// Total pages, when known.
    pub page_count: Option<u32>,
}

/// Pages of one source document destined for an output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentPart {
    pub document: DocumentRef,
    /// Pages in output order; `None` takes the whole document.
    pub pages: Option<Vec<u32>>,
    /// Begins a new output document instead of continuing the previous one.
    pub starts_new_document: bool,
}

impl DocumentPart {
    pub fn whole(document: DocumentRef) -> Self {
        DocumentPart {
            document,
            pages: None,
            starts_new_document: false,
        }
    }

    /// The explicit page list, or every page when the count is known.
    pub fn effective_pages(&self) -> Option<Vec<u32>> {
        match (&self.pages, self.document.page_count) {
            (Some(pages), _) => Some(pages.clone()),
            (None, Some(count)) => Some((1..=count).collect()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SplitMergeSession {
    parts: Vec<DocumentPart>,
}

impl SplitMergeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[DocumentPart] {
        &self.parts
    }

    pub fn has_documents(&self) -> bool {
        !self.parts.is_empty()
    }

    pub fn clear(&mut self) {
        self.parts.clear();
    }

    fn part_mut(&mut self, index: usize) -> Result<&mut DocumentPart, SessionError> {
        self.parts
            .get_mut(index)
            .ok_or(SessionError::IndexOutOfRange(index))
    }

    pub fn add_document(&mut self, document: DocumentRef) {
        debug!("Adding document {} to session", document.id);
        self.parts.push(DocumentPart::whole(document));
    }

    pub fn remove_document(&mut self, index: usize) -> Result<DocumentPart, SessionError> {
        if index >= self.parts.len() {
            return Err(SessionError::IndexOutOfRange(index));
        }
        let removed = self.parts.remove(index);
        if removed.starts_new_document {
            if let Some(next) = self.parts.get_mut(index) {
                next.starts_new_document = true;
            }
        }
        Ok(removed)
    }

    pub fn set_document_pages(&mut self, index: usize, pages: Vec<u32>) -> Result<(), SessionError> {
        self.part_mut(index)?.pages = Some(pages);
        Ok(())
    }

    /// Cut the part at `index` after each page in `split_pages`.
    ///
    /// The resulting chunks replace the part; all but the first start a new
    /// output document. Split pages the part doesn't contain are ignored.
    /// Returns the number of parts the original part became.
    pub fn split_document(&mut self, index: usize, split_pages: &[u32]) -> Result<usize, SessionError> {
        let part = self
            .parts
            .get(index)
            .ok_or(SessionError::IndexOutOfRange(index))?;
        let pages = part
            .effective_pages()
            .ok_or(SessionError::UnknownPageCount(part.document.id))?;

        let mut chunks: Vec<Vec<u32>> = vec![Vec::new()];
        for (i, &page) in pages.iter().enumerate() {
            if let Some(chunk) = chunks.last_mut() {
                chunk.push(page);
            }
            if split_pages.contains(&page) && i + 1 < pages.len() {
                chunks.push(Vec::new());
            }
        }

        if chunks.len() == 1 {
            return Ok(1);
        }

        let document = part.document.clone();
        let starts_new_document = part.starts_new_document;
        let count = chunks.len();
        let replacement = chunks.into_iter().enumerate().map(|(i, pages)| DocumentPart {
            document: document.clone(),
            pages: Some(pages),
            starts_new_document: i > 0 || starts_new_document,
        });
        self.parts.splice(index..=index, replacement);

        debug!("Split document {} into {} parts", document.id, count);
        Ok(count)
    }

    /// Move the part at `from` to position `to`. Returns whether anything moved.
    pub fn move_part(&mut self, from: usize, to: usize) -> Result<bool, SessionError> {
        let len = self.parts.len();
        if from >= len {
            return Err(SessionError::IndexOutOfRange(from));
        }
        if to >= len {
            return Err(SessionError::IndexOutOfRange(to));
        }
        if from == to {
            return Ok(false);
        }
        let part = self.parts.remove(from);
        self.parts.insert(to, part);
        Ok(true)
    }

    /// Group the parts into output documents.
    pub fn to_plan(&self) -> Vec<Vec<SourceSpec>> {
        let mut plan: Vec<Vec<SourceSpec>> = Vec::new();
        for part in &self.parts {
            let source = SourceSpec {
                document: part.document.id,
                pages: part.pages.as_deref().map(encode),
            };
            match plan.last_mut() {
                Some(target) if !part.starts_new_document => target.push(source),
                _ => plan.push(vec![source]),
            }
        }
        plan
    }

    pub fn to_request(&self, preview: bool, delete_source: bool, metadata: MetadataMode) -> SplitMergeRequest {
        SplitMergeRequest {
            plan: self.to_plan(),
            metadata,
            delete_source,
            preview,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: u64, pages: Option<u32>) -> DocumentRef {
        DocumentRef {
            id,
            title: format!("doc {}", id),
            page_count: pages,
        }
    }

    fn pages_of(session: &SplitMergeSession) -> Vec<Option<Vec<u32>>> {
        session.documents().iter().map(|p| p.pages.clone()).collect()
    }

    #[test]
    fn test_merge_plan_groups_consecutive_parts() {
        let mut session = SplitMergeSession::new();
        assert!(!session.has_documents());
        session.add_document(doc(1, Some(3)));
        session.add_document(doc(2, Some(2)));
        session.set_document_pages(1, vec![2, 1]).unwrap();

        let plan = session.to_plan();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0][0].pages, None);
        assert_eq!(plan[0][1].pages.as_deref(), Some("2,1"));
    }

    #[test]
    fn test_split_after_pages() {
        let mut session = SplitMergeSession::new();
        session.add_document(doc(1, Some(6)));

        assert_eq!(session.split_document(0, &[2, 4]).unwrap(), 3);
        assert_eq!(
            pages_of(&session),
            vec![Some(vec![1, 2]), Some(vec![3, 4]), Some(vec![5, 6])]
        );

        let plan = session.to_plan();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[2][0].pages.as_deref(), Some("5-6"));
    }

    #[test]
    fn test_split_ignores_foreign_and_last_pages() {
        let mut session = SplitMergeSession::new();
        session.add_document(doc(1, Some(10)));
        session.set_document_pages(0, vec![1, 3, 5]).unwrap();

        assert_eq!(session.split_document(0, &[2, 5]).unwrap(), 1);
        assert_eq!(pages_of(&session), vec![Some(vec![1, 3, 5])]);

        assert_eq!(session.split_document(0, &[3]).unwrap(), 2);
        assert_eq!(pages_of(&session), vec![Some(vec![1, 3]), Some(vec![5])]);
    }

    #[test]
    fn test_split_needs_page_count() {
        let mut session = SplitMergeSession::new();
        session.add_document(doc(7, None));
        assert_eq!(
            session.split_document(0, &[1]),
            Err(SessionError::UnknownPageCount(7))
        );
        assert_eq!(
            session.split_document(3, &[1]),
            Err(SessionError::IndexOutOfRange(3))
        );
    }

    #[test]
    fn test_split_keeps_following_part_merged() {
        let mut session = SplitMergeSession::new();
        session.add_document(doc(1, Some(4)));
        session.add_document(doc(2, Some(1)));
        session.split_document(0, &[2]).unwrap();

        let plan = session.to_plan();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[1].len(), 2);
        assert_eq!(plan[1][1].document, 2);
    }

    #[test]
    fn test_remove_passes_on_document_start() {
        let mut session = SplitMergeSession::new();
        session.add_document(doc(1, Some(4)));
        session.add_document(doc(2, Some(1)));
        session.split_document(0, &[2]).unwrap();

        let removed = session.remove_document(1).unwrap();
        assert_eq!(removed.pages, Some(vec![3, 4]));
        assert!(session.documents()[1].starts_new_document);
        assert_eq!(session.to_plan().len(), 2);

        assert_eq!(
            session.remove_document(5).unwrap_err(),
            SessionError::IndexOutOfRange(5)
        );
    }

    #[test]
    fn test_move_part() {
        let mut session = SplitMergeSession::new();
        session.add_document(doc(1, None));
        session.add_document(doc(2, None));
        session.add_document(doc(3, None));

        assert!(!session.move_part(1, 1).unwrap());
        assert!(session.move_part(0, 2).unwrap());
        let ids: Vec<u64> = session.documents().iter().map(|p| p.document.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!(session.move_part(0, 3).is_err());
    }

    #[test]
    fn test_request_and_clear() {
        let mut session = SplitMergeSession::new();
        session.add_document(doc(1, None));
        let request = session.to_request(true, true, MetadataMode::Redo);
        assert!(request.preview && request.delete_source);
        assert_eq!(request.metadata, MetadataMode::Redo);

        session.clear();
        assert!(!session.has_documents());
        assert!(session.to_plan().is_empty());
    }
}

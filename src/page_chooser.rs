use std::collections::BTreeSet;

use crate::session::{DocumentPart, DocumentRef};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageMark {
    pub selected: bool,
    pub disabled: bool,
}

/// Page picking for one document part.
///
/// In select mode the user picks the pages the part should contain. In split
/// mode the user picks the pages after which the part is cut, and only the
/// part's own pages can be picked.
#[derive(Debug, Clone)]
pub struct PageChooser {
    document: DocumentRef,
    splitting: bool,
    enabled_pages: Option<Vec<u32>>,
    pages: BTreeSet<u32>,
    buttons_enabled: bool,
    num_pages: Option<u32>,
}

impl PageChooser {
    pub fn select(part: &DocumentPart) -> Self {
        PageChooser {
            document: part.document.clone(),
            splitting: false,
            enabled_pages: None,
            pages: part.pages.iter().flatten().copied().collect(),
            buttons_enabled: true,
            num_pages: part.document.page_count,
        }
    }

    pub fn split(part: &DocumentPart) -> Self {
        PageChooser {
            document: part.document.clone(),
            splitting: true,
            enabled_pages: part.pages.clone(),
            pages: BTreeSet::new(),
            buttons_enabled: true,
            num_pages: part.document.page_count,
        }
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    pub fn is_splitting(&self) -> bool {
        self.splitting
    }

    pub fn buttons_enabled(&self) -> bool {
        self.buttons_enabled
    }

    /// Record the page count reported once the document has been loaded.
    pub fn loaded(&mut self, num_pages: u32) {
        self.num_pages = Some(num_pages);
    }

    pub fn num_pages(&self) -> Option<u32> {
        self.num_pages
    }

    fn is_disabled(&self, page: u32) -> bool {
        let outside_document = self.num_pages.is_some_and(|n| page == 0 || page > n);
        let not_enabled = self.splitting
            && self
                .enabled_pages
                .as_ref()
                .is_some_and(|enabled| !enabled.contains(&page));
        outside_document || not_enabled
    }

    pub fn mark(&self, page: u32) -> PageMark {
        PageMark {
            selected: self.pages.contains(&page),
            disabled: self.is_disabled(page),
        }
    }

    /// Flip the selection of `page`. Returns false when the page is disabled.
    pub fn toggle(&mut self, page: u32) -> bool {
        if self.is_disabled(page) {
            return false;
        }
        if !self.pages.remove(&page) {
            self.pages.insert(page);
        }
        true
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    pub fn selected(&self) -> Vec<u32> {
        self.pages.iter().copied().collect()
    }

    /// Hand out the chosen pages, ascending. Only the first call succeeds.
    pub fn confirm(&mut self) -> Option<Vec<u32>> {
        if !self.buttons_enabled {
            return None;
        }
        self.buttons_enabled = false;
        Some(self.selected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(pages: Option<Vec<u32>>) -> DocumentPart {
        DocumentPart {
            document: DocumentRef {
                id: 1,
                title: "test".into(),
                page_count: None,
            },
            pages,
            starts_new_document: false,
        }
    }

    #[test]
    fn test_split_mode_disables_pages_outside_part() {
        let chooser = PageChooser::split(&part(Some(vec![2, 3])));
        assert!(chooser.is_splitting());
        assert!(chooser.mark(1).disabled);
        assert!(!chooser.mark(2).disabled);
    }

    #[test]
    fn test_select_mode_marks_selected_pages() {
        let chooser = PageChooser::select(&part(Some(vec![1, 2, 3])));
        assert_eq!(
            chooser.mark(1),
            PageMark {
                selected: true,
                disabled: false
            }
        );
        assert!(!chooser.mark(4).selected);
    }

    #[test]
    fn test_toggle_respects_disabled_pages() {
        let mut chooser = PageChooser::split(&part(Some(vec![2, 3])));
        assert!(!chooser.toggle(1));
        assert!(chooser.toggle(3));
        assert!(chooser.mark(3).selected);
        assert!(chooser.toggle(3));
        assert!(!chooser.mark(3).selected);
    }

    #[test]
    fn test_loaded_page_count_bounds_selection() {
        let mut chooser = PageChooser::select(&part(None));
        assert!(chooser.toggle(9));
        chooser.loaded(5);
        assert_eq!(chooser.num_pages(), Some(5));
        assert!(chooser.mark(9).disabled);
        assert!(!chooser.toggle(6));
    }

    #[test]
    fn test_confirm_once_sorted() {
        let mut chooser = PageChooser::select(&part(None));
        chooser.toggle(4);
        chooser.toggle(1);
        assert_eq!(chooser.confirm(), Some(vec![1, 4]));
        assert!(!chooser.buttons_enabled());
        assert_eq!(chooser.confirm(), None);
    }
}

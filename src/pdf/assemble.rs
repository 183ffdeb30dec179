use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

use super::PdfDocument;
use crate::error::MergeError;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Keys that point back up a tree; following them would drag whole source
/// documents along with a single page.
const BACK_REFERENCES: [&[u8]; 2] = [b"Parent", b"P"];

/// Builds a new PDF out of pages copied from one or more source documents.
///
/// Objects shared between pages of the same source (fonts, images, resource
/// dictionaries) are copied once. A page may be appended any number of
/// times; every occurrence gets its own page object.
pub struct PdfAssembler {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    /// (source key, id in source) -> id in the new document
    imported: HashMap<(u64, ObjectId), ObjectId>,
}

impl PdfAssembler {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();
        PdfAssembler {
            doc,
            pages_id,
            kids: Vec::new(),
            imported: HashMap::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    pub fn version(&self) -> &str {
        &self.doc.version
    }

    /// Raise the output version to at least `version`.
    pub fn require_version(&mut self, version: &str) {
        if version > self.doc.version.as_str() {
            self.doc.version = version.to_string();
        }
    }

    /// Use a copy of `source`'s info dictionary for the new document.
    pub fn copy_info(&mut self, source: &PdfDocument, source_key: u64) -> Result<bool, MergeError> {
        let Some(info) = source.info_dictionary() else {
            return Ok(false);
        };
        let mut value = Object::Dictionary(info.clone());
        self.import_references(&source.doc, source_key, &mut value)?;
        let info_id = self.doc.add_object(value);
        self.doc.trailer.set("Info", Object::Reference(info_id));
        Ok(true)
    }

    /// Append page `page` (1-based) of `source`.
    ///
    /// `source_key` identifies the source across calls so that its shared
    /// objects are only copied once.
    pub fn append_page(
        &mut self,
        source: &PdfDocument,
        source_key: u64,
        page: u32,
    ) -> Result<(), MergeError> {
        let pages = source.doc.get_pages();
        let page_id = *pages.get(&page).ok_or(MergeError::PageOutOfRange(page))?;

        let mut page_dict = source.doc.get_dictionary(page_id)?.clone();
        inherit_attributes(&source.doc, &mut page_dict);
        page_dict.remove(b"Parent");

        let mut value = Object::Dictionary(page_dict);
        self.import_references(&source.doc, source_key, &mut value)?;
        if let Object::Dictionary(dict) = &mut value {
            dict.set("Parent", Object::Reference(self.pages_id));
        }

        let new_id = self.doc.add_object(value);
        self.kids.push(Object::Reference(new_id));
        Ok(())
    }

    /// Copy every object reachable from `value` and point `value` at the copies.
    fn import_references(
        &mut self,
        source: &Document,
        source_key: u64,
        value: &mut Object,
    ) -> Result<(), MergeError> {
        let mut pending = Vec::new();
        collect_references(value, &mut pending);

        let mut fresh = Vec::new();
        while let Some(old_id) = pending.pop() {
            if self.imported.contains_key(&(source_key, old_id)) {
                continue;
            }
            let new_id = self.doc.new_object_id();
            self.imported.insert((source_key, old_id), new_id);

            let object = source.get_object(old_id).cloned().unwrap_or(Object::Null);
            collect_references(&object, &mut pending);
            fresh.push((new_id, object));
        }

        for (new_id, mut object) in fresh {
            rewrite_references(&mut object, source_key, &self.imported);
            self.doc.objects.insert(new_id, object);
        }
        rewrite_references(value, source_key, &self.imported);
        Ok(())
    }

    /// Close the page tree and return the finished document.
    pub fn finish(mut self) -> Document {
        let count = self.kids.len() as i64;
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(self.kids)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc
            .trailer
            .set("Size", Object::Integer(self.doc.max_id as i64 + 1));
        self.doc
    }
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn inherit_attributes(source: &Document, page: &mut Dictionary) {
    let mut parent = page.get(b"Parent").and_then(|p| p.as_reference()).ok();
    let mut depth = 0;

    while let Some(id) = parent {
        let Ok(node) = source.get_dictionary(id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }

        depth += 1;
        if depth > 64 {
            break;
        }
        parent = node.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
}

fn collect_references(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        Object::Dictionary(dict) => collect_dictionary_references(dict, out),
        Object::Stream(stream) => collect_dictionary_references(&stream.dict, out),
        _ => {}
    }
}

fn collect_dictionary_references(dict: &Dictionary, out: &mut Vec<ObjectId>) {
    for (key, value) in dict.iter() {
        if !BACK_REFERENCES.contains(&key.as_slice()) {
            collect_references(value, out);
        }
    }
}

/// Rewrite references through `map`; anything not copied becomes null.
fn rewrite_references(object: &mut Object, source_key: u64, map: &HashMap<(u64, ObjectId), ObjectId>) {
    match object {
        Object::Reference(id) => {
            *object = match map.get(&(source_key, *id)) {
                Some(new_id) => Object::Reference(*new_id),
                None => Object::Null,
            };
        }
        Object::Array(items) => {
            for item in items {
                rewrite_references(item, source_key, map);
            }
        }
        Object::Dictionary(dict) => rewrite_dictionary(dict, source_key, map),
        Object::Stream(stream) => rewrite_dictionary(&mut stream.dict, source_key, map),
        _ => {}
    }
}

fn rewrite_dictionary(dict: &mut Dictionary, source_key: u64, map: &HashMap<(u64, ObjectId), ObjectId>) {
    for (_, value) in dict.iter_mut() {
        rewrite_references(value, source_key, map);
    }
}

//! The output document under construction
//!
//! Pages are kept in a flat list while the run is in progress so they can be
//! inserted at arbitrary positions (table-of-contents overflow); the page
//! tree and catalog are only written when the document is finished.

use super::matrix::Matrix;
use super::text::{Font, text_string};
use crate::types::{PageSize, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// A page of the output document
#[derive(Debug, Clone, Copy)]
pub struct OutputPage {
    pub id: ObjectId,
    pub size: PageSize,
}

/// Output document with a flat page list and shared fonts
pub struct OutputDocument {
    doc: Document,
    pages_id: ObjectId,
    pages: Vec<OutputPage>,
    fonts: Option<(ObjectId, ObjectId)>,
}

impl OutputDocument {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            pages: Vec::new(),
            fonts: None,
        }
    }

    /// Mutable access for embedding objects (XObjects, copied resources)
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[OutputPage] {
        &self.pages
    }

    /// Append an empty page
    pub fn push_blank_page(&mut self, size: PageSize) -> usize {
        let page = self.new_page(size, Dictionary::new(), Vec::new());
        self.pages.push(page);
        self.pages.len() - 1
    }

    /// Insert `count` empty pages starting at position `at`
    pub fn insert_blank_pages(&mut self, at: usize, count: usize, size: PageSize) {
        let at = at.min(self.pages.len());
        let new_pages: Vec<OutputPage> = (0..count)
            .map(|_| self.new_page(size, Dictionary::new(), Vec::new()))
            .collect();
        self.pages.splice(at..at, new_pages);
    }

    /// Append a page showing one XObject drawn through `matrix`
    pub fn push_xobject_page(
        &mut self,
        size: PageSize,
        xobject_id: ObjectId,
        matrix: Matrix,
    ) -> Result<usize> {
        let mut xobjects = Dictionary::new();
        xobjects.set("P0", Object::Reference(xobject_id));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("cm", matrix.operands()),
                Operation::new("Do", vec![Object::Name(b"P0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.encode()?));

        let page = self.new_page(size, xobjects, vec![Object::Reference(content_id)]);
        self.pages.push(page);
        Ok(self.pages.len() - 1)
    }

    /// Append a content stream to the page at `index`.
    ///
    /// The operations run after the existing content in a fresh graphics
    /// state, with both generated fonts available.
    pub fn append_content(&mut self, index: usize, operations: Vec<Operation>) -> Result<()> {
        let Some(page) = self.pages.get(index).copied() else {
            return Err(crate::types::AssembleError::Config(format!(
                "Page index {} out of range ({} pages)",
                index,
                self.pages.len()
            )));
        };

        let (regular_id, bold_id) = self.fonts();

        let mut wrapped = Vec::with_capacity(operations.len() + 2);
        wrapped.push(Operation::new("q", vec![]));
        wrapped.extend(operations);
        wrapped.push(Operation::new("Q", vec![]));
        let content = Content {
            operations: wrapped,
        };
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.encode()?));

        let page_dict = self.doc.get_dictionary_mut(page.id)?;
        if let Ok(Object::Array(contents)) = page_dict.get_mut(b"Contents") {
            contents.push(Object::Reference(content_id));
        }

        let resources = page_dict.get_mut(b"Resources")?.as_dict_mut()?;
        if !resources.has(b"Font") {
            resources.set("Font", Dictionary::new());
        }
        let fonts = resources.get_mut(b"Font")?.as_dict_mut()?;
        fonts.set(Font::Regular.resource_name(), Object::Reference(regular_id));
        fonts.set(Font::Bold.resource_name(), Object::Reference(bold_id));
        Ok(())
    }

    /// Write the page tree and catalog and serialize the document
    pub fn finish(mut self, title: &str) -> Result<Vec<u8>> {
        let page_refs: Vec<Object> = self
            .pages
            .iter()
            .map(|page| Object::Reference(page.id))
            .collect();
        let count = page_refs.len() as i64;
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(page_refs)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let catalog_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", catalog_id);

        let info_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Title", text_string(title)),
            ("Producer", Object::string_literal("pdf-binder")),
        ]));
        self.doc.trailer.set("Info", info_id);

        self.doc.compress();
        let mut writer = Vec::new();
        self.doc.save_to(&mut writer)?;
        Ok(writer)
    }

    /// Shared font objects, created on first use
    fn fonts(&mut self) -> (ObjectId, ObjectId) {
        if let Some(ids) = self.fonts {
            return ids;
        }
        let regular = self.doc.add_object(Font::Regular.dictionary());
        let bold = self.doc.add_object(Font::Bold.dictionary());
        self.fonts = Some((regular, bold));
        (regular, bold)
    }

    fn new_page(
        &mut self,
        size: PageSize,
        xobjects: Dictionary,
        contents: Vec<Object>,
    ) -> OutputPage {
        let mut resources = Dictionary::new();
        if !xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(xobjects));
        }

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(size.width),
                Object::Real(size.height),
            ]),
        );
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set("Contents", Object::Array(contents));

        OutputPage {
            id: self.doc.add_object(page_dict),
            size,
        }
    }
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::text::show_text;

    #[test]
    fn pages_keep_insertion_order() {
        let a4 = PageSize::new(595.0, 842.0);
        let mut output = OutputDocument::new();
        output.push_blank_page(a4);
        output.push_blank_page(a4);
        let first = output.pages()[0].id;
        output.insert_blank_pages(1, 2, PageSize::new(842.0, 595.0));

        assert_eq!(output.page_count(), 4);
        assert_eq!(output.pages()[0].id, first);
        assert!(output.pages()[1].size.is_landscape());
        assert!(output.pages()[2].size.is_landscape());
        assert!(!output.pages()[3].size.is_landscape());
    }

    #[test]
    fn finished_document_reloads() {
        let a4 = PageSize::new(595.0, 842.0);
        let mut output = OutputDocument::new();
        for _ in 0..3 {
            output.push_blank_page(a4);
        }
        output
            .append_content(
                1,
                show_text(Font::Bold, 12.0, Matrix::translate(50.0, 50.0), "Hej"),
            )
            .unwrap();
        assert!(output.append_content(7, Vec::new()).is_err());

        let bytes = output.finish("Test").unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }
}

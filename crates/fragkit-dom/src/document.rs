//! Documents: the owners of nodes, encodings and diagnostics.

use crate::builder::DomSink;
use crate::fragment::DocumentFragment;
use crate::node::{Node, NodeData};
use crate::serializer::{self, SaveOptions};
use crate::DomResult;
use fragkit_common::EngineConfig;
use fragkit_html::{encoding, Diagnostic, ParseOptions};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::debug;

#[derive(Debug)]
pub(crate) struct DocumentData {
    root: Rc<Node>,
    encoding: RefCell<Option<String>>,
    errors: RefCell<Vec<Diagnostic>>,
}

/// A reference-counted handle to a document.
///
/// Clones share the same document; equality is identity.
#[derive(Clone)]
pub struct Document(Rc<DocumentData>);

impl Document {
    /// Create a new empty document with no declared encoding.
    pub fn new() -> Self {
        Self::with_encoding(None)
    }

    pub fn with_encoding(encoding: Option<String>) -> Self {
        Self(Rc::new_cyclic(|data| DocumentData {
            root: Node::new(NodeData::Document, data.clone()),
            encoding: RefCell::new(encoding),
            errors: RefCell::new(Vec::new()),
        }))
    }

    /// Parse HTML and create a document.
    pub fn parse_html(html: &str) -> DomResult<Self> {
        Self::parse_html_with(html.as_bytes(), None, ParseOptions::default())
    }

    /// Parse bytes as a document, decoding with `encoding` or by sniffing.
    pub fn parse_html_with(
        input: &[u8],
        encoding: Option<&str>,
        options: ParseOptions,
    ) -> DomResult<Self> {
        let decoded =
            encoding::resolve(input, encoding, &EngineConfig::global().fallback_encoding)?;
        let document = Self::with_encoding(Some(decoded.encoding.clone()));
        let sink = DomSink::new(&document, document.root());
        let output = fragkit_html::parse_document(&decoded, sink, options)?;
        debug!(
            encoding = %decoded.encoding,
            errors = output.diagnostics.len(),
            "Document built"
        );
        document.append_errors(output.diagnostics);
        Ok(document)
    }

    pub(crate) fn from_data(data: Rc<DocumentData>) -> Self {
        Self(data)
    }

    pub(crate) fn downgrade(&self) -> Weak<DocumentData> {
        Rc::downgrade(&self.0)
    }

    /// Get the document root.
    pub fn root(&self) -> Rc<Node> {
        self.0.root.clone()
    }

    pub fn encoding(&self) -> Option<String> {
        self.0.encoding.borrow().clone()
    }

    /// Diagnostics recorded against this document, in detection order.
    pub fn errors(&self) -> Vec<Diagnostic> {
        self.0.errors.borrow().clone()
    }

    pub(crate) fn error_count(&self) -> usize {
        self.0.errors.borrow().len()
    }

    pub(crate) fn append_errors(&self, diagnostics: Vec<Diagnostic>) {
        self.0.errors.borrow_mut().extend(diagnostics);
    }

    /// Diagnostics recorded after the first `start`.
    pub(crate) fn errors_since(&self, start: usize) -> Vec<Diagnostic> {
        self.0
            .errors
            .borrow()
            .get(start..)
            .map(<[Diagnostic]>::to_vec)
            .unwrap_or_default()
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Get the document element (<html>).
    pub fn document_element(&self) -> Option<Rc<Node>> {
        self.0
            .root
            .children()
            .into_iter()
            .find(|n| n.tag_name() == Some("html"))
    }

    /// Get the <head> element.
    pub fn head(&self) -> Option<Rc<Node>> {
        self.document_element()?
            .children()
            .into_iter()
            .find(|n| n.tag_name() == Some("head"))
    }

    /// Get the <body> element.
    pub fn body(&self) -> Option<Rc<Node>> {
        self.document_element()?
            .children()
            .into_iter()
            .find(|n| n.tag_name() == Some("body"))
    }

    /// Get the title of the document.
    pub fn title(&self) -> Option<String> {
        let title = self
            .head()?
            .children()
            .into_iter()
            .find(|n| n.tag_name() == Some("title"))?;
        Some(title.text_content())
    }

    pub fn create_element(&self, name: &str) -> Rc<Node> {
        Node::element(name, Vec::new(), self.downgrade())
    }

    pub fn create_text_node(&self, text: &str) -> Rc<Node> {
        Node::text(text, self.downgrade())
    }

    pub fn create_comment(&self, data: &str) -> Rc<Node> {
        Node::new(NodeData::Comment(data.to_string()), self.downgrade())
    }

    /// Parse `html` as a fragment owned by this document.
    pub fn fragment(&self, html: &str) -> DomResult<DocumentFragment> {
        DocumentFragment::new(self, html, None, None)
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Rc<Node>> {
        self.0.root.get_element_by_id(id)
    }

    pub fn get_elements_by_tag_name(&self, tag_name: &str) -> Vec<Rc<Node>> {
        self.0.root.get_elements_by_tag_name(tag_name)
    }

    pub fn select(&self, selector: &str) -> Vec<Rc<Node>> {
        self.0.root.select(selector)
    }

    pub fn at(&self, selector: &str) -> Option<Rc<Node>> {
        self.0.root.at(selector)
    }

    /// Serialize the whole document as HTML.
    pub fn to_html(&self) -> String {
        serializer::serialize_children(&self.0.root, &SaveOptions::html())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Document {}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("encoding", &self.encoding())
            .field("errors", &self.error_count())
            .field("children", &self.0.root.children().len())
            .finish()
    }
}

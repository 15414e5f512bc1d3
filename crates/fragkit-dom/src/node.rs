//! DOM nodes.

use crate::context;
use crate::document::{Document, DocumentData};
use crate::fragment::DocumentFragment;
use crate::selector::Selector;
use crate::serializer::{self, SaveOptions};
use crate::{DomError, DomResult};
use fragkit_html::{Attribute, ParseOptions};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Type of DOM node and its payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    DocumentFragment,
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element {
        /// Lowercase tag name.
        name: String,
        /// Unique names, in insertion order.
        attributes: RefCell<Vec<Attribute>>,
    },
    Text(RefCell<String>),
    Comment(String),
    CData(String),
}

/// A DOM node.
#[derive(Debug)]
pub struct Node {
    data: NodeData,
    /// Parent node (weak reference to avoid cycles).
    parent: RefCell<Option<Weak<Node>>>,
    children: RefCell<Vec<Rc<Node>>>,
    /// Owning document.
    document: RefCell<Weak<DocumentData>>,
}

impl Node {
    pub(crate) fn new(data: NodeData, document: Weak<DocumentData>) -> Rc<Self> {
        Rc::new(Self {
            data,
            parent: RefCell::new(None),
            children: RefCell::new(Vec::new()),
            document: RefCell::new(document),
        })
    }

    pub(crate) fn element(
        name: &str,
        attributes: Vec<Attribute>,
        document: Weak<DocumentData>,
    ) -> Rc<Self> {
        Self::new(
            NodeData::Element {
                name: name.to_ascii_lowercase(),
                attributes: RefCell::new(attributes),
            },
            document,
        )
    }

    pub(crate) fn text(text: &str, document: Weak<DocumentData>) -> Rc<Self> {
        Self::new(NodeData::Text(RefCell::new(text.to_string())), document)
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Node name: the tag name for elements, `#document-fragment` for
    /// fragments, and a fixed name for the other kinds.
    pub fn name(&self) -> &str {
        match &self.data {
            NodeData::Document => "document",
            NodeData::DocumentFragment => "#document-fragment",
            NodeData::Doctype { name, .. } => name,
            NodeData::Element { name, .. } => name,
            NodeData::Text(_) => "text",
            NodeData::Comment(_) => "comment",
            NodeData::CData(_) => "#cdata-section",
        }
    }

    /// Get the tag name for element nodes.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.data, NodeData::Comment(_))
    }

    /// Get an attribute value.
    pub fn get_attribute(&self, name: &str) -> Option<String> {
        match &self.data {
            NodeData::Element { attributes, .. } => {
                let name = name.to_ascii_lowercase();
                attributes
                    .borrow()
                    .iter()
                    .find(|a| a.name == name)
                    .map(|a| a.value.clone())
            }
            _ => None,
        }
    }

    pub fn attributes(&self) -> Vec<Attribute> {
        match &self.data {
            NodeData::Element { attributes, .. } => attributes.borrow().clone(),
            _ => Vec::new(),
        }
    }

    /// Set an attribute, replacing the value in place if it already exists.
    /// Does nothing on non-element nodes.
    pub fn set_attribute(&self, name: &str, value: &str) {
        let NodeData::Element { attributes, .. } = &self.data else {
            return;
        };
        let name = name.to_ascii_lowercase();
        let mut attributes = attributes.borrow_mut();
        match attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value.to_string(),
            None => attributes.push(Attribute::new(name, value)),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attribute("class")
            .map(|c| c.split_whitespace().any(|cls| cls == class))
            .unwrap_or(false)
    }

    /// Get parent node.
    pub fn parent(&self) -> Option<Rc<Node>> {
        self.parent.borrow().as_ref().and_then(|w| w.upgrade())
    }

    /// Get child nodes.
    pub fn children(&self) -> Vec<Rc<Node>> {
        self.children.borrow().clone()
    }

    pub fn element_children(&self) -> Vec<Rc<Node>> {
        self.children
            .borrow()
            .iter()
            .filter(|n| n.is_element())
            .cloned()
            .collect()
    }

    pub fn first_child(&self) -> Option<Rc<Node>> {
        self.children.borrow().first().cloned()
    }

    pub fn last_child(&self) -> Option<Rc<Node>> {
        self.children.borrow().last().cloned()
    }

    pub fn previous_sibling(&self) -> Option<Rc<Node>> {
        let parent = self.parent()?;
        let siblings = parent.children.borrow();
        let index = siblings.iter().position(|n| self.is(n))?;
        index.checked_sub(1).map(|i| siblings[i].clone())
    }

    pub fn next_sibling(&self) -> Option<Rc<Node>> {
        let parent = self.parent()?;
        let siblings = parent.children.borrow();
        let index = siblings.iter().position(|n| self.is(n))?;
        siblings.get(index + 1).cloned()
    }

    /// The owning document, if it is still alive.
    pub fn document(&self) -> Option<Document> {
        self.document.borrow().upgrade().map(Document::from_data)
    }

    fn is(&self, other: &Rc<Node>) -> bool {
        std::ptr::eq(Rc::as_ptr(other), self)
    }

    /// Link `child` without any checks. Used while building a fresh tree.
    pub(crate) fn push_child(self: &Rc<Self>, child: Rc<Node>) {
        *child.parent.borrow_mut() = Some(Rc::downgrade(self));
        self.children.borrow_mut().push(child);
    }

    /// Append a child node, detaching it from its current parent first.
    ///
    /// The child moves into this node's document. Appending a fragment
    /// node moves its children instead.
    pub fn append_child(self: &Rc<Self>, child: Rc<Node>) -> DomResult<()> {
        match child.data {
            NodeData::Document => {
                return Err(DomError::InvalidArgument(
                    "a document node cannot be appended".to_string(),
                ))
            }
            NodeData::DocumentFragment => {
                for grandchild in child.children() {
                    self.append_child(grandchild)?;
                }
                return Ok(());
            }
            _ => {}
        }

        let mut ancestor = Some(self.clone());
        while let Some(node) = ancestor {
            if Rc::ptr_eq(&node, &child) {
                return Err(DomError::InvalidArgument(
                    "a node cannot be appended to itself or its descendants".to_string(),
                ));
            }
            ancestor = node.parent();
        }

        child.unlink();
        let document = self.document.borrow().clone();
        child.adopt(&document);
        self.push_child(child);
        Ok(())
    }

    fn adopt(&self, document: &Weak<DocumentData>) {
        *self.document.borrow_mut() = document.clone();
        for child in self.children.borrow().iter() {
            child.adopt(document);
        }
    }

    /// Remove this node from its parent. The node keeps its children.
    pub fn unlink(&self) {
        let parent = self.parent.borrow_mut().take();
        if let Some(parent) = parent.and_then(|w| w.upgrade()) {
            parent.children.borrow_mut().retain(|n| !self.is(n));
        }
    }

    /// Remove every child.
    pub fn clear_children(&self) {
        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children {
            *child.parent.borrow_mut() = None;
        }
    }

    /// Get the text content.
    ///
    /// Concatenates text and CDATA below this node; comments contribute
    /// only when asked directly.
    pub fn text_content(&self) -> String {
        if let NodeData::Comment(data) = &self.data {
            return data.clone();
        }
        let mut result = String::new();
        self.collect_text(&mut result);
        result
    }

    fn collect_text(&self, result: &mut String) {
        match &self.data {
            NodeData::Text(text) => result.push_str(&text.borrow()),
            NodeData::CData(data) => result.push_str(data),
            NodeData::Comment(_) | NodeData::Doctype { .. } => {}
            _ => {
                for child in self.children.borrow().iter() {
                    child.collect_text(result);
                }
            }
        }
    }

    /// Copy this node and its subtree. The copy has no parent and belongs
    /// to the same document.
    pub fn deep_clone(&self) -> Rc<Node> {
        let copy = Node::new(self.data.clone(), self.document.borrow().clone());
        for child in self.children.borrow().iter() {
            copy.push_child(child.deep_clone());
        }
        copy
    }

    /// All nodes below this one, depth-first in document order.
    pub fn descendants(&self) -> Vec<Rc<Node>> {
        let mut result = Vec::new();
        self.collect_descendants(&mut result);
        result
    }

    fn collect_descendants(&self, result: &mut Vec<Rc<Node>>) {
        for child in self.children.borrow().iter() {
            result.push(child.clone());
            child.collect_descendants(result);
        }
    }

    /// Descendant elements matching a simple selector.
    /// Supports: tag, #id, .class, compounds and descendant combinators.
    pub fn select(&self, selector: &str) -> Vec<Rc<Node>> {
        let Some(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.descendants()
            .into_iter()
            .filter(|n| selector.matches(n))
            .collect()
    }

    /// First descendant element matching `selector`.
    pub fn at(&self, selector: &str) -> Option<Rc<Node>> {
        let selector = Selector::parse(selector)?;
        self.descendants().into_iter().find(|n| selector.matches(n))
    }

    /// Does this element match `selector`?
    pub fn matches(&self, selector: &str) -> bool {
        Selector::parse(selector)
            .map(|s| s.matches(self))
            .unwrap_or(false)
    }

    pub fn get_elements_by_tag_name(&self, tag_name: &str) -> Vec<Rc<Node>> {
        let tag_name = tag_name.to_ascii_lowercase();
        self.descendants()
            .into_iter()
            .filter(|n| n.tag_name() == Some(tag_name.as_str()))
            .collect()
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Rc<Node>> {
        self.descendants()
            .into_iter()
            .find(|n| n.get_attribute("id").as_deref() == Some(id))
    }

    /// Parse `html` as the content of this element.
    ///
    /// The element is left untouched; the diagnostics go to its document.
    pub fn parse(self: &Rc<Self>, html: &str) -> DomResult<DocumentFragment> {
        self.parse_with_options(html, ParseOptions::default())
    }

    pub fn parse_with_options(
        self: &Rc<Self>,
        html: &str,
        options: ParseOptions,
    ) -> DomResult<DocumentFragment> {
        let document = self.document().ok_or_else(|| {
            DomError::InvalidArgument("context node does not belong to a document".to_string())
        })?;
        context::parse_in_context(&document, self, html, options)
    }

    /// Serialize this node as HTML.
    pub fn to_html(&self) -> String {
        serializer::serialize_node(self, &SaveOptions::html())
    }

    /// Serialize the children of this node as HTML.
    pub fn inner_html(&self) -> String {
        serializer::serialize_children(self, &SaveOptions::html())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_keep_order_and_replace_in_place() {
        let doc = Document::new();
        let div = doc.create_element("DIV");
        div.set_attribute("id", "a");
        div.set_attribute("Class", "x y");
        div.set_attribute("id", "b");

        assert_eq!(div.tag_name(), Some("div"));
        let names: Vec<_> = div.attributes().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["id", "class"]);
        assert_eq!(div.get_attribute("ID").as_deref(), Some("b"));
        assert!(div.has_class("y"));
    }

    #[test]
    fn test_append_moves_node() {
        let doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let child = doc.create_element("span");

        a.append_child(child.clone()).unwrap();
        b.append_child(child.clone()).unwrap();

        assert!(a.children().is_empty());
        assert_eq!(b.children().len(), 1);
        assert!(Rc::ptr_eq(&child.parent().unwrap(), &b));
    }

    #[test]
    fn test_append_rejects_cycles() {
        let doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("span");
        outer.append_child(inner.clone()).unwrap();

        assert!(matches!(
            inner.append_child(outer.clone()),
            Err(DomError::InvalidArgument(_))
        ));
        assert!(outer.append_child(outer.clone()).is_err());
    }

    #[test]
    fn test_siblings() {
        let doc = Document::new();
        let parent = doc.create_element("ul");
        let first = doc.create_element("li");
        let second = doc.create_element("li");
        parent.append_child(first.clone()).unwrap();
        parent.append_child(second.clone()).unwrap();

        assert!(Rc::ptr_eq(&first.next_sibling().unwrap(), &second));
        assert!(Rc::ptr_eq(&second.previous_sibling().unwrap(), &first));
        assert!(first.previous_sibling().is_none());
        assert!(second.next_sibling().is_none());
    }

    #[test]
    fn test_unlink() {
        let doc = Document::new();
        let parent = doc.create_element("p");
        let text = doc.create_text_node("hi");
        parent.append_child(text.clone()).unwrap();

        text.unlink();
        assert!(text.parent().is_none());
        assert!(parent.children().is_empty());

        // Unlinking a detached node is a no-op.
        text.unlink();
        assert!(text.parent().is_none());
    }

    #[test]
    fn test_text_content_skips_comments() {
        let doc = Document::new();
        let p = doc.create_element("p");
        p.append_child(doc.create_text_node("a")).unwrap();
        p.append_child(doc.create_comment("hidden")).unwrap();
        p.append_child(doc.create_text_node("b")).unwrap();

        assert_eq!(p.text_content(), "ab");
        assert_eq!(doc.create_comment("c").text_content(), "c");
    }

    #[test]
    fn test_deep_clone_is_detached() {
        let doc = Document::new();
        let parent = doc.create_element("div");
        let child = doc.create_element("b");
        child.append_child(doc.create_text_node("x")).unwrap();
        parent.append_child(child.clone()).unwrap();

        let copy = child.deep_clone();
        assert!(copy.parent().is_none());
        assert_eq!(copy.text_content(), "x");
        assert!(!Rc::ptr_eq(&copy, &child));
        assert_eq!(copy.document(), Some(doc));
    }

    #[test]
    fn test_node_names() {
        let doc = Document::new();
        assert_eq!(doc.create_element("Div").name(), "div");
        assert_eq!(doc.create_text_node("x").name(), "text");
        assert_eq!(doc.root().name(), "document");
    }
}

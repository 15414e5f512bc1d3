//! `TreeSink` that builds `Rc<Node>` trees.

use crate::document::{Document, DocumentData};
use crate::node::{Node, NodeData};
use crate::{DomError, DomResult};
use fragkit_html::{Attribute, DecodedInput, Diagnostic, ParseError, ParseOptions, TreeSink};
use std::rc::{Rc, Weak};
use tracing::warn;

pub(crate) struct DomSink {
    document: Weak<DocumentData>,
    root: Rc<Node>,
}

impl DomSink {
    /// A sink that hangs top-level content off `root`.
    pub(crate) fn new(document: &Document, root: Rc<Node>) -> Self {
        Self {
            document: document.downgrade(),
            root,
        }
    }
}

impl TreeSink for DomSink {
    type NodeId = Rc<Node>;

    fn root(&self) -> Rc<Node> {
        self.root.clone()
    }

    fn create_element(&mut self, name: &str, attrs: Vec<Attribute>) -> Rc<Node> {
        Node::element(name, attrs, self.document.clone())
    }

    fn create_comment(&mut self, data: String) -> Rc<Node> {
        Node::new(NodeData::Comment(data), self.document.clone())
    }

    fn create_cdata(&mut self, data: String) -> Rc<Node> {
        Node::new(NodeData::CData(data), self.document.clone())
    }

    fn create_doctype(&mut self, name: String, public_id: String, system_id: String) -> Rc<Node> {
        Node::new(
            NodeData::Doctype {
                name,
                public_id,
                system_id,
            },
            self.document.clone(),
        )
    }

    fn append_child(&mut self, parent: &Rc<Node>, child: Rc<Node>) {
        parent.push_child(child);
    }

    fn append_text(&mut self, parent: &Rc<Node>, text: &str) {
        if let Some(last) = parent.last_child() {
            if let NodeData::Text(existing) = last.data() {
                existing.borrow_mut().push_str(text);
                return;
            }
        }
        parent.push_child(Node::text(text, self.document.clone()));
    }
}

/// Parse `input` into the children of `target` and return the diagnostics.
pub(crate) fn build_fragment(
    document: &Document,
    target: &Rc<Node>,
    input: &DecodedInput,
    options: ParseOptions,
    context: Option<&str>,
) -> DomResult<Vec<Diagnostic>> {
    let sink = DomSink::new(document, target.clone());
    match fragkit_html::parse_fragment(input, sink, options, context) {
        Ok(output) => Ok(output.diagnostics),
        Err(ParseError::Syntax(diagnostic)) => {
            warn!(%diagnostic, "Strict fragment parse rejected input");
            Err(DomError::Syntax(diagnostic))
        }
        Err(err) => Err(err.into()),
    }
}

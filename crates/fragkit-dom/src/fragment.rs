//! Document fragments.
//!
//! A [`DocumentFragment`] is a detached forest of nodes owned by a
//! [`Document`], together with the diagnostics of the parse that built it.
//!
//! ```ignore
//! let fragment = DocumentFragment::parse("<div>foo</div", None, None)?;
//! assert_eq!(fragment.to_html(), "<div>foo</div>");
//! assert!(!fragment.errors().is_empty());
//! ```

use crate::builder;
use crate::context;
use crate::document::Document;
use crate::node::{Node, NodeData};
use crate::serializer::{self, SaveOptions};
use crate::DomResult;
use fragkit_common::EngineConfig;
use fragkit_html::{encoding, DecodedInput, Diagnostic, ParseOptions};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// A parsed, detached forest of nodes.
#[derive(Debug)]
pub struct DocumentFragment {
    node: Rc<Node>,
    document: Document,
    errors: Vec<Diagnostic>,
}

impl DocumentFragment {
    /// Parse `input` into a fragment of a new document.
    ///
    /// With an explicit `encoding` the bytes are decoded with it and the
    /// document reports the label as given; otherwise the encoding is
    /// sniffed.
    pub fn parse(
        input: impl AsRef<[u8]>,
        encoding: Option<&str>,
        options: Option<ParseOptions>,
    ) -> DomResult<Self> {
        Self::parse_with(input, encoding, options, |_| {})
    }

    /// Like [`parse`](Self::parse), letting `configure` adjust the options first.
    pub fn parse_with(
        input: impl AsRef<[u8]>,
        encoding: Option<&str>,
        options: Option<ParseOptions>,
        configure: impl FnOnce(&mut ParseOptions),
    ) -> DomResult<Self> {
        let mut options = options.unwrap_or_default();
        configure(&mut options);
        Self::parse_decoded(input.as_ref(), encoding, options).map(|(fragment, _)| fragment)
    }

    fn parse_decoded(
        input: &[u8],
        label: Option<&str>,
        options: ParseOptions,
    ) -> DomResult<(Self, String)> {
        let decoded = encoding::resolve(input, label, &EngineConfig::global().fallback_encoding)?;
        let document = Document::with_encoding(Some(decoded.encoding.clone()));
        let fragment = Self::empty(&document);
        let errors = builder::build_fragment(&document, &fragment.node, &decoded, options, None)?;
        debug!(
            encoding = %decoded.encoding,
            children = fragment.node.children().len(),
            errors = errors.len(),
            "Fragment parsed"
        );
        Ok((fragment.with_errors(errors), decoded.text))
    }

    /// Parse `html` into a fragment owned by `document`.
    ///
    /// With a `context` element the markup is parsed as that element's
    /// content; the diagnostics are then also appended to `document`.
    pub fn new(
        document: &Document,
        html: &str,
        context: Option<&Rc<Node>>,
        options: Option<ParseOptions>,
    ) -> DomResult<Self> {
        Self::new_with(document, html, context, options, |_| {})
    }

    /// Like [`new`](Self::new), letting `configure` adjust the options first.
    pub fn new_with(
        document: &Document,
        html: &str,
        context: Option<&Rc<Node>>,
        options: Option<ParseOptions>,
        configure: impl FnOnce(&mut ParseOptions),
    ) -> DomResult<Self> {
        let mut options = options.unwrap_or_default();
        configure(&mut options);

        if let Some(context) = context {
            return context::parse_in_context(document, context, html, options);
        }

        let fragment = Self::empty(document);
        let input = DecodedInput::from_text(html);
        let errors = builder::build_fragment(document, &fragment.node, &input, options, None)?;
        Ok(fragment.with_errors(errors))
    }

    /// An empty fragment owned by `document`.
    pub fn empty(document: &Document) -> Self {
        Self {
            node: Node::new(NodeData::DocumentFragment, document.downgrade()),
            document: document.clone(),
            errors: Vec::new(),
        }
    }

    /// Build a `T` from [`new`](Self::new), running its constructor once.
    pub fn new_as<T: FragmentConstructor>(
        document: &Document,
        html: &str,
        context: Option<&Rc<Node>>,
        options: Option<ParseOptions>,
    ) -> DomResult<T> {
        let fragment = Self::new(document, html, context, options)?;
        let args = FragmentArgs {
            document: document.clone(),
            html: html.to_string(),
            context: context.cloned(),
            options,
        };
        Ok(T::construct(fragment, args))
    }

    /// Build a `T` from [`parse`](Self::parse), running its constructor once.
    pub fn parse_as<T: FragmentConstructor>(
        input: impl AsRef<[u8]>,
        encoding: Option<&str>,
        options: Option<ParseOptions>,
    ) -> DomResult<T> {
        let (fragment, html) =
            Self::parse_decoded(input.as_ref(), encoding, options.unwrap_or_default())?;
        let args = FragmentArgs {
            document: fragment.document.clone(),
            html,
            context: None,
            options,
        };
        Ok(T::construct(fragment, args))
    }

    pub(crate) fn with_errors(mut self, errors: Vec<Diagnostic>) -> Self {
        self.errors = errors;
        self
    }

    /// The underlying fragment node.
    pub fn node(&self) -> &Rc<Node> {
        &self.node
    }

    pub fn name(&self) -> &'static str {
        "#document-fragment"
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Diagnostics of the parse that produced this fragment.
    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn children(&self) -> Vec<Rc<Node>> {
        self.node.children()
    }

    pub fn element_children(&self) -> Vec<Rc<Node>> {
        self.node.element_children()
    }

    /// Append `child`, moving it out of wherever it was.
    pub fn append_child(&self, child: Rc<Node>) -> DomResult<()> {
        self.node.append_child(child)
    }

    /// A fragment has no parent; this is always `None`.
    pub fn parent(&self) -> Option<Rc<Node>> {
        self.node.parent()
    }

    pub fn unlink(&self) -> &Self {
        self.node.unlink();
        self
    }

    /// Text and CDATA content of the whole fragment.
    pub fn content(&self) -> String {
        self.node.text_content()
    }

    pub fn to_html(&self) -> String {
        serializer::serialize_children(&self.node, &SaveOptions::html())
    }

    pub fn to_xhtml(&self) -> String {
        serializer::serialize_children(&self.node, &SaveOptions::xhtml())
    }

    pub fn to_xml(&self) -> String {
        serializer::serialize_children(&self.node, &SaveOptions::xml())
    }

    /// Serialize with explicit options, encoding the result if asked to.
    ///
    /// Fails with `InvalidArgument` for an unknown label, or when script,
    /// style or comment content has characters the encoding lacks.
    pub fn serialize(&self, options: &SaveOptions) -> DomResult<Vec<u8>> {
        serializer::check_encodable(&self.node, options)?;
        let text = serializer::serialize_children(&self.node, options);
        serializer::encode(&text, options)
    }

    pub fn inner_html(&self) -> String {
        self.to_html()
    }

    /// Replace the children with the result of parsing `html`.
    ///
    /// The fragment's own diagnostics are left as they are.
    pub fn set_inner_html(&self, html: &str) -> DomResult<()> {
        let replacement = Self::new(&self.document, html, None, None)?;
        self.node.clear_children();
        self.node.append_child(replacement.node.clone())
    }

    /// Deep copy: new nodes, same document, copied diagnostics.
    pub fn duplicate(&self) -> Self {
        Self {
            node: self.node.deep_clone(),
            document: self.document.clone(),
            errors: self.errors.clone(),
        }
    }

    pub fn select(&self, selector: &str) -> Vec<Rc<Node>> {
        self.node.select(selector)
    }

    pub fn at(&self, selector: &str) -> Option<Rc<Node>> {
        self.node.at(selector)
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Rc<Node>> {
        self.node.get_element_by_id(id)
    }
}

impl fmt::Display for DocumentFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

/// Arguments a fragment was constructed with, as passed by the caller.
#[derive(Debug, Clone)]
pub struct FragmentArgs {
    pub document: Document,
    pub html: String,
    pub context: Option<Rc<Node>>,
    pub options: Option<ParseOptions>,
}

/// Types that wrap a [`DocumentFragment`] and want a say in construction.
///
/// `construct` runs exactly once per instance, from
/// [`DocumentFragment::new_as`] or [`DocumentFragment::parse_as`].
/// Copies made by [`duplicate`](FragmentConstructor::duplicate) go through
/// `with_fragment` instead.
pub trait FragmentConstructor: Sized {
    fn construct(fragment: DocumentFragment, args: FragmentArgs) -> Self;

    fn fragment(&self) -> &DocumentFragment;

    /// Same type and state as `self`, wrapping `fragment`.
    fn with_fragment(&self, fragment: DocumentFragment) -> Self;

    fn duplicate(&self) -> Self {
        self.with_fragment(self.fragment().duplicate())
    }
}

impl FragmentConstructor for DocumentFragment {
    fn construct(fragment: DocumentFragment, _args: FragmentArgs) -> Self {
        fragment
    }

    fn fragment(&self) -> &DocumentFragment {
        self
    }

    fn with_fragment(&self, fragment: DocumentFragment) -> Self {
        fragment
    }
}

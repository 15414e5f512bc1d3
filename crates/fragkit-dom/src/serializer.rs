//! Serializer - turn node trees back into HTML, XHTML or XML strings.

use crate::node::{Node, NodeData};
use crate::{DomError, DomResult};
use fragkit_common::EngineConfig;
use fragkit_html::{elements, encoding, Attribute};
use std::fmt::Write;

/// Output syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// `<br>`, boolean attributes minimized.
    Html,
    /// `<br />` for void elements, explicit end tags otherwise.
    Xhtml,
    /// Every empty element self-closed: `<br/>`, `<p/>`.
    Xml,
}

/// Options for serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    pub mode: SaveMode,
    /// Encode the output with this encoding label; `None` keeps UTF-8.
    pub encoding: Option<String>,
    /// Write void elements as `<br />` in XHTML mode.
    pub xhtml_self_closing_void: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self::html()
    }
}

impl SaveOptions {
    pub fn new(mode: SaveMode) -> Self {
        Self {
            mode,
            encoding: None,
            xhtml_self_closing_void: EngineConfig::global().xhtml_self_closing_void,
        }
    }

    pub fn html() -> Self {
        Self::new(SaveMode::Html)
    }

    pub fn xhtml() -> Self {
        Self::new(SaveMode::Xhtml)
    }

    pub fn xml() -> Self {
        Self::new(SaveMode::Xml)
    }

    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    pub fn with_xhtml_self_closing_void(mut self, enabled: bool) -> Self {
        self.xhtml_self_closing_void = enabled;
        self
    }
}

/// Serialize `node` itself.
pub fn serialize_node(node: &Node, options: &SaveOptions) -> String {
    let mut out = String::new();
    Serializer::new(&mut out, options).write_node(node);
    out
}

/// Serialize the children of `node`, in order.
pub fn serialize_children(node: &Node, options: &SaveOptions) -> String {
    let mut out = String::new();
    let mut ser = Serializer::new(&mut out, options);
    for child in node.children() {
        ser.write_node(&child);
    }
    out
}

/// Encode serialized text with the output encoding of `options`.
pub fn encode(text: &str, options: &SaveOptions) -> DomResult<Vec<u8>> {
    match &options.encoding {
        Some(label) => Ok(encoding::encode(text, label)?),
        None => Ok(text.as_bytes().to_vec()),
    }
}

/// Check that content written without escaping survives the output encoding.
///
/// Raw text, comments and CDATA are written verbatim, so a character the
/// encoding lacks would come back as a literal reference after re-parsing.
pub fn check_encodable(node: &Node, options: &SaveOptions) -> DomResult<()> {
    let Some(label) = &options.encoding else {
        return Ok(());
    };
    for descendant in node.descendants() {
        let (content, place) = match descendant.data() {
            NodeData::Comment(data) => (data.clone(), "a comment".to_string()),
            NodeData::CData(data) => (data.clone(), "a CDATA section".to_string()),
            NodeData::Text(text) => {
                let parent = descendant.parent();
                match parent.as_ref().and_then(|p| p.tag_name()) {
                    Some(tag) if elements::is_raw_text(tag) => {
                        (text.borrow().clone(), format!("<{}>", tag))
                    }
                    _ => continue,
                }
            }
            _ => continue,
        };
        if !encoding::can_encode(&content, label)? {
            return Err(DomError::InvalidArgument(format!(
                "{} cannot represent the content of {}",
                label, place
            )));
        }
    }
    Ok(())
}

struct Serializer<'a, W: Write> {
    out: &'a mut W,
    options: &'a SaveOptions,
    in_raw_text: bool,
}

impl<'a, W: Write> Serializer<'a, W> {
    fn new(out: &'a mut W, options: &'a SaveOptions) -> Self {
        Self {
            out,
            options,
            in_raw_text: false,
        }
    }

    fn write_node(&mut self, node: &Node) {
        match node.data() {
            NodeData::Document | NodeData::DocumentFragment => self.write_children(node),
            NodeData::Doctype {
                name,
                public_id,
                system_id,
            } => self.write_doctype(name, public_id, system_id),
            NodeData::Element { name, attributes } => {
                let attributes = attributes.borrow().clone();
                self.write_element(node, name, &attributes);
            }
            NodeData::Text(text) => {
                let text = text.borrow();
                if self.in_raw_text {
                    let _ = self.out.write_str(&text);
                } else {
                    self.write_text_escaped(&text);
                }
            }
            NodeData::Comment(data) => {
                let _ = write!(self.out, "<!--{}-->", data);
            }
            NodeData::CData(data) => {
                let _ = write!(self.out, "<![CDATA[{}]]>", data);
            }
        }
    }

    fn write_children(&mut self, node: &Node) {
        for child in node.children() {
            self.write_node(&child);
        }
    }

    fn write_doctype(&mut self, name: &str, public_id: &str, system_id: &str) {
        let _ = write!(self.out, "<!DOCTYPE {}", name);
        if !public_id.is_empty() {
            let _ = write!(self.out, " PUBLIC \"{}\"", public_id);
            if !system_id.is_empty() {
                let _ = write!(self.out, " \"{}\"", system_id);
            }
        } else if !system_id.is_empty() {
            let _ = write!(self.out, " SYSTEM \"{}\"", system_id);
        }
        let _ = self.out.write_str(">");
    }

    fn write_element(&mut self, node: &Node, name: &str, attributes: &[Attribute]) {
        let _ = write!(self.out, "<{}", name);
        for attr in attributes {
            self.write_attr(attr);
        }

        let empty = node.first_child().is_none();
        let void = elements::is_void(name);
        match self.options.mode {
            SaveMode::Html if void && empty => {
                let _ = self.out.write_str(">");
                return;
            }
            SaveMode::Xhtml if void && empty => {
                let close = if self.options.xhtml_self_closing_void {
                    " />"
                } else {
                    ">"
                };
                let _ = self.out.write_str(close);
                return;
            }
            SaveMode::Xml if empty => {
                let _ = self.out.write_str("/>");
                return;
            }
            _ => {
                let _ = self.out.write_str(">");
            }
        }

        let was_raw = self.in_raw_text;
        self.in_raw_text = elements::is_raw_text(name);
        self.write_children(node);
        self.in_raw_text = was_raw;
        let _ = write!(self.out, "</{}>", name);
    }

    fn write_attr(&mut self, attr: &Attribute) {
        if attr.value.is_empty()
            && self.options.mode == SaveMode::Html
            && elements::is_boolean_attribute(&attr.name)
        {
            let _ = write!(self.out, " {}", attr.name);
            return;
        }
        let _ = write!(self.out, " {}=\"", attr.name);
        for c in attr.value.chars() {
            let _ = match c {
                '&' => self.out.write_str("&amp;"),
                '"' => self.out.write_str("&quot;"),
                _ => self.out.write_char(c),
            };
        }
        let _ = self.out.write_str("\"");
    }

    fn write_text_escaped(&mut self, text: &str) {
        for c in text.chars() {
            let _ = match c {
                '&' => self.out.write_str("&amp;"),
                '<' => self.out.write_str("&lt;"),
                '>' => self.out.write_str("&gt;"),
                _ => self.out.write_char(c),
            };
        }
    }
}

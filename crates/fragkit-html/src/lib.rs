//! # FragKit HTML
//!
//! Lenient HTML4 parser for FragKit.
//!
//! A tokenizer and tree builder that work together to build a tree through
//! the [`TreeSink`] interface. Malformed markup is repaired and every
//! repair is reported as a [`Diagnostic`] instead of failing the parse,
//! unless the options ask for strict parsing.

pub mod diagnostics;
pub mod elements;
pub mod encoding;
pub mod entities;
pub mod options;
pub mod tokenizer;
pub mod tree_builder;

pub use diagnostics::{Diagnostic, DiagnosticCollector, Level, Position};
pub use encoding::{DecodedInput, EncodingSource};
pub use options::ParseOptions;
pub use tokenizer::{Attribute, Token, Tokenizer};
pub use tree_builder::TreeBuilder;

use thiserror::Error;
use tracing::debug;

/// Errors that can occur during HTML parsing.
#[derive(Error, Debug)]
pub enum ParseError {
    /// A diagnostic was raised while recovery was disabled.
    #[error("Syntax error: {0}")]
    Syntax(Diagnostic),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal parser error: {0}")]
    Internal(String),
}

/// Result type for HTML parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Receives the nodes the tree builder creates.
///
/// The builder keeps its own stack of open elements; the sink only
/// creates nodes and links them.
pub trait TreeSink {
    /// The type used to identify nodes in the tree.
    type NodeId: Clone;

    /// The node that receives top-level content.
    fn root(&self) -> Self::NodeId;

    fn create_element(&mut self, name: &str, attrs: Vec<Attribute>) -> Self::NodeId;

    fn create_comment(&mut self, data: String) -> Self::NodeId;

    fn create_cdata(&mut self, data: String) -> Self::NodeId;

    fn create_doctype(&mut self, name: String, public_id: String, system_id: String)
        -> Self::NodeId;

    /// Append `child` as the last child of `parent`.
    fn append_child(&mut self, parent: &Self::NodeId, child: Self::NodeId);

    /// Append text to `parent`, merging with a trailing text node.
    fn append_text(&mut self, parent: &Self::NodeId, text: &str);
}

/// The filled sink and the diagnostics of one parse, in detection order.
#[derive(Debug)]
pub struct ParseOutput<S> {
    pub sink: S,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a fragment into `sink`.
///
/// With a `context` tag name the input is parsed as the content of such an
/// element: `script`/`style` content stays raw text and an end tag for the
/// context itself never closes anything.
pub fn parse_fragment<S: TreeSink>(
    input: &DecodedInput,
    sink: S,
    options: ParseOptions,
    context: Option<&str>,
) -> ParseResult<ParseOutput<S>> {
    debug!(
        len = input.text.len(),
        context,
        strict = options.is_strict(),
        "Parsing fragment"
    );
    let tokenizer = match context {
        Some(tag) => Tokenizer::for_context(&input.text, tag),
        None => Tokenizer::new(&input.text),
    };
    let mut builder = TreeBuilder::for_fragment(sink, options, context);
    builder.note_decoding(input)?;
    let output = builder.build(tokenizer)?;
    debug!(diagnostics = output.diagnostics.len(), "Fragment parsed");
    Ok(output)
}

/// Parse a complete document into `sink`, with implied `html`, `head` and `body`.
pub fn parse_document<S: TreeSink>(
    input: &DecodedInput,
    sink: S,
    options: ParseOptions,
) -> ParseResult<ParseOutput<S>> {
    debug!(len = input.text.len(), strict = options.is_strict(), "Parsing document");
    let mut builder = TreeBuilder::for_document(sink, options);
    builder.note_decoding(input)?;
    let output = builder.build(Tokenizer::new(&input.text))?;
    debug!(diagnostics = output.diagnostics.len(), "Document parsed");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts what the builder creates.
    #[derive(Debug, Default)]
    struct CountingSink {
        elements: Vec<String>,
        texts: usize,
        comments: usize,
    }

    impl TreeSink for CountingSink {
        type NodeId = usize;

        fn root(&self) -> usize {
            0
        }

        fn create_element(&mut self, name: &str, _attrs: Vec<Attribute>) -> usize {
            self.elements.push(name.to_string());
            self.elements.len()
        }

        fn create_comment(&mut self, _data: String) -> usize {
            self.comments += 1;
            0
        }

        fn create_cdata(&mut self, _data: String) -> usize {
            0
        }

        fn create_doctype(&mut self, _name: String, _public_id: String, _system_id: String) -> usize {
            0
        }

        fn append_child(&mut self, _parent: &usize, _child: usize) {}

        fn append_text(&mut self, _parent: &usize, _text: &str) {
            self.texts += 1;
        }
    }

    #[test]
    fn test_parse_fragment() {
        let input = DecodedInput::from_text("<p>Hello</p><!-- c -->");
        let output =
            parse_fragment(&input, CountingSink::default(), ParseOptions::default(), None)
                .unwrap();
        assert_eq!(output.sink.elements, vec!["p"]);
        assert_eq!(output.sink.comments, 1);
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_parse_document() {
        let input = DecodedInput::from_text("<p>Hello</p>");
        let output =
            parse_document(&input, CountingSink::default(), ParseOptions::default()).unwrap();
        assert_eq!(output.sink.elements, vec!["html", "head", "body", "p"]);
    }

    #[test]
    fn test_empty_fragment() {
        let input = DecodedInput::from_text("");
        let output =
            parse_fragment(&input, CountingSink::default(), ParseOptions::default(), None)
                .unwrap();
        assert!(output.sink.elements.is_empty());
        assert_eq!(output.sink.texts, 0);
    }

    #[test]
    fn test_decoding_errors_are_reported() {
        let input = encoding::resolve(&[b'<', b'p', b'>', 0xFF], Some("UTF-8"), "windows-1252")
            .unwrap();
        let output =
            parse_fragment(&input, CountingSink::default(), ParseOptions::default(), None)
                .unwrap();
        assert_eq!(
            output.diagnostics[0].message,
            "Input is not proper UTF-8, indicate encoding !"
        );
    }

    #[test]
    fn test_strict_fragment_fails() {
        let input = DecodedInput::from_text("<jimmy></jimmy>");
        let result = parse_fragment(
            &input,
            CountingSink::default(),
            ParseOptions::new().strict(),
            None,
        );
        assert!(matches!(result, Err(ParseError::Syntax(_))));
    }
}

//! Parsing a fragment as the content of an existing element.

use crate::builder;
use crate::document::Document;
use crate::fragment::DocumentFragment;
use crate::node::Node;
use crate::{DomError, DomResult};
use fragkit_html::{DecodedInput, ParseOptions};
use std::rc::Rc;
use tracing::debug;

/// Parse `html` as if it were the content of `context`.
///
/// `context` is not modified. New diagnostics are appended to `document`
/// and the fragment keeps only those. On failure the document is left as
/// it was.
pub(crate) fn parse_in_context(
    document: &Document,
    context: &Rc<Node>,
    html: &str,
    options: ParseOptions,
) -> DomResult<DocumentFragment> {
    let owner = context.document().ok_or_else(|| {
        DomError::InvalidArgument("context node does not belong to a document".to_string())
    })?;
    if owner != *document {
        return Err(DomError::InvalidArgument(
            "context node belongs to a different document".to_string(),
        ));
    }
    let tag = context.tag_name().ok_or_else(|| {
        DomError::InvalidArgument(format!("context node must be an element, got {}", context.name()))
    })?;

    let snapshot = document.error_count();
    let fragment = DocumentFragment::empty(document);
    let input = DecodedInput::from_text(html);
    let diagnostics =
        builder::build_fragment(document, fragment.node(), &input, options, Some(tag))?;

    document.append_errors(diagnostics);
    let delta = document.errors_since(snapshot);
    debug!(context = tag, errors = delta.len(), "Parsed fragment in context");
    Ok(fragment.with_errors(delta))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_document() -> (Document, Rc<Node>) {
        let doc = Document::parse_html("<html><body><div id='foo'><jimmy></jimmy></div></body></html>")
            .unwrap();
        let div = doc.get_element_by_id("foo").unwrap();
        (doc, div)
    }

    #[test]
    fn test_delta_only() {
        let (doc, div) = context_document();
        assert_eq!(doc.errors().len(), 1);

        let fragment = parse_in_context(&doc, &div, "<hello>x</hello>", ParseOptions::default())
            .unwrap();
        let messages: Vec<_> = fragment.errors().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["Tag hello invalid"]);
        assert_eq!(doc.errors().len(), 2);
    }

    #[test]
    fn test_context_untouched() {
        let (doc, div) = context_document();
        let before = div.children().len();
        let fragment = parse_in_context(&doc, &div, "<p>a</p>", ParseOptions::default()).unwrap();
        assert_eq!(div.children().len(), before);
        assert_eq!(fragment.to_html(), "<p>a</p>");
    }

    #[test]
    fn test_foreign_document_rejected() {
        let (_, div) = context_document();
        let other = Document::new();
        let result = parse_in_context(&other, &div, "<p>a</p>", ParseOptions::default());
        assert!(matches!(result, Err(DomError::InvalidArgument(_))));
    }

    #[test]
    fn test_non_element_rejected() {
        let (doc, _) = context_document();
        let text = doc.create_text_node("x");
        let result = parse_in_context(&doc, &text, "<p>a</p>", ParseOptions::default());
        assert!(matches!(result, Err(DomError::InvalidArgument(_))));
    }

    #[test]
    fn test_strict_failure_leaves_document_unchanged() {
        let (doc, div) = context_document();
        let result = parse_in_context(&doc, &div, "<hello></hello>", ParseOptions::new().strict());
        assert!(matches!(result, Err(DomError::Syntax(_))));
        assert_eq!(doc.errors().len(), 1);
    }

    #[test]
    fn test_script_context_is_raw_text() {
        let doc = Document::parse_html("<html><head><script></script></head></html>").unwrap();
        let script = doc.at("script").unwrap();
        let fragment =
            parse_in_context(&doc, &script, "if (a < b) { x = '<p>'; }", ParseOptions::default())
                .unwrap();
        assert_eq!(fragment.children().len(), 1);
        assert!(fragment.children()[0].is_text());
    }
}

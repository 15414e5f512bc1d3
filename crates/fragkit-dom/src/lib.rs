//! # FragKit DOM
//!
//! Node graph, documents and fragments built by the FragKit HTML parser.
//!
//! ## Design
//!
//! 1. **Reference-counted tree**: `Rc<Node>` with weak parent and document links
//! 2. **Per-parse diagnostics**: a fragment sees only the diagnostics of the parse that built it
//! 3. **Context parsing**: fragments can be parsed as the content of an existing element
//! 4. **Serialization**: HTML, XHTML and XML output with optional re-encoding

mod builder;
mod context;
pub mod document;
pub mod fragment;
pub mod node;
pub mod selector;
pub mod serializer;

pub use document::Document;
pub use fragment::{DocumentFragment, FragmentArgs, FragmentConstructor};
pub use node::{Node, NodeData};
pub use selector::Selector;
pub use serializer::{SaveMode, SaveOptions};

pub use fragkit_html::{Attribute, Diagnostic, Level, ParseOptions};

use fragkit_html::ParseError;
use thiserror::Error;

/// Errors that can occur in DOM operations.
#[derive(Error, Debug)]
pub enum DomError {
    /// Strict parsing rejected the input.
    #[error("Syntax error: {0}")]
    Syntax(Diagnostic),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ParseError> for DomError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Syntax(diagnostic) => DomError::Syntax(diagnostic),
            ParseError::InvalidArgument(message) => DomError::InvalidArgument(message),
            ParseError::Internal(message) => DomError::Internal(message),
        }
    }
}

/// Result type for DOM operations.
pub type DomResult<T> = Result<T, DomError>;

#[cfg(test)]
mod tests {
    use super::*;
    use fragkit_html::Position;

    #[test]
    fn test_parse_error_conversion() {
        let diagnostic = Diagnostic::error("Tag jimmy invalid", Position::START);
        let err: DomError = ParseError::Syntax(diagnostic.clone()).into();
        assert!(matches!(err, DomError::Syntax(ref d) if *d == diagnostic));

        let err: DomError = ParseError::InvalidArgument("Unsupported encoding: x".into()).into();
        assert_eq!(err.to_string(), "Invalid argument: Unsupported encoding: x");
    }
}

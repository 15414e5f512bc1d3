//! Non-fatal parse diagnostics.

use crate::{ParseError, ParseResult};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Warning,
    Error,
    /// Parsing stopped after this diagnostic.
    Fatal,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        };
        f.write_str(label)
    }
}

/// Line and column in the decoded input, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const START: Position = Position { line: 1, column: 1 };
}

impl Default for Position {
    fn default() -> Self {
        Self::START
    }
}

/// A recorded deviation from well-formed markup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, at: Position) -> Self {
        Self::new(Level::Error, message, at)
    }

    pub fn warning(message: impl Into<String>, at: Position) -> Self {
        Self::new(Level::Warning, message, at)
    }

    pub fn fatal(message: impl Into<String>, at: Position) -> Self {
        Self::new(Level::Fatal, message, at)
    }

    fn new(level: Level, message: impl Into<String>, at: Position) -> Self {
        Self {
            level,
            message: message.into(),
            line: at.line,
            column: at.column,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.line, self.column, self.level, self.message
        )
    }
}

/// Collects the diagnostics of a single parse, in detection order.
///
/// With recovery disabled the first diagnostic becomes a [`ParseError::Syntax`].
#[derive(Debug)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    recover: bool,
}

impl DiagnosticCollector {
    pub fn new(recover: bool) -> Self {
        Self {
            diagnostics: Vec::new(),
            recover,
        }
    }

    pub fn record(&mut self, diagnostic: Diagnostic) -> ParseResult<()> {
        if !self.recover {
            return Err(ParseError::Syntax(diagnostic));
        }
        debug!(%diagnostic, "Parse diagnostic");
        self.diagnostics.push(diagnostic);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

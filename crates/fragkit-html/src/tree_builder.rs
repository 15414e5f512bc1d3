//! HTML tree builder.
//!
//! HTML4-style lenient tree construction: a stack of open elements, an
//! auto-close table for implied end tags, and recovery for everything
//! else. Fragments are built straight "in body" under the sink root;
//! documents go through the implied `html`/`head`/`body` insertion modes.

use crate::diagnostics::{Diagnostic, DiagnosticCollector, Position};
use crate::elements;
use crate::encoding::DecodedInput;
use crate::options::ParseOptions;
use crate::tokenizer::{Attribute, Token, Tokenizer};
use crate::{ParseOutput, ParseResult, TreeSink};
use fragkit_common::EngineConfig;
use std::collections::HashSet;
use tracing::{trace, warn};

/// Insertion mode for tree construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    AfterHead,
    InBody,
    AfterBody,
    AfterAfterBody,
}

/// HTML tree builder.
pub struct TreeBuilder<S: TreeSink> {
    sink: S,
    mode: InsertionMode,
    open_elements: Vec<(String, S::NodeId)>,
    /// Element the fragment is parsed inside of. It sits below the stack and is never popped.
    context: Option<String>,
    fragment: bool,
    options: ParseOptions,
    max_depth: usize,
    diagnostics: DiagnosticCollector,
    /// Buffer for accumulating consecutive text characters
    text_buffer: String,
    position: Position,
    seen_ids: HashSet<String>,
    seen_content: bool,
    block_at_root: bool,
    stopped: bool,
}

impl<S: TreeSink> TreeBuilder<S> {
    fn with_mode(sink: S, options: ParseOptions, mode: InsertionMode) -> Self {
        Self {
            sink,
            mode,
            open_elements: Vec::new(),
            context: None,
            fragment: false,
            options,
            max_depth: EngineConfig::global().max_depth,
            diagnostics: DiagnosticCollector::new(options.recover),
            text_buffer: String::new(),
            position: Position::START,
            seen_ids: HashSet::new(),
            seen_content: false,
            block_at_root: false,
            stopped: false,
        }
    }

    /// Builder for a complete document.
    pub fn for_document(sink: S, options: ParseOptions) -> Self {
        Self::with_mode(sink, options, InsertionMode::Initial)
    }

    /// Builder for a fragment, optionally parsed as the content of `context`.
    pub fn for_fragment(sink: S, options: ParseOptions, context: Option<&str>) -> Self {
        let mut builder = Self::with_mode(sink, options, InsertionMode::InBody);
        builder.fragment = true;
        builder.context = context.map(str::to_ascii_lowercase);
        builder
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Record a diagnostic if decoding replaced malformed input.
    pub fn note_decoding(&mut self, input: &DecodedInput) -> ParseResult<()> {
        if input.had_errors {
            self.diagnostics.record(Diagnostic::error(
                format!("Input is not proper {}, indicate encoding !", input.encoding),
                Position::START,
            ))?;
        }
        Ok(())
    }

    pub fn build(mut self, mut tokenizer: Tokenizer) -> ParseResult<ParseOutput<S>> {
        while let Some((token, position)) = tokenizer.next_token()? {
            for diagnostic in tokenizer.take_diagnostics() {
                self.diagnostics.record(diagnostic)?;
            }
            if self.stopped {
                break;
            }
            self.position = position;
            self.process_token(token)?;
        }

        Ok(ParseOutput {
            sink: self.sink,
            diagnostics: self.diagnostics.into_vec(),
        })
    }

    fn error(&mut self, message: impl Into<String>) -> ParseResult<()> {
        self.diagnostics
            .record(Diagnostic::error(message, self.position))
    }

    fn current_name(&self) -> Option<&str> {
        self.open_elements.last().map(|(name, _)| name.as_str())
    }

    fn current_parent(&self) -> S::NodeId {
        match self.open_elements.last() {
            Some((_, node)) => node.clone(),
            None => self.sink.root(),
        }
    }

    fn depth(&self) -> usize {
        self.open_elements.len() + usize::from(self.context.is_some())
    }

    fn insert(&mut self, node: S::NodeId) {
        let parent = self.current_parent();
        self.sink.append_child(&parent, node);
        self.seen_content = true;
    }

    fn insert_comment(&mut self, data: String) -> ParseResult<()> {
        self.flush_text()?;
        let node = self.sink.create_comment(data);
        self.insert(node);
        Ok(())
    }

    fn insert_element(
        &mut self,
        name: String,
        attrs: Vec<Attribute>,
        self_closing: bool,
    ) -> ParseResult<()> {
        if self.depth() >= self.max_depth && !self.options.huge {
            self.diagnostics.record(Diagnostic::fatal(
                format!(
                    "Excessive depth in document: {} use XML_PARSE_HUGE option",
                    self.max_depth
                ),
                self.position,
            ))?;
            warn!(max_depth = self.max_depth, "Stopped parsing at nesting limit");
            self.stopped = true;
            return Ok(());
        }

        for attr in attrs.iter().filter(|a| a.name == "id") {
            if !self.seen_ids.insert(attr.value.clone()) {
                self.error(format!("ID {} already defined", attr.value))?;
            }
        }

        let at_root = self.open_elements.is_empty();
        let node = self.sink.create_element(&name, attrs);
        self.insert(node.clone());

        if self.fragment && at_root && elements::is_block(&name) {
            self.block_at_root = true;
        }
        if !elements::is_void(&name) && !self_closing {
            self.open_elements.push((name, node));
        }
        Ok(())
    }

    fn flush_text(&mut self) -> ParseResult<()> {
        if self.text_buffer.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.text_buffer);
        let blank = text.chars().all(char::is_whitespace);
        if blank && self.options.noblanks {
            return Ok(());
        }

        if !blank
            && self.options.legacy_paragraph_wrap
            && self.fragment
            && self.context.is_none()
            && self.block_at_root
            && self.open_elements.is_empty()
        {
            self.insert_element("p".to_string(), Vec::new(), false)?;
        }

        let parent = self.current_parent();
        self.sink.append_text(&parent, &text);
        self.seen_content = true;
        Ok(())
    }

    /// Close the innermost element named in `targets`, unless a `stop`
    /// element comes first.
    fn close_if_open(&mut self, targets: &[&str], stop: &[&str]) {
        for i in (0..self.open_elements.len()).rev() {
            let name = self.open_elements[i].0.as_str();
            if targets.contains(&name) {
                self.open_elements.truncate(i);
                return;
            }
            if stop.contains(&name) {
                return;
            }
        }
    }

    /// Implied end tags triggered by a start tag.
    fn auto_close(&mut self, name: &str) {
        if elements::closes_paragraph(name) {
            self.close_if_open(&["p"], elements::SCOPE_BOUNDARY);
        }
        match name {
            "li" => self.close_if_open(&["li"], &["ul", "ol", "menu", "dir", "table", "td", "th"]),
            "dt" | "dd" => self.close_if_open(&["dt", "dd"], &["dl", "table", "td", "th"]),
            "option" => self.close_if_open(&["option"], &["select", "optgroup"]),
            "optgroup" => self.close_if_open(&["optgroup", "option"], &["select"]),
            "tr" => self.close_if_open(&["tr"], &["table", "thead", "tbody", "tfoot"]),
            "td" | "th" => self.close_if_open(&["td", "th"], &["tr", "table"]),
            "thead" | "tbody" | "tfoot" => {
                self.close_if_open(&["thead", "tbody", "tfoot"], &["table"])
            }
            _ => {}
        }
    }

    fn process_token(&mut self, token: Token) -> ParseResult<()> {
        trace!(mode = ?self.mode, token = ?token, "Processing token");

        match self.mode {
            InsertionMode::Initial => self.handle_initial(token)?,
            InsertionMode::BeforeHtml => self.handle_before_html(token)?,
            InsertionMode::BeforeHead => self.handle_before_head(token)?,
            InsertionMode::InHead => self.handle_in_head(token)?,
            InsertionMode::AfterHead => self.handle_after_head(token)?,
            InsertionMode::InBody => self.handle_in_body(token)?,
            InsertionMode::AfterBody => self.handle_after_body(token)?,
            InsertionMode::AfterAfterBody => self.handle_after_after_body(token)?,
        }

        Ok(())
    }

    fn handle_initial(&mut self, token: Token) -> ParseResult<()> {
        match token {
            Token::Doctype {
                name,
                public_id,
                system_id,
            } => {
                let node = self.sink.create_doctype(name, public_id, system_id);
                self.insert(node);
                self.mode = InsertionMode::BeforeHtml;
            }
            Token::Character(ch) if ch.is_whitespace() => {}
            Token::Comment(data) => self.insert_comment(data)?,
            _ => {
                self.mode = InsertionMode::BeforeHtml;
                self.process_token(token)?;
            }
        }
        Ok(())
    }

    fn handle_before_html(&mut self, token: Token) -> ParseResult<()> {
        match token {
            Token::StartTag { name, attrs, .. } if name == "html" => {
                self.insert_element(name, attrs, false)?;
                self.mode = InsertionMode::BeforeHead;
            }
            Token::Character(ch) if ch.is_whitespace() => {}
            Token::Comment(data) => self.insert_comment(data)?,
            Token::Doctype { .. } => self.error("Misplaced DOCTYPE declaration")?,
            Token::EndTag { name } if !matches!(name.as_str(), "head" | "body" | "html" | "br") => {
                self.error(format!("Unexpected end tag : {}", name))?;
            }
            _ => {
                // Implied html start tag
                self.insert_element("html".to_string(), Vec::new(), false)?;
                self.mode = InsertionMode::BeforeHead;
                self.process_token(token)?;
            }
        }
        Ok(())
    }

    fn handle_before_head(&mut self, token: Token) -> ParseResult<()> {
        match token {
            Token::StartTag { name, attrs, .. } if name == "head" => {
                self.insert_element(name, attrs, false)?;
                self.mode = InsertionMode::InHead;
            }
            Token::StartTag { name, .. } if name == "html" => {
                self.error("htmlParseStartTag: misplaced <html> tag")?;
            }
            Token::Character(ch) if ch.is_whitespace() => {}
            Token::Comment(data) => self.insert_comment(data)?,
            Token::Doctype { .. } => self.error("Misplaced DOCTYPE declaration")?,
            _ => {
                // Implied head start tag
                self.insert_element("head".to_string(), Vec::new(), false)?;
                self.mode = InsertionMode::InHead;
                self.process_token(token)?;
            }
        }
        Ok(())
    }

    fn close_head(&mut self) -> ParseResult<()> {
        self.flush_text()?;
        while let Some((name, _)) = self.open_elements.pop() {
            if name == "head" {
                break;
            }
        }
        self.mode = InsertionMode::AfterHead;
        Ok(())
    }

    fn handle_in_head(&mut self, token: Token) -> ParseResult<()> {
        // title, style and script collect their text
        let in_text_element = self.current_name().is_some_and(|name| name != "head");

        match token {
            Token::Character(ch) if in_text_element => self.text_buffer.push(ch),
            Token::Character(ch) if ch.is_whitespace() => {}
            Token::Comment(data) => self.insert_comment(data)?,
            Token::StartTag {
                name,
                attrs,
                self_closing,
            } if matches!(
                name.as_str(),
                "base" | "basefont" | "link" | "meta" | "title" | "style" | "script" | "noscript"
            ) =>
            {
                self.flush_text()?;
                self.insert_element(name, attrs, self_closing)?;
            }
            Token::EndTag { name } if in_text_element && self.current_name() == Some(name.as_str()) => {
                self.flush_text()?;
                self.open_elements.pop();
            }
            Token::EndTag { name } if name == "head" => self.close_head()?,
            Token::EndTag { name } if matches!(name.as_str(), "body" | "html" | "br") => {
                // Act as if </head> seen
                self.close_head()?;
                self.process_token(Token::EndTag { name })?;
            }
            Token::EndTag { name } => {
                self.error(format!("Unexpected end tag : {}", name))?;
            }
            Token::Doctype { .. } => self.error("Misplaced DOCTYPE declaration")?,
            _ => {
                // Content closes head implicitly
                self.close_head()?;
                self.process_token(token)?;
            }
        }
        Ok(())
    }

    fn handle_after_head(&mut self, token: Token) -> ParseResult<()> {
        match token {
            Token::Character(ch) if ch.is_whitespace() => {}
            Token::Comment(data) => self.insert_comment(data)?,
            Token::StartTag { name, attrs, .. } if name == "body" => {
                self.insert_element(name, attrs, false)?;
                self.mode = InsertionMode::InBody;
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "html" | "head") => {
                self.error(format!("htmlParseStartTag: misplaced <{}> tag", name))?;
            }
            Token::Doctype { .. } => self.error("Misplaced DOCTYPE declaration")?,
            _ => {
                // Implied body start tag
                self.insert_element("body".to_string(), Vec::new(), false)?;
                self.mode = InsertionMode::InBody;
                self.process_token(token)?;
            }
        }
        Ok(())
    }

    fn handle_in_body(&mut self, token: Token) -> ParseResult<()> {
        match token {
            // Ignore null characters
            Token::Character('\0') => {}
            Token::Character(ch) => self.text_buffer.push(ch),
            Token::Comment(data) => self.insert_comment(data)?,
            Token::CData(data) => {
                self.flush_text()?;
                let node = self.sink.create_cdata(data);
                self.insert(node);
            }
            Token::Doctype { .. } => {
                self.flush_text()?;
                self.error("Misplaced DOCTYPE declaration")?;
            }
            Token::StartTag {
                name,
                attrs,
                self_closing,
            } => self.start_tag_in_body(name, attrs, self_closing)?,
            Token::EndTag { name } => self.end_tag_in_body(name)?,
            Token::Eof => {
                self.flush_text()?;
                self.open_elements.clear();
            }
        }
        Ok(())
    }

    fn start_tag_in_body(
        &mut self,
        name: String,
        attrs: Vec<Attribute>,
        self_closing: bool,
    ) -> ParseResult<()> {
        if name == "body"
            && self.fragment
            && self.context.is_none()
            && !self.seen_content
            && self.text_buffer.chars().all(char::is_whitespace)
        {
            // A fragment that opens with <body> keeps it; leading blanks go.
            self.text_buffer.clear();
            return self.insert_element(name, attrs, self_closing);
        }

        self.flush_text()?;
        if matches!(name.as_str(), "html" | "head" | "body") {
            return self.error(format!("htmlParseStartTag: misplaced <{}> tag", name));
        }
        if !elements::is_known(&name) {
            self.error(format!("Tag {} invalid", name))?;
        }

        self.auto_close(&name);
        self.insert_element(name, attrs, self_closing)
    }

    fn end_tag_in_body(&mut self, name: String) -> ParseResult<()> {
        self.flush_text()?;

        if !self.fragment
            && matches!(name.as_str(), "body" | "html")
            && self.open_elements.iter().any(|(n, _)| n == "body")
        {
            self.mode = InsertionMode::AfterBody;
            if name == "html" {
                self.process_token(Token::EndTag { name })?;
            }
            return Ok(());
        }

        let Some(index) = self.open_elements.iter().rposition(|(n, _)| *n == name) else {
            if matches!(name.as_str(), "html" | "head" | "body") {
                return Ok(());
            }
            return self.error(format!("Unexpected end tag : {}", name));
        };

        let unclosed = self.open_elements[index + 1..]
            .iter()
            .rev()
            .map(|(n, _)| n.as_str())
            .find(|n| !elements::has_optional_end_tag(n))
            .map(str::to_string);
        if let Some(unclosed) = unclosed {
            self.error(format!(
                "Opening and ending tag mismatch: {} and {}",
                name, unclosed
            ))?;
        }
        self.open_elements.truncate(index);
        Ok(())
    }

    fn handle_after_body(&mut self, token: Token) -> ParseResult<()> {
        match token {
            Token::Character(ch) if ch.is_whitespace() => self.handle_in_body(token)?,
            Token::Comment(data) => self.insert_comment(data)?,
            Token::EndTag { name } if name == "html" => {
                self.mode = InsertionMode::AfterAfterBody;
            }
            Token::Eof => self.handle_in_body(Token::Eof)?,
            _ => {
                // Parse error - reprocess in "in body" mode
                self.mode = InsertionMode::InBody;
                self.process_token(token)?;
            }
        }
        Ok(())
    }

    fn handle_after_after_body(&mut self, token: Token) -> ParseResult<()> {
        match token {
            Token::Comment(data) => {
                self.flush_text()?;
                let root = self.sink.root();
                let node = self.sink.create_comment(data);
                self.sink.append_child(&root, node);
            }
            Token::Character(ch) if ch.is_whitespace() => self.handle_in_body(token)?,
            Token::Eof => self.handle_in_body(Token::Eof)?,
            _ => {
                // Parse error - reprocess in "in body" mode
                self.mode = InsertionMode::InBody;
                self.process_token(token)?;
            }
        }
        Ok(())
    }
}

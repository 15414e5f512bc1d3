//! HTML tokenizer.
//!
//! A lenient HTML4-style tokenizer. It never fails on malformed markup:
//! every recovery is recorded as a [`Diagnostic`] and tokenizing goes on.
//! Tokens are produced lazily through [`Tokenizer::next_token`], each with
//! the position where it started.

use crate::diagnostics::{Diagnostic, Position};
use crate::{elements, entities};
use crate::{ParseError, ParseResult};
use std::collections::VecDeque;

/// A single attribute, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Token types emitted by the tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// DOCTYPE declaration
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
    /// Start tag (e.g., `<div>` or `<img />`)
    StartTag {
        name: String,
        attrs: Vec<Attribute>,
        self_closing: bool,
    },
    /// End tag (e.g., `</div>`)
    EndTag { name: String },
    /// Text content
    Character(char),
    /// Comment
    Comment(String),
    /// `<![CDATA[...]]>` section
    CData(String),
    /// End of file
    Eof,
}

impl Token {
    /// Value of a start tag attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            Token::StartTag { attrs, .. } => attrs
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }
}

/// Tokenization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    TagOpen,
    TagName,
    EndTagOpen,
    EndTagName,
    AfterEndTagName,
    BogusEndTag,
    SelfClosingStartTag,
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDoubleQuoted,
    AttributeValueSingleQuoted,
    AttributeValueUnquoted,
    MarkupDeclarationOpen,
    CommentStart,
    Comment,
    CommentEndDash,
    CommentEnd,
    Doctype,
    CData,
    BogusComment,
    /// script, style: no character references
    RawText,
    /// textarea, title: character references decoded
    RcData,
}

/// Text-content state an element switches the tokenizer into.
fn text_state_for(tag: &str) -> Option<State> {
    if elements::is_raw_text(tag) {
        Some(State::RawText)
    } else if elements::is_escapable_raw_text(tag) {
        Some(State::RcData)
    } else {
        None
    }
}

/// HTML tokenizer.
pub struct Tokenizer {
    input: Vec<char>,
    /// Char offsets where each line starts.
    line_starts: Vec<usize>,
    pos: usize,
    state: State,
    initial_state: State,
    initial_tag: String,
    /// The name of the last emitted start tag (for RAWTEXT/RCDATA end tag matching)
    last_start_tag_name: String,
    token_start: Position,
    current_tag_name: String,
    current_attrs: Vec<Attribute>,
    current_attr_name: String,
    current_attr_value: String,
    self_closing: bool,
    current_comment: String,
    pending: VecDeque<(Token, Position)>,
    diagnostics: Vec<Diagnostic>,
    steps: usize,
    finished: bool,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        let input: Vec<char> = input.chars().collect();
        let mut line_starts = vec![0];
        line_starts.extend(
            input
                .iter()
                .enumerate()
                .filter(|(_, &ch)| ch == '\n')
                .map(|(i, _)| i + 1),
        );

        Self {
            input,
            line_starts,
            pos: 0,
            state: State::Data,
            initial_state: State::Data,
            initial_tag: String::new(),
            last_start_tag_name: String::new(),
            token_start: Position::START,
            current_tag_name: String::new(),
            current_attrs: Vec::new(),
            current_attr_name: String::new(),
            current_attr_value: String::new(),
            self_closing: false,
            current_comment: String::new(),
            pending: VecDeque::new(),
            diagnostics: Vec::new(),
            steps: 0,
            finished: false,
        }
    }

    /// Tokenizer for content that sits inside a `context` element.
    ///
    /// Inside `script`/`style` the input is raw text, inside
    /// `textarea`/`title` it is text with character references.
    pub fn for_context(input: &str, context: &str) -> Self {
        let mut tokenizer = Self::new(input);
        let context = context.to_ascii_lowercase();
        if let Some(state) = text_state_for(&context) {
            tokenizer.state = state;
            tokenizer.initial_state = state;
        }
        tokenizer.last_start_tag_name = context.clone();
        tokenizer.initial_tag = context;
        tokenizer
    }

    /// Go back to the start of the input.
    pub fn rewind(&mut self) {
        self.pos = 0;
        self.state = self.initial_state;
        self.last_start_tag_name = self.initial_tag.clone();
        self.token_start = Position::START;
        self.current_tag_name.clear();
        self.current_attrs.clear();
        self.current_attr_name.clear();
        self.current_attr_value.clear();
        self.self_closing = false;
        self.current_comment.clear();
        self.pending.clear();
        self.diagnostics.clear();
        self.steps = 0;
        self.finished = false;
    }

    /// Diagnostics found since the last call.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// The next token and where it starts. `None` once [`Token::Eof`] was returned.
    pub fn next_token(&mut self) -> ParseResult<Option<(Token, Position)>> {
        let limit = (self.input.len() + 1) * 8 + 64;
        while self.pending.is_empty() {
            if self.finished {
                return Ok(None);
            }
            self.step();

            // Safety check to prevent infinite loops
            self.steps += 1;
            if self.steps > limit {
                return Err(ParseError::Internal(
                    "Tokenizer infinite loop detected".into(),
                ));
            }
        }
        Ok(self.pending.pop_front())
    }

    fn step(&mut self) {
        match self.state {
            State::Data => self.state_data(),
            State::TagOpen => self.state_tag_open(),
            State::TagName => self.state_tag_name(),
            State::EndTagOpen => self.state_end_tag_open(),
            State::EndTagName => self.state_end_tag_name(),
            State::AfterEndTagName => self.state_after_end_tag_name(),
            State::BogusEndTag => self.state_bogus_end_tag(),
            State::SelfClosingStartTag => self.state_self_closing_start_tag(),
            State::BeforeAttributeName => self.state_before_attribute_name(),
            State::AttributeName => self.state_attribute_name(),
            State::AfterAttributeName => self.state_after_attribute_name(),
            State::BeforeAttributeValue => self.state_before_attribute_value(),
            State::AttributeValueDoubleQuoted => self.state_attribute_value_quoted('"'),
            State::AttributeValueSingleQuoted => self.state_attribute_value_quoted('\''),
            State::AttributeValueUnquoted => self.state_attribute_value_unquoted(),
            State::MarkupDeclarationOpen => self.state_markup_declaration_open(),
            State::CommentStart => self.state_comment_start(),
            State::Comment => self.state_comment(),
            State::CommentEndDash => self.state_comment_end_dash(),
            State::CommentEnd => self.state_comment_end(),
            State::Doctype => self.state_doctype(),
            State::CData => self.state_cdata(),
            State::BogusComment => self.state_bogus_comment(),
            State::RawText => self.state_text_content(false),
            State::RcData => self.state_text_content(true),
        }
    }

    fn position_at(&self, pos: usize) -> Position {
        let line = match self.line_starts.binary_search(&pos) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Position {
            line: line + 1,
            column: pos - self.line_starts[line] + 1,
        }
    }

    fn cursor(&self) -> Position {
        self.position_at(self.pos)
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn consume(&mut self) -> Option<char> {
        let ch = self.current_char();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    /// Step back so the last consumed char is seen again.
    fn reconsume(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    fn emit(&mut self, token: Token) {
        self.pending.push_back((token, self.token_start));
    }

    fn emit_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.emit(Token::Character(ch));
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        let at = self.cursor();
        self.diagnostics.push(Diagnostic::error(message, at));
    }

    fn unterminated_start_tag(&mut self) {
        let message = format!("Couldn't find end of Start Tag {}", self.current_tag_name);
        self.error(message);
    }

    fn emit_current_comment(&mut self) {
        let comment = std::mem::take(&mut self.current_comment);
        self.emit(Token::Comment(comment));
    }

    /// Emit the pending start tag and pick the state that follows it.
    fn finish_start_tag(&mut self) {
        self.emit_current_attr();
        self.state = State::Data;
        if self.current_tag_name.is_empty() {
            return;
        }
        // Save the tag name for RAWTEXT/RCDATA end tag matching
        self.last_start_tag_name = self.current_tag_name.clone();
        if !self.self_closing {
            if let Some(state) = text_state_for(&self.last_start_tag_name) {
                self.state = state;
            }
        }

        let tag = Token::StartTag {
            name: std::mem::take(&mut self.current_tag_name),
            attrs: std::mem::take(&mut self.current_attrs),
            self_closing: self.self_closing,
        };
        self.self_closing = false;
        self.emit(tag);
    }

    fn emit_current_end_tag(&mut self) {
        self.state = State::Data;
        if !self.current_tag_name.is_empty() {
            let tag = Token::EndTag {
                name: std::mem::take(&mut self.current_tag_name),
            };
            self.emit(tag);
        }
    }

    fn emit_current_attr(&mut self) {
        if self.current_attr_name.is_empty() {
            return;
        }
        let name = std::mem::take(&mut self.current_attr_name);
        let value = std::mem::take(&mut self.current_attr_value);
        if self.current_attrs.iter().any(|a| a.name == name) {
            // First occurrence wins.
            self.error(format!("Attribute {} redefined", name));
            return;
        }
        self.current_attrs.push(Attribute { name, value });
    }

    fn start_attr(&mut self, first: char) {
        self.current_attr_name.clear();
        self.current_attr_value.clear();
        self.current_attr_name.push(first.to_ascii_lowercase());
        self.state = State::AttributeName;
    }

    /// A `<` inside a tag ends it; the `<` is seen again as new markup.
    fn truncate_tag_at_lt(&mut self) {
        self.error("error parsing attribute name");
        self.reconsume();
        self.finish_start_tag();
    }

    fn state_data(&mut self) {
        self.token_start = self.cursor();
        match self.consume() {
            Some('<') => self.state = State::TagOpen,
            Some('&') => {
                let text = self.consume_character_reference(false);
                self.emit_str(&text);
            }
            Some(ch) => self.emit(Token::Character(ch)),
            None => {
                self.emit(Token::Eof);
                self.finished = true;
            }
        }
    }

    fn state_tag_open(&mut self) {
        match self.current_char() {
            Some('!') => {
                self.consume();
                self.state = State::MarkupDeclarationOpen;
            }
            Some('/') => {
                self.consume();
                self.state = State::EndTagOpen;
            }
            Some(ch) if ch.is_ascii_alphabetic() => {
                self.current_tag_name.clear();
                self.current_attrs.clear();
                self.self_closing = false;
                self.state = State::TagName;
            }
            Some('?') => {
                self.consume();
                self.error("Processing instruction not supported");
                self.current_comment.clear();
                self.state = State::BogusComment;
            }
            _ => {
                self.error("htmlParseStartTag: invalid element name");
                self.emit(Token::Character('<'));
                self.state = State::Data;
            }
        }
    }

    fn state_tag_name(&mut self) {
        match self.consume() {
            Some(ch) if ch.is_ascii_whitespace() => {
                self.state = State::BeforeAttributeName;
            }
            Some('/') => {
                self.state = State::SelfClosingStartTag;
            }
            Some('>') => self.finish_start_tag(),
            Some('<') => self.truncate_tag_at_lt(),
            Some(ch) => {
                self.current_tag_name.push(ch.to_ascii_lowercase());
            }
            None => {
                self.unterminated_start_tag();
                self.finish_start_tag();
            }
        }
    }

    fn state_end_tag_open(&mut self) {
        match self.current_char() {
            Some(ch) if ch.is_ascii_alphabetic() => {
                self.current_tag_name.clear();
                self.state = State::EndTagName;
            }
            Some('>') => {
                self.consume();
                self.error("htmlParseEndTag: '</' not followed by name");
                self.state = State::Data;
            }
            None => {
                self.error("htmlParseEndTag: '</' not followed by name");
                self.emit_str("</");
                self.state = State::Data;
            }
            _ => {
                self.error("htmlParseEndTag: '</' not followed by name");
                self.current_comment.clear();
                self.state = State::BogusComment;
            }
        }
    }

    fn state_end_tag_name(&mut self) {
        match self.consume() {
            Some(ch) if ch.is_ascii_whitespace() => {
                self.state = State::AfterEndTagName;
            }
            Some('>') => self.emit_current_end_tag(),
            Some('<') => {
                self.error("End tag : expected '>'");
                self.reconsume();
                self.emit_current_end_tag();
            }
            Some(ch) => {
                self.current_tag_name.push(ch.to_ascii_lowercase());
            }
            None => {
                self.error("End tag : expected '>'");
                self.emit_current_end_tag();
            }
        }
    }

    fn state_after_end_tag_name(&mut self) {
        match self.consume() {
            Some(ch) if ch.is_ascii_whitespace() => {}
            Some('>') => self.emit_current_end_tag(),
            Some('<') => {
                self.error("End tag : expected '>'");
                self.reconsume();
                self.emit_current_end_tag();
            }
            Some(_) => {
                self.error("End tag : expected '>'");
                self.state = State::BogusEndTag;
            }
            None => {
                self.error("End tag : expected '>'");
                self.emit_current_end_tag();
            }
        }
    }

    /// Skip whatever follows an end tag name up to `>`.
    fn state_bogus_end_tag(&mut self) {
        match self.consume() {
            Some('>') | None => self.emit_current_end_tag(),
            Some(_) => {}
        }
    }

    fn state_self_closing_start_tag(&mut self) {
        match self.consume() {
            Some('>') => {
                self.self_closing = true;
                self.finish_start_tag();
            }
            None => {
                self.unterminated_start_tag();
                self.finish_start_tag();
            }
            Some(_) => {
                self.reconsume();
                self.state = State::BeforeAttributeName;
            }
        }
    }

    fn state_before_attribute_name(&mut self) {
        match self.consume() {
            Some(ch) if ch.is_ascii_whitespace() => {}
            Some('/') => self.state = State::SelfClosingStartTag,
            Some('>') => self.finish_start_tag(),
            Some('<') => self.truncate_tag_at_lt(),
            Some('=' | '"' | '\'') => self.error("error parsing attribute name"),
            Some(ch) => self.start_attr(ch),
            None => {
                self.unterminated_start_tag();
                self.finish_start_tag();
            }
        }
    }

    fn state_attribute_name(&mut self) {
        match self.consume() {
            Some(ch) if ch.is_ascii_whitespace() => {
                self.state = State::AfterAttributeName;
            }
            Some('=') => self.state = State::BeforeAttributeValue,
            Some('/') => {
                self.emit_current_attr();
                self.state = State::SelfClosingStartTag;
            }
            Some('>') => self.finish_start_tag(),
            Some('<') => self.truncate_tag_at_lt(),
            Some(ch) => {
                self.current_attr_name.push(ch.to_ascii_lowercase());
            }
            None => {
                self.unterminated_start_tag();
                self.finish_start_tag();
            }
        }
    }

    fn state_after_attribute_name(&mut self) {
        match self.consume() {
            Some(ch) if ch.is_ascii_whitespace() => {}
            Some('=') => self.state = State::BeforeAttributeValue,
            Some('/') => {
                self.emit_current_attr();
                self.state = State::SelfClosingStartTag;
            }
            Some('>') => self.finish_start_tag(),
            Some('<') => self.truncate_tag_at_lt(),
            Some(ch) => {
                self.emit_current_attr();
                self.start_attr(ch);
            }
            None => {
                self.unterminated_start_tag();
                self.finish_start_tag();
            }
        }
    }

    fn state_before_attribute_value(&mut self) {
        match self.consume() {
            Some(ch) if ch.is_ascii_whitespace() => {}
            Some('"') => self.state = State::AttributeValueDoubleQuoted,
            Some('\'') => self.state = State::AttributeValueSingleQuoted,
            Some('>') => self.finish_start_tag(),
            Some(_) => {
                self.reconsume();
                self.state = State::AttributeValueUnquoted;
            }
            None => {
                self.unterminated_start_tag();
                self.finish_start_tag();
            }
        }
    }

    fn state_attribute_value_quoted(&mut self, quote: char) {
        match self.consume() {
            Some(ch) if ch == quote => {
                self.emit_current_attr();
                self.state = State::BeforeAttributeName;
            }
            Some('&') => {
                let text = self.consume_character_reference(true);
                self.current_attr_value.push_str(&text);
            }
            Some(ch) => self.current_attr_value.push(ch),
            None => {
                self.unterminated_start_tag();
                self.finish_start_tag();
            }
        }
    }

    fn state_attribute_value_unquoted(&mut self) {
        match self.consume() {
            Some(ch) if ch.is_ascii_whitespace() => {
                self.emit_current_attr();
                self.state = State::BeforeAttributeName;
            }
            Some('>') => self.finish_start_tag(),
            Some('&') => {
                let text = self.consume_character_reference(true);
                self.current_attr_value.push_str(&text);
            }
            Some(ch) => self.current_attr_value.push(ch),
            None => {
                self.unterminated_start_tag();
                self.finish_start_tag();
            }
        }
    }

    /// Resolve the reference after a consumed `&`.
    ///
    /// Unknown or incomplete references are kept as literal text. In
    /// attribute values they are kept silently, as in query strings.
    fn consume_character_reference(&mut self, in_attribute: bool) -> String {
        if self.current_char() == Some('#') {
            return self.consume_numeric_reference(in_attribute);
        }

        let name: String = self.input[self.pos..]
            .iter()
            .take_while(|ch| ch.is_ascii_alphanumeric())
            .take(entities::MAX_NAME_LEN)
            .collect();
        if name.is_empty() {
            if !in_attribute {
                self.error("htmlParseEntityRef: no name");
            }
            return "&".to_string();
        }
        self.pos += name.chars().count();

        if self.current_char() != Some(';') {
            if !in_attribute {
                self.error("htmlParseEntityRef: expecting ';'");
            }
            return format!("&{}", name);
        }
        match entities::lookup(&name) {
            Some(ch) => {
                self.consume();
                ch.to_string()
            }
            None => format!("&{}", name),
        }
    }

    fn consume_numeric_reference(&mut self, in_attribute: bool) -> String {
        let start = self.pos;
        self.consume(); // '#'
        let hex = matches!(self.current_char(), Some('x' | 'X'));
        if hex {
            self.consume();
        }
        let digits: String = self.input[self.pos..]
            .iter()
            .take_while(|ch| if hex { ch.is_ascii_hexdigit() } else { ch.is_ascii_digit() })
            .collect();
        if digits.is_empty() {
            if !in_attribute {
                self.error("htmlParseCharRef: invalid value");
            }
            self.pos = start;
            return "&".to_string();
        }
        self.pos += digits.len();

        if self.current_char() == Some(';') {
            self.consume();
        } else if !in_attribute {
            self.error("htmlParseCharRef: missing semicolon");
        }

        match entities::decode_numeric(&digits, hex) {
            Ok(ch) => ch.to_string(),
            Err(value) => {
                self.error(format!("htmlParseCharRef: invalid xmlChar value {}", value));
                '\u{FFFD}'.to_string()
            }
        }
    }

    fn state_markup_declaration_open(&mut self) {
        // Check for comment (<!--)
        if self.current_char() == Some('-') && self.peek_char(1) == Some('-') {
            self.pos += 2;
            self.current_comment.clear();
            self.state = State::CommentStart;
            return;
        }

        // Check for DOCTYPE
        if self.matches_case_insensitive("DOCTYPE") {
            self.pos += 7;
            self.current_comment.clear();
            self.state = State::Doctype;
            return;
        }

        if self.matches_case_insensitive("[CDATA[") {
            self.pos += 7;
            self.current_comment.clear();
            self.state = State::CData;
            return;
        }

        // Otherwise, bogus comment
        self.error("Incorrectly opened comment");
        self.current_comment.clear();
        self.state = State::BogusComment;
    }

    fn matches_case_insensitive(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, expected)| {
            self.peek_char(i)
                .is_some_and(|ch| ch.eq_ignore_ascii_case(&expected))
        })
    }

    fn unterminated_comment(&mut self) {
        self.error("Comment not terminated");
        self.emit_current_comment();
        self.state = State::Data;
    }

    fn state_comment_start(&mut self) {
        match self.current_char() {
            Some('-') => {
                self.consume();
                self.state = State::CommentEndDash;
            }
            Some('>') => {
                self.consume();
                self.emit_current_comment();
                self.state = State::Data;
            }
            _ => {
                self.state = State::Comment;
            }
        }
    }

    fn state_comment(&mut self) {
        match self.consume() {
            Some('-') => self.state = State::CommentEndDash,
            Some(ch) => self.current_comment.push(ch),
            None => self.unterminated_comment(),
        }
    }

    fn state_comment_end_dash(&mut self) {
        match self.consume() {
            Some('-') => self.state = State::CommentEnd,
            Some(ch) => {
                self.current_comment.push('-');
                self.current_comment.push(ch);
                self.state = State::Comment;
            }
            None => self.unterminated_comment(),
        }
    }

    fn state_comment_end(&mut self) {
        match self.consume() {
            Some('>') => {
                self.emit_current_comment();
                self.state = State::Data;
            }
            Some('-') => self.current_comment.push('-'),
            Some(ch) => {
                self.current_comment.push_str("--");
                self.current_comment.push(ch);
                self.state = State::Comment;
            }
            None => self.unterminated_comment(),
        }
    }

    /// Collect the declaration up to an unquoted `>`, then split it up.
    fn state_doctype(&mut self) {
        let mut quote = None;
        loop {
            match self.consume() {
                Some('>') if quote.is_none() => break,
                Some(ch @ ('"' | '\'')) => {
                    quote = match quote {
                        None => Some(ch),
                        Some(q) if q == ch => None,
                        open => open,
                    };
                    self.current_comment.push(ch);
                }
                Some(ch) => self.current_comment.push(ch),
                None => {
                    self.error("DOCTYPE improperly terminated");
                    break;
                }
            }
        }

        let raw = std::mem::take(&mut self.current_comment);
        let (name, public_id, system_id) = split_doctype(&raw);
        self.emit(Token::Doctype {
            name,
            public_id,
            system_id,
        });
        self.state = State::Data;
    }

    fn state_cdata(&mut self) {
        loop {
            if self.matches_case_insensitive("]]>") {
                self.pos += 3;
                break;
            }
            match self.consume() {
                Some(ch) => self.current_comment.push(ch),
                None => {
                    self.error("CData section not finished");
                    break;
                }
            }
        }
        let data = std::mem::take(&mut self.current_comment);
        self.emit(Token::CData(data));
        self.state = State::Data;
    }

    fn state_bogus_comment(&mut self) {
        loop {
            match self.consume() {
                Some('>') | None => {
                    self.emit_current_comment();
                    self.state = State::Data;
                    break;
                }
                Some(ch) => {
                    self.current_comment.push(ch);
                }
            }
        }
    }

    /// Content of script/style (raw) and textarea/title (with references).
    fn state_text_content(&mut self, decode_references: bool) {
        self.token_start = self.cursor();
        match self.consume() {
            Some('<') if self.current_char() == Some('/') && self.matches_end_tag(1) => {
                self.pos += 1 + self.last_start_tag_name.chars().count();
                while let Some(ch) = self.consume() {
                    if ch == '>' {
                        break;
                    }
                }
                if self.input.get(self.pos.saturating_sub(1)) != Some(&'>') {
                    self.error("End tag : expected '>'");
                }
                self.current_tag_name = self.last_start_tag_name.clone();
                self.emit_current_end_tag();
            }
            Some('&') if decode_references => {
                let text = self.consume_character_reference(false);
                self.emit_str(&text);
            }
            Some(ch) => self.emit(Token::Character(ch)),
            None => self.state = State::Data,
        }
    }

    /// Does the end tag of the current text element start `offset` chars ahead?
    fn matches_end_tag(&self, offset: usize) -> bool {
        if self.last_start_tag_name.is_empty() {
            return false;
        }

        let tag_name = &self.last_start_tag_name;
        let len = tag_name.chars().count();
        for (i, expected_ch) in tag_name.chars().enumerate() {
            match self.peek_char(offset + i) {
                Some(ch) if ch.to_ascii_lowercase() == expected_ch => continue,
                _ => return false,
            }
        }

        // After the tag name, must be whitespace, /, >, or the end of input
        match self.peek_char(offset + len) {
            Some(ch) => ch.is_ascii_whitespace() || ch == '/' || ch == '>',
            None => true,
        }
    }
}

impl Iterator for Tokenizer {
    type Item = ParseResult<(Token, Position)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

/// Split `html PUBLIC "pub" "sys"` into name, public and system identifiers.
fn split_doctype(raw: &str) -> (String, String, String) {
    let raw = raw.trim();
    let name_len = raw
        .find(|ch: char| ch.is_ascii_whitespace())
        .unwrap_or(raw.len());
    let name = raw[..name_len].to_ascii_lowercase();
    let rest = raw[name_len..].trim_start();

    let keyword_len = rest
        .find(|ch: char| ch.is_ascii_whitespace() || ch == '"' || ch == '\'')
        .unwrap_or(rest.len());
    let keyword = rest[..keyword_len].to_ascii_uppercase();
    let mut literals = quoted_literals(&rest[keyword_len..]).into_iter();

    match keyword.as_str() {
        "PUBLIC" => {
            let public_id = literals.next().unwrap_or_default();
            let system_id = literals.next().unwrap_or_default();
            (name, public_id, system_id)
        }
        "SYSTEM" => (name, String::new(), literals.next().unwrap_or_default()),
        _ => (name, String::new(), String::new()),
    }
}

fn quoted_literals(mut rest: &str) -> Vec<String> {
    let mut literals = Vec::new();
    loop {
        rest = rest.trim_start();
        let Some(quote) = rest.chars().next().filter(|ch| *ch == '"' || *ch == '\'') else {
            return literals;
        };
        let body = &rest[1..];
        let end = body.find(quote).unwrap_or(body.len());
        literals.push(body[..end].to_string());
        rest = body.get(end + 1..).unwrap_or("");
    }
}

/// Tokenize HTML input.
pub fn tokenize(input: &str) -> ParseResult<Vec<Token>> {
    Tokenizer::new(input)
        .map(|item| item.map(|(token, _)| token))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(input: &str) -> Vec<String> {
        let mut tokenizer = Tokenizer::new(input);
        while tokenizer.next_token().unwrap().is_some() {}
        tokenizer
            .take_diagnostics()
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    fn text_of(tokens: &[Token]) -> String {
        tokens
            .iter()
            .filter_map(|t| match t {
                Token::Character(ch) => Some(*ch),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_simple_tag() {
        let tokens = tokenize("<div></div>").unwrap();
        assert!(matches!(tokens[0], Token::StartTag { ref name, .. } if name == "div"));
        assert!(matches!(tokens[1], Token::EndTag { ref name } if name == "div"));
        assert!(matches!(tokens[2], Token::Eof));
    }

    #[test]
    fn test_self_closing_tag() {
        let tokens = tokenize("<br/>").unwrap();
        assert!(matches!(
            tokens[0],
            Token::StartTag { ref name, self_closing: true, .. } if name == "br"
        ));
    }

    #[test]
    fn test_attributes_keep_source_order() {
        let tokens = tokenize("<div id=\"test\" class=\"foo\" data-x=1></div>").unwrap();
        if let Token::StartTag { name, attrs, .. } = &tokens[0] {
            assert_eq!(name, "div");
            let names: Vec<_> = attrs.iter().map(|a| a.name.as_str()).collect();
            assert_eq!(names, vec!["id", "class", "data-x"]);
        } else {
            panic!("Expected StartTag");
        }
        assert_eq!(tokens[0].attr("class"), Some("foo"));
        assert_eq!(tokens[0].attr("data-x"), Some("1"));
    }

    #[test]
    fn test_spaces_around_equals() {
        let tokens = tokenize("<a href = \"x\" title= 'y'>").unwrap();
        assert_eq!(tokens[0].attr("href"), Some("x"));
        assert_eq!(tokens[0].attr("title"), Some("y"));
    }

    #[test]
    fn test_duplicate_attribute_first_wins() {
        let tokens = tokenize("<p class=a class=b>").unwrap();
        assert_eq!(tokens[0].attr("class"), Some("a"));
        assert_eq!(messages("<p class=a class=b>"), vec!["Attribute class redefined"]);
    }

    #[test]
    fn test_text_content() {
        let tokens = tokenize("<p>Hello World</p>").unwrap();
        assert!(matches!(tokens[0], Token::StartTag { ref name, .. } if name == "p"));
        // Text tokens are individual characters
        assert!(matches!(tokens[1], Token::Character('H')));
        assert_eq!(text_of(&tokens), "Hello World");
    }

    #[test]
    fn test_comment() {
        let tokens = tokenize("<!-- comment -->").unwrap();
        assert!(matches!(tokens[0], Token::Comment(ref s) if s == " comment "));
    }

    #[test]
    fn test_unterminated_comment() {
        assert_eq!(messages("<!-- open"), vec!["Comment not terminated"]);
    }

    #[test]
    fn test_bogus_declarations_are_reported() {
        let tokens = tokenize("<!x>").unwrap();
        assert!(matches!(tokens[0], Token::Comment(ref data) if data == "x"));
        assert_eq!(messages("<!x>"), vec!["Incorrectly opened comment"]);
        assert_eq!(messages("<!"), vec!["Incorrectly opened comment"]);
        assert_eq!(messages("<?pi>"), vec!["Processing instruction not supported"]);
    }

    #[test]
    fn test_cdata_section() {
        let tokens = tokenize("<![CDATA[a < b]]>").unwrap();
        assert!(matches!(tokens[0], Token::CData(ref s) if s == "a < b"));
    }

    #[test]
    fn test_doctype() {
        let tokens = tokenize("<!DOCTYPE html>").unwrap();
        assert!(matches!(
            tokens[0],
            Token::Doctype { ref name, .. } if name == "html"
        ));
    }

    #[test]
    fn test_doctype_identifiers() {
        let tokens = tokenize(
            r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.01//EN" "http://www.w3.org/TR/html4/strict.dtd">"#,
        )
        .unwrap();
        assert_eq!(
            tokens[0],
            Token::Doctype {
                name: "html".into(),
                public_id: "-//W3C//DTD HTML 4.01//EN".into(),
                system_id: "http://www.w3.org/TR/html4/strict.dtd".into(),
            }
        );
    }

    #[test]
    fn test_entity_in_attribute() {
        let tokens = tokenize("<a href=\"?foo=1&amp;bar=2&baz=3\"></a>").unwrap();
        assert_eq!(tokens[0].attr("href"), Some("?foo=1&bar=2&baz=3"));
        assert!(messages("<a href=\"?foo=1&amp;bar=2&baz=3\"></a>").is_empty());
    }

    #[test]
    fn test_entities_in_text() {
        let tokens = tokenize("a &lt;b&gt; &eacute; &#65;&#x3053;").unwrap();
        assert_eq!(text_of(&tokens), "a <b> \u{e9} A\u{3053}");
    }

    #[test]
    fn test_bad_references_stay_literal() {
        let tokens = tokenize("&bogus; &amp &").unwrap();
        assert_eq!(text_of(&tokens), "&bogus; &amp &");
        assert_eq!(
            messages("&bogus; &amp &"),
            vec!["htmlParseEntityRef: expecting ';'", "htmlParseEntityRef: no name"]
        );
    }

    #[test]
    fn test_invalid_char_ref() {
        let tokens = tokenize("&#0;").unwrap();
        assert_eq!(text_of(&tokens), "\u{FFFD}");
        assert_eq!(messages("&#0;"), vec!["htmlParseCharRef: invalid xmlChar value 0"]);
    }

    #[test]
    fn test_lt_in_tag_truncates() {
        let tokens = tokenize("<div </div>").unwrap();
        assert!(matches!(tokens[0], Token::StartTag { ref name, ref attrs, .. } if name == "div" && attrs.is_empty()));
        assert!(matches!(tokens[1], Token::EndTag { ref name } if name == "div"));
        assert_eq!(messages("<div </div>"), vec!["error parsing attribute name"]);
    }

    #[test]
    fn test_end_tag_at_eof() {
        let tokens = tokenize("<div></div").unwrap();
        assert!(matches!(tokens[1], Token::EndTag { ref name } if name == "div"));
        assert_eq!(messages("<div></div"), vec!["End tag : expected '>'"]);
    }

    #[test]
    fn test_end_tag_garbage_not_merged() {
        let tokens = tokenize("</div foo>").unwrap();
        assert!(matches!(tokens[0], Token::EndTag { ref name } if name == "div"));
    }

    #[test]
    fn test_start_tag_at_eof() {
        let tokens = tokenize("<span class=x").unwrap();
        assert!(matches!(tokens[0], Token::StartTag { ref name, .. } if name == "span"));
        assert_eq!(tokens[0].attr("class"), Some("x"));
        assert_eq!(messages("<span class=x"), vec!["Couldn't find end of Start Tag span"]);
    }

    #[test]
    fn test_lone_lt_is_text() {
        let tokens = tokenize("a < b").unwrap();
        assert_eq!(text_of(&tokens), "a < b");
        assert_eq!(messages("a < b"), vec!["htmlParseStartTag: invalid element name"]);
    }

    #[test]
    fn test_script_is_raw() {
        let tokens = tokenize("<script>if (a < b && c) {}</script>").unwrap();
        assert_eq!(text_of(&tokens), "if (a < b && c) {}");
        assert!(matches!(tokens.last(), Some(Token::Eof)));
        assert!(tokens
            .iter()
            .any(|t| matches!(t, Token::EndTag { name } if name == "script")));
    }

    #[test]
    fn test_title_decodes_references() {
        let tokens = tokenize("<title>a &amp; <b></title>").unwrap();
        assert_eq!(text_of(&tokens), "a & <b>");
    }

    #[test]
    fn test_context_tokenizer_starts_raw() {
        let mut tokenizer = Tokenizer::for_context("<b>x</b>", "style");
        let tokens: Vec<_> = tokenizer
            .by_ref()
            .map(|item| item.unwrap().0)
            .collect();
        assert_eq!(text_of(&tokens), "<b>x</b>");
    }

    #[test]
    fn test_positions() {
        let mut tokenizer = Tokenizer::new("ab\n  <p>");
        let mut last = None;
        while let Some((token, at)) = tokenizer.next_token().unwrap() {
            if matches!(token, Token::StartTag { .. }) {
                last = Some(at);
            }
        }
        assert_eq!(last, Some(Position { line: 2, column: 3 }));
    }

    #[test]
    fn test_rewind() {
        let mut tokenizer = Tokenizer::new("<p>x");
        let first: Vec<_> = tokenizer.by_ref().map(|t| t.unwrap().0).collect();
        tokenizer.rewind();
        let second: Vec<_> = tokenizer.by_ref().map(|t| t.unwrap().0).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input() {
        let tokens = tokenize("").unwrap();
        assert!(matches!(tokens[0], Token::Eof));
    }

    #[test]
    fn test_nested_tags() {
        let tokens = tokenize("<div><span><b>text</b></span></div>").unwrap();
        let tag_names: Vec<String> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::StartTag { name, .. } => Some(name.clone()),
                Token::EndTag { name } => Some(name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(tag_names, vec!["div", "span", "b", "b", "span", "div"]);
    }

    #[test]
    fn test_boolean_attribute() {
        let tokens = tokenize("<input type=\"text\" disabled>").unwrap();
        assert_eq!(tokens[0].attr("disabled"), Some(""));
    }
}

//! Input encoding resolution and output encoding.
//!
//! Resolution order when no encoding is given: byte-order mark, a `<meta>`
//! charset declaration in the first 1024 bytes, UTF-8 if the bytes are
//! valid UTF-8, and finally the configured fallback.

use crate::{ParseError, ParseResult};
use encoding_rs::{Encoding, UTF_8};
use std::borrow::Cow;
use tracing::debug;

/// How far into the input the `<meta>` prescan looks.
const PRESCAN_LIMIT: usize = 1024;

/// How the input encoding was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingSource {
    Explicit,
    ByteOrderMark,
    MetaDeclaration,
    ValidUtf8,
    Fallback,
}

/// Input text after encoding resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInput {
    pub text: String,
    /// Encoding name reported to the document. Explicit labels are kept verbatim.
    pub encoding: String,
    pub source: EncodingSource,
    /// Malformed byte sequences were replaced with U+FFFD.
    pub had_errors: bool,
}

impl DecodedInput {
    /// Wrap text that is already Unicode.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            encoding: UTF_8.name().to_string(),
            source: EncodingSource::ValidUtf8,
            had_errors: false,
        }
    }
}

/// Look up an encoding by WHATWG label.
pub fn lookup(label: &str) -> ParseResult<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ParseError::InvalidArgument(format!("Unsupported encoding: {}", label)))
}

/// Decode `input`, honouring `explicit` if given.
pub fn resolve(input: &[u8], explicit: Option<&str>, fallback: &str) -> ParseResult<DecodedInput> {
    if let Some(label) = explicit {
        let encoding = lookup(label)?;
        let (text, had_errors) = encoding.decode_with_bom_removal(input);
        debug!(label, encoding = encoding.name(), had_errors, "Decoded with explicit encoding");
        return Ok(DecodedInput {
            text: text.into_owned(),
            encoding: label.to_string(),
            source: EncodingSource::Explicit,
            had_errors,
        });
    }

    let (encoding, source, body) = sniff(input, fallback)?;
    let (text, had_errors) = encoding.decode_without_bom_handling(body);
    debug!(encoding = encoding.name(), ?source, had_errors, "Decoded with sniffed encoding");
    Ok(DecodedInput {
        text: text.into_owned(),
        encoding: encoding.name().to_string(),
        source,
        had_errors,
    })
}

fn sniff<'a>(
    input: &'a [u8],
    fallback: &str,
) -> ParseResult<(&'static Encoding, EncodingSource, &'a [u8])> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(input) {
        return Ok((encoding, EncodingSource::ByteOrderMark, &input[bom_len..]));
    }

    if let Some(encoding) = prescan_meta(input) {
        return Ok((encoding, EncodingSource::MetaDeclaration, input));
    }

    if std::str::from_utf8(input).is_ok() {
        return Ok((UTF_8, EncodingSource::ValidUtf8, input));
    }

    Ok((lookup(fallback)?, EncodingSource::Fallback, input))
}

/// Find a charset declared by a `<meta>` tag near the start of the input.
///
/// Handles both `<meta charset="...">` and
/// `<meta http-equiv="Content-Type" content="text/html; charset=...">`.
pub fn prescan_meta(input: &[u8]) -> Option<&'static Encoding> {
    let head = &input[..input.len().min(PRESCAN_LIMIT)];
    let lowered: Vec<u8> = head.iter().map(u8::to_ascii_lowercase).collect();

    let mut from = 0;
    while let Some(offset) = find(&lowered[from..], b"<meta") {
        let start = from + offset + 5;
        let end = lowered[start..]
            .iter()
            .position(|&b| b == b'>')
            .map_or(lowered.len(), |p| start + p);
        let tag = &lowered[start..end];

        if let Some(label) = charset_in(tag) {
            if let Some(encoding) = Encoding::for_label(label) {
                // A declared UTF-16 is read as UTF-8, the page got here as ASCII.
                return Some(encoding.output_encoding());
            }
        }
        from = end;
    }
    None
}

fn charset_in(tag: &[u8]) -> Option<&[u8]> {
    let at = find(tag, b"charset")? + 7;
    let mut rest = &tag[at..];

    rest = trim_start(rest);
    rest = rest.strip_prefix(b"=")?;
    rest = trim_start(rest);

    let (quote, rest) = match rest.first() {
        Some(&q @ (b'"' | b'\'')) => (Some(q), &rest[1..]),
        _ => (None, rest),
    };
    let len = rest
        .iter()
        .position(|&b| match quote {
            Some(q) => b == q,
            None => b.is_ascii_whitespace() || b == b';' || b == b'"' || b == b'\'' || b == b'/',
        })
        .unwrap_or(rest.len());

    let label = &rest[..len];
    (!label.is_empty()).then_some(label)
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let skip = bytes.iter().take_while(|b| b.is_ascii_whitespace()).count();
    &bytes[skip..]
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Encode serialized output into the named encoding.
///
/// Characters the encoding cannot represent become numeric character
/// references. Those only decode back in text and attribute values.
pub fn encode(text: &str, label: &str) -> ParseResult<Vec<u8>> {
    let encoding = lookup(label)?.output_encoding();
    let (bytes, _, unmappable) = encoding.encode(text);
    if unmappable {
        debug!(encoding = encoding.name(), "Replaced unmappable characters with references");
    }
    Ok(match bytes {
        Cow::Borrowed(b) => b.to_vec(),
        Cow::Owned(b) => b,
    })
}

/// Whether every character of `text` has a byte sequence in the named encoding.
pub fn can_encode(text: &str, label: &str) -> ParseResult<bool> {
    let encoding = lookup(label)?.output_encoding();
    let (_, _, unmappable) = encoding.encode(text);
    Ok(!unmappable)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KONNICHIWA: &str = "<div>こんにちは！</div>";

    #[test]
    fn test_explicit_euc_jp() {
        let (bytes, _, _) = encoding_rs::EUC_JP.encode(KONNICHIWA);
        let decoded = resolve(&bytes, Some("EUC-JP"), "windows-1252").unwrap();
        assert_eq!(decoded.text, KONNICHIWA);
        assert_eq!(decoded.encoding, "EUC-JP");
        assert_eq!(decoded.source, EncodingSource::Explicit);
    }

    #[test]
    fn test_explicit_label_reported_verbatim() {
        let decoded = resolve(b"<div>hello world</div>", Some("ISO-8859-1"), "windows-1252").unwrap();
        assert_eq!(decoded.encoding, "ISO-8859-1");
        assert_eq!(decoded.text, "<div>hello world</div>");
    }

    #[test]
    fn test_can_encode() {
        assert!(can_encode("caf\u{e9}", "ISO-8859-1").unwrap());
        assert!(!can_encode("\u{3042}", "ISO-8859-1").unwrap());
        assert!(can_encode("\u{3042}", "EUC-JP").unwrap());
        assert!(can_encode("anything", "no-such-encoding").is_err());
    }

    #[test]
    fn test_unknown_label() {
        let result = resolve(b"x", Some("no-such-encoding"), "windows-1252");
        assert!(matches!(result, Err(ParseError::InvalidArgument(_))));
    }

    #[test]
    fn test_bom_wins() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("héllo".as_bytes());
        let decoded = resolve(&bytes, None, "windows-1252").unwrap();
        assert_eq!(decoded.text, "héllo");
        assert_eq!(decoded.source, EncodingSource::ByteOrderMark);
    }

    #[test]
    fn test_meta_charset_prescan() {
        let source = format!("<meta charset=\"EUC-JP\">{}", KONNICHIWA);
        let (bytes, _, _) = encoding_rs::EUC_JP.encode(&source);
        let decoded = resolve(&bytes, None, "windows-1252").unwrap();
        assert_eq!(decoded.encoding, "EUC-JP");
        assert_eq!(decoded.source, EncodingSource::MetaDeclaration);
        assert!(decoded.text.ends_with(KONNICHIWA));
    }

    #[test]
    fn test_meta_http_equiv_prescan() {
        let html = br#"<META HTTP-EQUIV="Content-Type" CONTENT="text/html; charset=Shift_JIS">"#;
        assert_eq!(prescan_meta(html), Some(encoding_rs::SHIFT_JIS));
    }

    #[test]
    fn test_plain_ascii_is_utf8() {
        let decoded = resolve(b"hello", None, "windows-1252").unwrap();
        assert_eq!(decoded.text, "hello");
        assert_eq!(decoded.encoding, "UTF-8");
    }

    #[test]
    fn test_fallback_for_invalid_utf8() {
        let decoded = resolve(&[b'c', b'a', b'f', 0xE9], None, "windows-1252").unwrap();
        assert_eq!(decoded.text, "café");
        assert_eq!(decoded.source, EncodingSource::Fallback);
    }

    #[test]
    fn test_encode_uses_references_for_unmappable() {
        let bytes = encode("a\u{3053}b", "ISO-8859-1").unwrap();
        assert_eq!(bytes, b"a&#12371;b");
    }
}

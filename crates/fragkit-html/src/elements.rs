//! HTML 4 element tables.

use std::collections::HashSet;

/// Elements defined by HTML 4.01 (strict, transitional and frameset).
const HTML4_ELEMENTS: &[&str] = &[
    "a", "abbr", "acronym", "address", "applet", "area", "b", "base", "basefont", "bdo", "big",
    "blockquote", "body", "br", "button", "caption", "center", "cite", "code", "col", "colgroup",
    "dd", "del", "dfn", "dir", "div", "dl", "dt", "em", "embed", "fieldset", "font", "form",
    "frame", "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "head", "hr", "html", "i", "iframe",
    "img", "input", "ins", "isindex", "kbd", "label", "legend", "li", "link", "map", "menu", "meta",
    "noframes", "noscript", "object", "ol", "optgroup", "option", "p", "param", "pre", "q", "s",
    "samp", "script", "select", "small", "span", "strike", "strong", "style", "sub", "sup",
    "table", "tbody", "td", "textarea", "tfoot", "th", "thead", "title", "tr", "tt", "u", "ul",
    "var",
];

/// Void elements that cannot have children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "br", "col", "embed", "frame", "hr", "img", "input", "isindex",
    "link", "meta", "param", "source", "track", "wbr",
];

/// Elements that cause implicit closure of p elements.
const P_CLOSING_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "center", "dir", "div", "dl", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hgroup", "hr", "listing", "main", "menu", "nav", "noframes", "ol", "p", "pre", "section",
    "table", "ul", "xmp",
];

/// Elements whose end tag may be left out without a diagnostic.
const OPTIONAL_END_TAG: &[&str] = &[
    "body", "colgroup", "dd", "dt", "head", "html", "li", "option", "p", "tbody", "td", "tfoot",
    "th", "thead", "tr",
];

/// Elements whose content is kept verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements whose content is text with character references.
const ESCAPABLE_RAW_TEXT_ELEMENTS: &[&str] = &["textarea", "title"];

/// Attributes written without a value when empty.
const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "checked", "compact", "declare", "defer", "disabled", "ismap", "multiple", "nohref",
    "noresize", "noshade", "nowrap", "readonly", "selected",
];

lazy_static::lazy_static! {
    static ref KNOWN: HashSet<&'static str> = HTML4_ELEMENTS.iter().copied().collect();
}

pub fn is_known(name: &str) -> bool {
    KNOWN.contains(name)
}

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub fn closes_paragraph(name: &str) -> bool {
    P_CLOSING_ELEMENTS.contains(&name)
}

/// Block-level content, for implied paragraphs.
pub fn is_block(name: &str) -> bool {
    closes_paragraph(name) || matches!(name, "li" | "dd" | "dt")
}

pub fn has_optional_end_tag(name: &str) -> bool {
    OPTIONAL_END_TAG.contains(&name)
}

pub fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

pub fn is_escapable_raw_text(name: &str) -> bool {
    ESCAPABLE_RAW_TEXT_ELEMENTS.contains(&name)
}

pub fn is_boolean_attribute(name: &str) -> bool {
    BOOLEAN_ATTRIBUTES.contains(&name)
}

/// Elements that stop the search for an open `p` to close.
pub const SCOPE_BOUNDARY: &[&str] = &[
    "applet", "button", "caption", "html", "marquee", "object", "table", "td", "template", "th",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html4_membership() {
        assert!(is_known("div"));
        assert!(is_known("font"));
        assert!(!is_known("jimmy"));
        assert!(!is_known("section"));
    }

    #[test]
    fn test_void_includes_legacy_elements() {
        for name in ["br", "basefont", "frame", "isindex", "img"] {
            assert!(is_void(name), "{} should be void", name);
        }
        assert!(!is_void("div"));
    }

    #[test]
    fn test_text_elements() {
        assert!(is_raw_text("script"));
        assert!(is_escapable_raw_text("title"));
        assert!(!is_raw_text("title"));
        for name in ["xmp", "iframe", "noembed", "noframes"] {
            assert!(!is_raw_text(name), "{} content is markup", name);
        }
    }
}

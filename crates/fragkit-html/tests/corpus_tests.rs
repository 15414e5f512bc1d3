//! Corpus tests for the fragment and document parsers

use fragkit_html::{
    parse_document, parse_fragment, Attribute, DecodedInput, Level, ParseOptions, TreeSink,
};

#[derive(Debug, Default)]
struct TestSink {
    events: Vec<String>,
    node_count: usize,
}

impl TestSink {
    fn next_id(&mut self) -> usize {
        self.node_count += 1;
        self.node_count
    }
}

impl TreeSink for TestSink {
    type NodeId = usize;

    fn root(&self) -> usize {
        0
    }

    fn create_element(&mut self, name: &str, attrs: Vec<Attribute>) -> usize {
        let attr_str = attrs
            .iter()
            .map(|a| {
                if a.value.is_empty() {
                    a.name.clone()
                } else {
                    format!("{}={}", a.name, a.value)
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        if attr_str.is_empty() {
            self.events.push(format!("start:{}", name));
        } else {
            self.events.push(format!("start:{}[{}]", name, attr_str));
        }
        self.next_id()
    }

    fn create_comment(&mut self, data: String) -> usize {
        self.events.push(format!("comment:{}", data));
        self.next_id()
    }

    fn create_cdata(&mut self, data: String) -> usize {
        self.events.push(format!("cdata:{}", data));
        self.next_id()
    }

    fn create_doctype(&mut self, name: String, _public_id: String, _system_id: String) -> usize {
        self.events.push(format!("doctype:{}", name));
        self.next_id()
    }

    fn append_child(&mut self, parent: &usize, child: usize) {
        self.events.push(format!("append:{}>{}", parent, child));
    }

    fn append_text(&mut self, parent: &usize, text: &str) {
        if !text.trim().is_empty() {
            self.events.push(format!("text:{}>{}", parent, text.trim()));
        }
    }
}

fn fragment(html: &str) -> (Vec<String>, Vec<String>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("fragkit_html=trace")
        .with_test_writer()
        .try_init();
    let input = DecodedInput::from_text(html);
    let output = parse_fragment(&input, TestSink::default(), ParseOptions::default(), None)
        .expect("fragment parse");
    let messages = output.diagnostics.into_iter().map(|d| d.message).collect();
    (output.sink.events, messages)
}

fn document(html: &str) -> Vec<String> {
    let input = DecodedInput::from_text(html);
    parse_document(&input, TestSink::default(), ParseOptions::default())
        .expect("document parse")
        .sink
        .events
}

fn has(events: &[String], event: &str) -> bool {
    events.iter().any(|e| e == event)
}

#[test]
fn test_simple_page() {
    let html = r#"<!DOCTYPE html>
<html>
<head><title>Test</title></head>
<body><p>Hello</p></body>
</html>"#;

    let events = document(html);

    assert!(has(&events, "doctype:html"));
    assert!(has(&events, "start:html"));
    assert!(has(&events, "start:head"));
    assert!(has(&events, "start:body"));
    assert!(events.iter().any(|e| e.starts_with("text:") && e.ends_with(">Hello")));
}

#[test]
fn test_fragment_content_goes_to_root() {
    let (events, errors) = fragment("<div>a</div><span>b</span>");
    assert_eq!(
        events,
        vec![
            "start:div",
            "append:0>1",
            "text:1>a",
            "start:span",
            "append:0>2",
            "text:2>b",
        ]
    );
    assert!(errors.is_empty());
}

#[test]
fn test_malformed_nesting() {
    let (events, errors) = fragment("<div><span><p></div></span></p>");
    assert!(has(&events, "start:p"));
    assert_eq!(
        errors,
        vec![
            "Opening and ending tag mismatch: div and span",
            "Unexpected end tag : span",
            "Unexpected end tag : p",
        ]
    );
}

#[test]
fn test_unclosed_tags() {
    let (events, errors) = fragment("<p>Text<div>More");
    assert!(has(&events, "text:1>Text"));
    // div closes the paragraph, so it lands at the root.
    assert!(has(&events, "append:0>2"));
    assert!(errors.is_empty());
}

#[test]
fn test_entity_decoding() {
    let (events, _) = fragment("<p>&lt;div&gt; &amp; &quot;text&quot;</p>");
    assert!(has(&events, "text:1><div> & \"text\""));
}

#[test]
fn test_nested_lists() {
    let (events, errors) = fragment("<ul><li>One<ul><li>Nested</li></ul></li><li>Two</li></ul>");
    assert_eq!(events.iter().filter(|e| *e == "start:li").count(), 3);
    assert!(errors.is_empty());
}

#[test]
fn test_table_structure() {
    let (events, _) = fragment("<table><tr><td>Cell</td></tr></table>");
    assert!(has(&events, "start:table"));
    assert!(has(&events, "start:tr"));
    assert!(has(&events, "start:td"));
}

#[test]
fn test_comments_and_cdata() {
    let (events, _) = fragment("<!-- comment 1 --><div><!-- comment 2 --><![CDATA[x]]></div>");
    assert!(has(&events, "comment: comment 1 "));
    assert!(has(&events, "comment: comment 2 "));
    assert!(has(&events, "cdata:x"));
}

#[test]
fn test_attributes_with_special_chars() {
    let (events, _) =
        fragment(r#"<input type="text" data-value="foo&amp;bar" class="a b c" disabled>"#);
    assert!(has(
        &events,
        "start:input[type=text data-value=foo&bar class=a b c disabled]"
    ));
}

#[test]
fn test_diagnostics_carry_positions() {
    let input = DecodedInput::from_text("<p>\n  <jimmy></jimmy></p>");
    let output =
        parse_fragment(&input, TestSink::default(), ParseOptions::default(), None).unwrap();
    let diagnostic = &output.diagnostics[0];
    assert_eq!(diagnostic.message, "Tag jimmy invalid");
    assert_eq!(diagnostic.level, Level::Error);
    assert_eq!((diagnostic.line, diagnostic.column), (2, 3));
}

#[test]
fn test_misplaced_doctype_in_fragment() {
    let (events, errors) = fragment("<!DOCTYPE html><p>x</p>");
    assert!(!events.iter().any(|e| e.starts_with("doctype:")));
    assert_eq!(errors, vec!["Misplaced DOCTYPE declaration"]);
}

#[test]
fn test_only_script_and_style_are_raw_text() {
    let (events, _) = fragment("<iframe>a &amp; b</iframe><style>a &amp; b</style>");
    assert!(has(&events, "text:1>a & b"));
    assert!(has(&events, "text:2>a &amp; b"));
}

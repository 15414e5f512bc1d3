//! Query selector support (basic).
//!
//! Supports `tag`, `#id`, `.class`, `*`, compounds such as `li.item#first`
//! and descendant combinators written as whitespace.

use crate::node::Node;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn parse(text: &str) -> Option<Self> {
        let mut compound = Compound::default();
        let tag_end = text.find(['#', '.']).unwrap_or(text.len());
        let tag = &text[..tag_end];
        if !tag.is_empty() && tag != "*" {
            compound.tag = Some(tag.to_ascii_lowercase());
        }

        let mut rest = &text[tag_end..];
        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['#', '.']).unwrap_or(body.len());
            let value = &body[..end];
            if value.is_empty() {
                return None;
            }
            if marker == '#' {
                compound.id = Some(value.to_string());
            } else {
                compound.classes.push(value.to_string());
            }
            rest = &body[end..];
        }
        Some(compound)
    }

    fn matches(&self, node: &Node) -> bool {
        let Some(tag) = node.tag_name() else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|t| t != tag) {
            return false;
        }
        if let Some(id) = &self.id {
            if node.get_attribute("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|class| node.has_class(class))
    }
}

/// A parsed selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    steps: Vec<Compound>,
}

impl Selector {
    /// Parse a selector; `None` if it is empty or malformed.
    pub fn parse(selector: &str) -> Option<Self> {
        let steps = selector
            .split_whitespace()
            .map(Compound::parse)
            .collect::<Option<Vec<_>>>()?;
        if steps.is_empty() {
            return None;
        }
        Some(Self { steps })
    }

    /// Does `node` match? Descendant steps are checked against its ancestors.
    pub fn matches(&self, node: &Node) -> bool {
        let Some((last, ancestors)) = self.steps.split_last() else {
            return false;
        };
        if !last.matches(node) {
            return false;
        }

        let mut current = node.parent();
        for step in ancestors.iter().rev() {
            loop {
                let Some(candidate) = current.take() else {
                    return false;
                };
                current = candidate.parent();
                if step.matches(&candidate) {
                    break;
                }
            }
        }
        true
    }
}

//! Parse-tree anchor scanning.
//!
//! The fragment is parsed with `scraper`, external `a[target="_blank"]`
//! elements get a merged `rel` value, and the tree is serialized back.
//! Markup is normalized on the way out (quoted attributes, explicit closing
//! tags), so the content is only re-serialized when an anchor changes.
//!
//! The fragment is parsed in a `<body>` context. Content that does not
//! survive that (table cells, document-level tags, misnested markup) is
//! handed to the pattern scan instead of being re-serialized lossily.

use std::collections::HashMap;
use std::sync::LazyLock;

use ego_tree::{NodeId, NodeRef};
use regex::Regex;
use scraper::{Html, Selector, node::Node};

use super::{RelStrategy, merge_rel_value, pattern};
use crate::classifier::LinkClassifier;

/// Start tag names in the source markup.
static START_TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([a-zA-Z][a-zA-Z0-9-]*)").expect("start tag pattern is valid")
});

const BLANK_ANCHOR_SELECTOR: &str = r#"a[target="_blank"]"#;

/// HTML5 void elements that must not have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text children are emitted without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Rewrite every external `_blank` anchor in `content`.
///
/// Returns the re-serialized content and the number of anchors rewritten, or
/// `None` when nothing had to change.
pub(crate) fn protect_anchors(
    content: &str,
    classifier: &dyn LinkClassifier,
) -> Option<(String, usize)> {
    let Ok(selector) = Selector::parse(BLANK_ANCHOR_SELECTOR) else {
        tracing::warn!("Invalid CSS selector: {BLANK_ANCHOR_SELECTOR}");
        return None;
    };

    let document = Html::parse_fragment(content);
    let mut rel_values = HashMap::new();

    for element in document.select(&selector) {
        let anchor_html = element.html();
        if classifier.is_internal_link(&anchor_html) {
            tracing::trace!("Skipping internal link {anchor_html}");
            continue;
        }

        let merged = match element.value().attr("rel") {
            Some(existing) => merge_rel_value(existing),
            None => merge_rel_value(""),
        };
        if let Some(rel) = merged {
            tracing::trace!("Protecting external link {anchor_html}");
            rel_values.insert(element.id(), rel);
        }
    }

    if rel_values.is_empty() {
        return None;
    }

    if !preserves_elements(content, &document) {
        tracing::warn!("Fragment does not round-trip through the parser, using pattern scan");
        return pattern::protect_anchors(content, classifier, RelStrategy::Merge);
    }

    let mut out = String::with_capacity(content.len() + rel_values.len() * 32);
    // parse_fragment wraps the content in a synthetic <html> element
    for child in document.root_element().children() {
        serialize_node(child, &rel_values, &mut out);
    }
    Some((out, rel_values.len()))
}

/// Whether every start tag in `content` became an element of `document`,
/// with no elements dropped or synthesized by the parser.
fn preserves_elements(content: &str, document: &Html) -> bool {
    let mut counts: HashMap<String, isize> = HashMap::new();
    for caps in START_TAG_PATTERN.captures_iter(content) {
        *counts.entry(caps[1].to_ascii_lowercase()).or_default() += 1;
    }
    // skip the synthetic <html> root
    for node in document.root_element().descendants().skip(1) {
        if let Some(el) = node.value().as_element() {
            *counts.entry(el.name().to_ascii_lowercase()).or_default() -= 1;
        }
    }
    counts.values().all(|&count| count == 0)
}

fn serialize_node(node: NodeRef<Node>, rel_values: &HashMap<NodeId, String>, out: &mut String) {
    match node.value() {
        Node::Document | Node::Fragment => {
            for child in node.children() {
                serialize_node(child, rel_values, out);
            }
        }
        Node::Element(el) => {
            let tag = el.name();
            out.push('<');
            out.push_str(tag);

            let rel = rel_values.get(&node.id());
            if let Some(rel) = rel.filter(|_| el.attr("rel").is_none()) {
                push_attr(out, "rel", rel);
            }
            for (name, value) in el.attrs() {
                let value = match rel {
                    Some(rel) if name == "rel" => rel.as_str(),
                    _ => value,
                };
                push_attr(out, name, value);
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&tag) {
                return;
            }

            for child in node.children() {
                serialize_node(child, rel_values, out);
            }

            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        Node::Text(text) => {
            let raw = node
                .parent()
                .and_then(|parent| parent.value().as_element())
                .is_some_and(|parent| RAW_TEXT_ELEMENTS.contains(&parent.name()));
            if raw {
                out.push_str(text);
            } else {
                push_escaped(out, text, false);
            }
        }
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        _ => {}
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    push_escaped(out, value, true);
    out.push('"');
}

fn push_escaped(out: &mut String, text: &str, attr_mode: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attr_mode => out.push_str("&quot;"),
            '<' if !attr_mode => out.push_str("&lt;"),
            '>' if !attr_mode => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

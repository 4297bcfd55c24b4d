//! Regex-based anchor scanning and `rel` rewriting.
//!
//! Anchors are found textually and each distinct anchor is replaced
//! literally across the whole content. This relies on the rich-text editor
//! emitting well-formed, flat anchor markup.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{BLANK_TARGET, PROTECTION_ATTR, RelStrategy, merge_rel_value};
use crate::classifier::LinkClassifier;

/// An opening `<a ...>` tag up to the first closing `</a>`.
static ANCHOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\s[^>]*>.*?</a>").expect("anchor pattern is valid"));

/// One name or `name=value` pair of an opening tag. The name is group 1, the
/// value group 2 (double-quoted), 3 (single-quoted) or 4 (unquoted). Quoted
/// values are consumed whole, so text inside them is never read as a name.
static ATTR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("attribute pattern is valid")
});

/// Byte offset right after `<a`, where the protective attribute goes.
const INSERT_OFFSET: usize = 2;

/// Distinct anchor substrings of `content`, in order of first appearance.
pub(crate) fn distinct_anchors(content: &str) -> Vec<&str> {
    let mut seen = HashSet::new();
    ANCHOR_PATTERN
        .find_iter(content)
        .map(|m| m.as_str())
        .filter(|anchor| seen.insert(*anchor))
        .collect()
}

/// Rewrite every external `_blank` anchor in `content`.
///
/// Returns the new content and the number of distinct anchors rewritten, or
/// `None` when nothing had to change.
pub(crate) fn protect_anchors(
    content: &str,
    classifier: &dyn LinkClassifier,
    strategy: RelStrategy,
) -> Option<(String, usize)> {
    let mut anchors = distinct_anchors(content);
    // An opener missing its `</a>` swallows the next anchor. Rewriting the
    // enclosing match first keeps its literal intact for the replace.
    anchors.sort_by_key(|anchor| Reverse(anchor.len()));

    let mut result: Option<String> = None;
    let mut rewritten = 0;

    for anchor in anchors {
        if !anchor.contains(BLANK_TARGET) {
            continue;
        }
        if classifier.is_internal_link(anchor) {
            tracing::trace!("Skipping internal link {anchor}");
            continue;
        }
        let Some(protected) = rewrite_anchor(anchor, strategy) else {
            continue;
        };

        tracing::trace!("Protecting external link {anchor}");
        let current = result.as_deref().unwrap_or(content);
        result = Some(current.replace(anchor, &protected));
        rewritten += 1;
    }

    result.map(|content| (content, rewritten))
}

/// Produce the protected form of a single anchor, or `None` if its opening
/// tag already carries `noopener` and `noreferrer` or it cannot be rewritten.
pub(crate) fn rewrite_anchor(anchor: &str, strategy: RelStrategy) -> Option<String> {
    let tag_end = anchor.find('>').map_or(anchor.len(), |i| i + 1);
    let rel_attrs: Vec<Captures<'_>> = ATTR_PATTERN
        .captures_iter(&anchor[..tag_end])
        .filter(|caps| caps[1].eq_ignore_ascii_case("rel"))
        .collect();

    if rel_attrs
        .iter()
        .any(|caps| merge_rel_value(attr_value(caps)).is_none())
    {
        return None;
    }

    if strategy == RelStrategy::Merge {
        if let Some(caps) = rel_attrs.first() {
            return merge_rel(anchor, caps);
        }
    }

    insert_rel(anchor)
}

fn attr_value<'h>(caps: &Captures<'h>) -> &'h str {
    caps.get(2)
        .or_else(|| caps.get(3))
        .or_else(|| caps.get(4))
        .map_or("", |m| m.as_str())
}

fn insert_rel(anchor: &str) -> Option<String> {
    if anchor.len() < INSERT_OFFSET || !anchor.is_char_boundary(INSERT_OFFSET) {
        tracing::warn!("Anchor too short to protect, leaving as is: {anchor:?}");
        return None;
    }

    let (head, tail) = anchor.split_at(INSERT_OFFSET);
    Some(format!("{head} {PROTECTION_ATTR}{tail}"))
}

fn merge_rel(anchor: &str, caps: &Captures) -> Option<String> {
    let (span, open, close) = match (caps.get(2), caps.get(3), caps.get(4)) {
        (Some(m), _, _) | (_, Some(m), _) => (m.range(), "", ""),
        (_, _, Some(m)) => (m.range(), "\"", "\""),
        // bare `rel` without a value
        _ => {
            let end = caps.get(0)?.end();
            (end..end, "=\"", "\"")
        }
    };
    let merged = merge_rel_value(&anchor[span.clone()])?;

    let mut out = String::with_capacity(anchor.len() + 24);
    out.push_str(&anchor[..span.start]);
    out.push_str(open);
    out.push_str(&merged);
    out.push_str(close);
    out.push_str(&anchor[span.end..]);
    Some(out)
}

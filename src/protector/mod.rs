//! The [`LinkProtector`] save-pipeline step.
//!
//! Anchors that open in a new browsing context (`target="_blank"`) and lead
//! off-site get `rel="noopener noreferrer"`, so the opened page cannot reach
//! back through `window.opener` (reverse tabnabbing).
//!
//! Two scan modes are available:
//!
//! - [`AnchorScan::Pattern`] -- textual scan and literal replacement; the
//!   rest of the content is left byte-for-byte intact.
//! - [`AnchorScan::Tree`] -- parse the fragment and re-serialize it with the
//!   attribute merged in (requires the `dom` feature).

mod pattern;
#[cfg(feature = "dom")]
mod tree;

use serde::{Deserialize, Serialize};

use crate::classifier::LinkClassifier;
use crate::config::{LinkProtectorBuilder, ProtectionSettings};
use crate::error::Result;
use crate::pipeline::{ContentProcessor, SaveContentArgs};

/// Marker that an anchor opens in a new browsing context.
pub(crate) const BLANK_TARGET: &str = "_blank";

/// The attribute injected into external anchors.
pub const PROTECTION_ATTR: &str = r#"rel="noopener noreferrer""#;

const NOOPENER: &str = "noopener";
const NOREFERRER: &str = "noreferrer";

/// How to treat an anchor that already has a `rel` attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelStrategy {
    /// Add the missing `noopener`/`noreferrer` tokens to the existing value.
    #[default]
    Merge,
    /// Always insert a fresh `rel="noopener noreferrer"` after `<a`, even if
    /// that duplicates an existing `rel` attribute.
    Insert,
}

/// How anchors are located in the content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorScan {
    /// Regex scan with literal replacement.
    #[default]
    Pattern,
    /// HTML parse tree scan. `rel` values are always merged in this mode.
    #[cfg(feature = "dom")]
    Tree,
}

/// Adds `noopener` and `noreferrer` to a `rel` value.
///
/// A missing `noopener` is prepended; a missing `noreferrer` goes right after
/// `noopener`. Returns `None` when both are already present.
pub(crate) fn merge_rel_value(value: &str) -> Option<String> {
    fn has(tokens: &[&str], wanted: &str) -> bool {
        tokens.iter().any(|t| t.eq_ignore_ascii_case(wanted))
    }

    let mut tokens: Vec<&str> = value.split_whitespace().collect();
    if has(&tokens, NOOPENER) && has(&tokens, NOREFERRER) {
        return None;
    }
    if !has(&tokens, NOOPENER) {
        tokens.insert(0, NOOPENER);
    }
    if !has(&tokens, NOREFERRER) {
        let at = tokens
            .iter()
            .position(|t| t.eq_ignore_ascii_case(NOOPENER))
            .map_or(tokens.len(), |i| i + 1);
        tokens.insert(at, NOREFERRER);
    }
    Some(tokens.join(" "))
}

/// Save-pipeline step that protects external `_blank` links.
///
/// Build one with [`LinkProtector::builder`]. Processing never fails: an
/// anchor that cannot be rewritten is logged and left untouched.
///
/// # Example
///
/// ```
/// use link_protector::LinkProtector;
///
/// let protector = LinkProtector::builder()
///     .server_url("http://mysite.com")
///     .build()
///     .unwrap();
///
/// let html = r#"<a href="http://example.com" target="_blank">x</a>"#;
/// assert_eq!(
///     protector.protect(html),
///     r#"<a rel="noopener noreferrer" href="http://example.com" target="_blank">x</a>"#
/// );
/// ```
pub struct LinkProtector {
    enabled: bool,
    rel_strategy: RelStrategy,
    scan: AnchorScan,
    classifier: Box<dyn LinkClassifier>,
}

impl LinkProtector {
    pub(crate) fn new(
        enabled: bool,
        rel_strategy: RelStrategy,
        scan: AnchorScan,
        classifier: Box<dyn LinkClassifier>,
    ) -> Self {
        Self {
            enabled,
            rel_strategy,
            scan,
            classifier,
        }
    }

    /// Start configuring a protector with default settings.
    pub fn builder() -> LinkProtectorBuilder {
        LinkProtectorBuilder::new()
    }

    /// Whether external link protection is switched on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn rel_strategy(&self) -> RelStrategy {
        self.rel_strategy
    }

    pub fn scan(&self) -> AnchorScan {
        self.scan
    }

    /// Return a protected copy of `content`.
    pub fn protect(&self, content: &str) -> String {
        let mut content = content.to_string();
        self.protect_in_place(&mut content);
        content
    }

    /// Protect `content` in place, returning the number of distinct anchors
    /// that were rewritten.
    pub fn protect_in_place(&self, content: &mut String) -> usize {
        if content.is_empty() || !self.enabled {
            return 0;
        }

        let outcome = match self.scan {
            AnchorScan::Pattern => {
                pattern::protect_anchors(content, self.classifier.as_ref(), self.rel_strategy)
            }
            #[cfg(feature = "dom")]
            AnchorScan::Tree => tree::protect_anchors(content, self.classifier.as_ref()),
        };

        match outcome {
            Some((protected, count)) => {
                *content = protected;
                tracing::debug!("Protected {count} external links");
                count
            }
            None => 0,
        }
    }
}

impl ContentProcessor for LinkProtector {
    fn process(&self, args: &mut SaveContentArgs) {
        if args.is_aborted() {
            return;
        }
        self.protect_in_place(args.content_mut());
    }
}

/// One-shot protection of `content` with explicit settings and server URL.
///
/// Fails only if `settings` are invalid.
///
/// ```
/// use link_protector::{ProtectionSettings, protect_external_links};
///
/// let settings = ProtectionSettings::default();
/// let out = protect_external_links(
///     r#"<a href="http://mysite.com/page" target="_blank">x</a>"#,
///     &settings,
///     "http://mysite.com",
/// )
/// .unwrap();
/// assert!(!out.contains("noopener"));
/// ```
pub fn protect_external_links(
    content: &str,
    settings: &ProtectionSettings,
    server_url: &str,
) -> Result<String> {
    let protector = LinkProtector::builder()
        .settings(settings.clone())
        .server_url(server_url)
        .build()?;
    Ok(protector.protect(content))
}

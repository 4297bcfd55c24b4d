//! Internal/external classification of anchor tags.
//!
//! A link is internal when its `href` points into the site itself: a media
//! library path, an internal item link, a site-relative path, or an absolute
//! URL on the current server. Everything else is external and gets protected.

use std::sync::LazyLock;

use regex::Regex;

/// Captures a double-quote terminated `href` value made of ASCII word and
/// URL punctuation characters. Values with anything else (`#`, `%`, spaces,
/// non-ASCII letters) do not match and are treated as an empty href.
static HREF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href *= *["']([0-9A-Za-z_:/.~\-?&=;]+)""#).expect("href pattern is valid")
});

/// Href prefixes that always denote a link into the current site.
const SITE_RELATIVE_PREFIXES: [char; 3] = ['/', '~', '-'];

/// Decides whether an anchor tag links inside the current site.
///
/// Implement this to replace the built-in [`SiteLinkClassifier`] entirely,
/// e.g. to consult a routing table.
pub trait LinkClassifier: Send + Sync {
    /// Returns `true` if the anchor (its full HTML text) is an internal link.
    fn is_internal_link(&self, anchor_html: &str) -> bool;
}

/// Source of the media library URL prefixes.
pub trait MediaPrefixSource: Send + Sync {
    /// The prefixes, in configuration order.
    fn media_prefixes(&self) -> &[String];
}

impl MediaPrefixSource for Vec<String> {
    fn media_prefixes(&self) -> &[String] {
        self
    }
}

/// Resolves the canonical URL of the current site.
///
/// Called once per classified anchor. An empty string means the URL is not
/// known, which disables the same-server check.
///
/// Any `Fn() -> String` closure is a resolver:
///
/// ```
/// use link_protector::ServerUrlResolver;
///
/// let resolver = || "https://www.example.org".to_string();
/// assert_eq!(resolver.server_url(), "https://www.example.org");
/// ```
pub trait ServerUrlResolver: Send + Sync {
    /// The current server URL, or an empty string.
    fn server_url(&self) -> String;
}

impl<F> ServerUrlResolver for F
where
    F: Fn() -> String + Send + Sync,
{
    fn server_url(&self) -> String {
        self()
    }
}

/// A server URL fixed at construction time.
#[derive(Clone, Debug, Default)]
pub struct StaticServerUrl(String);

impl StaticServerUrl {
    /// Create a new `StaticServerUrl`; an empty `url` disables the
    /// same-server check.
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }
}

impl ServerUrlResolver for StaticServerUrl {
    fn server_url(&self) -> String {
        self.0.clone()
    }
}

/// The default [`LinkClassifier`], driven by media prefixes, the internal
/// link marker and the current server URL.
///
/// # Example
///
/// ```
/// use link_protector::{LinkClassifier, SiteLinkClassifier, StaticServerUrl};
///
/// let classifier = SiteLinkClassifier::new(
///     vec!["-/media/".to_string()],
///     "~/link.aspx?",
///     StaticServerUrl::new("https://www.example.org"),
/// );
/// assert!(classifier.is_internal_link(r#"<a href="-/media/logo.png" target="_blank">"#));
/// assert!(!classifier.is_internal_link(r#"<a href="https://evil.test/" target="_blank">"#));
/// ```
pub struct SiteLinkClassifier {
    media_prefixes: Box<dyn MediaPrefixSource>,
    internal_link_prefix: String,
    server_url: Box<dyn ServerUrlResolver>,
}

impl SiteLinkClassifier {
    /// Create a new `SiteLinkClassifier` from its media prefixes, internal
    /// link prefix and server URL source.
    pub fn new(
        media_prefixes: impl MediaPrefixSource + 'static,
        internal_link_prefix: impl Into<String>,
        server_url: impl ServerUrlResolver + 'static,
    ) -> Self {
        Self::from_boxed(
            Box::new(media_prefixes),
            internal_link_prefix.into(),
            Box::new(server_url),
        )
    }

    pub(crate) fn from_boxed(
        media_prefixes: Box<dyn MediaPrefixSource>,
        internal_link_prefix: String,
        server_url: Box<dyn ServerUrlResolver>,
    ) -> Self {
        Self {
            media_prefixes,
            internal_link_prefix,
            server_url,
        }
    }

    /// Extract the `href` value from an anchor tag, or `""` if none can be
    /// recognised.
    pub fn extract_href(anchor_html: &str) -> &str {
        HREF_PATTERN
            .captures(anchor_html)
            .and_then(|caps| caps.get(1))
            .map_or("", |m| m.as_str())
    }

    /// Prefix-based part of the classification, applied to a bare href.
    pub fn is_internal_href(&self, href: &str) -> bool {
        self.media_prefixes
            .media_prefixes()
            .iter()
            .any(|prefix| href.starts_with(prefix.as_str()))
            || href.starts_with(self.internal_link_prefix.as_str())
            || href.starts_with(SITE_RELATIVE_PREFIXES)
    }
}

impl LinkClassifier for SiteLinkClassifier {
    fn is_internal_link(&self, anchor_html: &str) -> bool {
        let href = Self::extract_href(anchor_html);
        if self.is_internal_href(href) {
            return true;
        }

        let server_url = self.server_url.server_url();
        !server_url.is_empty() && anchor_html.contains(&server_url)
    }
}

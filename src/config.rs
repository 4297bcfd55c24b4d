//! Settings and builder for [`LinkProtector`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classifier::{
    LinkClassifier, MediaPrefixSource, ServerUrlResolver, SiteLinkClassifier, StaticServerUrl,
};
use crate::error::{LinkProtectorError, Result};
use crate::protector::{AnchorScan, LinkProtector, RelStrategy};

/// Default marker of internal item links produced by the editor.
pub const DEFAULT_INTERNAL_LINK_PREFIX: &str = "~/link.aspx?";

/// Protection settings as found in the host's configuration file.
///
/// Every field is optional in the TOML document:
///
/// ```toml
/// protect_external_links_with_blank_target = true
/// media_prefixes = ["-/media/", "~/media/"]
/// internal_link_prefix = "~/link.aspx?"
/// rel_strategy = "merge"   # or "insert"
/// scan = "pattern"         # or "tree"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionSettings {
    /// Master switch for external link protection.
    pub protect_external_links_with_blank_target: bool,
    /// Media library URL prefixes; links starting with any of them are internal.
    pub media_prefixes: Vec<String>,
    /// Prefix of internal item links.
    pub internal_link_prefix: String,
    pub rel_strategy: RelStrategy,
    pub scan: AnchorScan,
}

impl Default for ProtectionSettings {
    fn default() -> Self {
        Self {
            protect_external_links_with_blank_target: true,
            media_prefixes: vec!["-/media/".to_string(), "~/media/".to_string()],
            internal_link_prefix: DEFAULT_INTERNAL_LINK_PREFIX.to_string(),
            rel_strategy: RelStrategy::default(),
            scan: AnchorScan::default(),
        }
    }
}

impl ProtectionSettings {
    /// Parse settings from a TOML document.
    pub fn from_toml_str(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }

    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&data)?;
        tracing::debug!("Loaded link protection settings from {}", path.display());
        Ok(settings)
    }
}

/// Builder for configuring a [`LinkProtector`].
///
/// Starts from [`ProtectionSettings::default`] with an empty server URL.
/// Setting a custom [`classifier`](Self::classifier) replaces the built-in
/// [`SiteLinkClassifier`], and the media prefix, internal link prefix and
/// server URL settings are then ignored.
///
/// # Example
///
/// ```
/// use link_protector::{LinkProtector, RelStrategy};
///
/// let protector = LinkProtector::builder()
///     .media_prefixes(["/assets/"])
///     .internal_link_prefix("-/link")
///     .server_url_resolver(|| "https://www.example.org".to_string())
///     .rel_strategy(RelStrategy::Insert)
///     .build()
///     .unwrap();
/// assert!(protector.is_enabled());
/// ```
pub struct LinkProtectorBuilder {
    enabled: bool,
    media_prefixes: Box<dyn MediaPrefixSource>,
    internal_link_prefix: String,
    server_url: Box<dyn ServerUrlResolver>,
    classifier: Option<Box<dyn LinkClassifier>>,
    rel_strategy: RelStrategy,
    scan: AnchorScan,
}

impl LinkProtectorBuilder {
    /// Create a new builder with [`ProtectionSettings::default`] and an empty
    /// server URL.
    pub fn new() -> Self {
        Self::from_settings(ProtectionSettings::default())
    }

    fn from_settings(settings: ProtectionSettings) -> Self {
        Self {
            enabled: settings.protect_external_links_with_blank_target,
            media_prefixes: Box::new(settings.media_prefixes),
            internal_link_prefix: settings.internal_link_prefix,
            server_url: Box::new(StaticServerUrl::default()),
            classifier: None,
            rel_strategy: settings.rel_strategy,
            scan: settings.scan,
        }
    }

    /// Apply every field of `settings`, keeping the server URL and any custom
    /// classifier already set.
    pub fn settings(self, settings: ProtectionSettings) -> Self {
        Self {
            server_url: self.server_url,
            classifier: self.classifier,
            ..Self::from_settings(settings)
        }
    }

    /// Switch external link protection on or off.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Fixed list of media library prefixes.
    pub fn media_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        self.media_prefixes = Box::new(prefixes);
        self
    }

    /// Pluggable source of media library prefixes.
    pub fn media_prefix_source(mut self, source: impl MediaPrefixSource + 'static) -> Self {
        self.media_prefixes = Box::new(source);
        self
    }

    pub fn internal_link_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.internal_link_prefix = prefix.into();
        self
    }

    /// Fixed server URL. An empty string disables the same-server check.
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Box::new(StaticServerUrl::new(url));
        self
    }

    /// Server URL resolved on every classification.
    pub fn server_url_resolver(mut self, resolver: impl ServerUrlResolver + 'static) -> Self {
        self.server_url = Box::new(resolver);
        self
    }

    /// Replace the built-in classifier.
    pub fn classifier(mut self, classifier: impl LinkClassifier + 'static) -> Self {
        self.classifier = Some(Box::new(classifier));
        self
    }

    pub fn rel_strategy(mut self, strategy: RelStrategy) -> Self {
        self.rel_strategy = strategy;
        self
    }

    pub fn scan(mut self, scan: AnchorScan) -> Self {
        self.scan = scan;
        self
    }

    /// Validate the configuration and build the [`LinkProtector`].
    ///
    /// Empty media prefixes and an empty internal link prefix are rejected:
    /// every href starts with the empty string, so they would mark all links
    /// as internal.
    pub fn build(self) -> Result<LinkProtector> {
        let classifier = match self.classifier {
            Some(classifier) => classifier,
            None => {
                if self.internal_link_prefix.is_empty() {
                    return Err(LinkProtectorError::Config(
                        "internal link prefix must not be empty".into(),
                    ));
                }
                if let Some(index) = self
                    .media_prefixes
                    .media_prefixes()
                    .iter()
                    .position(|prefix| prefix.is_empty())
                {
                    return Err(LinkProtectorError::Config(format!(
                        "media prefix at index {index} is empty"
                    )));
                }
                Box::new(SiteLinkClassifier::from_boxed(
                    self.media_prefixes,
                    self.internal_link_prefix,
                    self.server_url,
                ))
            }
        };

        Ok(LinkProtector::new(
            self.enabled,
            self.rel_strategy,
            self.scan,
            classifier,
        ))
    }
}

impl Default for LinkProtectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

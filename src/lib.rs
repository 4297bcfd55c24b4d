//! # link_protector
//!
//! A rich-text save pipeline step that protects external links opening in a
//! new browsing context against reverse tabnabbing.
//!
//! ## Overview
//!
//! [`LinkProtector`] scans saved HTML for `<a>` tags containing `_blank`,
//! classifies each one as internal or external with a [`LinkClassifier`],
//! and adds `rel="noopener noreferrer"` to the external ones. Internal links
//! are those whose `href` starts with a media library prefix, the internal
//! link marker, `/`, `~` or `-`, or that mention the current server URL.
//! Anything the classifier cannot recognise is treated as external.
//!
//! The protector is a [`ContentProcessor`] and can be dropped into a
//! [`SavePipeline`] next to other save steps.
//!
//! ## Quick start
//!
//! ```rust
//! use link_protector::{LinkProtector, SavePipeline};
//!
//! let protector = LinkProtector::builder()
//!     .media_prefixes(["-/media/", "~/media/"])
//!     .internal_link_prefix("-/link")
//!     .server_url("http://mysite.com")
//!     .build()
//!     .unwrap();
//!
//! let mut pipeline = SavePipeline::new();
//! pipeline.add(protector);
//!
//! let saved = pipeline.process_content(
//!     r#"<p><a href="http://example.com" target="_blank">x</a></p>"#,
//! );
//! assert_eq!(
//!     saved,
//!     r#"<p><a rel="noopener noreferrer" href="http://example.com" target="_blank">x</a></p>"#,
//! );
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `dom` | **yes** | Enables [`AnchorScan::Tree`], a `scraper` based scan mode. |

pub mod classifier;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod protector;

pub use classifier::{
    LinkClassifier, MediaPrefixSource, ServerUrlResolver, SiteLinkClassifier, StaticServerUrl,
};
pub use config::{DEFAULT_INTERNAL_LINK_PREFIX, LinkProtectorBuilder, ProtectionSettings};
pub use error::{LinkProtectorError, Result};
pub use pipeline::{ContentProcessor, SaveContentArgs, SavePipeline};
pub use protector::{
    AnchorScan, LinkProtector, PROTECTION_ATTR, RelStrategy, protect_external_links,
};

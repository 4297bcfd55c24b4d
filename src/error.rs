//! Error types for the `link_protector` crate.

/// Errors raised while configuring a [`LinkProtector`](crate::LinkProtector).
///
/// Processing content never fails; anchors that cannot be rewritten are
/// skipped and logged instead.
#[derive(Debug, thiserror::Error)]
pub enum LinkProtectorError {
    /// The builder configuration is invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// A settings document could not be parsed.
    #[error("Settings parse failed: {0}")]
    Settings(#[from] toml::de::Error),

    /// A settings file could not be read.
    #[error("Settings read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A type alias for `Result<T, LinkProtectorError>`.
pub type Result<T> = std::result::Result<T, LinkProtectorError>;

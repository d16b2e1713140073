use htcollector::ProcessorError;
use thiserror::Error;

/// Errors building the processor from its configuration.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// A condition pattern failed to compile.
    #[error("invalid condition regex {pattern:?} for key {key:?}: {source}")]
    InvalidRegex {
        /// Attribute key of the rule.
        key: String,
        /// The offending pattern.
        pattern: String,
        /// Compilation failure.
        #[source]
        source: regex::Error,
    },

    /// A `jwt` encoded cookie rule without a cookie name.
    #[error("rule for key {0:?} decodes a jwt cookie but names no cookie")]
    MissingCookieName(String),
}

impl From<ConfigError> for ProcessorError {
    fn from(err: ConfigError) -> Self {
        ProcessorError::InvalidConfig(err.to_string())
    }
}

/// Errors decoding a credential.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TokenError {
    /// The token does not have the `header.payload[.signature]` shape.
    #[error("malformed jwt: expected 3 segments, found {0}")]
    Segments(usize),

    /// A segment is not valid base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The payload is not a JSON object.
    #[error("invalid claims: {0}")]
    Claims(#[from] serde_json::Error),

    /// The decoded credentials are not UTF-8.
    #[error("credentials are not utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Basic credentials without a `user:password` separator.
    #[error("basic credentials without ':' separator")]
    Basic,
}

use htcollector::ProcessorError;
use thiserror::Error;

/// Errors returned by a content filter for a single attribute.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FilterError {
    /// The value could not be parsed in the filter's format. The attribute is
    /// left untouched.
    #[error("unprocessable value: {0}")]
    UnprocessableValue(String),

    /// The filter failed for a reason unrelated to the input.
    #[error("{0}")]
    Internal(String),
}

/// Errors building the processor from its configuration.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// A key or value pattern failed to compile.
    #[error("invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        /// The offending pattern.
        pattern: String,
        /// Compilation failure.
        #[source]
        source: regex::Error,
    },

    /// A complex data entry names neither a type nor a type key.
    #[error("complex data entry for key {0:?} needs a type or a type_key")]
    UntypedComplexData(String),
}

impl From<ConfigError> for ProcessorError {
    fn from(err: ConfigError) -> Self {
        ProcessorError::InvalidConfig(err.to_string())
    }
}

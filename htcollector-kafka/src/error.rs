use std::fmt;
use thiserror::Error;

/// Errors building the exporter from its configuration. Permanent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// No marshaler exists for the encoding.
    #[error("unrecognized encoding {0:?}")]
    UnrecognizedEncoding(String),

    /// The protocol version could not be parsed.
    #[error("invalid Kafka protocol version {0:?}")]
    InvalidVersion(String),

    /// `max_message_bytes` is zero.
    #[error("max_message_bytes must be positive")]
    InvalidMaxMessageBytes,
}

/// A span that could not be turned into a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MarshalError {
    /// Trace id is not 16 bytes long.
    #[error("span {span_id} has an invalid trace id of {len} bytes")]
    InvalidTraceId {
        /// Hex encoded span id.
        span_id: String,
        /// Length of the trace id.
        len: usize,
    },

    /// Span id is not 8 bytes long.
    #[error("span of trace {trace_id} has an invalid span id of {len} bytes")]
    InvalidSpanId {
        /// Hex encoded trace id.
        trace_id: String,
        /// Length of the span id.
        len: usize,
    },
}

/// Every span of a batch that could not be marshaled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarshalErrors(pub Vec<MarshalError>);

impl MarshalErrors {
    /// Whether no span failed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MarshalErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to marshal {} spans", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            write!(f, "{}{err}", if i == 0 { ": " } else { "; " })?;
        }
        Ok(())
    }
}

impl std::error::Error for MarshalErrors {}

/// Producer failures aggregated for the host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to deliver {count} messages due to {first}")]
pub struct KafkaErrors {
    /// Number of messages that were not delivered.
    pub count: usize,
    /// Error of the first undelivered message.
    pub first: String,
}

/// Errors returned by [`KafkaTracesExporter::export`](crate::KafkaTracesExporter::export).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExportError {
    /// Some spans could not be marshaled. The others were delivered.
    #[error(transparent)]
    Marshal(#[from] MarshalErrors),

    /// The producer failed to deliver messages.
    #[error(transparent)]
    Kafka(#[from] KafkaErrors),

    /// The exporter was already shut down.
    #[error("exporter already shut down")]
    AlreadyShutdown,
}

impl ExportError {
    /// Whether retrying the batch can never succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(self, ExportError::Marshal(_) | ExportError::AlreadyShutdown)
    }
}

impl From<ExportError> for htcollector::ProcessorError {
    fn from(err: ExportError) -> Self {
        htcollector::ProcessorError::Other(err.to_string())
    }
}

impl From<ConfigError> for htcollector::ProcessorError {
    fn from(err: ConfigError) -> Self {
        htcollector::ProcessorError::InvalidConfig(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kafka_errors_message() {
        let err = ExportError::from(KafkaErrors {
            count: 3,
            first: "kafka: broker not available".into(),
        });
        assert_eq!(
            err.to_string(),
            "Failed to deliver 3 messages due to kafka: broker not available"
        );
        assert!(!err.is_permanent());
    }

    #[test]
    fn marshal_errors_list_every_span() {
        let err = ExportError::from(MarshalErrors(vec![
            MarshalError::InvalidTraceId {
                span_id: "01".into(),
                len: 3,
            },
            MarshalError::InvalidSpanId {
                trace_id: "02".into(),
                len: 0,
            },
        ]));
        assert_eq!(
            err.to_string(),
            "failed to marshal 2 spans: span 01 has an invalid trace id of 3 bytes; \
             span of trace 02 has an invalid span id of 0 bytes"
        );
        assert!(err.is_permanent());
    }
}

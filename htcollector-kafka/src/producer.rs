use crate::error::KafkaErrors;
use crate::message::ProducerMessage;
use async_trait::async_trait;
use std::fmt::{self, Debug};

/// A message the producer failed to deliver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProducerError {
    /// The undelivered message.
    pub message: ProducerMessage,
    /// Why delivery failed.
    pub error: String,
}

impl fmt::Display for ProducerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.error)
    }
}

impl std::error::Error for ProducerError {}

/// Every message of a send that was not delivered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProducerErrors(pub Vec<ProducerError>);

impl fmt::Display for ProducerErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to deliver {} messages", self.0.len())
    }
}

impl std::error::Error for ProducerErrors {}

impl From<ProducerErrors> for KafkaErrors {
    fn from(errors: ProducerErrors) -> Self {
        KafkaErrors {
            count: errors.0.len(),
            first: errors
                .0
                .first()
                .map(|err| err.error.clone())
                .unwrap_or_else(|| "unknown producer error".to_string()),
        }
    }
}

/// Kafka producer that reports the delivery outcome of every message.
///
/// Connection management, batching, retries and compression belong to the
/// implementation.
#[async_trait]
pub trait KafkaProducer: Send + Sync + Debug {
    /// Delivers `messages`, returning the ones that could not be delivered.
    async fn send_messages(&self, messages: Vec<ProducerMessage>) -> Result<(), ProducerErrors>;

    /// Flushes pending messages and releases the connection.
    async fn close(&self) -> Result<(), ProducerErrors>;
}

use crate::config::Config;
use crate::error::{ConfigError, ExportError, KafkaErrors};
use crate::marshaler::{marshaler_for, TracesMarshaler};
use crate::producer::KafkaProducer;
use htcollector::proto::trace::TracesData;
use opentelemetry::{otel_debug, otel_info};
use std::sync::atomic::{AtomicBool, Ordering};

/// Exports trace batches to a Kafka topic.
#[derive(Debug)]
pub struct KafkaTracesExporter {
    topic: String,
    marshaler: Box<dyn TracesMarshaler>,
    producer: Box<dyn KafkaProducer>,
    is_shutdown: AtomicBool,
}

impl KafkaTracesExporter {
    /// Creates an exporter producing through `producer`. Fails on an
    /// unrecognized encoding or protocol version.
    pub fn new<P>(config: &Config, producer: P) -> Result<Self, ConfigError>
    where
        P: KafkaProducer + 'static,
    {
        let marshaler = marshaler_for(config)?;
        otel_info!(
            name: "KafkaExporter.Created",
            topic = config.topic.as_str(),
            encoding = marshaler.encoding(),
            protocol_version = config.protocol_version.as_str(),
            span_curing = config.span_curing.enabled
        );
        Ok(KafkaTracesExporter {
            topic: config.topic.clone(),
            marshaler,
            producer: Box::new(producer),
            is_shutdown: AtomicBool::new(false),
        })
    }

    /// The encoding of the produced messages.
    pub fn encoding(&self) -> &'static str {
        self.marshaler.encoding()
    }

    /// Marshals and produces `traces`.
    ///
    /// Spans that cannot be marshaled are reported as a permanent
    /// [`ExportError::Marshal`] after the other spans were produced. Producer
    /// failures take precedence and are reported as [`ExportError::Kafka`].
    pub async fn export(&self, traces: &TracesData) -> Result<(), ExportError> {
        if self.is_shutdown.load(Ordering::Relaxed) {
            return Err(ExportError::AlreadyShutdown);
        }
        let marshaled = self.marshaler.marshal(traces, &self.topic);
        if !marshaled.messages.is_empty() {
            let count = marshaled.messages.len();
            self.producer
                .send_messages(marshaled.messages)
                .await
                .map_err(KafkaErrors::from)?;
            otel_debug!(name: "KafkaExporter.Sent", topic = self.topic.as_str(), messages = count as u64);
        }
        if marshaled.errors.is_empty() {
            Ok(())
        } else {
            Err(ExportError::Marshal(marshaled.errors))
        }
    }

    /// Closes the producer. Later exports fail.
    pub async fn shutdown(&self) -> Result<(), ExportError> {
        if self.is_shutdown.swap(true, Ordering::Relaxed) {
            return Err(ExportError::AlreadyShutdown);
        }
        self.producer.close().await.map_err(KafkaErrors::from)?;
        Ok(())
    }
}

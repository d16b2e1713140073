//! Conversion of trace batches into Kafka messages.
use crate::config::{Config, JAEGER_PROTO_ENCODING, OTLP_PROTO_ENCODING};
use crate::curer::SpanCurer;
use crate::error::{ConfigError, MarshalErrors};
use crate::jaeger::{self, trace_id_string};
use crate::message::ProducerMessage;
use crate::version::KafkaVersion;
use htcollector::proto::trace::TracesData;
use opentelemetry::otel_warn;
use prost::Message;
use std::fmt::Debug;

/// Messages produced from a batch, and the spans that could not be turned
/// into messages.
#[derive(Debug, Default)]
pub struct MarshaledTraces {
    /// Messages to produce, in batch order.
    pub messages: Vec<ProducerMessage>,
    /// Spans left out of `messages`.
    pub errors: MarshalErrors,
}

/// Turns trace batches into Kafka messages.
pub trait TracesMarshaler: Send + Sync + Debug {
    /// Marshals `traces` into messages for `topic`. A span that cannot be
    /// marshaled does not prevent the others from being marshaled.
    fn marshal(&self, traces: &TracesData, topic: &str) -> MarshaledTraces;

    /// Name of the encoding, as used in configuration.
    fn encoding(&self) -> &'static str;
}

/// Picks the marshaler for the configured encoding. Span curing replaces the
/// plain Jaeger marshaler when enabled.
pub fn marshaler_for(config: &Config) -> Result<Box<dyn TracesMarshaler>, ConfigError> {
    let version: KafkaVersion = config.protocol_version.parse()?;
    match config.encoding.as_str() {
        OTLP_PROTO_ENCODING => Ok(Box::new(OtlpProtoMarshaler)),
        JAEGER_PROTO_ENCODING if config.span_curing.enabled => {
            if config.producer.max_message_bytes == 0 {
                return Err(ConfigError::InvalidMaxMessageBytes);
            }
            Ok(Box::new(CuringJaegerMarshaler::new(SpanCurer::new(
                config.span_curing.clone(),
                config.producer.max_message_bytes,
                version,
            ))))
        }
        JAEGER_PROTO_ENCODING => Ok(Box::new(JaegerProtoMarshaler)),
        other => Err(ConfigError::UnrecognizedEncoding(other.to_string())),
    }
}

/// Produces the whole batch as a single OTLP `TracesData` message.
#[derive(Debug, Default, Clone, Copy)]
pub struct OtlpProtoMarshaler;

impl TracesMarshaler for OtlpProtoMarshaler {
    fn marshal(&self, traces: &TracesData, topic: &str) -> MarshaledTraces {
        if traces.resource_spans.is_empty() {
            return MarshaledTraces::default();
        }
        MarshaledTraces {
            messages: vec![ProducerMessage {
                topic: topic.to_string(),
                key: None,
                value: traces.encode_to_vec(),
                headers: Vec::new(),
            }],
            errors: MarshalErrors::default(),
        }
    }

    fn encoding(&self) -> &'static str {
        OTLP_PROTO_ENCODING
    }
}

/// Produces one Jaeger `Span` message per span, keyed by trace id.
#[derive(Debug, Default, Clone, Copy)]
pub struct JaegerProtoMarshaler;

fn jaeger_message(span: &jaeger::Span, key: &[u8], topic: &str) -> ProducerMessage {
    ProducerMessage {
        topic: topic.to_string(),
        key: Some(key.to_vec()),
        value: span.encode_to_vec(),
        headers: Vec::new(),
    }
}

impl TracesMarshaler for JaegerProtoMarshaler {
    fn marshal(&self, traces: &TracesData, topic: &str) -> MarshaledTraces {
        let translated = jaeger::translate(traces);
        let messages = translated
            .spans
            .iter()
            .map(|span| jaeger_message(span, trace_id_string(&span.trace_id).as_bytes(), topic))
            .collect();
        MarshaledTraces {
            messages,
            errors: MarshalErrors(translated.errors),
        }
    }

    fn encoding(&self) -> &'static str {
        JAEGER_PROTO_ENCODING
    }
}

/// [`JaegerProtoMarshaler`] that cures spans too large for the brokers.
///
/// Spans that cannot be cured are dropped when `drop_spans` is set and
/// forwarded unchanged otherwise, in which case the producer rejects them.
#[derive(Debug, Clone)]
pub struct CuringJaegerMarshaler {
    curer: SpanCurer,
}

impl CuringJaegerMarshaler {
    /// Wraps the Jaeger marshaler with `curer`.
    pub fn new(curer: SpanCurer) -> Self {
        CuringJaegerMarshaler { curer }
    }
}

impl TracesMarshaler for CuringJaegerMarshaler {
    fn marshal(&self, traces: &TracesData, topic: &str) -> MarshaledTraces {
        let translated = jaeger::translate(traces);
        let mut messages = Vec::with_capacity(translated.spans.len());
        for mut span in translated.spans {
            let key = trace_id_string(&span.trace_id).into_bytes();
            let message = jaeger_message(&span, &key, topic);
            if self.curer.fits(&message) {
                messages.push(message);
                continue;
            }

            self.curer.log_oversized(&span, &message);
            match self.curer.cure_span(&mut span, &key, topic) {
                Some(cured) => messages.push(cured),
                None if self.curer.drops_spans() => {
                    otel_warn!(
                        name: "KafkaExporter.OversizedSpanDropped",
                        trace_id = trace_id_string(&span.trace_id),
                        span_id = const_hex::encode(&span.span_id)
                    );
                }
                None => {
                    otel_warn!(
                        name: "KafkaExporter.OversizedSpanForwarded",
                        trace_id = trace_id_string(&span.trace_id),
                        span_id = const_hex::encode(&span.span_id)
                    );
                    messages.push(message);
                }
            }
        }
        MarshaledTraces {
            messages,
            errors: MarshalErrors(translated.errors),
        }
    }

    fn encoding(&self) -> &'static str {
        JAEGER_PROTO_ENCODING
    }
}

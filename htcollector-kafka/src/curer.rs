//! Shrinking of spans whose message exceeds the broker limit.
use crate::config::SpanCuringConfig;
use crate::jaeger::{trace_id_string, KeyValue, Span, ValueType};
use crate::message::ProducerMessage;
use crate::version::KafkaVersion;
use opentelemetry::{otel_info, otel_warn};
use prost::Message;

/// Suffix of the boolean tag marking a truncated tag.
pub const TRUNCATED_SUFFIX: &str = ".htcollector.truncated";

const MAX_CURE_ATTEMPTS: usize = 5;

/// Truncates the largest string and binary tags of oversized spans until
/// their message fits `max_message_bytes`.
#[derive(Debug, Clone)]
pub struct SpanCurer {
    config: SpanCuringConfig,
    max_message_bytes: usize,
    version: KafkaVersion,
}

impl SpanCurer {
    /// Creates a curer for messages produced to brokers of `version`.
    pub fn new(config: SpanCuringConfig, max_message_bytes: usize, version: KafkaVersion) -> Self {
        SpanCurer {
            config,
            max_message_bytes,
            version,
        }
    }

    /// Whether uncurable spans are dropped.
    pub fn drops_spans(&self) -> bool {
        self.config.drop_spans
    }

    /// Size of `message` as accounted by the producer for the configured
    /// protocol version.
    pub fn message_bytes(&self, message: &ProducerMessage) -> usize {
        message.byte_size(self.version)
    }

    /// Whether `message` is within the broker limit.
    pub fn fits(&self, message: &ProducerMessage) -> bool {
        self.message_bytes(message) <= self.max_message_bytes
    }

    /// Shrinks `span` in place and returns its message once it fits.
    ///
    /// Every attempt truncates the string and binary tags longer than the
    /// current cap to the cap, marks each of them with a
    /// `<key>.htcollector.truncated` tag and re-encodes the span. The cap
    /// starts at `max_attribute_value_size_bytes` and is halved after every
    /// failed attempt. Returns `None` after five failed attempts.
    pub fn cure_span(&self, span: &mut Span, key: &[u8], topic: &str) -> Option<ProducerMessage> {
        let mut cap = self.config.max_attribute_value_size_bytes;
        for attempt in 1..=MAX_CURE_ATTEMPTS {
            let truncated = truncate_tags(&mut span.tags, cap);
            for tag_key in truncated {
                let marker = format!("{tag_key}{TRUNCATED_SUFFIX}");
                if !span.tags.iter().any(|tag| tag.key == marker) {
                    span.tags.push(KeyValue::bool(marker, true));
                }
            }

            let message = ProducerMessage {
                topic: topic.to_string(),
                key: Some(key.to_vec()),
                value: span.encode_to_vec(),
                headers: Vec::new(),
            };
            if self.fits(&message) {
                otel_info!(
                    name: "KafkaExporter.SpanCured",
                    trace_id = trace_id_string(&span.trace_id),
                    span_id = const_hex::encode(&span.span_id),
                    attempts = attempt as u64,
                    attribute_value_size = cap as u64,
                    message_bytes = self.message_bytes(&message) as u64
                );
                return Some(message);
            }
            cap /= 2;
        }
        None
    }

    /// Logs the identity of an oversized span together with its process and
    /// tags, and the size of the rejected `message`. Tag values are only
    /// logged with `dump_span_attributes`, their lengths otherwise.
    pub fn log_oversized(&self, span: &Span, message: &ProducerMessage) {
        let message_bytes = self.message_bytes(message);
        let (service_name, process_tags) = match span.process.as_ref() {
            Some(process) => (
                process.service_name.as_str(),
                process
                    .tags
                    .iter()
                    .map(|tag| format!("{}={}", tag.key, tag.value_text()))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            None => ("", String::new()),
        };
        let span_tags = span
            .tags
            .iter()
            .map(|tag| {
                if self.config.dump_span_attributes {
                    format!("{}={}", tag.key, tag.value_text())
                } else {
                    format!("{}(len={})", tag.key, tag.value_len())
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let start_time = span
            .start_time
            .as_ref()
            .map(|ts| format!("{}.{:09}", ts.seconds, ts.nanos))
            .unwrap_or_default();
        let duration = span
            .duration
            .as_ref()
            .map(|d| {
                format!(
                    "{:?}",
                    std::time::Duration::new(d.seconds.max(0) as u64, d.nanos.max(0) as u32)
                )
            })
            .unwrap_or_default();

        otel_warn!(
            name: "KafkaExporter.OversizedSpan",
            trace_id = trace_id_string(&span.trace_id),
            span_id = const_hex::encode(&span.span_id),
            operation_name = span.operation_name.as_str(),
            start_time = start_time.as_str(),
            duration = duration.as_str(),
            service_name = service_name,
            process_tags = process_tags.as_str(),
            span_tags = span_tags.as_str(),
            message_bytes = message_bytes as u64,
            max_message_bytes = self.max_message_bytes as u64
        );
    }
}

/// Truncates every string or binary tag longer than `cap` and returns the
/// keys of the truncated tags.
fn truncate_tags(tags: &mut [KeyValue], cap: usize) -> Vec<String> {
    let mut truncated = Vec::new();
    for tag in tags.iter_mut() {
        match tag.v_type() {
            ValueType::String if tag.v_str.len() > cap => {
                let mut end = cap;
                while !tag.v_str.is_char_boundary(end) {
                    end -= 1;
                }
                tag.v_str.truncate(end);
                truncated.push(tag.key.clone());
            }
            ValueType::Binary if tag.v_binary.len() > cap => {
                tag.v_binary.truncate(cap);
                truncated.push(tag.key.clone());
            }
            _ => {}
        }
    }
    truncated
}

use serde::Deserialize;

/// Encoding name of [`OtlpProtoMarshaler`](crate::OtlpProtoMarshaler).
pub const OTLP_PROTO_ENCODING: &str = "otlp_proto";
/// Encoding name of [`JaegerProtoMarshaler`](crate::JaegerProtoMarshaler).
pub const JAEGER_PROTO_ENCODING: &str = "jaeger_proto";

/// Kafka exporter configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Topic spans are produced to.
    pub topic: String,
    /// Message encoding, `otlp_proto` or `jaeger_proto`.
    pub encoding: String,
    /// Kafka protocol version of the brokers, e.g. `2.0.0` or `0.10.2.1`.
    pub protocol_version: String,
    /// Producer settings.
    pub producer: ProducerConfig,
    /// Shrinking of oversized spans. Only used with `jaeger_proto`.
    pub span_curing: SpanCuringConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            topic: "otlp_spans".to_string(),
            encoding: OTLP_PROTO_ENCODING.to_string(),
            protocol_version: "2.0.0".to_string(),
            producer: ProducerConfig::default(),
            span_curing: SpanCuringConfig::default(),
        }
    }
}

/// Producer settings that influence marshaling.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProducerConfig {
    /// Largest message the brokers accept.
    pub max_message_bytes: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        ProducerConfig {
            max_message_bytes: 1_000_000,
        }
    }
}

/// Span curing settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SpanCuringConfig {
    /// Whether oversized spans are cured.
    pub enabled: bool,
    /// Initial cap on string and binary tag values, halved on every attempt.
    pub max_attribute_value_size_bytes: usize,
    /// Log the values of span tags of oversized spans instead of their
    /// lengths.
    pub dump_span_attributes: bool,
    /// Drop spans that cannot be cured instead of forwarding them.
    pub drop_spans: bool,
}

impl Default for SpanCuringConfig {
    fn default() -> Self {
        SpanCuringConfig {
            enabled: false,
            max_attribute_value_size_bytes: 131_072,
            dump_span_attributes: false,
            drop_spans: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let config: Config = serde_yaml::from_str(
            r#"
encoding: jaeger_proto
producer:
  max_message_bytes: 1024
span_curing:
  enabled: true
  drop_spans: true
"#,
        )
        .unwrap();

        assert_eq!(config.topic, "otlp_spans");
        assert_eq!(config.encoding, JAEGER_PROTO_ENCODING);
        assert_eq!(config.protocol_version, "2.0.0");
        assert_eq!(config.producer.max_message_bytes, 1024);
        assert!(config.span_curing.enabled);
        assert!(config.span_curing.drop_spans);
        assert!(!config.span_curing.dump_span_attributes);
        assert_eq!(config.span_curing.max_attribute_value_size_bytes, 131_072);
    }
}

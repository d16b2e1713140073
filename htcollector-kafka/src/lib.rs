//! # Kafka trace exporter
//!
//! Produces trace batches to a Kafka topic through a [`KafkaProducer`]
//! supplied by the host. Two encodings are supported:
//!
//! * `otlp_proto`: one OTLP `TracesData` message per batch, unkeyed.
//! * `jaeger_proto`: one Jaeger `api_v2` `Span` message per span, keyed by
//!   the Jaeger trace id so that all spans of a trace land on the same
//!   partition.
//!
//! ## Span curing
//!
//! Brokers reject messages above `max_message_bytes`. With
//! `span_curing.enabled` and the `jaeger_proto` encoding, spans whose message
//! is too large are shrunk before they reach the producer: string and binary
//! tags longer than `max_attribute_value_size_bytes` are truncated and marked
//! with a `<key>.htcollector.truncated = true` tag, and the cap is halved
//! until the message fits or five attempts have failed.
//!
//! ```
//! use htcollector_kafka::{marshaler_for, Config};
//!
//! let config: Config = Config {
//!     encoding: "jaeger_proto".into(),
//!     ..Default::default()
//! };
//! let marshaler = marshaler_for(&config).unwrap();
//! assert_eq!(marshaler.encoding(), "jaeger_proto");
//! ```
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod config;
pub mod curer;
mod error;
mod exporter;
#[allow(missing_docs)]
pub mod jaeger;
mod marshaler;
mod message;
mod producer;
mod version;

pub use config::{
    Config, ProducerConfig, SpanCuringConfig, JAEGER_PROTO_ENCODING, OTLP_PROTO_ENCODING,
};
pub use error::{ConfigError, ExportError, KafkaErrors, MarshalError, MarshalErrors};
pub use exporter::KafkaTracesExporter;
pub use marshaler::{
    marshaler_for, CuringJaegerMarshaler, JaegerProtoMarshaler, MarshaledTraces,
    OtlpProtoMarshaler, TracesMarshaler,
};
pub use message::{ProducerMessage, RecordHeader};
pub use producer::{KafkaProducer, ProducerError, ProducerErrors};
pub use version::KafkaVersion;

//! # Collector processor primitives
//!
//! Shared building blocks for the processors and exporters that plug into the
//! collector pipeline host. The host owns receivers, batching and transport;
//! the crates in this workspace only transform batches of OTLP telemetry.
//!
//! The following diagram shows where processors sit relative to the host:
//!
//! ```ascii
//!   +-----------+   +--------------------------------------+   +------------------+
//!   |           |   |  TracesProcessor / MetricsProcessor  |   |                  |
//!   | Receivers +--->  (piifilter, enduser, tenantid, ...) +---> Exporters (kafka)|
//!   |           |   |                                      |   |                  |
//!   +-----------+   +--------------------------------------+   +------------------+
//! ```
//!
//! Every batch travels together with a [`BatchContext`] that carries the
//! inbound request metadata, the caller's deadline, and per-batch scratch data
//! such as the [`ParsedTraceData`] produced by the PII filter.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

pub mod attributes;
pub mod context;
pub mod cookie;
pub mod criteria;
pub mod error;
pub mod json;
pub mod parsed;
pub mod processor;
pub mod redaction;
#[cfg(feature = "testing")]
#[doc(hidden)]
pub mod testing;

pub use context::BatchContext;
pub use criteria::{AttributeCriterion, SpanCriteria};
pub use error::{ProcessorError, ProcessorResult};
pub use parsed::{ParsedAttribute, ParsedSpanData, ParsedTraceData};
pub use processor::{Capabilities, MetricsProcessor, Processor, TracesProcessor};
pub use redaction::{HashAlgorithm, RedactionStrategy, REDACTED_TEXT};

/// Re-export of the OTLP message types the processors operate on.
pub mod proto {
    pub use opentelemetry_proto::tonic::common::v1::{
        any_value, AnyValue, ArrayValue, InstrumentationScope, KeyValue, KeyValueList,
    };
    pub use opentelemetry_proto::tonic::metrics::v1 as metrics;
    pub use opentelemetry_proto::tonic::resource::v1::Resource;
    pub use opentelemetry_proto::tonic::trace::v1 as trace;
}

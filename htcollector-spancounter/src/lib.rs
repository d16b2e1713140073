//! # Span counter
//!
//! Counts the spans of each tenant and service that match labeled criteria
//! and reports them with the `spancounter.matching_spans` counter, dimensioned
//! by `tenant-id`, `service.name` and `span-criteria-label`.
//!
//! A span matches a criterion when its name equals the configured
//! `span_name` (if any) and it carries every configured attribute with the
//! configured value. An empty value accepts any value.
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
mod processor;

pub use config::{Config, ServiceConfig, SpanConfig, TenantConfig};
pub use processor::{SpanCounterProcessor, SPAN_CRITERIA_LABEL_DIMENSION, TENANT_ID_DIMENSION};

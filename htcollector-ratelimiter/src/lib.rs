//! # Rate limiter
//!
//! Asks an envoy compatible `RateLimitService` whether the tenant that sent a
//! span batch may still ingest spans. The request carries a single descriptor
//! `tenant_spans = <tenant id>` and spends one hit per span. Batches of
//! tenants that are over their limit are dropped and counted in
//! `ratelimiter.dropped_spans`.
//!
//! The processor fails open: missing tenant ids, unreachable services and
//! timeouts let the batch through.
//!
//! ```no_run
//! use htcollector::Processor;
//! use htcollector_ratelimiter::{Config, RateLimiterProcessor};
//!
//! # async fn run() -> htcollector::ProcessorResult<()> {
//! let processor = RateLimiterProcessor::new(Config {
//!     service_host: "ratelimit.internal".into(),
//!     ..Default::default()
//! });
//! processor.start().await?;
//! # Ok(())
//! # }
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

mod client;
mod config;
mod processor;
#[allow(missing_docs)]
pub mod proto;

pub use client::{GrpcRateLimitClient, RateLimitClient};
pub use config::Config;
pub use processor::{RateLimiterProcessor, TENANT_SPANS_DESCRIPTOR};

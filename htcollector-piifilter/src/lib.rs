//! # PII filter processor
//!
//! Redacts personally identifiable information from span attributes. Values
//! are inspected according to their format, so a password inside a JSON body,
//! a URL query, a cookie header or a SQL literal is replaced while the
//! surrounding structure stays valid.
//!
//! Rules come in two flavours:
//!
//! * *key rules* match attribute keys, structural keys (JSON members, form
//!   parameters, cookie names) or, when `fqn` is set, fully qualified paths
//!   such as `$.user.password`. The whole matched value is replaced.
//! * *value rules* match inside values; every match is replaced in place.
//!
//! ```
//! use htcollector::attributes::{string_attribute, AttributesExt};
//! use htcollector::proto::trace::{ResourceSpans, ScopeSpans, Span, TracesData};
//! use htcollector::{BatchContext, TracesProcessor};
//! use htcollector_piifilter::{Config, PiiElement, PiiFilterProcessor};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let processor = PiiFilterProcessor::new(Config {
//!     key_regexs: vec![PiiElement {
//!         regex: "^http.request.header.*".into(),
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! })?;
//!
//! let mut traces = TracesData {
//!     resource_spans: vec![ResourceSpans {
//!         scope_spans: vec![ScopeSpans {
//!             spans: vec![Span {
//!                 attributes: vec![string_attribute("http.request.header.password", "abc123")],
//!                 ..Default::default()
//!             }],
//!             ..Default::default()
//!         }],
//!         ..Default::default()
//!     }],
//! };
//!
//! processor
//!     .process_traces(&mut BatchContext::new(), &mut traces)
//!     .await?;
//!
//! let span = &traces.resource_spans[0].scope_spans[0].spans[0];
//! assert_eq!(span.attributes.find_str("http.request.header.password"), Some("***"));
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

mod config;
mod error;
pub mod filters;
pub mod matcher;
mod processor;

pub use config::{ComplexDataType, Config, PiiComplexData, PiiElement};
pub use error::{ConfigError, FilterError};
pub use processor::PiiFilterProcessor;

//! # HAProxy verifier
//!
//! Tracks requests that passed through HAProxy and have not been answered
//! yet. Request spans and response spans are recognized with two sets of
//! [`SpanCriteria`]; both kinds are keyed by `<trace id>-<parent span id>`, so
//! a response removes the entry its request added. A background task logs
//! the number of outstanding requests every `log_interval_seconds`.
//!
//! Spans are never modified.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

use async_trait::async_trait;
use htcollector::proto::trace::{Span, TracesData};
use htcollector::{
    BatchContext, Capabilities, Processor, ProcessorError, ProcessorResult, SpanCriteria,
    TracesProcessor,
};
use opentelemetry::{otel_debug, otel_info};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// HAProxy verifier configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Selects the spans that open a request.
    pub request_criteria: SpanCriteria,
    /// Selects the spans that answer a request.
    pub response_criteria: SpanCriteria,
    /// Cadence of the outstanding request report.
    pub log_interval_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            request_criteria: SpanCriteria::default(),
            response_criteria: SpanCriteria::default(),
            log_interval_seconds: 60,
        }
    }
}

#[derive(Debug)]
struct Reporter {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Keeps the set of requests still waiting for their response.
#[derive(Debug)]
pub struct HaproxyVerifierProcessor {
    config: Config,
    in_flight: Arc<Mutex<HashSet<String>>>,
    reporter: Mutex<Option<Reporter>>,
    is_shutdown: AtomicBool,
}

/// The key shared by a request span and its response span.
pub fn request_key(span: &Span) -> String {
    format!(
        "{}-{}",
        const_hex::encode(&span.trace_id),
        const_hex::encode(&span.parent_span_id)
    )
}

impl HaproxyVerifierProcessor {
    /// Creates the processor. The reporting task is spawned by
    /// [`Processor::start`].
    pub fn new(config: Config) -> Self {
        HaproxyVerifierProcessor {
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            reporter: Mutex::new(None),
            is_shutdown: AtomicBool::new(false),
        }
    }

    /// Number of requests without a response so far.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().map(|set| set.len()).unwrap_or(0)
    }

    fn log_interval(&self) -> Duration {
        Duration::from_secs(self.config.log_interval_seconds.max(1))
    }
}

#[async_trait]
impl Processor for HaproxyVerifierProcessor {
    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_ONLY
    }

    async fn start(&self) -> ProcessorResult<()> {
        let mut reporter = self.reporter.lock()?;
        if reporter.is_some() {
            return Ok(());
        }
        let (shutdown, mut shutdown_rx) = oneshot::channel();
        let in_flight = Arc::clone(&self.in_flight);
        let mut interval = tokio::time::interval(self.log_interval());
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        let count = in_flight.lock().map(|set| set.len()).unwrap_or(0);
                        otel_info!(name: "HaproxyVerifier.InFlight", count = count as u64);
                    }
                }
            }
        });
        *reporter = Some(Reporter { shutdown, handle });
        Ok(())
    }

    async fn shutdown(&self) -> ProcessorResult<()> {
        if self.is_shutdown.swap(true, Ordering::Relaxed) {
            return Err(ProcessorError::AlreadyShutdown);
        }
        let reporter = self.reporter.lock()?.take();
        if let Some(Reporter { shutdown, handle }) = reporter {
            // the receiver is gone only if the task already ended
            let _ = shutdown.send(());
            handle
                .await
                .map_err(|err| ProcessorError::Other(err.to_string()))?;
        }
        otel_debug!(name: "HaproxyVerifier.Shutdown", in_flight = self.in_flight() as u64);
        Ok(())
    }
}

#[async_trait]
impl TracesProcessor for HaproxyVerifierProcessor {
    async fn process_traces(
        &self,
        _cx: &mut BatchContext,
        traces: &mut TracesData,
    ) -> ProcessorResult<()> {
        let track_requests = !self.config.request_criteria.is_empty();
        let track_responses = !self.config.response_criteria.is_empty();
        if !track_requests && !track_responses {
            return Ok(());
        }

        let mut in_flight = self.in_flight.lock()?;
        let spans = traces
            .resource_spans
            .iter()
            .flat_map(|rs| rs.scope_spans.iter())
            .flat_map(|ss| ss.spans.iter());
        for span in spans {
            if track_requests && self.config.request_criteria.matches(span) {
                in_flight.insert(request_key(span));
            } else if track_responses && self.config.response_criteria.matches(span) {
                in_flight.remove(&request_key(span));
            }
        }
        Ok(())
    }
}

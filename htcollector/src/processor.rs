//! Processor lifecycle traits.
//!
//! The pipeline host drives processors through these traits: it calls
//! [`Processor::start`] once before the first batch, invokes
//! [`TracesProcessor::process_traces`] / [`MetricsProcessor::process_metrics`]
//! for every batch (possibly concurrently from several workers), and finally
//! calls [`Processor::shutdown`].
use crate::context::BatchContext;
use crate::error::ProcessorResult;
use crate::proto::{metrics::MetricsData, trace::TracesData};
use async_trait::async_trait;
use std::fmt::Debug;

/// What a processor does to the data it is handed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether the processor modifies the batch in place.
    pub mutates_data: bool,
}

impl Capabilities {
    /// Capabilities of a processor that rewrites batches.
    pub const MUTATING: Capabilities = Capabilities { mutates_data: true };
    /// Capabilities of a processor that only observes batches.
    pub const READ_ONLY: Capabilities = Capabilities {
        mutates_data: false,
    };
}

/// Lifecycle shared by every processor.
#[async_trait]
pub trait Processor: Send + Sync + Debug {
    /// Describes whether the processor mutates batches.
    fn capabilities(&self) -> Capabilities;

    /// Acquires the resources the processor needs, such as remote
    /// connections or background tasks.
    async fn start(&self) -> ProcessorResult<()> {
        Ok(())
    }

    /// Releases everything acquired by [`start`](Processor::start).
    ///
    /// Implementations should make sure shutdown can be called multiple times.
    async fn shutdown(&self) -> ProcessorResult<()> {
        Ok(())
    }
}

/// A processor for batches of spans.
#[async_trait]
pub trait TracesProcessor: Processor {
    /// Processes one batch in place. Span order must be preserved.
    ///
    /// Returning an error fails the whole batch.
    async fn process_traces(
        &self,
        cx: &mut BatchContext,
        traces: &mut TracesData,
    ) -> ProcessorResult<()>;
}

/// A processor for batches of metrics.
#[async_trait]
pub trait MetricsProcessor: Processor {
    /// Processes one batch in place.
    async fn process_metrics(
        &self,
        cx: &mut BatchContext,
        metrics: &mut MetricsData,
    ) -> ProcessorResult<()>;
}

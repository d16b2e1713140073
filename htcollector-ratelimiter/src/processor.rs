use crate::client::{GrpcRateLimitClient, RateLimitClient};
use crate::config::Config;
use crate::proto::rate_limit_descriptor::Entry;
use crate::proto::rate_limit_response::Code;
use crate::proto::{RateLimitDescriptor, RateLimitRequest};
use async_trait::async_trait;
use htcollector::proto::trace::TracesData;
use htcollector::{
    BatchContext, Capabilities, Processor, ProcessorError, ProcessorResult, TracesProcessor,
};
use opentelemetry::metrics::{Counter, Meter};
use opentelemetry::{otel_debug, otel_info, otel_warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Descriptor key the tenant id is sent under.
pub const TENANT_SPANS_DESCRIPTOR: &str = "tenant_spans";

const DROPPED_SPANS_METRIC: &str = "ratelimiter.dropped_spans";
const TENANT_ID_DIMENSION: &str = "tenant-id";

/// Drops span batches of tenants that are over their limit.
///
/// Every batch costs `span_count` hits against the bucket of its tenant. When
/// the service answers `OVER_LIMIT` the batch is emptied. Batches without a
/// tenant, and batches for which the service cannot be reached in time, are
/// forwarded unchanged.
#[derive(Debug)]
pub struct RateLimiterProcessor {
    config: Config,
    client: Mutex<Option<Arc<dyn RateLimitClient>>>,
    is_shutdown: AtomicBool,
    dropped_spans: Counter<u64>,
}

impl RateLimiterProcessor {
    /// Creates the processor, recording drops with the global meter. The
    /// service connection is set up by [`Processor::start`].
    pub fn new(config: Config) -> Self {
        Self::with_meter(config, &opentelemetry::global::meter("htcollector-ratelimiter"))
    }

    /// Creates the processor, recording drops with `meter`.
    pub fn with_meter(config: Config, meter: &Meter) -> Self {
        RateLimiterProcessor {
            config,
            client: Mutex::new(None),
            is_shutdown: AtomicBool::new(false),
            dropped_spans: meter
                .u64_counter(DROPPED_SPANS_METRIC)
                .with_description("Spans dropped because their tenant was over the limit")
                .build(),
        }
    }

    /// Uses `client` instead of connecting to the configured endpoint.
    pub fn with_client(self, client: Arc<dyn RateLimitClient>) -> Self {
        if let Ok(mut guard) = self.client.lock() {
            *guard = Some(client);
        }
        self
    }

    fn request(&self, tenant_id: &str, span_count: usize) -> RateLimitRequest {
        RateLimitRequest {
            domain: self.config.domain.clone(),
            descriptors: vec![RateLimitDescriptor {
                entries: vec![Entry {
                    key: TENANT_SPANS_DESCRIPTOR.to_string(),
                    value: tenant_id.to_string(),
                }],
            }],
            hits_addend: u32::try_from(span_count).unwrap_or(u32::MAX),
        }
    }
}

fn span_count(traces: &TracesData) -> usize {
    traces
        .resource_spans
        .iter()
        .flat_map(|rs| rs.scope_spans.iter())
        .map(|ss| ss.spans.len())
        .sum()
}

#[async_trait]
impl Processor for RateLimiterProcessor {
    fn capabilities(&self) -> Capabilities {
        Capabilities::MUTATING
    }

    async fn start(&self) -> ProcessorResult<()> {
        let mut client = self.client.lock()?;
        if client.is_none() {
            let grpc = GrpcRateLimitClient::connect_lazy(self.config.endpoint(), self.config.timeout())
                .map_err(|err| ProcessorError::InvalidConfig(err.to_string()))?;
            *client = Some(Arc::new(grpc));
        }
        otel_info!(
            name: "RateLimiter.Started",
            endpoint = self.config.endpoint(),
            domain = self.config.domain.as_str()
        );
        Ok(())
    }

    async fn shutdown(&self) -> ProcessorResult<()> {
        if self.is_shutdown.swap(true, Ordering::Relaxed) {
            return Err(ProcessorError::AlreadyShutdown);
        }
        // dropping the last clone of the channel closes the connection
        self.client.lock()?.take();
        otel_info!(name: "RateLimiter.Shutdown");
        Ok(())
    }
}

#[async_trait]
impl TracesProcessor for RateLimiterProcessor {
    async fn process_traces(
        &self,
        cx: &mut BatchContext,
        traces: &mut TracesData,
    ) -> ProcessorResult<()> {
        if self.is_shutdown.load(Ordering::Relaxed) {
            return Err(ProcessorError::AlreadyShutdown);
        }
        let Some(tenant_id) = cx
            .header_values(&self.config.tenant_id_header_name)
            .first()
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string())
        else {
            otel_debug!(
                name: "RateLimiter.MissingTenant",
                header = self.config.tenant_id_header_name.as_str()
            );
            return Ok(());
        };
        let span_count = span_count(traces);
        if span_count == 0 {
            return Ok(());
        }
        let Some(client) = self.client.lock()?.clone() else {
            otel_warn!(name: "RateLimiter.NotStarted", tenant_id = tenant_id.as_str());
            return Ok(());
        };

        let mut budget = self.config.timeout();
        let mut deadline_bound = false;
        if let Some(remaining) = cx.remaining() {
            if remaining.is_zero() {
                return Err(ProcessorError::DeadlineExceeded);
            }
            if remaining < budget {
                budget = remaining;
                deadline_bound = true;
            }
        }

        let request = self.request(&tenant_id, span_count);
        let response = match tokio::time::timeout(budget, client.should_rate_limit(request)).await {
            Ok(Ok(response)) => response,
            Err(_) if deadline_bound => return Err(ProcessorError::DeadlineExceeded),
            Err(_) => {
                otel_warn!(
                    name: "RateLimiter.Timeout",
                    tenant_id = tenant_id.as_str(),
                    timeout_millis = self.config.timeout_millis
                );
                return Ok(());
            }
            Ok(Err(status)) => {
                otel_warn!(
                    name: "RateLimiter.CallFailed",
                    tenant_id = tenant_id.as_str(),
                    error = status.to_string()
                );
                return Ok(());
            }
        };

        if response.overall_code() == Code::OverLimit {
            otel_debug!(
                name: "RateLimiter.OverLimit",
                tenant_id = tenant_id.as_str(),
                dropped_spans = span_count as u64
            );
            traces.resource_spans.clear();
            self.dropped_spans.add(
                span_count as u64,
                &[opentelemetry::KeyValue::new(TENANT_ID_DIMENSION, tenant_id)],
            );
        }
        Ok(())
    }
}

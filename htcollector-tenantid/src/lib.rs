//! # Tenant-ID processor
//!
//! Reads the tenant id from a header of the inbound request and stamps it on
//! every resource of the batch, and for metrics on every data point as well.
//! Batches without the header, or with more than one value for it, are
//! rejected.
//!
//! The processor counts the spans and metric data points it sees per tenant
//! with the `tenantid.spans` and `tenantid.metric_data_points` counters.
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
use htcollector::attributes::{string_attribute, AttributesExt};
use htcollector::proto::metrics::{metric, MetricsData};
use htcollector::proto::trace::TracesData;
use htcollector::proto::{KeyValue, Resource};
use htcollector::{
    BatchContext, Capabilities, MetricsProcessor, Processor, ProcessorError, ProcessorResult,
    TracesProcessor,
};
use http::HeaderName;
use opentelemetry::metrics::{Counter, Meter};
use opentelemetry::otel_debug;
use serde::Deserialize;
use thiserror::Error;

/// Default header carrying the tenant id.
pub const DEFAULT_HEADER_NAME: &str = "x-tenant-id";
/// Default attribute key the tenant id is written to.
pub const DEFAULT_ATTRIBUTE_KEY: &str = "tenant-id";
/// Metric dimension holding the tenant id.
pub const TENANT_ID_DIMENSION: &str = "tenant-id";

const SPANS_METRIC: &str = "tenantid.spans";
const DATA_POINTS_METRIC: &str = "tenantid.metric_data_points";

/// Tenant-ID processor configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Request header holding the tenant id.
    pub header_name: String,
    /// Attribute key the tenant id is written to.
    pub attribute_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            header_name: DEFAULT_HEADER_NAME.to_string(),
            attribute_key: DEFAULT_ATTRIBUTE_KEY.to_string(),
        }
    }
}

/// Errors building the processor from its configuration.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// The header name is not a valid HTTP header name.
    #[error("invalid header name {name:?}: {source}")]
    InvalidHeaderName {
        /// The configured name.
        name: String,
        /// Validation failure.
        #[source]
        source: http::header::InvalidHeaderName,
    },

    /// The attribute key is empty.
    #[error("attribute_key must not be empty")]
    EmptyAttributeKey,
}

impl From<ConfigError> for ProcessorError {
    fn from(err: ConfigError) -> Self {
        ProcessorError::InvalidConfig(err.to_string())
    }
}

/// Stamps the tenant id of the inbound request on spans and metrics.
#[derive(Debug)]
pub struct TenantIdProcessor {
    header: HeaderName,
    attribute_key: String,
    spans: Counter<u64>,
    data_points: Counter<u64>,
}

impl TenantIdProcessor {
    /// Builds the processor, recording counters with the global meter.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        Self::with_meter(config, &opentelemetry::global::meter("htcollector-tenantid"))
    }

    /// Builds the processor, recording counters with `meter`.
    pub fn with_meter(config: Config, meter: &Meter) -> Result<Self, ConfigError> {
        let header = HeaderName::from_bytes(config.header_name.as_bytes()).map_err(|source| {
            ConfigError::InvalidHeaderName {
                name: config.header_name.clone(),
                source,
            }
        })?;
        if config.attribute_key.is_empty() {
            return Err(ConfigError::EmptyAttributeKey);
        }
        Ok(TenantIdProcessor {
            header,
            attribute_key: config.attribute_key,
            spans: meter
                .u64_counter(SPANS_METRIC)
                .with_description("Spans received per tenant")
                .build(),
            data_points: meter
                .u64_counter(DATA_POINTS_METRIC)
                .with_description("Metric data points received per tenant")
                .build(),
        })
    }

    fn tenant_id(&self, cx: &BatchContext) -> ProcessorResult<String> {
        let values = cx.header_values(self.header.as_str());
        match values.as_slice() {
            [tenant_id] => Ok(tenant_id.to_string()),
            [] => {
                otel_debug!(name: "TenantId.MissingHeader", header = self.header.as_str());
                Err(ProcessorError::MissingHeader(self.header.to_string()))
            }
            _ => {
                otel_debug!(
                    name: "TenantId.MultipleHeaderValues",
                    header = self.header.as_str(),
                    count = values.len() as u64
                );
                Err(ProcessorError::MultipleHeaderValues(self.header.to_string()))
            }
        }
    }

    fn stamp_resource(&self, resource: &mut Option<Resource>, tenant_id: &str) {
        resource
            .get_or_insert_with(Resource::default)
            .attributes
            .upsert(string_attribute(self.attribute_key.as_str(), tenant_id));
    }
}

fn stamp_points<'a>(
    attributes: impl Iterator<Item = &'a mut Vec<KeyValue>>,
    tenant: &KeyValue,
) -> u64 {
    let mut count = 0;
    for point_attributes in attributes {
        point_attributes.upsert(tenant.clone());
        count += 1;
    }
    count
}

#[async_trait]
impl Processor for TenantIdProcessor {
    fn capabilities(&self) -> Capabilities {
        Capabilities::MUTATING
    }
}

#[async_trait]
impl TracesProcessor for TenantIdProcessor {
    async fn process_traces(
        &self,
        cx: &mut BatchContext,
        traces: &mut TracesData,
    ) -> ProcessorResult<()> {
        let tenant_id = self.tenant_id(cx)?;

        let mut span_count = 0u64;
        for resource_spans in traces.resource_spans.iter_mut() {
            self.stamp_resource(&mut resource_spans.resource, &tenant_id);
            span_count += resource_spans
                .scope_spans
                .iter()
                .map(|scope_spans| scope_spans.spans.len() as u64)
                .sum::<u64>();
        }

        self.spans.add(
            span_count,
            &[opentelemetry::KeyValue::new(TENANT_ID_DIMENSION, tenant_id)],
        );
        Ok(())
    }
}

#[async_trait]
impl MetricsProcessor for TenantIdProcessor {
    async fn process_metrics(
        &self,
        cx: &mut BatchContext,
        metrics: &mut MetricsData,
    ) -> ProcessorResult<()> {
        let tenant_id = self.tenant_id(cx)?;
        let tenant = string_attribute(self.attribute_key.as_str(), tenant_id.as_str());

        let mut point_count = 0u64;
        for resource_metrics in metrics.resource_metrics.iter_mut() {
            self.stamp_resource(&mut resource_metrics.resource, &tenant_id);
            for scope_metrics in resource_metrics.scope_metrics.iter_mut() {
                for metric in scope_metrics.metrics.iter_mut() {
                    point_count += match metric.data.as_mut() {
                        Some(metric::Data::Gauge(gauge)) => stamp_points(
                            gauge.data_points.iter_mut().map(|dp| &mut dp.attributes),
                            &tenant,
                        ),
                        Some(metric::Data::Sum(sum)) => stamp_points(
                            sum.data_points.iter_mut().map(|dp| &mut dp.attributes),
                            &tenant,
                        ),
                        Some(metric::Data::Histogram(histogram)) => stamp_points(
                            histogram.data_points.iter_mut().map(|dp| &mut dp.attributes),
                            &tenant,
                        ),
                        Some(metric::Data::ExponentialHistogram(histogram)) => stamp_points(
                            histogram.data_points.iter_mut().map(|dp| &mut dp.attributes),
                            &tenant,
                        ),
                        Some(metric::Data::Summary(summary)) => stamp_points(
                            summary.data_points.iter_mut().map(|dp| &mut dp.attributes),
                            &tenant,
                        ),
                        None => 0,
                    };
                }
            }
        }

        self.data_points.add(
            point_count,
            &[opentelemetry::KeyValue::new(TENANT_ID_DIMENSION, tenant_id)],
        );
        Ok(())
    }
}

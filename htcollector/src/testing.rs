//! Builders and harnesses shared by the processor test suites.
use crate::attributes::string_attribute;
use crate::proto::metrics::{
    metric, Gauge, Metric, MetricsData, NumberDataPoint, ResourceMetrics, ScopeMetrics,
};
use crate::proto::trace::{ResourceSpans, ScopeSpans, Span, TracesData};
use crate::proto::{KeyValue, Resource};
use opentelemetry::metrics::{Meter, MeterProvider};
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, SdkMeterProvider};

/// Builds a span with a fixed trace id, the given span id and attributes.
pub fn span(name: &str, span_id: u8, attributes: Vec<KeyValue>) -> Span {
    Span {
        trace_id: vec![0x5b; 16],
        span_id: vec![span_id; 8],
        name: name.to_string(),
        start_time_unix_nano: 1_700_000_000_000_000_000,
        end_time_unix_nano: 1_700_000_000_250_000_000,
        attributes,
        ..Default::default()
    }
}

/// Builds a span named `span` carrying the given string attributes.
pub fn span_with_attributes(pairs: &[(&str, &str)]) -> Span {
    span(
        "span",
        1,
        pairs.iter().map(|(k, v)| string_attribute(*k, *v)).collect(),
    )
}

/// Wraps spans into a single resource / scope.
pub fn traces(resource_attributes: Vec<KeyValue>, spans: Vec<Span>) -> TracesData {
    TracesData {
        resource_spans: vec![ResourceSpans {
            resource: Some(Resource {
                attributes: resource_attributes,
                ..Default::default()
            }),
            scope_spans: vec![ScopeSpans {
                spans,
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

/// Iterates over every span of a batch.
pub fn all_spans(traces: &TracesData) -> impl Iterator<Item = &Span> {
    traces
        .resource_spans
        .iter()
        .flat_map(|rs| rs.scope_spans.iter())
        .flat_map(|ss| ss.spans.iter())
}

/// Wraps a gauge with `points` data points into a metrics batch.
pub fn gauge_metrics(name: &str, points: usize) -> MetricsData {
    let data_points = (0..points)
        .map(|i| NumberDataPoint {
            value: Some(
                crate::proto::metrics::number_data_point::Value::AsInt(i as i64),
            ),
            ..Default::default()
        })
        .collect();
    MetricsData {
        resource_metrics: vec![ResourceMetrics {
            resource: Some(Resource::default()),
            scope_metrics: vec![ScopeMetrics {
                metrics: vec![Metric {
                    name: name.to_string(),
                    data: Some(metric::Data::Gauge(Gauge { data_points })),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

/// A meter backed by an in-memory exporter, for asserting counter values.
#[derive(Debug)]
pub struct MetricsTestContext {
    provider: SdkMeterProvider,
    exporter: InMemoryMetricExporter,
    meter: Meter,
}

impl Default for MetricsTestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsTestContext {
    /// Creates a fresh provider and exporter.
    pub fn new() -> Self {
        let exporter = InMemoryMetricExporter::default();
        let provider = SdkMeterProvider::builder()
            .with_periodic_exporter(exporter.clone())
            .build();
        let meter = provider.meter("htcollector-test");
        MetricsTestContext {
            provider,
            exporter,
            meter,
        }
    }

    /// The meter to hand to the processor under test.
    pub fn meter(&self) -> &Meter {
        &self.meter
    }

    /// Flushes and returns the value of the u64 sum `name` for the data point
    /// whose attributes equal `attributes` (order insensitive). `None` when no
    /// such data point was recorded.
    pub fn u64_sum(&self, name: &str, attributes: &[(&str, &str)]) -> Option<u64> {
        self.provider.force_flush().ok()?;
        let resource_metrics = self.exporter.get_finished_metrics().ok()?;

        let mut total = None;
        for rm in &resource_metrics {
            for sm in rm.scope_metrics() {
                for metric in sm.metrics().filter(|m| m.name() == name) {
                    if let AggregatedMetrics::U64(MetricData::Sum(sum)) = metric.data() {
                        for dp in sum.data_points() {
                            let mut actual: Vec<(String, String)> = dp
                                .attributes()
                                .map(|kv| (kv.key.to_string(), kv.value.to_string()))
                                .collect();
                            actual.sort();
                            let mut expected: Vec<(String, String)> = attributes
                                .iter()
                                .map(|(k, v)| (k.to_string(), v.to_string()))
                                .collect();
                            expected.sort();
                            if actual == expected {
                                // cumulative temporality: the latest export wins
                                total = Some(dp.value());
                            }
                        }
                    }
                }
            }
        }
        total
    }
}

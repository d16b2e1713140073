use crate::config::Config;
use async_trait::async_trait;
use htcollector::attributes::AttributesExt;
use htcollector::proto::trace::TracesData;
use htcollector::{BatchContext, Capabilities, Processor, ProcessorResult, SpanCriteria, TracesProcessor};
use opentelemetry::metrics::{Counter, Meter};
use opentelemetry::otel_debug;
use opentelemetry_semantic_conventions::resource::SERVICE_NAME;
use std::collections::HashMap;

const MATCHING_SPANS_METRIC: &str = "spancounter.matching_spans";
/// Metric dimension holding the tenant id.
pub const TENANT_ID_DIMENSION: &str = "tenant-id";
/// Metric dimension holding the criterion label.
pub const SPAN_CRITERIA_LABEL_DIMENSION: &str = "span-criteria-label";

#[derive(Debug)]
struct LabeledCriteria {
    label: String,
    criteria: SpanCriteria,
}

/// Counts spans matching labeled criteria, per tenant and service.
///
/// Tenants and services are read from the resource of each span. Spans are
/// never modified.
#[derive(Debug)]
pub struct SpanCounterProcessor {
    tenant_id_attribute_key: String,
    // tenant id -> service name -> criteria
    criteria: HashMap<String, HashMap<String, Vec<LabeledCriteria>>>,
    matching_spans: Counter<u64>,
}

impl SpanCounterProcessor {
    /// Creates the processor, recording counts with the global meter.
    pub fn new(config: Config) -> Self {
        Self::with_meter(config, &opentelemetry::global::meter("htcollector-spancounter"))
    }

    /// Creates the processor, recording counts with `meter`.
    pub fn with_meter(config: Config, meter: &Meter) -> Self {
        let mut criteria: HashMap<String, HashMap<String, Vec<LabeledCriteria>>> = HashMap::new();
        for tenant in config.tenant_configs {
            let services = criteria.entry(tenant.tenant_id).or_default();
            for service in tenant.service_configs {
                let labeled = services.entry(service.service_name).or_default();
                for span_config in service.span_configs {
                    let label = if span_config.label.is_empty() {
                        uuid::Uuid::new_v4().to_string()
                    } else {
                        span_config.label
                    };
                    labeled.push(LabeledCriteria {
                        label,
                        criteria: span_config.criteria,
                    });
                }
            }
        }
        SpanCounterProcessor {
            tenant_id_attribute_key: config.tenant_id_attribute_key,
            criteria,
            matching_spans: meter
                .u64_counter(MATCHING_SPANS_METRIC)
                .with_description("Spans matching the configured criteria")
                .build(),
        }
    }

    /// Labels configured for `tenant_id` and `service_name`, in configuration
    /// order.
    pub fn labels(&self, tenant_id: &str, service_name: &str) -> Vec<&str> {
        self.criteria
            .get(tenant_id)
            .and_then(|services| services.get(service_name))
            .map(|labeled| labeled.iter().map(|l| l.label.as_str()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Processor for SpanCounterProcessor {
    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_ONLY
    }
}

#[async_trait]
impl TracesProcessor for SpanCounterProcessor {
    async fn process_traces(
        &self,
        _cx: &mut BatchContext,
        traces: &mut TracesData,
    ) -> ProcessorResult<()> {
        if self.criteria.is_empty() {
            return Ok(());
        }
        // (tenant, service, label) -> count
        let mut counts: HashMap<(&str, &str, &str), u64> = HashMap::new();
        for resource_spans in &traces.resource_spans {
            let Some(resource) = resource_spans.resource.as_ref() else {
                continue;
            };
            let Some(tenant_id) = resource.attributes.find_str(&self.tenant_id_attribute_key) else {
                continue;
            };
            let Some(services) = self.criteria.get(tenant_id) else {
                continue;
            };
            let Some(service_name) = resource.attributes.find_str(SERVICE_NAME) else {
                continue;
            };
            let Some(labeled) = services.get(service_name) else {
                continue;
            };
            for span in resource_spans.scope_spans.iter().flat_map(|ss| ss.spans.iter()) {
                for criteria in labeled.iter().filter(|l| l.criteria.matches(span)) {
                    *counts
                        .entry((tenant_id, service_name, criteria.label.as_str()))
                        .or_default() += 1;
                }
            }
        }

        for ((tenant_id, service_name, label), count) in counts {
            otel_debug!(
                name: "SpanCounter.Matched",
                tenant_id = tenant_id,
                service_name = service_name,
                label = label,
                count = count
            );
            self.matching_spans.add(
                count,
                &[
                    opentelemetry::KeyValue::new(TENANT_ID_DIMENSION, tenant_id.to_string()),
                    opentelemetry::KeyValue::new(SERVICE_NAME, service_name.to_string()),
                    opentelemetry::KeyValue::new(SPAN_CRITERIA_LABEL_DIMENSION, label.to_string()),
                ],
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServiceConfig, SpanConfig, TenantConfig};

    #[test]
    fn empty_labels_get_a_uuid() {
        let processor = SpanCounterProcessor::new(Config {
            tenant_configs: vec![TenantConfig {
                tenant_id: "acme".into(),
                service_configs: vec![ServiceConfig {
                    service_name: "checkout".into(),
                    span_configs: vec![SpanConfig::default(), SpanConfig::default()],
                }],
            }],
            ..Default::default()
        });

        let labels = processor.labels("acme", "checkout");
        assert_eq!(labels.len(), 2);
        assert_ne!(labels[0], labels[1]);
        assert!(uuid::Uuid::parse_str(labels[0]).is_ok());
        assert!(processor.labels("acme", "cart").is_empty());
    }
}

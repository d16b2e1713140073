use htcollector::attributes::string_attribute;
use htcollector::proto::trace::TracesData;
use htcollector::testing::{span, traces, MetricsTestContext};
use htcollector::{BatchContext, Capabilities, Processor, TracesProcessor};
use htcollector_spancounter::{Config, SpanCounterProcessor};

const CONFIG: &str = r#"
tenant_configs:
  - tenant_id: acme
    service_configs:
      - service_name: checkout
        span_configs:
          - label: failed-logins
            span_name: POST /login
            span_attributes:
              - key: http.status_code
                value: "401"
          - label: any-db
            span_attributes:
              - key: db.system
"#;

fn batch(tenant: &str, service: &str) -> TracesData {
    traces(
        vec![
            string_attribute("tenant-id", tenant),
            string_attribute("service.name", service),
        ],
        vec![
            span(
                "POST /login",
                1,
                vec![string_attribute("http.status_code", "401")],
            ),
            span(
                "POST /login",
                2,
                vec![string_attribute("http.status_code", "200")],
            ),
            span("GET /cart", 3, vec![string_attribute("http.status_code", "401")]),
            span("SELECT", 4, vec![string_attribute("db.system", "postgresql")]),
            span("INSERT", 5, vec![string_attribute("db.system", "mysql")]),
        ],
    )
}

#[tokio::test]
async fn counts_matching_spans_per_label() {
    let metrics = MetricsTestContext::new();
    let config: Config = serde_yaml::from_str(CONFIG).unwrap();
    let processor = SpanCounterProcessor::with_meter(config, metrics.meter());
    let mut traces = batch("acme", "checkout");
    let before = traces.clone();

    processor
        .process_traces(&mut BatchContext::new(), &mut traces)
        .await
        .unwrap();
    processor
        .process_traces(&mut BatchContext::new(), &mut traces)
        .await
        .unwrap();

    assert_eq!(traces, before);
    let dims = |label| {
        [
            ("tenant-id", "acme"),
            ("service.name", "checkout"),
            ("span-criteria-label", label),
        ]
    };
    assert_eq!(
        metrics.u64_sum("spancounter.matching_spans", &dims("failed-logins")),
        Some(2)
    );
    assert_eq!(
        metrics.u64_sum("spancounter.matching_spans", &dims("any-db")),
        Some(4)
    );
}

#[tokio::test]
async fn unknown_tenant_or_service_is_ignored() {
    let metrics = MetricsTestContext::new();
    let config: Config = serde_yaml::from_str(CONFIG).unwrap();
    let processor = SpanCounterProcessor::with_meter(config, metrics.meter());

    for (tenant, service) in [("globex", "checkout"), ("acme", "cart")] {
        processor
            .process_traces(&mut BatchContext::new(), &mut batch(tenant, service))
            .await
            .unwrap();
    }

    assert_eq!(
        metrics.u64_sum(
            "spancounter.matching_spans",
            &[
                ("tenant-id", "acme"),
                ("service.name", "checkout"),
                ("span-criteria-label", "any-db"),
            ]
        ),
        None
    );
}

#[test]
fn is_read_only() {
    let processor = SpanCounterProcessor::new(Config::default());
    assert_eq!(processor.capabilities(), Capabilities::READ_ONLY);
}

use super::model::{KeyValue, Log, Process, Span, SpanRef, SpanRefType};
use crate::error::MarshalError;
use htcollector::attributes::{as_str, to_json, AttributesExt};
use htcollector::proto::any_value::Value;
use htcollector::proto::trace::{span, status, ResourceSpans, TracesData};
use htcollector::proto::{self, InstrumentationScope};
use opentelemetry_semantic_conventions::resource::SERVICE_NAME;

const DEFAULT_SERVICE_NAME: &str = "unknown_service";
const INSTRUMENTATION_LIBRARY_NAME: &str = "otel.library.name";
const INSTRUMENTATION_LIBRARY_VERSION: &str = "otel.library.version";
const ERROR: &str = "error";
const SPAN_KIND: &str = "span.kind";
const OTEL_STATUS_CODE: &str = "otel.status_code";
const OTEL_STATUS_DESCRIPTION: &str = "otel.status_description";
const EVENT: &str = "event";

/// Spans of a batch in the Jaeger model, each carrying its process, and the
/// spans that could not be translated.
#[derive(Debug, Default)]
pub struct Translated {
    /// Translated spans, in batch order.
    pub spans: Vec<Span>,
    /// Spans with malformed ids.
    pub errors: Vec<MarshalError>,
}

/// Translates every span of `traces` into the Jaeger model.
pub fn translate(traces: &TracesData) -> Translated {
    let mut translated = Translated::default();
    for resource_spans in &traces.resource_spans {
        let process = resource_to_process(resource_spans);
        for scope_spans in &resource_spans.scope_spans {
            for otlp_span in &scope_spans.spans {
                match convert_span(otlp_span, scope_spans.scope.as_ref(), &process) {
                    Ok(span) => translated.spans.push(span),
                    Err(err) => translated.errors.push(err),
                }
            }
        }
    }
    translated
}

fn resource_to_process(resource_spans: &ResourceSpans) -> Process {
    let attributes = resource_spans
        .resource
        .as_ref()
        .map(|resource| resource.attributes.as_slice())
        .unwrap_or_default();
    let service_name = attributes
        .iter()
        .find(|kv| kv.key == SERVICE_NAME)
        .and_then(|kv| kv.value.as_ref())
        .and_then(as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_SERVICE_NAME);
    Process {
        service_name: service_name.to_string(),
        tags: attributes
            .iter()
            .filter(|kv| kv.key != SERVICE_NAME)
            .map(attribute_to_tag)
            .collect(),
    }
}

fn convert_span(
    otlp_span: &proto::trace::Span,
    scope: Option<&InstrumentationScope>,
    process: &Process,
) -> Result<Span, MarshalError> {
    if otlp_span.trace_id.len() != 16 {
        return Err(MarshalError::InvalidTraceId {
            span_id: const_hex::encode(&otlp_span.span_id),
            len: otlp_span.trace_id.len(),
        });
    }
    if otlp_span.span_id.len() != 8 {
        return Err(MarshalError::InvalidSpanId {
            trace_id: const_hex::encode(&otlp_span.trace_id),
            len: otlp_span.span_id.len(),
        });
    }

    let mut references = Vec::with_capacity(otlp_span.links.len() + 1);
    if otlp_span.parent_span_id.len() == 8 {
        references.push(SpanRef {
            trace_id: otlp_span.trace_id.clone(),
            span_id: otlp_span.parent_span_id.clone(),
            ref_type: SpanRefType::ChildOf as i32,
        });
    }
    references.extend(links_to_references(&otlp_span.links));

    Ok(Span {
        trace_id: otlp_span.trace_id.clone(),
        span_id: otlp_span.span_id.clone(),
        operation_name: otlp_span.name.clone(),
        references,
        flags: otlp_span.flags & 0xff,
        start_time: Some(timestamp(otlp_span.start_time_unix_nano)),
        duration: Some(duration(
            otlp_span
                .end_time_unix_nano
                .saturating_sub(otlp_span.start_time_unix_nano),
        )),
        tags: build_span_tags(otlp_span, scope),
        logs: events_to_logs(&otlp_span.events),
        process: Some(process.clone()),
        ..Default::default()
    })
}

fn links_to_references(links: &[span::Link]) -> impl Iterator<Item = SpanRef> + '_ {
    links
        .iter()
        .filter(|link| link.trace_id.len() == 16 && link.span_id.len() == 8)
        .map(|link| SpanRef {
            trace_id: link.trace_id.clone(),
            span_id: link.span_id.clone(),
            ref_type: SpanRefType::FollowsFrom as i32,
        })
}

fn build_span_tags(otlp_span: &proto::trace::Span, scope: Option<&InstrumentationScope>) -> Vec<KeyValue> {
    let attributes = &otlp_span.attributes;
    let mut tags: Vec<KeyValue> = attributes.iter().map(attribute_to_tag).collect();

    if let Some(scope) = scope.filter(|scope| !scope.name.is_empty()) {
        tags.push(KeyValue::string(INSTRUMENTATION_LIBRARY_NAME, scope.name.as_str()));
        if !scope.version.is_empty() {
            tags.push(KeyValue::string(INSTRUMENTATION_LIBRARY_VERSION, scope.version.as_str()));
        }
    }

    if !attributes.contains_key(SPAN_KIND) {
        if let Some(kind) = format_span_kind(otlp_span.kind()) {
            tags.push(KeyValue::string(SPAN_KIND, kind));
        }
    }

    if let Some(status) = otlp_span.status.as_ref() {
        match status.code() {
            status::StatusCode::Unset => {}
            status::StatusCode::Ok => {
                if !attributes.contains_key(OTEL_STATUS_CODE) {
                    tags.push(KeyValue::string(OTEL_STATUS_CODE, "OK"));
                }
            }
            status::StatusCode::Error => {
                if !attributes.contains_key(ERROR) {
                    tags.push(KeyValue::bool(ERROR, true));
                }
                if !attributes.contains_key(OTEL_STATUS_CODE) {
                    tags.push(KeyValue::string(OTEL_STATUS_CODE, "ERROR"));
                }
                if !status.message.is_empty() && !attributes.contains_key(OTEL_STATUS_DESCRIPTION) {
                    tags.push(KeyValue::string(OTEL_STATUS_DESCRIPTION, status.message.as_str()));
                }
            }
        }
    }

    tags
}

fn format_span_kind(kind: span::SpanKind) -> Option<&'static str> {
    match kind {
        span::SpanKind::Client => Some("client"),
        span::SpanKind::Server => Some("server"),
        span::SpanKind::Producer => Some("producer"),
        span::SpanKind::Consumer => Some("consumer"),
        span::SpanKind::Internal | span::SpanKind::Unspecified => None,
    }
}

fn events_to_logs(events: &[span::Event]) -> Vec<Log> {
    events
        .iter()
        .map(|event| {
            let mut fields = Vec::with_capacity(event.attributes.len() + 1);
            if !event.name.is_empty() {
                fields.push(KeyValue::string(EVENT, event.name.as_str()));
            }
            fields.extend(event.attributes.iter().map(attribute_to_tag));
            Log {
                timestamp: Some(timestamp(event.time_unix_nano)),
                fields,
            }
        })
        .collect()
}

fn attribute_to_tag(kv: &proto::KeyValue) -> KeyValue {
    let key = kv.key.clone();
    match kv.value.as_ref().and_then(|v| v.value.as_ref()) {
        Some(Value::StringValue(s)) => KeyValue::string(key, s.as_str()),
        Some(Value::BoolValue(b)) => KeyValue::bool(key, *b),
        Some(Value::IntValue(i)) => KeyValue::int64(key, *i),
        Some(Value::DoubleValue(d)) => KeyValue::float64(key, *d),
        Some(Value::BytesValue(b)) => KeyValue::binary(key, b.clone()),
        Some(Value::ArrayValue(_)) | Some(Value::KvlistValue(_)) => {
            let json = kv.value.as_ref().map(to_json).unwrap_or_default();
            KeyValue::string(key, json.to_string())
        }
        None => KeyValue::string(key, ""),
    }
}

const NANOS_PER_SECOND: u64 = 1_000_000_000;

fn timestamp(unix_nanos: u64) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: (unix_nanos / NANOS_PER_SECOND) as i64,
        nanos: (unix_nanos % NANOS_PER_SECOND) as i32,
    }
}

fn duration(nanos: u64) -> prost_types::Duration {
    prost_types::Duration {
        seconds: (nanos / NANOS_PER_SECOND) as i64,
        nanos: (nanos % NANOS_PER_SECOND) as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use htcollector::attributes::string_attribute;
    use htcollector::proto::trace::Status;
    use htcollector::testing::{span as test_span, traces};

    fn assert_tag(tags: &[KeyValue], key: &str, expected: Option<&str>) {
        let values: Vec<String> = tags
            .iter()
            .filter(|tag| tag.key == key)
            .map(KeyValue::value_text)
            .collect();
        match expected {
            Some(expected) => assert_eq!(values, vec![expected.to_string()], "{key}"),
            None => assert!(values.is_empty(), "unexpected tag {key}: {values:?}"),
        }
    }

    fn with_status(code: status::StatusCode, message: &str) -> proto::trace::Span {
        let mut span = test_span("op", 1, vec![]);
        span.kind = span::SpanKind::Client as i32;
        span.status = Some(Status {
            message: message.to_string(),
            code: code as i32,
        });
        span
    }

    #[test]
    fn status_tags() {
        let cases = [
            (status::StatusCode::Error, "", Some("ERROR"), None, Some("true")),
            (status::StatusCode::Unset, "", None, None, None),
            (status::StatusCode::Ok, "", Some("OK"), None, None),
            (
                status::StatusCode::Error,
                "have message",
                Some("ERROR"),
                Some("have message"),
                Some("true"),
            ),
        ];
        for (code, message, status_code, description, error) in cases {
            let tags = build_span_tags(&with_status(code, message), None);
            assert_tag(&tags, OTEL_STATUS_CODE, status_code);
            assert_tag(&tags, OTEL_STATUS_DESCRIPTION, description);
            assert_tag(&tags, ERROR, error);
            assert_tag(&tags, SPAN_KIND, Some("client"));
        }
    }

    #[test]
    fn user_set_values_win() {
        let mut span = with_status(status::StatusCode::Error, "Something bad happened");
        span.attributes = vec![
            string_attribute(SPAN_KIND, "server"),
            string_attribute(OTEL_STATUS_CODE, "ERROR"),
            string_attribute(OTEL_STATUS_DESCRIPTION, "custom"),
        ];

        let tags = build_span_tags(&span, None);

        assert_tag(&tags, SPAN_KIND, Some("server"));
        assert_tag(&tags, OTEL_STATUS_DESCRIPTION, Some("custom"));
        assert_tag(&tags, ERROR, Some("true"));
    }

    #[test]
    fn translates_process_references_and_events() {
        let mut otlp_span = test_span("GET /", 2, vec![string_attribute("http.method", "GET")]);
        otlp_span.parent_span_id = vec![1; 8];
        otlp_span.links.push(span::Link {
            trace_id: vec![7; 16],
            span_id: vec![8; 8],
            ..Default::default()
        });
        otlp_span.events.push(span::Event {
            time_unix_nano: 1_700_000_000_100_000_000,
            name: "retry".into(),
            attributes: vec![string_attribute("attempt", "2")],
            ..Default::default()
        });
        let mut batch = traces(
            vec![
                string_attribute("service.name", "checkout"),
                string_attribute("host.name", "node-1"),
            ],
            vec![otlp_span],
        );
        batch.resource_spans[0].scope_spans[0].scope = Some(InstrumentationScope {
            name: "tracer".into(),
            version: "1.0".into(),
            ..Default::default()
        });

        let translated = translate(&batch);

        assert!(translated.errors.is_empty());
        let span = &translated.spans[0];
        let process = span.process.as_ref().unwrap();
        assert_eq!(process.service_name, "checkout");
        assert_eq!(process.tags, vec![KeyValue::string("host.name", "node-1")]);
        assert_eq!(span.references.len(), 2);
        assert_eq!(span.references[0].ref_type(), SpanRefType::ChildOf);
        assert_eq!(span.references[0].span_id, vec![1; 8]);
        assert_eq!(span.references[1].ref_type(), SpanRefType::FollowsFrom);
        assert_eq!(span.start_time.as_ref().unwrap().seconds, 1_700_000_000);
        assert_eq!(span.duration.as_ref().unwrap().nanos, 250_000_000);
        assert_tag(&span.tags, INSTRUMENTATION_LIBRARY_NAME, Some("tracer"));
        assert_tag(&span.tags, INSTRUMENTATION_LIBRARY_VERSION, Some("1.0"));
        assert_tag(&span.tags, "http.method", Some("GET"));
        assert_tag(&span.tags, SPAN_KIND, None);
        assert_eq!(
            span.logs[0].fields,
            vec![KeyValue::string("event", "retry"), KeyValue::string("attempt", "2")]
        );
    }

    #[test]
    fn malformed_ids_are_reported() {
        let mut bad_trace = test_span("a", 1, vec![]);
        bad_trace.trace_id = vec![1, 2, 3];
        let mut bad_span = test_span("b", 2, vec![]);
        bad_span.span_id.clear();

        let translated = translate(&traces(vec![], vec![bad_trace, test_span("c", 3, vec![]), bad_span]));

        assert_eq!(translated.spans.len(), 1);
        assert_eq!(translated.spans[0].operation_name, "c");
        assert_eq!(translated.spans[0].process.as_ref().unwrap().service_name, "unknown_service");
        assert_eq!(
            translated.errors[0],
            MarshalError::InvalidTraceId {
                span_id: "0101010101010101".into(),
                len: 3
            }
        );
        assert!(matches!(translated.errors[1], MarshalError::InvalidSpanId { len: 0, .. }));
    }
}

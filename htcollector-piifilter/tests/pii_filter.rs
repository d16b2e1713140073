use htcollector::attributes::{string_attribute, AttributesExt};
use htcollector::proto::trace::TracesData;
use htcollector::testing::{all_spans, span, traces};
use htcollector::{BatchContext, ParsedTraceData, RedactionStrategy, TracesProcessor};
use htcollector_piifilter::{
    ComplexDataType, Config, PiiComplexData, PiiElement, PiiFilterProcessor,
};

fn rule(regex: &str) -> PiiElement {
    PiiElement {
        regex: regex.to_string(),
        ..Default::default()
    }
}

fn batch(attributes: &[(&str, &str)]) -> TracesData {
    traces(
        vec![],
        vec![span(
            "GET /login",
            7,
            attributes
                .iter()
                .map(|(k, v)| string_attribute(*k, *v))
                .collect(),
        )],
    )
}

async fn process(config: Config, traces: &mut TracesData) -> BatchContext {
    let processor = PiiFilterProcessor::new(config).unwrap();
    let mut cx = BatchContext::new();
    processor.process_traces(&mut cx, traces).await.unwrap();
    cx
}

fn attribute(traces: &TracesData, key: &str) -> Option<String> {
    all_spans(traces)
        .next()
        .and_then(|span| span.attributes.find_str(key))
        .map(str::to_string)
}

#[tokio::test]
async fn key_regex_redacts_header() {
    let mut traces = batch(&[("http.request.header.password", "abc123")]);

    let cx = process(
        Config {
            key_regexs: vec![rule("^http.request.header.*")],
            ..Default::default()
        },
        &mut traces,
    )
    .await;

    assert_eq!(
        attribute(&traces, "http.request.header.password").as_deref(),
        Some("***")
    );
    let parsed = cx.extensions().get::<ParsedTraceData>().unwrap();
    let span_data = parsed.span(&[0x5b; 16], &[7; 8]).unwrap();
    assert_eq!(
        span_data["http.request.header.password"].redacted["http.request.header.password"],
        "abc123"
    );
}

#[tokio::test]
async fn value_regex_redacts_card_number() {
    let mut traces = batch(&[("payment.note", "4111 2222 3333 4444")]);

    process(
        Config {
            value_regexs: vec![rule(r"(?:\d[ -]*?){13,16}")],
            ..Default::default()
        },
        &mut traces,
    )
    .await;

    assert_eq!(attribute(&traces, "payment.note").as_deref(), Some("***"));
}

#[tokio::test]
async fn json_body_selected_by_content_type() {
    let mut traces = batch(&[
        ("http.request.header.content-type", "application/json"),
        (
            "http.request.body",
            r#"{"a":[{"b":"1"},{"password":["12","34","56"]}]}"#,
        ),
    ]);

    let cx = process(
        Config {
            key_regexs: vec![PiiElement {
                fqn: true,
                ..rule(r"^\$\.a\[1\]\.password\[1\]$")
            }],
            complex_data: vec![PiiComplexData {
                key: "http.request.body".into(),
                data_type: None,
                type_key: Some("http.request.header.content-type".into()),
            }],
            ..Default::default()
        },
        &mut traces,
    )
    .await;

    assert_eq!(
        attribute(&traces, "http.request.body").as_deref(),
        Some(r#"{"a":[{"b":"1"},{"password":["12","***","56"]}]}"#)
    );
    let parsed = cx.extensions().get::<ParsedTraceData>().unwrap();
    let body = &parsed.span(&[0x5b; 16], &[7; 8]).unwrap()["http.request.body"];
    assert_eq!(body.redacted["$.a[1].password[1]"], "34");
}

#[tokio::test]
async fn sql_literals_are_redacted() {
    let mut traces = batch(&[(
        "sql.query",
        "select password from user where name = 'dave' or name =\"bob\";",
    )]);

    process(Config::default(), &mut traces).await;

    assert_eq!(
        attribute(&traces, "sql.query").as_deref(),
        Some("select password from user where name = '***' or name =\"***\";")
    );
}

#[tokio::test]
async fn session_identifier_adds_session_attribute() {
    let mut traces = batch(&[("http.request.header.cookie", "theme=dark; sid=abc")]);

    process(
        Config {
            redaction_strategy: RedactionStrategy::Hash,
            key_regexs: vec![PiiElement {
                session_identifier: true,
                ..rule("^sid$")
            }],
            ..Default::default()
        },
        &mut traces,
    )
    .await;

    let digest = "a9993e364706816aba3e25717850c26c9cd0d89d";
    assert_eq!(
        attribute(&traces, "http.request.header.cookie"),
        Some(format!("theme=dark; sid={digest}"))
    );
    assert_eq!(attribute(&traces, "session.id").as_deref(), Some(digest));
}

#[tokio::test]
async fn malformed_structured_value_falls_through_to_key_value() {
    let mut traces = batch(&[("rpc.request", "{not json password=hunter2")]);

    process(
        Config {
            value_regexs: vec![rule("hunter2")],
            complex_data: vec![PiiComplexData {
                key: "rpc.request".into(),
                data_type: Some(ComplexDataType::Json),
                type_key: None,
            }],
            ..Default::default()
        },
        &mut traces,
    )
    .await;

    assert_eq!(
        attribute(&traces, "rpc.request").as_deref(),
        Some("{not json password=***")
    );
}

#[tokio::test]
async fn untouched_batch_has_no_redactions() {
    let mut traces = batch(&[("http.method", "GET"), ("http.request.header.cookie", "novalue")]);
    let before = traces.clone();

    let cx = process(
        Config {
            key_regexs: vec![rule("^password$")],
            ..Default::default()
        },
        &mut traces,
    )
    .await;

    assert_eq!(traces, before);
    let parsed = cx.extensions().get::<ParsedTraceData>().unwrap();
    let span_data = parsed.span(&[0x5b; 16], &[7; 8]).unwrap();
    assert!(span_data.values().all(|attribute| !attribute.is_redacted()));
}

#[test]
fn invalid_regex_is_rejected() {
    let config = Config {
        value_regexs: vec![rule("[")],
        ..Default::default()
    };
    assert!(PiiFilterProcessor::new(config).is_err());
}

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use htcollector::attributes::{string_attribute, AttributesExt};
use htcollector::proto::trace::TracesData;
use htcollector::testing::{all_spans, span, traces};
use htcollector::{BatchContext, HashAlgorithm, TracesProcessor};
use htcollector_enduser::{Config, EndUserConfig, EndUserProcessor, EndUserType};

fn jwt(claims: &str) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims),
        URL_SAFE_NO_PAD.encode("signature")
    )
}

fn bearer_rule() -> EndUserConfig {
    EndUserConfig {
        key: "http.request.header.authorization".into(),
        kind: EndUserType::Authheader,
        id_claims: vec!["sub".into()],
        role_claims: vec!["role".into()],
        scope_claims: vec!["scope".into()],
        ..Default::default()
    }
}

async fn process(config: Config, traces: &mut TracesData) {
    let processor = EndUserProcessor::new(config).unwrap();
    processor
        .process_traces(&mut BatchContext::new(), traces)
        .await
        .unwrap();
}

#[tokio::test]
async fn bearer_token_populates_identity() {
    let token = jwt(r#"{"sub":"dave","role":"user","scope":"traceable"}"#);
    let mut traces = traces(
        vec![],
        vec![span(
            "GET /",
            1,
            vec![string_attribute(
                "http.request.header.authorization",
                format!("Bearer {token}"),
            )],
        )],
    );

    process(
        Config {
            end_users: vec![bearer_rule()],
        },
        &mut traces,
    )
    .await;

    let span = all_spans(&traces).next().unwrap();
    assert_eq!(span.attributes.find_str("enduser.id"), Some("dave"));
    assert_eq!(span.attributes.find_str("enduser.role"), Some("user"));
    assert_eq!(span.attributes.find_str("enduser.scope"), Some("traceable"));
    let expected_session = HashAlgorithm::Sha1.hash(&token);
    assert_eq!(
        span.attributes.find_str("session.id"),
        Some(expected_session.as_str())
    );
}

#[tokio::test]
async fn existing_attributes_are_kept() {
    let token = jwt(r#"{"sub":"dave","role":"user"}"#);
    let mut traces = traces(
        vec![],
        vec![span(
            "GET /",
            1,
            vec![
                string_attribute("enduser.id", "already-known"),
                string_attribute("http.request.header.authorization[0]", format!("Bearer {token}")),
            ],
        )],
    );

    process(
        Config {
            end_users: vec![bearer_rule()],
        },
        &mut traces,
    )
    .await;

    let span = all_spans(&traces).next().unwrap();
    assert_eq!(span.attributes.find_str("enduser.id"), Some("already-known"));
    assert_eq!(span.attributes.find_str("enduser.role"), Some("user"));
    assert_eq!(
        span.attributes
            .iter()
            .filter(|kv| kv.key == "enduser.id")
            .count(),
        1
    );
}

#[tokio::test]
async fn rule_with_failed_condition_is_skipped() {
    let token = jwt(r#"{"sub":"dave"}"#);
    let mut traces = traces(
        vec![],
        vec![span(
            "GET /",
            1,
            vec![
                string_attribute("http.method", "GET"),
                string_attribute("http.request.header.authorization", format!("Bearer {token}")),
            ],
        )],
    );
    let before = traces.clone();

    let config: Config = serde_yaml::from_str(
        r#"
end_users:
  - key: http.request.header.authorization
    type: authheader
    id_claims: [sub]
    conditions:
      - key: http.method
        regex: ^POST$
"#,
    )
    .unwrap();
    process(config, &mut traces).await;

    assert_eq!(traces, before);
}

#[tokio::test]
async fn unparseable_token_leaves_span_untouched() {
    let mut traces = traces(
        vec![],
        vec![span(
            "GET /",
            1,
            vec![string_attribute(
                "http.request.header.authorization",
                "Bearer not-a-jwt",
            )],
        )],
    );
    let before = traces.clone();

    process(
        Config {
            end_users: vec![bearer_rule()],
        },
        &mut traces,
    )
    .await;

    assert_eq!(traces, before);
}

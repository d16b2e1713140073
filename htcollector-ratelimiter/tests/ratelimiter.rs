use async_trait::async_trait;
use htcollector::testing::{span, traces, MetricsTestContext};
use htcollector::{BatchContext, Processor, ProcessorError, TracesProcessor};
use htcollector_ratelimiter::proto::rate_limit_response::Code;
use htcollector_ratelimiter::proto::{RateLimitRequest, RateLimitResponse};
use htcollector_ratelimiter::{Config, RateLimitClient, RateLimiterProcessor};
use http::{HeaderMap, HeaderValue};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct MockClient {
    requests: Mutex<Vec<RateLimitRequest>>,
    reply: Result<Code, tonic::Code>,
    delay: Duration,
}

impl MockClient {
    fn replying(reply: Result<Code, tonic::Code>) -> Arc<Self> {
        Arc::new(MockClient {
            requests: Mutex::new(Vec::new()),
            reply,
            delay: Duration::ZERO,
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(MockClient {
            requests: Mutex::new(Vec::new()),
            reply: Ok(Code::OverLimit),
            delay,
        })
    }

    fn requests(&self) -> Vec<RateLimitRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RateLimitClient for MockClient {
    async fn should_rate_limit(
        &self,
        request: RateLimitRequest,
    ) -> Result<RateLimitResponse, tonic::Status> {
        self.requests.lock().unwrap().push(request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.reply {
            Ok(code) => Ok(RateLimitResponse {
                overall_code: code as i32,
                statuses: vec![],
            }),
            Err(code) => Err(tonic::Status::new(code, "rate limit service unavailable")),
        }
    }
}

fn tenant_context(tenant: Option<&'static str>) -> BatchContext {
    let mut metadata = HeaderMap::new();
    if let Some(tenant) = tenant {
        metadata.insert("x-tenant-id", HeaderValue::from_static(tenant));
    }
    BatchContext::new().with_metadata(metadata)
}

fn three_spans() -> htcollector::proto::trace::TracesData {
    traces(
        vec![],
        vec![span("a", 1, vec![]), span("b", 2, vec![]), span("c", 3, vec![])],
    )
}

#[tokio::test]
async fn over_limit_drops_batch_and_counts() {
    let metrics = MetricsTestContext::new();
    let client = MockClient::replying(Ok(Code::OverLimit));
    let processor =
        RateLimiterProcessor::with_meter(Config::default(), metrics.meter()).with_client(client.clone());
    let mut batch = three_spans();

    processor
        .process_traces(&mut tenant_context(Some("acme")), &mut batch)
        .await
        .unwrap();

    assert!(batch.resource_spans.is_empty());
    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].domain, "collector");
    assert_eq!(requests[0].hits_addend, 3);
    let entry = &requests[0].descriptors[0].entries[0];
    assert_eq!((entry.key.as_str(), entry.value.as_str()), ("tenant_spans", "acme"));
    assert_eq!(
        metrics.u64_sum("ratelimiter.dropped_spans", &[("tenant-id", "acme")]),
        Some(3)
    );
}

#[tokio::test]
async fn under_limit_forwards_batch() {
    let processor = RateLimiterProcessor::new(Config::default())
        .with_client(MockClient::replying(Ok(Code::Ok)));
    let mut batch = three_spans();
    let before = batch.clone();

    processor
        .process_traces(&mut tenant_context(Some("acme")), &mut batch)
        .await
        .unwrap();

    assert_eq!(batch, before);
}

#[tokio::test]
async fn missing_tenant_makes_no_call() {
    let client = MockClient::replying(Ok(Code::OverLimit));
    let processor = RateLimiterProcessor::new(Config::default()).with_client(client.clone());
    let mut batch = three_spans();
    let before = batch.clone();

    processor
        .process_traces(&mut tenant_context(None), &mut batch)
        .await
        .unwrap();

    assert_eq!(batch, before);
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn empty_tenant_makes_no_call() {
    let client = MockClient::replying(Ok(Code::OverLimit));
    let processor = RateLimiterProcessor::new(Config::default()).with_client(client.clone());
    let mut batch = three_spans();
    let before = batch.clone();

    processor
        .process_traces(&mut tenant_context(Some("")), &mut batch)
        .await
        .unwrap();

    assert_eq!(batch, before);
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn service_errors_fail_open() {
    let processor = RateLimiterProcessor::new(Config::default())
        .with_client(MockClient::replying(Err(tonic::Code::Unavailable)));
    let mut batch = three_spans();
    let before = batch.clone();

    processor
        .process_traces(&mut tenant_context(Some("acme")), &mut batch)
        .await
        .unwrap();

    assert_eq!(batch, before);
}

#[tokio::test]
async fn slow_service_fails_open_after_timeout() {
    let processor = RateLimiterProcessor::new(Config {
        timeout_millis: 10,
        ..Default::default()
    })
    .with_client(MockClient::slow(Duration::from_millis(500)));
    let mut batch = three_spans();

    processor
        .process_traces(&mut tenant_context(Some("acme")), &mut batch)
        .await
        .unwrap();

    assert_eq!(batch.resource_spans[0].scope_spans[0].spans.len(), 3);
}

#[tokio::test]
async fn caller_deadline_is_surfaced() {
    let processor = RateLimiterProcessor::new(Config::default())
        .with_client(MockClient::slow(Duration::from_millis(500)));
    let mut cx = tenant_context(Some("acme")).with_deadline(Instant::now() + Duration::from_millis(10));
    let mut batch = three_spans();

    let err = processor
        .process_traces(&mut cx, &mut batch)
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessorError::DeadlineExceeded));
}

#[tokio::test]
async fn unreachable_service_fails_open() {
    let processor = RateLimiterProcessor::new(Config {
        service_port: 1,
        timeout_millis: 200,
        ..Default::default()
    });
    processor.start().await.unwrap();
    let mut batch = three_spans();
    let before = batch.clone();

    processor
        .process_traces(&mut tenant_context(Some("acme")), &mut batch)
        .await
        .unwrap();
    assert_eq!(batch, before);

    processor.shutdown().await.unwrap();
    assert!(matches!(
        processor.shutdown().await,
        Err(ProcessorError::AlreadyShutdown)
    ));
    assert!(matches!(
        processor
            .process_traces(&mut tenant_context(Some("acme")), &mut batch)
            .await,
        Err(ProcessorError::AlreadyShutdown)
    ));
}

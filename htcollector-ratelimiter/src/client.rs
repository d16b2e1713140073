use crate::proto::rate_limit_service_client::RateLimitServiceClient;
use crate::proto::{RateLimitRequest, RateLimitResponse};
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};

/// Asks a rate limit service whether a request should be limited.
#[async_trait]
pub trait RateLimitClient: Send + Sync + Debug {
    /// Issues a single `ShouldRateLimit` call.
    async fn should_rate_limit(
        &self,
        request: RateLimitRequest,
    ) -> Result<RateLimitResponse, tonic::Status>;
}

/// [`RateLimitClient`] talking gRPC to an envoy compatible rate limit service.
///
/// The channel connects lazily and reconnects on failure; clones share the
/// same connection.
#[derive(Debug, Clone)]
pub struct GrpcRateLimitClient {
    inner: RateLimitServiceClient<Channel>,
}

impl GrpcRateLimitClient {
    /// Creates a client for `endpoint` without connecting. Must be called
    /// from within a tokio runtime.
    pub fn connect_lazy(endpoint: String, timeout: Duration) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(endpoint)?
            .timeout(timeout)
            .connect_lazy();
        Ok(GrpcRateLimitClient {
            inner: RateLimitServiceClient::new(channel),
        })
    }
}

#[async_trait]
impl RateLimitClient for GrpcRateLimitClient {
    async fn should_rate_limit(
        &self,
        request: RateLimitRequest,
    ) -> Result<RateLimitResponse, tonic::Status> {
        let mut client = self.inner.clone();
        client
            .should_rate_limit(request)
            .await
            .map(tonic::Response::into_inner)
    }
}

//! Per-batch context handed to processors alongside the telemetry.
use http::{Extensions, HeaderMap};
use std::time::{Duration, Instant};

/// Ambient data that travels with a single batch through the processor chain.
///
/// The context is created by the host when the batch is received and dropped
/// once the batch has been exported, so anything stored in its
/// [extensions](BatchContext::extensions) has the lifetime of the batch.
#[derive(Debug, Default)]
pub struct BatchContext {
    metadata: HeaderMap,
    deadline: Option<Instant>,
    extensions: Extensions,
}

impl BatchContext {
    /// Creates an empty context with no metadata and no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the inbound request metadata (gRPC metadata or HTTP headers).
    pub fn with_metadata(mut self, metadata: HeaderMap) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets the instant by which processing of the batch must complete.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The inbound request metadata.
    pub fn metadata(&self) -> &HeaderMap {
        &self.metadata
    }

    /// All values of the header `name`. Values that are not visible ASCII are
    /// skipped.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.metadata
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }

    /// The caller supplied deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, saturating at zero. `None` when the batch
    /// has no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Per-batch scratch data.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Mutable access to the per-batch scratch data.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut metadata = HeaderMap::new();
        metadata.append("x-tenant-id", HeaderValue::from_static("tenant-a"));
        metadata.append("x-tenant-id", HeaderValue::from_static("tenant-b"));

        let cx = BatchContext::new().with_metadata(metadata);

        assert_eq!(cx.header_values("X-Tenant-ID"), vec!["tenant-a", "tenant-b"]);
        assert!(cx.header_values("x-other").is_empty());
    }

    #[test]
    fn remaining_saturates_after_deadline() {
        let cx = BatchContext::new().with_deadline(Instant::now());
        assert_eq!(cx.remaining(), Some(Duration::ZERO));
        assert_eq!(BatchContext::new().remaining(), None);
    }
}

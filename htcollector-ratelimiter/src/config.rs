use serde::Deserialize;
use std::time::Duration;

/// Rate limiter configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Host of the rate limit service.
    pub service_host: String,
    /// Port of the rate limit service.
    pub service_port: u16,
    /// Rate limit domain sent with every request.
    pub domain: String,
    /// Request header holding the tenant id.
    pub tenant_id_header_name: String,
    /// Timeout of a single rate limit call.
    pub timeout_millis: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            service_host: "127.0.0.1".to_string(),
            service_port: 8081,
            domain: "collector".to_string(),
            tenant_id_header_name: "x-tenant-id".to_string(),
            timeout_millis: 1000,
        }
    }
}

impl Config {
    /// The gRPC endpoint of the rate limit service.
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.service_host, self.service_port)
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }
}

use htcollector::SpanCriteria;
use serde::Deserialize;

/// Span counter configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Resource attribute holding the tenant id.
    pub tenant_id_attribute_key: String,
    /// Criteria to count, per tenant.
    pub tenant_configs: Vec<TenantConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tenant_id_attribute_key: "tenant-id".to_string(),
            tenant_configs: Vec::new(),
        }
    }
}

/// Criteria of a single tenant.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TenantConfig {
    /// The tenant id as found on resources.
    pub tenant_id: String,
    /// Criteria per service of the tenant.
    pub service_configs: Vec<ServiceConfig>,
}

/// Criteria of a single service.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    /// The `service.name` resource attribute.
    pub service_name: String,
    /// Span criteria counted for the service.
    pub span_configs: Vec<SpanConfig>,
}

/// A labeled span criterion.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SpanConfig {
    /// Value of the `span-criteria-label` dimension. A random UUID is used
    /// when empty.
    pub label: String,
    /// Which spans to count.
    #[serde(flatten)]
    pub criteria: SpanCriteria,
}

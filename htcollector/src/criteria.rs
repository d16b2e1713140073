//! Span selection by name and attribute values.
use crate::attributes::{self, AttributesExt};
use crate::proto::trace::Span;
use serde::Deserialize;

/// An attribute that a span must carry. An empty `value` matches any value.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AttributeCriterion {
    /// Attribute key.
    pub key: String,
    /// Expected value, compared against the textual form of the attribute.
    pub value: String,
}

/// Selects spans by operation name and attributes.
///
/// A span matches when its name equals `span_name` (if set) and every entry
/// of `span_attributes` is present with the configured value.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SpanCriteria {
    /// Required span name. `None` or empty matches any name.
    pub span_name: Option<String>,
    /// Required attributes.
    pub span_attributes: Vec<AttributeCriterion>,
}

impl SpanCriteria {
    /// Whether the criteria select nothing in particular.
    pub fn is_empty(&self) -> bool {
        self.span_name.as_deref().map_or(true, str::is_empty) && self.span_attributes.is_empty()
    }

    /// Evaluates the criteria against `span`.
    pub fn matches(&self, span: &Span) -> bool {
        if let Some(name) = self.span_name.as_deref().filter(|n| !n.is_empty()) {
            if span.name != name {
                return false;
            }
        }
        self.span_attributes.iter().all(|criterion| {
            match span.attributes.find(&criterion.key) {
                Some(value) => criterion.value.is_empty() || attributes::to_text(value) == criterion.value,
                None => false,
            }
        })
    }
}

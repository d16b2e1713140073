use super::{Filter, FilterOutcome};
use crate::error::FilterError;
use crate::matcher::Matcher;
use htcollector::attributes::{to_text, unindexed_key};
use htcollector::proto::{any_value::Value, AnyValue};
use std::sync::Arc;

/// Treats the whole attribute value as a single scalar.
///
/// Key rules are matched against the unindexed key with configured prefixes
/// stripped; FQN rules against the full key. When no key rule matches, value
/// rules are applied to string values.
#[derive(Clone, Debug)]
pub struct KeyValueFilter {
    matcher: Arc<Matcher>,
}

impl KeyValueFilter {
    /// Creates a filter evaluating `matcher`.
    pub fn new(matcher: Arc<Matcher>) -> Self {
        KeyValueFilter { matcher }
    }
}

impl Filter for KeyValueFilter {
    fn name(&self) -> &'static str {
        "keyvalue"
    }

    fn redact_attribute(&self, key: &str, value: &mut AnyValue) -> Result<FilterOutcome, FilterError> {
        let mut outcome = FilterOutcome::default();
        let original = match &value.value {
            Some(Value::StringValue(s)) => s.clone(),
            Some(Value::IntValue(_)) | Some(Value::DoubleValue(_)) | Some(Value::BoolValue(_)) => {
                to_text(value)
            }
            _ => return Ok(outcome),
        };
        if original.is_empty() {
            return Ok(outcome);
        }
        outcome.parsed.record(key, original.as_str());

        let key_to_match = self.matcher.truncated_key(unindexed_key(key));
        if let Some(matched) = self.matcher.filter_key(key_to_match, key, &original, key) {
            if matched.session {
                outcome.set_session(&original);
            }
            if matched.redacted {
                value.value = Some(Value::StringValue(matched.value));
                outcome.parsed.record_redacted(key, original);
            }
            return Ok(outcome);
        }

        if let Some(Value::StringValue(current)) = &mut value.value {
            let (redacted, replaced) = self.matcher.filter_string_value(current, key, key);
            if redacted {
                *current = replaced;
                outcome.parsed.record_redacted(key, original);
            }
        }
        Ok(outcome)
    }
}

use super::{Filter, FilterOutcome};
use crate::error::FilterError;
use crate::matcher::{Matcher, Rule};
use htcollector::json::{for_each_leaf_mut, scalar_text, walk_mut, VisitorMut, Walk};
use htcollector::proto::{any_value::Value as AttributeValue, AnyValue};
use serde_json::Value;
use std::sync::Arc;

/// Redacts leaves of JSON documents.
///
/// Members and array elements are matched by key (array elements take the
/// key of the member holding the array) or, for FQN rules, by JSON path. A
/// match redacts every leaf below the matched node; scalar leaves that no rule
/// covers are scanned with the value rules.
#[derive(Clone, Debug)]
pub struct JsonFilter {
    matcher: Arc<Matcher>,
}

impl JsonFilter {
    /// Creates a filter evaluating `matcher`.
    pub fn new(matcher: Arc<Matcher>) -> Self {
        JsonFilter { matcher }
    }
}

struct Redactor<'a> {
    matcher: &'a Matcher,
    outcome: FilterOutcome,
}

impl Redactor<'_> {
    fn redact_subtree(&mut self, rule: &Rule, path: &str, node: &mut Value) {
        if rule.is_session() {
            self.outcome.set_session(&scalar_text(node));
        }
        let outcome = &mut self.outcome;
        for_each_leaf_mut(node, path, &mut |leaf_path, leaf| {
            let original = scalar_text(leaf);
            outcome.parsed.record(leaf_path, original.as_str());
            let replaced = rule.strategy().apply(&original);
            if replaced != original {
                *leaf = Value::String(replaced);
                outcome.parsed.record_redacted(leaf_path, original);
            }
        });
    }

    fn scan_scalar(&mut self, key: &str, path: &str, node: &mut Value) {
        if node.is_null() {
            return;
        }
        let original = scalar_text(node);
        self.outcome.parsed.record(path, original.as_str());
        if !(node.is_string() || node.is_number()) {
            return;
        }
        let (redacted, replaced) = self.matcher.filter_string_value(&original, key, path);
        if redacted {
            *node = Value::String(replaced);
            self.outcome.parsed.record_redacted(path, original);
        }
    }
}

impl VisitorMut for Redactor<'_> {
    fn visit(&mut self, key: &str, path: &str, node: &mut Value) -> Walk {
        let matcher = self.matcher;
        if let Some(rule) = matcher.match_key(key, path) {
            self.redact_subtree(rule, path, node);
            return Walk::Skip;
        }
        if !(node.is_object() || node.is_array()) {
            self.scan_scalar(key, path, node);
        }
        Walk::Descend
    }
}

impl Filter for JsonFilter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn redact_attribute(&self, key: &str, value: &mut AnyValue) -> Result<FilterOutcome, FilterError> {
        let Some(AttributeValue::StringValue(text)) = &mut value.value else {
            return Ok(FilterOutcome::default());
        };
        if text.trim().is_empty() {
            return Ok(FilterOutcome::default());
        }

        let mut document: Value = serde_json::from_str(text)
            .map_err(|err| FilterError::UnprocessableValue(format!("{key}: {err}")))?;

        let mut redactor = Redactor {
            matcher: &self.matcher,
            outcome: FilterOutcome::default(),
        };
        walk_mut(&mut document, &mut redactor);

        let outcome = redactor.outcome;
        if outcome.is_redacted() {
            *text = serde_json::to_string(&document)
                .map_err(|err| FilterError::Internal(format!("{key}: {err}")))?;
        }
        Ok(outcome)
    }
}

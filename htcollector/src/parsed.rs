//! Scratchpad describing what the content filters saw and changed.
use std::collections::HashMap;

/// What a filter parsed out of one attribute.
///
/// `flattened` maps every leaf (key, JSON path, cookie name, ...) to its raw
/// value after structural parsing. `redacted` maps every leaf that was changed
/// to its value *before* redaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedAttribute {
    /// Leaf key to raw value.
    pub flattened: HashMap<String, String>,
    /// Leaf key to the original, pre-redaction value.
    pub redacted: HashMap<String, String>,
}

impl ParsedAttribute {
    /// Whether any leaf was redacted.
    pub fn is_redacted(&self) -> bool {
        !self.redacted.is_empty()
    }

    /// Whether nothing was recorded at all.
    pub fn is_empty(&self) -> bool {
        self.flattened.is_empty() && self.redacted.is_empty()
    }

    /// Records a leaf seen during parsing.
    pub fn record(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.flattened.insert(key.into(), value.into());
    }

    /// Records a leaf that was redacted, keeping the first original value if
    /// the leaf is redacted more than once.
    pub fn record_redacted(&mut self, key: impl Into<String>, original: impl Into<String>) {
        self.redacted.entry(key.into()).or_insert_with(|| original.into());
    }

    /// Folds `other` into `self`. Original values already present win.
    pub fn merge(&mut self, other: ParsedAttribute) {
        for (key, value) in other.flattened {
            self.flattened.entry(key).or_insert(value);
        }
        for (key, value) in other.redacted {
            self.redacted.entry(key).or_insert(value);
        }
    }
}

/// Parsed attributes of one span, keyed by attribute key.
pub type ParsedSpanData = HashMap<String, ParsedAttribute>;

/// Hex trace id and hex span id.
type SpanKey = (String, String);

fn span_key(trace_id: &[u8], span_id: &[u8]) -> SpanKey {
    (const_hex::encode(trace_id), const_hex::encode(span_id))
}

/// Parsed attributes of every span in a batch, keyed by trace and span id.
///
/// Inserted into the [`BatchContext`](crate::BatchContext) extensions by the
/// PII filter and discarded together with the batch.
#[derive(Clone, Debug, Default)]
pub struct ParsedTraceData {
    spans: HashMap<SpanKey, ParsedSpanData>,
}

impl ParsedTraceData {
    /// Stores the parsed data of the span identified by `trace_id` and
    /// `span_id`.
    pub fn insert(&mut self, trace_id: &[u8], span_id: &[u8], data: ParsedSpanData) {
        if data.is_empty() {
            return;
        }
        self.spans
            .entry(span_key(trace_id, span_id))
            .or_default()
            .extend(data);
    }

    /// Folds the spans of `other` into `self`.
    pub fn extend(&mut self, other: ParsedTraceData) {
        for (key, data) in other.spans {
            self.spans.entry(key).or_default().extend(data);
        }
    }

    /// Parsed data of the span identified by `trace_id` and `span_id`.
    pub fn span(&self, trace_id: &[u8], span_id: &[u8]) -> Option<&ParsedSpanData> {
        self.spans.get(&span_key(trace_id, span_id))
    }

    /// Number of spans with parsed data.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Whether no span had parsed data.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_first_original() {
        let mut first = ParsedAttribute::default();
        first.record_redacted("$.password", "hunter2");

        let mut second = ParsedAttribute::default();
        second.record_redacted("$.password", "***");
        second.record("$.user", "dave");

        first.merge(second);

        assert_eq!(first.redacted["$.password"], "hunter2");
        assert_eq!(first.flattened["$.user"], "dave");
    }

    #[test]
    fn empty_span_data_is_not_stored() {
        let mut data = ParsedTraceData::default();
        data.insert(&[1; 16], &[1; 8], ParsedSpanData::new());
        assert!(data.is_empty());
    }

    #[test]
    fn same_span_id_in_different_traces_is_kept_apart() {
        let attribute = |original: &str| {
            let mut parsed = ParsedAttribute::default();
            parsed.record_redacted("password", original);
            ParsedSpanData::from([("http.request.header.password".to_string(), parsed)])
        };
        let mut data = ParsedTraceData::default();
        data.insert(&[1; 16], &[7; 8], attribute("hunter2"));
        data.insert(&[2; 16], &[7; 8], attribute("swordfish"));

        assert_eq!(data.len(), 2);
        let first = &data.span(&[1; 16], &[7; 8]).unwrap()["http.request.header.password"];
        let second = &data.span(&[2; 16], &[7; 8]).unwrap()["http.request.header.password"];
        assert_eq!(first.redacted["password"], "hunter2");
        assert_eq!(second.redacted["password"], "swordfish");
        assert!(data.span(&[3; 16], &[7; 8]).is_none());
    }
}

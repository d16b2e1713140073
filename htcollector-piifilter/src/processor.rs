use crate::config::{ComplexDataType, Config, PiiComplexData};
use crate::error::{ConfigError, FilterError};
use crate::filters::{
    CookieFilter, Filter, FilterOutcome, JsonFilter, KeyValueFilter, SqlFilter, UrlEncodedFilter,
};
use crate::matcher::Matcher;
use async_trait::async_trait;
use htcollector::attributes::{unindexed_key, AttributesExt};
use htcollector::cookie::{REQUEST_COOKIE_KEY, RESPONSE_SET_COOKIE_KEY};
use htcollector::proto::trace::{Span, TracesData};
use htcollector::{
    BatchContext, Capabilities, ParsedAttribute, ParsedSpanData, ParsedTraceData, Processor,
    ProcessorResult, TracesProcessor,
};
use opentelemetry::{otel_debug, otel_error};
use std::collections::HashMap;
use std::sync::Arc;

const URL_KEY: &str = "http.url";
const SQL_KEYS: [&str; 2] = ["sql.query", "db.statement"];

/// Redacts sensitive data from span attributes.
///
/// Each attribute is offered to a chain of content filters: the structured
/// filter selected by `complex_data` (if any), then the cookie, URL-encoded or
/// SQL filter depending on the attribute key, and finally the key-value
/// filter. The first filter that redacts something ends the chain.
///
/// What the filters saw is stored as [`ParsedTraceData`] in the batch context
/// for later processors.
#[derive(Debug)]
pub struct PiiFilterProcessor {
    complex_data: HashMap<String, PiiComplexData>,
    key_value: KeyValueFilter,
    json: JsonFilter,
    url_encoded: UrlEncodedFilter,
    cookie: CookieFilter,
    sql: SqlFilter,
}

impl PiiFilterProcessor {
    /// Builds the processor, compiling every rule.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let matcher = Arc::new(Matcher::new(&config)?);
        let mut complex_data = HashMap::with_capacity(config.complex_data.len());
        for entry in config.complex_data {
            if entry.data_type.is_none() && entry.type_key.is_none() {
                return Err(ConfigError::UntypedComplexData(entry.key));
            }
            complex_data.insert(entry.key.clone(), entry);
        }

        Ok(PiiFilterProcessor {
            complex_data,
            key_value: KeyValueFilter::new(matcher.clone()),
            json: JsonFilter::new(matcher.clone()),
            url_encoded: UrlEncodedFilter::new(matcher.clone()),
            cookie: CookieFilter::new(matcher.clone()),
            sql: SqlFilter::new(matcher),
        })
    }

    fn structured_filter(&self, data_type: ComplexDataType) -> &dyn Filter {
        match data_type {
            ComplexDataType::Json => &self.json,
            ComplexDataType::Urlencoded => &self.url_encoded,
            ComplexDataType::Sql => &self.sql,
            ComplexDataType::Cookie => &self.cookie,
        }
    }

    /// Filters to run, in order, for the attribute `key` of `span`.
    fn chain(&self, key: &str, span: &Span) -> Vec<&dyn Filter> {
        let mut chain: Vec<&dyn Filter> = Vec::with_capacity(3);
        let key = unindexed_key(key);

        if let Some(entry) = self.complex_data.get(key) {
            let data_type = entry.data_type.or_else(|| {
                entry
                    .type_key
                    .as_deref()
                    .and_then(|type_key| span.attributes.find_str(type_key))
                    .and_then(ComplexDataType::from_content_type)
            });
            if let Some(data_type) = data_type {
                chain.push(self.structured_filter(data_type));
            }
        }

        let key_filter: Option<&dyn Filter> = match key {
            REQUEST_COOKIE_KEY | RESPONSE_SET_COOKIE_KEY => Some(&self.cookie),
            URL_KEY => Some(&self.url_encoded),
            _ if SQL_KEYS.contains(&key) => Some(&self.sql),
            _ => None,
        };
        if let Some(filter) = key_filter {
            if !chain.iter().any(|f| f.name() == filter.name()) {
                chain.push(filter);
            }
        }

        chain.push(&self.key_value);
        chain
    }

    fn filter_span(&self, span: &mut Span) -> ParsedSpanData {
        let mut parsed = ParsedSpanData::new();
        let mut sessions = Vec::new();

        for index in 0..span.attributes.len() {
            let key = span.attributes[index].key.clone();
            let chain = self.chain(&key, span);
            let Some(value) = span.attributes[index].value.as_mut() else {
                continue;
            };

            let mut seen = ParsedAttribute::default();
            for filter in chain {
                match filter.redact_attribute(&key, value) {
                    Ok(FilterOutcome {
                        parsed: attribute,
                        session,
                    }) => {
                        let redacted = attribute.is_redacted();
                        seen.merge(attribute);
                        sessions.extend(session);
                        if redacted {
                            break;
                        }
                    }
                    Err(FilterError::UnprocessableValue(reason)) => {
                        otel_debug!(
                            name: "PiiFilter.UnprocessableValue",
                            filter = filter.name(),
                            key = key.as_str(),
                            reason = reason
                        );
                    }
                    Err(err) => {
                        otel_error!(
                            name: "PiiFilter.FilterFailed",
                            filter = filter.name(),
                            key = key.as_str(),
                            error = err.to_string()
                        );
                    }
                }
            }

            if !seen.is_empty() {
                parsed.insert(key, seen);
            }
        }

        for session in sessions {
            span.attributes.upsert(session);
        }
        parsed
    }
}

#[async_trait]
impl Processor for PiiFilterProcessor {
    fn capabilities(&self) -> Capabilities {
        Capabilities::MUTATING
    }
}

#[async_trait]
impl TracesProcessor for PiiFilterProcessor {
    async fn process_traces(
        &self,
        cx: &mut BatchContext,
        traces: &mut TracesData,
    ) -> ProcessorResult<()> {
        let mut parsed = ParsedTraceData::default();
        for resource_spans in traces.resource_spans.iter_mut() {
            for scope_spans in resource_spans.scope_spans.iter_mut() {
                for span in scope_spans.spans.iter_mut() {
                    let span_data = self.filter_span(span);
                    parsed.insert(&span.trace_id, &span.span_id, span_data);
                }
            }
        }

        if parsed.is_empty() {
            return Ok(());
        }
        if let Some(existing) = cx.extensions_mut().get_mut::<ParsedTraceData>() {
            existing.extend(parsed);
        } else {
            cx.extensions_mut().insert(parsed);
        }
        Ok(())
    }
}

use super::{Filter, FilterOutcome};
use crate::error::FilterError;
use crate::matcher::Matcher;
use htcollector::attributes::unindexed_key;
use htcollector::proto::{any_value::Value, AnyValue};
use std::sync::Arc;
use url::form_urlencoded;

const URL_KEY: &str = "http.url";

/// Redacts parameters of URL-encoded forms and query strings.
///
/// For `http.url` attributes only the query component of the URL is
/// rewritten. Parameters are addressed as `$.name`, or `$.name[i]` when the
/// name occurs more than once.
#[derive(Clone, Debug)]
pub struct UrlEncodedFilter {
    matcher: Arc<Matcher>,
}

impl UrlEncodedFilter {
    /// Creates a filter evaluating `matcher`.
    pub fn new(matcher: Arc<Matcher>) -> Self {
        UrlEncodedFilter { matcher }
    }

    /// Redacts the parameters of `query` and returns the rewritten query, or
    /// `None` when nothing was redacted. Segments that are not redacted are
    /// kept byte for byte.
    fn redact_query(&self, query: &str, outcome: &mut FilterOutcome) -> Option<String> {
        let mut segments: Vec<String> = query.split('&').map(str::to_string).collect();
        let params: Vec<Option<(String, String)>> = segments
            .iter()
            .map(|segment| {
                form_urlencoded::parse(segment.as_bytes())
                    .next()
                    .map(|(name, value)| (name.into_owned(), value.into_owned()))
            })
            .collect();
        if params.iter().all(Option::is_none) {
            return None;
        }

        let mut redacted = false;
        for (index, param) in params.iter().enumerate() {
            let Some((name, original)) = param else {
                continue;
            };
            let same_name = |p: &Option<(String, String)>| p.as_ref().is_some_and(|(n, _)| n == name);
            let path = if params.iter().filter(|p| same_name(*p)).count() > 1 {
                let position = params[..index].iter().filter(|p| same_name(*p)).count();
                format!("$.{name}[{position}]")
            } else {
                format!("$.{name}")
            };

            outcome.parsed.record(path.as_str(), original.as_str());
            if original.is_empty() {
                continue;
            }

            let key_to_match = self.matcher.truncated_key(name);
            let replacement = match self.matcher.filter_key(key_to_match, name, original, &path) {
                Some(matched) => {
                    if matched.session {
                        outcome.set_session(original);
                    }
                    matched.redacted.then_some(matched.value)
                }
                None => {
                    let (value_redacted, replaced) =
                        self.matcher.filter_string_value(original, name, &path);
                    value_redacted.then_some(replaced)
                }
            };
            if let Some(replacement) = replacement {
                let raw_name = segments[index]
                    .split_once('=')
                    .map_or(segments[index].as_str(), |(raw_name, _)| raw_name);
                let encoded: String = form_urlencoded::byte_serialize(replacement.as_bytes()).collect();
                let rewritten = format!("{raw_name}={encoded}");
                segments[index] = rewritten;
                outcome.parsed.record_redacted(path, original.clone());
                redacted = true;
            }
        }

        redacted.then(|| segments.join("&"))
    }

    /// Rewrites the query component of an absolute or relative URL, leaving
    /// the rest of `text` as written.
    fn redact_url(&self, text: &mut String, outcome: &mut FilterOutcome) {
        let (before_fragment, fragment) = match text.split_once('#') {
            Some((before, fragment)) => (before, Some(fragment)),
            None => (text.as_str(), None),
        };
        let Some((base, query)) = before_fragment.split_once('?') else {
            return;
        };
        if let Some(new_query) = self.redact_query(query, outcome) {
            let mut rebuilt = format!("{base}?{new_query}");
            if let Some(fragment) = fragment {
                rebuilt.push('#');
                rebuilt.push_str(fragment);
            }
            *text = rebuilt;
        }
    }
}

impl Filter for UrlEncodedFilter {
    fn name(&self) -> &'static str {
        "urlencoded"
    }

    fn redact_attribute(&self, key: &str, value: &mut AnyValue) -> Result<FilterOutcome, FilterError> {
        let mut outcome = FilterOutcome::default();
        let Some(Value::StringValue(text)) = &mut value.value else {
            return Ok(outcome);
        };
        if text.is_empty() {
            return Ok(outcome);
        }

        if unindexed_key(key) == URL_KEY {
            self.redact_url(text, &mut outcome);
        } else {
            let query = text.strip_prefix('?').unwrap_or(text.as_str());
            if let Some(new_query) = self.redact_query(query, &mut outcome) {
                *text = new_query;
            }
        }
        Ok(outcome)
    }
}

use super::{Filter, FilterOutcome};
use crate::error::FilterError;
use crate::matcher::Matcher;
use htcollector::attributes::unindexed_key;
use htcollector::cookie::{
    join_cookies, parse_request_cookies, parse_set_cookie, RESPONSE_SET_COOKIE_KEY,
};
use htcollector::proto::{any_value::Value, AnyValue};
use std::sync::Arc;

/// Redacts individual cookies of `Cookie` and `Set-Cookie` headers.
///
/// Cookie names are matched as keys. When any cookie is redacted the header is
/// rewritten as `name=value; name2=value2`.
#[derive(Clone, Debug)]
pub struct CookieFilter {
    matcher: Arc<Matcher>,
}

impl CookieFilter {
    /// Creates a filter evaluating `matcher`.
    pub fn new(matcher: Arc<Matcher>) -> Self {
        CookieFilter { matcher }
    }
}

impl Filter for CookieFilter {
    fn name(&self) -> &'static str {
        "cookie"
    }

    fn redact_attribute(&self, key: &str, value: &mut AnyValue) -> Result<FilterOutcome, FilterError> {
        let mut outcome = FilterOutcome::default();
        let Some(Value::StringValue(header)) = &mut value.value else {
            return Ok(outcome);
        };

        let mut cookies = if unindexed_key(key) == RESPONSE_SET_COOKIE_KEY {
            parse_set_cookie(header)
        } else {
            parse_request_cookies(header)
        };

        let mut redacted = false;
        for cookie in cookies.iter_mut() {
            let original = cookie.value.clone();
            outcome.parsed.record(cookie.name.as_str(), original.as_str());
            if original.is_empty() {
                continue;
            }

            let key_to_match = self.matcher.truncated_key(&cookie.name);
            if let Some(matched) =
                self.matcher
                    .filter_key(key_to_match, &cookie.name, &original, &cookie.name)
            {
                if matched.session {
                    outcome.set_session(&original);
                }
                if matched.redacted {
                    cookie.value = matched.value;
                    outcome.parsed.record_redacted(cookie.name.as_str(), original);
                    redacted = true;
                }
                continue;
            }

            let (value_redacted, replaced) =
                self.matcher
                    .filter_string_value(&original, &cookie.name, &cookie.name);
            if value_redacted {
                cookie.value = replaced;
                outcome.parsed.record_redacted(cookie.name.as_str(), original);
                redacted = true;
            }
        }

        if redacted {
            *header = join_cookies(&cookies);
        }
        Ok(outcome)
    }
}

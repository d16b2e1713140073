//! Content filters.
//!
//! Every filter understands one value format. It parses the attribute value,
//! applies the [`Matcher`](crate::matcher::Matcher) to each leaf it finds and,
//! when something was redacted, writes the re-serialized value back.
use crate::error::FilterError;
use htcollector::attributes::string_attribute;
use htcollector::proto::{AnyValue, KeyValue};
use htcollector::{HashAlgorithm, ParsedAttribute};
use std::fmt::Debug;

mod cookie;
mod json;
mod keyvalue;
mod sql;
mod urlencoded;

pub use cookie::CookieFilter;
pub use json::JsonFilter;
pub use keyvalue::KeyValueFilter;
pub use sql::SqlFilter;
pub use urlencoded::UrlEncodedFilter;

/// Key of the attribute emitted for session identifying values.
pub const SESSION_ID_KEY: &str = "session.id";

/// What a filter did to one attribute.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterOutcome {
    /// The leaves that were seen and redacted.
    pub parsed: ParsedAttribute,
    /// A `session.id` attribute to add to the span.
    pub session: Option<KeyValue>,
}

impl FilterOutcome {
    /// Whether the attribute value was changed.
    pub fn is_redacted(&self) -> bool {
        self.parsed.is_redacted()
    }

    pub(crate) fn set_session(&mut self, original: &str) {
        if self.session.is_none() {
            self.session = Some(session_attribute(original));
        }
    }
}

/// Builds the `session.id` attribute for an observed session value.
pub fn session_attribute(original: &str) -> KeyValue {
    string_attribute(SESSION_ID_KEY, HashAlgorithm::Sha1.hash(original))
}

/// A content filter.
pub trait Filter: Send + Sync + Debug {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Redacts `value`, the value of attribute `key`, in place.
    ///
    /// Empty or non-applicable values are reported as not redacted.
    fn redact_attribute(&self, key: &str, value: &mut AnyValue) -> Result<FilterOutcome, FilterError>;
}

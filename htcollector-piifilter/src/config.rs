//! Configuration of the PII filter processor.
use htcollector::RedactionStrategy;
use serde::Deserialize;

/// PII filter configuration.
///
/// ```yaml
/// redaction_strategy: hash
/// prefixes: ["http.request.header."]
/// key_regexs:
///   - regex: "^password$"
///     redaction_strategy: redact
///   - regex: "^\\$\\.user\\.ssn$"
///     fqn: true
/// value_regexs:
///   - regex: "(?:\\d[ -]*?){13,16}"
/// complex_data:
///   - key: http.request.body
///     type_key: http.request.header.content-type
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Strategy used by rules that do not set their own, and by the SQL
    /// filter.
    pub redaction_strategy: RedactionStrategy,

    /// Prefixes stripped from attribute keys before key rules are matched,
    /// e.g. `http.request.header.` so that a rule can match `authorization`.
    pub prefixes: Vec<String>,

    /// Rules matched against attribute keys, structural keys or paths.
    pub key_regexs: Vec<PiiElement>,

    /// Rules matched against values; every match is replaced in place.
    pub value_regexs: Vec<PiiElement>,

    /// Attributes holding structured payloads.
    pub complex_data: Vec<PiiComplexData>,
}

/// A single redaction rule.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PiiElement {
    /// The pattern.
    pub regex: String,

    /// Overrides the global strategy for this rule.
    pub redaction_strategy: Option<RedactionStrategy>,

    /// Match against the fully qualified path (e.g. `$.user.password`)
    /// instead of the leaf key.
    pub fqn: bool,

    /// A match also yields a `session.id` attribute.
    pub session_identifier: bool,
}

/// Structured payload formats understood by the content filters.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComplexDataType {
    /// A JSON document.
    Json,
    /// An `application/x-www-form-urlencoded` body or query string.
    #[serde(alias = "url_encoded", alias = "x-www-form-urlencoded")]
    Urlencoded,
    /// A SQL statement.
    Sql,
    /// A cookie header.
    Cookie,
}

impl ComplexDataType {
    /// Maps a MIME content type onto a payload format.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains("json") {
            Some(ComplexDataType::Json)
        } else if content_type.contains("x-www-form-urlencoded") {
            Some(ComplexDataType::Urlencoded)
        } else {
            None
        }
    }
}

/// Declares that an attribute carries a structured payload.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PiiComplexData {
    /// Unindexed attribute key holding the payload.
    pub key: String,

    /// Fixed payload format.
    #[serde(rename = "type")]
    pub data_type: Option<ComplexDataType>,

    /// Sibling attribute holding the payload's content type, consulted when
    /// `type` is not set.
    pub type_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml() {
        let config: Config = serde_yaml::from_str(
            r#"
redaction_strategy: hash
prefixes: ["http.request.header."]
key_regexs:
  - regex: "^password$"
    redaction_strategy: redact
  - regex: "^\\$\\.user\\.ssn$"
    fqn: true
    session_identifier: true
value_regexs:
  - regex: "(?:\\d[ -]*?){13,16}"
complex_data:
  - key: http.request.body
    type_key: http.request.header.content-type
  - key: rpc.payload
    type: urlencoded
"#,
        )
        .unwrap();

        assert_eq!(config.redaction_strategy, RedactionStrategy::Hash);
        assert_eq!(
            config.key_regexs[0].redaction_strategy,
            Some(RedactionStrategy::Redact)
        );
        assert!(config.key_regexs[1].fqn);
        assert!(config.key_regexs[1].session_identifier);
        assert_eq!(config.value_regexs[0].redaction_strategy, None);
        assert_eq!(
            config.complex_data[1].data_type,
            Some(ComplexDataType::Urlencoded)
        );
        assert_eq!(
            config.complex_data[0].type_key.as_deref(),
            Some("http.request.header.content-type")
        );
    }

    #[test]
    fn content_types() {
        assert_eq!(
            ComplexDataType::from_content_type("application/json; charset=utf-8"),
            Some(ComplexDataType::Json)
        );
        assert_eq!(
            ComplexDataType::from_content_type("application/x-www-form-urlencoded"),
            Some(ComplexDataType::Urlencoded)
        );
        assert_eq!(ComplexDataType::from_content_type("text/plain"), None);
    }
}

//! Compiled key and value rules.
use crate::config::{Config, PiiElement};
use crate::error::ConfigError;
use htcollector::RedactionStrategy;
use regex::Regex;

/// A compiled redaction rule.
#[derive(Clone, Debug)]
pub struct Rule {
    regex: Regex,
    strategy: RedactionStrategy,
    fqn: bool,
    session: bool,
}

impl Rule {
    fn compile(element: &PiiElement, global: RedactionStrategy) -> Result<Self, ConfigError> {
        let regex = Regex::new(&element.regex).map_err(|source| ConfigError::InvalidRegex {
            pattern: element.regex.clone(),
            source,
        })?;
        Ok(Rule {
            regex,
            strategy: element.redaction_strategy.unwrap_or(global),
            fqn: element.fqn,
            session: element.session_identifier,
        })
    }

    /// The strategy applied on a match.
    pub fn strategy(&self) -> RedactionStrategy {
        self.strategy
    }

    /// Whether the rule matches fully qualified paths.
    pub fn is_fqn(&self) -> bool {
        self.fqn
    }

    /// Whether a match yields a session attribute.
    pub fn is_session(&self) -> bool {
        self.session
    }

    fn matches(&self, key: &str, path: &str) -> bool {
        if self.fqn {
            self.regex.is_match(path)
        } else {
            self.regex.is_match(key)
        }
    }
}

/// Outcome of a key rule match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyMatch {
    /// Whether the value was changed.
    pub redacted: bool,
    /// Whether the rule marks the value as a session identifier.
    pub session: bool,
    /// The value after applying the rule's strategy.
    pub value: String,
}

/// Evaluates key rules and value rules in declaration order.
#[derive(Clone, Debug)]
pub struct Matcher {
    strategy: RedactionStrategy,
    prefixes: Vec<String>,
    key_rules: Vec<Rule>,
    value_rules: Vec<Rule>,
}

impl Matcher {
    /// Compiles every rule. Fails on the first invalid pattern.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let compile = |elements: &[PiiElement]| {
            elements
                .iter()
                .map(|element| Rule::compile(element, config.redaction_strategy))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Matcher {
            strategy: config.redaction_strategy,
            prefixes: config.prefixes.clone(),
            key_rules: compile(&config.key_regexs)?,
            value_rules: compile(&config.value_regexs)?,
        })
    }

    /// The global redaction strategy.
    pub fn strategy(&self) -> RedactionStrategy {
        self.strategy
    }

    /// Strips the first configured prefix that `key` starts with.
    pub fn truncated_key<'a>(&self, key: &'a str) -> &'a str {
        self.prefixes
            .iter()
            .find_map(|prefix| key.strip_prefix(prefix.as_str()))
            .unwrap_or(key)
    }

    /// First key rule matching `key`, or `path` for FQN rules.
    pub fn match_key(&self, key: &str, path: &str) -> Option<&Rule> {
        self.key_rules.iter().find(|rule| rule.matches(key, path))
    }

    /// Applies the first key rule matching `key_to_match` (or `path`) to
    /// `value`. `None` when no rule matches.
    ///
    /// A rule whose strategy leaves the value unchanged still counts as a
    /// match but does not report a redaction.
    pub fn filter_key(
        &self,
        key_to_match: &str,
        actual_key: &str,
        value: &str,
        path: &str,
    ) -> Option<KeyMatch> {
        let rule = self.match_key(key_to_match, path)?;
        let redacted = rule.strategy.apply(value);
        opentelemetry::otel_debug!(
            name: "PiiFilter.KeyMatched",
            key = actual_key,
            path = path,
            regex = rule.regex.as_str()
        );
        Some(KeyMatch {
            redacted: redacted != value,
            session: rule.session,
            value: redacted,
        })
    }

    /// Replaces every match of every value rule inside `value`.
    ///
    /// Returns whether anything changed, together with the new value.
    pub fn filter_string_value(&self, value: &str, key: &str, path: &str) -> (bool, String) {
        let mut current = value.to_string();
        let mut redacted = false;
        for rule in &self.value_rules {
            if !rule.regex.is_match(&current) {
                continue;
            }
            let replaced = rule
                .regex
                .replace_all(&current, |caps: &regex::Captures<'_>| {
                    rule.strategy.apply(&caps[0])
                })
                .into_owned();
            if replaced != current {
                opentelemetry::otel_debug!(
                    name: "PiiFilter.ValueMatched",
                    key = key,
                    path = path,
                    regex = rule.regex.as_str()
                );
                redacted = true;
                current = replaced;
            }
        }
        (redacted, current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(regex: &str) -> PiiElement {
        PiiElement {
            regex: regex.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn invalid_pattern_fails_construction() {
        let config = Config {
            key_regexs: vec![element("(unclosed")],
            ..Default::default()
        };
        assert!(matches!(
            Matcher::new(&config),
            Err(ConfigError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn first_declared_rule_wins() {
        let config = Config {
            key_regexs: vec![
                PiiElement {
                    redaction_strategy: Some(RedactionStrategy::Hash),
                    ..element("^pass")
                },
                element("^password$"),
            ],
            ..Default::default()
        };
        let matcher = Matcher::new(&config).unwrap();

        let matched = matcher
            .filter_key("password", "password", "abc", "password")
            .unwrap();
        assert_eq!(matched.value, "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert!(matched.redacted);
    }

    #[test]
    fn fqn_rules_match_path_only() {
        let config = Config {
            key_regexs: vec![PiiElement {
                fqn: true,
                ..element(r"^\$\.user\.password$")
            }],
            ..Default::default()
        };
        let matcher = Matcher::new(&config).unwrap();

        assert!(matcher.match_key("password", "$.user.password").is_some());
        assert!(matcher.match_key("password", "$.admin.password").is_none());
        assert!(matcher
            .match_key("$.user.password", "$.other")
            .is_none());
    }

    #[test]
    fn raw_strategy_matches_without_redacting() {
        let config = Config {
            redaction_strategy: RedactionStrategy::Raw,
            key_regexs: vec![element("token")],
            ..Default::default()
        };
        let matcher = Matcher::new(&config).unwrap();
        let matched = matcher.filter_key("token", "token", "t0k3n", "token").unwrap();
        assert!(!matched.redacted);
        assert_eq!(matched.value, "t0k3n");
    }

    #[test]
    fn value_rules_replace_each_occurrence() {
        let config = Config {
            value_regexs: vec![element(r"\d{3}-\d{2}-\d{4}")],
            ..Default::default()
        };
        let matcher = Matcher::new(&config).unwrap();
        let (redacted, value) =
            matcher.filter_string_value("ssn 123-45-6789 and 987-65-4321", "note", "note");
        assert!(redacted);
        assert_eq!(value, "ssn *** and ***");

        let (redacted, value) = matcher.filter_string_value("nothing here", "note", "note");
        assert!(!redacted);
        assert_eq!(value, "nothing here");
    }

    #[test]
    fn strips_first_matching_prefix() {
        let config = Config {
            prefixes: vec![
                "http.request.header.".into(),
                "http.response.header.".into(),
            ],
            ..Default::default()
        };
        let matcher = Matcher::new(&config).unwrap();
        assert_eq!(
            matcher.truncated_key("http.request.header.authorization"),
            "authorization"
        );
        assert_eq!(matcher.truncated_key("http.url"), "http.url");
    }
}

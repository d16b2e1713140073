//! Identity extraction rules.
use crate::config::{EndUserConfig, EndUserType, Encoding};
use crate::error::ConfigError;
use crate::token::{decode_basic_user, decode_claims, AuthHeader};
use htcollector::attributes::{find, to_text, unindexed_key};
use htcollector::cookie::{parse_request_cookies, parse_set_cookie, RESPONSE_SET_COOKIE_KEY};
use htcollector::proto::KeyValue;
use opentelemetry::otel_debug;
use regex::Regex;
use serde_json::{Map, Value};
use url::form_urlencoded;

/// Identity fragments found on a span. Fragments are never overwritten once
/// set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndUser {
    /// `enduser.id`.
    pub id: Option<String>,
    /// `enduser.role`.
    pub role: Option<String>,
    /// `enduser.scope`.
    pub scope: Option<String>,
    /// `session.id`, already hashed unless the rule asked for raw values.
    pub session: Option<String>,
}

impl EndUser {
    fn fill(slot: &mut Option<String>, value: Option<String>) {
        if slot.is_none() {
            *slot = value.filter(|v| !v.is_empty());
        }
    }

    /// Whether nothing was found.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.role.is_none() && self.scope.is_none() && self.session.is_none()
    }
}

/// A compiled extraction rule.
#[derive(Debug)]
pub(crate) struct Rule {
    config: EndUserConfig,
    conditions: Vec<(String, Regex)>,
}

impl Rule {
    pub(crate) fn new(config: EndUserConfig) -> Result<Self, ConfigError> {
        if config.kind == EndUserType::Cookie
            && config.encoding == Some(Encoding::Jwt)
            && config.cookie_name.is_empty()
        {
            return Err(ConfigError::MissingCookieName(config.key));
        }
        let conditions = config
            .conditions
            .iter()
            .map(|condition| {
                Regex::new(&condition.regex)
                    .map(|regex| (condition.key.clone(), regex))
                    .map_err(|source| ConfigError::InvalidRegex {
                        key: config.key.clone(),
                        pattern: condition.regex.clone(),
                        source,
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(Rule { config, conditions })
    }

    pub(crate) fn key(&self) -> &str {
        &self.config.key
    }

    /// Whether every condition holds on the span's attributes.
    pub(crate) fn applies(&self, attributes: &[KeyValue]) -> bool {
        self.conditions.iter().all(|(key, regex)| {
            find(attributes, key).is_some_and(|value| regex.is_match(&to_text(value)))
        })
    }

    /// Extracts identity fragments from the value of attribute `key`.
    pub(crate) fn extract(&self, key: &str, value: &str, user: &mut EndUser) {
        if value.is_empty() {
            return;
        }
        match self.config.kind {
            EndUserType::Id => EndUser::fill(&mut user.id, Some(value.to_string())),
            EndUserType::Role => EndUser::fill(&mut user.role, Some(value.to_string())),
            EndUserType::Scope => EndUser::fill(&mut user.scope, Some(value.to_string())),
            EndUserType::Session => self.fill_session(user, Some(value.to_string())),
            EndUserType::Authheader => self.extract_auth_header(value, user),
            EndUserType::Json => self.extract_json(value, user),
            EndUserType::Urlencoded => self.extract_urlencoded(value, user),
            EndUserType::Cookie => self.extract_cookie(key, value, user),
        }
    }

    fn fill_session(&self, user: &mut EndUser, raw: Option<String>) {
        if user.session.is_some() {
            return;
        }
        let Some(raw) = raw else { return };
        let value = if self.config.session_separator.is_empty() {
            raw
        } else {
            let separator = self.config.session_separator.as_str();
            let parts: Vec<&str> = raw.split(separator).collect();
            self.config
                .session_indexes
                .iter()
                .filter_map(|index| parts.get(*index).copied())
                .collect::<Vec<_>>()
                .join(separator)
        };
        let value = if self.config.raw_session_value {
            value
        } else {
            self.config.hash_algo.hash(&value)
        };
        user.session = Some(value);
    }

    fn extract_auth_header(&self, value: &str, user: &mut EndUser) {
        match AuthHeader::parse(value) {
            Some(AuthHeader::Bearer(token)) => self.extract_bearer(token, user),
            Some(AuthHeader::Basic(credentials)) => match decode_basic_user(credentials) {
                Ok(name) => EndUser::fill(&mut user.id, Some(name)),
                Err(err) => {
                    otel_debug!(
                        name: "EndUser.InvalidBasicCredentials",
                        key = self.config.key.as_str(),
                        error = err.to_string()
                    );
                }
            },
            None => {}
        }
    }

    fn extract_bearer(&self, token: &str, user: &mut EndUser) {
        let claims = match decode_claims(token) {
            Ok(claims) => claims,
            Err(err) => {
                otel_debug!(
                    name: "EndUser.InvalidToken",
                    key = self.config.key.as_str(),
                    error = err.to_string()
                );
                return;
            }
        };

        let c = &self.config;
        EndUser::fill(&mut user.id, claim(&claims, &c.id_claims, &c.id_paths));
        EndUser::fill(&mut user.role, claim(&claims, &c.role_claims, &c.role_paths));
        EndUser::fill(&mut user.scope, claim(&claims, &c.scope_claims, &c.scope_paths));
        let session = claim(&claims, &c.session_claims, &c.session_paths)
            .unwrap_or_else(|| token.to_string());
        self.fill_session(user, Some(session));
    }

    fn extract_json(&self, value: &str, user: &mut EndUser) {
        let document: Value = match serde_json::from_str(value) {
            Ok(document) => document,
            Err(err) => {
                otel_debug!(
                    name: "EndUser.InvalidJson",
                    key = self.config.key.as_str(),
                    error = err.to_string()
                );
                return;
            }
        };
        let c = &self.config;
        let lookup = |paths: &[String]| paths.iter().find_map(|path| select_text(&document, path));
        EndUser::fill(&mut user.id, lookup(&c.id_paths[..]));
        EndUser::fill(&mut user.role, lookup(&c.role_paths[..]));
        EndUser::fill(&mut user.scope, lookup(&c.scope_paths[..]));
        self.fill_session(user, lookup(&c.session_paths[..]));
    }

    fn extract_urlencoded(&self, value: &str, user: &mut EndUser) {
        let query = value.strip_prefix('?').unwrap_or(value);
        let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        self.extract_pairs(&pairs, user);
    }

    fn extract_cookie(&self, key: &str, value: &str, user: &mut EndUser) {
        let cookies = if unindexed_key(key) == RESPONSE_SET_COOKIE_KEY {
            parse_set_cookie(value)
        } else {
            parse_request_cookies(value)
        };

        if self.config.encoding == Some(Encoding::Jwt) {
            if let Some(cookie) = cookies.iter().find(|c| c.name == self.config.cookie_name) {
                self.extract_bearer(&cookie.value, user);
            }
            return;
        }

        let pairs: Vec<(String, String)> = cookies
            .into_iter()
            .map(|cookie| (cookie.name, cookie.value))
            .collect();
        self.extract_pairs(&pairs, user);
    }

    fn extract_pairs(&self, pairs: &[(String, String)], user: &mut EndUser) {
        let c = &self.config;
        let lookup = |keys: &[String]| {
            keys.iter().find_map(|key| {
                pairs
                    .iter()
                    .find(|(name, value)| name == key && !value.is_empty())
                    .map(|(_, value)| value.clone())
            })
        };
        EndUser::fill(&mut user.id, lookup(&c.id_keys[..]));
        EndUser::fill(&mut user.role, lookup(&c.role_keys[..]));
        EndUser::fill(&mut user.scope, lookup(&c.scope_keys[..]));
        self.fill_session(user, lookup(&c.session_keys[..]));
    }
}

/// Value of the first claim in `names` that is present, optionally descending
/// into it with the first matching JSONPath in `paths`.
fn claim(claims: &Map<String, Value>, names: &[String], paths: &[String]) -> Option<String> {
    names.iter().find_map(|name| {
        let value = claims.get(name)?;
        if paths.is_empty() {
            return value_text(value);
        }
        // structured claims may arrive JSON encoded
        let decoded;
        let target = match value {
            Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
                Ok(value) => {
                    decoded = value;
                    &decoded
                }
                Err(err) => {
                    otel_debug!(
                        name: "EndUser.InvalidClaimJson",
                        claim = name.as_str(),
                        error = err.to_string()
                    );
                    return None;
                }
            },
            other => other,
        };
        paths.iter().find_map(|path| select_text(target, path))
    })
}

fn select_text(document: &Value, path: &str) -> Option<String> {
    match jsonpath_lib::select(document, path) {
        Ok(found) => found.into_iter().find_map(value_text),
        Err(err) => {
            otel_debug!(
                name: "EndUser.InvalidJsonPath",
                path = path,
                error = format!("{err:?}")
            );
            None
        }
    }
}

/// Text of a claim or JSON node. Arrays are joined with `,`.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_text).collect();
            (!parts.is_empty()).then(|| parts.join(","))
        }
        other => Some(other.to_string()),
    }
}

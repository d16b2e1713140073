//! Configuration of the end-user processor.
use htcollector::HashAlgorithm;
use serde::Deserialize;

/// End-user processor configuration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Extraction rules, evaluated in declaration order.
    pub end_users: Vec<EndUserConfig>,
}

/// How the value of the rule's attribute is interpreted.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EndUserType {
    /// The value is the user id.
    #[default]
    Id,
    /// The value is the user role.
    Role,
    /// The value is the user scope.
    Scope,
    /// The value is the session.
    Session,
    /// An `Authorization` header with `Bearer` or `Basic` credentials.
    Authheader,
    /// A cookie header.
    Cookie,
    /// A JSON document.
    Json,
    /// A URL-encoded form or query string.
    Urlencoded,
}

/// Encoding of a value found inside a cookie.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// A JSON web token.
    Jwt,
}

/// A regex that a sibling attribute must match for a rule to apply.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Condition {
    /// Sibling attribute key.
    pub key: String,
    /// Pattern the sibling value must match.
    pub regex: String,
}

/// A single extraction rule.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EndUserConfig {
    /// Unindexed attribute key the rule applies to.
    pub key: String,
    /// Value interpretation.
    #[serde(rename = "type")]
    pub kind: EndUserType,
    /// Encoding of the cookie named `cookie_name`.
    pub encoding: Option<Encoding>,
    /// Cookie holding a JWT when `encoding` is `jwt`.
    pub cookie_name: String,
    /// Keep session values as is instead of hashing them.
    pub raw_session_value: bool,
    /// Digest used for session values.
    pub hash_algo: HashAlgorithm,
    /// Conditions on sibling attributes, all of which must hold.
    pub conditions: Vec<Condition>,

    /// JWT claims holding the id.
    pub id_claims: Vec<String>,
    /// JSONPaths to the id.
    pub id_paths: Vec<String>,
    /// Form or cookie keys holding the id.
    pub id_keys: Vec<String>,

    /// JWT claims holding the role.
    pub role_claims: Vec<String>,
    /// JSONPaths to the role.
    pub role_paths: Vec<String>,
    /// Form or cookie keys holding the role.
    pub role_keys: Vec<String>,

    /// JWT claims holding the scope.
    pub scope_claims: Vec<String>,
    /// JSONPaths to the scope.
    pub scope_paths: Vec<String>,
    /// Form or cookie keys holding the scope.
    pub scope_keys: Vec<String>,

    /// JWT claims holding the session.
    pub session_claims: Vec<String>,
    /// JSONPaths to the session.
    pub session_paths: Vec<String>,
    /// Form or cookie keys holding the session.
    pub session_keys: Vec<String>,

    /// Components of the split session value to keep, in order.
    pub session_indexes: Vec<usize>,
    /// Separator used to split and rejoin the session value.
    pub session_separator: String,
}

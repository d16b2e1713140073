//! Redactors: pure functions applied to sensitive values.
use serde::Deserialize;
use sha1::{Digest, Sha1};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

/// Replacement text of the `redact` strategy.
pub const REDACTED_TEXT: &str = "***";

const SHAKE256_OUTPUT_LEN: usize = 64;

/// Digest used for hashing values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-1, hex encoded (40 characters).
    #[default]
    #[serde(rename = "SHA-1", alias = "sha1", alias = "sha-1", alias = "SHA1")]
    Sha1,
    /// SHAKE-256 with a 64 byte output, hex encoded (128 characters).
    #[serde(
        rename = "SHAKE-256",
        alias = "shake256",
        alias = "shake-256",
        alias = "SHAKE256"
    )]
    Shake256,
}

impl HashAlgorithm {
    /// Hashes `value` and returns the lowercase hex digest.
    pub fn hash(self, value: &str) -> String {
        match self {
            HashAlgorithm::Sha1 => const_hex::encode(Sha1::digest(value.as_bytes())),
            HashAlgorithm::Shake256 => {
                let mut hasher = Shake256::default();
                hasher.update(value.as_bytes());
                let mut output = [0u8; SHAKE256_OUTPUT_LEN];
                hasher.finalize_xof().read(&mut output);
                const_hex::encode(output)
            }
        }
    }
}

/// How a matched value is replaced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedactionStrategy {
    /// Replace with [`REDACTED_TEXT`].
    #[default]
    Redact,
    /// Replace with the hex SHA-1 digest of the value.
    Hash,
    /// Keep the value as is.
    Raw,
}

impl RedactionStrategy {
    /// Applies the strategy to `value`.
    pub fn apply(self, value: &str) -> String {
        match self {
            RedactionStrategy::Redact => REDACTED_TEXT.to_string(),
            RedactionStrategy::Hash => HashAlgorithm::Sha1.hash(value),
            RedactionStrategy::Raw => value.to_string(),
        }
    }
}

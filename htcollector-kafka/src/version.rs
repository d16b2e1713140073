use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// A Kafka broker protocol version.
///
/// Releases before 1.0 have four components (`0.10.2.1`), later ones three
/// (`2.0.0`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KafkaVersion([u32; 4]);

impl KafkaVersion {
    /// First version writing record batches, which carry headers.
    pub const V0_11_0_0: KafkaVersion = KafkaVersion([0, 11, 0, 0]);

    /// Builds a version from its components.
    pub const fn new(major: u32, minor: u32, very_minor: u32, patch: u32) -> Self {
        KafkaVersion([major, minor, very_minor, patch])
    }

    /// Whether `self` is `other` or newer.
    pub fn is_at_least(&self, other: KafkaVersion) -> bool {
        *self >= other
    }
}

impl FromStr for KafkaVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidVersion(s.to_string());
        let expected = if s.starts_with("0.") { 4 } else { 3 };

        let mut parts = [0u32; 4];
        let mut count = 0;
        for part in s.split('.') {
            if count == expected {
                return Err(invalid());
            }
            parts[count] = part.parse().map_err(|_| invalid())?;
            count += 1;
        }
        if count != expected {
            return Err(invalid());
        }
        Ok(KafkaVersion(parts))
    }
}

impl fmt::Display for KafkaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, very_minor, patch] = self.0;
        if major == 0 {
            write!(f, "{major}.{minor}.{very_minor}.{patch}")
        } else {
            write!(f, "{major}.{minor}.{very_minor}")
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Digest used underneath RSA PKCS#1 v1.5.
///
/// `Sha1` exists only for print agents that still request it; new callers
/// should ask for `Sha256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// Legacy digest, default when a caller names none.
    #[default]
    #[serde(rename = "SHA1", alias = "SHA-1", alias = "sha1")]
    Sha1,
    #[serde(rename = "SHA256", alias = "SHA-256", alias = "sha256")]
    Sha256,
}

impl SigningAlgorithm {
    /// Resolve the algorithm a caller asked for.
    ///
    /// Missing means SHA1. Anything that is not recognisably SHA1 is
    /// upgraded to SHA256 rather than refused.
    pub fn from_requested(requested: Option<&str>) -> Self {
        let Some(raw) = requested else {
            return Self::Sha1;
        };
        match raw.trim().to_ascii_uppercase().as_str() {
            "" | "SHA1" | "SHA-1" => Self::Sha1,
            _ => Self::Sha256,
        }
    }

    /// Wire name (`SHA1` / `SHA256`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Sha1)
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

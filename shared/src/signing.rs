//! Wire types of the remote signing authority.

use serde::{Deserialize, Serialize};
pub use spotless_cert::SigningAlgorithm;

/// Edge function path the console posts signing challenges to
pub const SIGN_PATH: &str = "/functions/v1/qz-sign";
/// Path of the published public certificate
pub const CERTIFICATE_PATH: &str = "/qz-digital-certificate.txt";

/// Body of a signing request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignRequest {
    /// Opaque challenge text from the print agent
    #[serde(default)]
    pub message: String,
    /// "SHA1" / "SHA256"; absent means SHA1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

impl SignRequest {
    pub fn new(message: impl Into<String>, algorithm: SigningAlgorithm) -> Self {
        Self {
            message: message.into(),
            algorithm: Some(algorithm.as_str().to_string()),
        }
    }

    pub fn resolved_algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::from_requested(self.algorithm.as_deref())
    }
}

/// Successful signing response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    /// Base64 RSASSA-PKCS1-v1_5 signature
    pub signature: String,
    /// Wire name of the digest actually used: "SHA1" / "SHA256"
    pub algo_used: String,
}

/// Error body returned on any failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignErrorBody {
    pub error: String,
}

/// Either shape, for clients decoding a reply
#[derive(Debug, Clone, Deserialize)]
pub struct SignReply {
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

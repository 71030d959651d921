mod algorithm;
mod certificate;
mod crypto;
mod error;
mod identity;
pub mod signer;

pub use algorithm::SigningAlgorithm;
pub use certificate::{CERTIFICATE_MARKER, CertificateInfo, inspect_certificate, looks_like_certificate};
pub use crypto::{
    hex_prefix, parse_private_key, public_key_from_certificate, sign, sign_base64, sign_with_key,
    verify, verify_base64, verify_with_key,
};
pub use error::{CertError, Result};
pub use identity::{CERTIFICATE_FILE, IdentityProfile, PRIVATE_KEY_FILE, SigningIdentity};
pub use signer::{ProviderType, SecureSigner, SoftwareSigner};

//! Self-signed signing identity for print-agent trust.
//!
//! A print agent is told to trust one certificate; every request it
//! receives must then be signed by the matching private key. The key never
//! leaves the signing service, only the certificate is published.

use crate::error::{CertError, Result};
use rand::thread_rng;
use rcgen::{CertificateParams, DistinguishedName, DnType, IsCa, KeyPair, KeyUsagePurpose};
use rsa::RsaPrivateKey;
use rsa::pkcs8::EncodePrivateKey;
use std::fs;
use std::path::Path;
use time::{Duration, OffsetDateTime};

/// File name the console fetches the public certificate from
pub const CERTIFICATE_FILE: &str = "digital-certificate.txt";
/// File name of the PKCS#8 private key (kept out of anything served)
pub const PRIVATE_KEY_FILE: &str = "private-key.pem";

#[derive(Clone, Debug)]
pub struct IdentityProfile {
    pub common_name: String,
    pub organization: String,
    pub validity_days: u32,
    pub key_bits: usize,
}

impl Default for IdentityProfile {
    fn default() -> Self {
        Self {
            common_name: "localhost".to_string(),
            organization: "Spotless".to_string(),
            validity_days: 3650, // 10 years
            key_bits: 2048,
        }
    }
}

impl IdentityProfile {
    pub fn new(common_name: &str, organization: &str) -> Self {
        Self {
            common_name: common_name.to_string(),
            organization: organization.to_string(),
            ..Default::default()
        }
    }
}

/// Certificate + private key pair (both PEM)
#[derive(Clone)]
pub struct SigningIdentity {
    cert_pem: String,
    key_pem: String,
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("cert_pem", &self.cert_pem)
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

impl SigningIdentity {
    /// Generate a fresh RSA key and a self-signed certificate for it
    pub fn generate(profile: &IdentityProfile) -> Result<Self> {
        let mut rng = thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, profile.key_bits)
            .map_err(|e| CertError::InvalidKey(format!("RSA gen error: {}", e)))?;
        let key_pem = private_key
            .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|e| CertError::InvalidKey(format!("RSA PEM error: {}", e)))?
            .to_string();
        let key_pair = KeyPair::from_pem(&key_pem)?;

        let mut params = CertificateParams::new(vec![profile.common_name.clone()])?;
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, &profile.common_name);
        dn.push(DnType::OrganizationName, &profile.organization);
        params.distinguished_name = dn;
        params.is_ca = IsCa::NoCa;
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature];

        let now = OffsetDateTime::now_utc();
        params.not_before = now;
        params.not_after = now + Duration::days(profile.validity_days as i64);

        let cert = params.self_signed(&key_pair)?;

        Ok(Self {
            cert_pem: cert.pem(),
            key_pem,
        })
    }

    pub fn from_pem(cert_pem: impl Into<String>, key_pem: impl Into<String>) -> Self {
        Self {
            cert_pem: cert_pem.into(),
            key_pem: key_pem.into(),
        }
    }

    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    pub fn key_pem(&self) -> &str {
        &self.key_pem
    }

    /// Write `digital-certificate.txt` and `private-key.pem` into `dir`
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
        fs::write(dir.join(CERTIFICATE_FILE), &self.cert_pem)?;
        fs::write(dir.join(PRIVATE_KEY_FILE), &self.key_pem)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let cert_pem = fs::read_to_string(dir.join(CERTIFICATE_FILE))?;
        let key_pem = fs::read_to_string(dir.join(PRIVATE_KEY_FILE))?;
        Ok(Self { cert_pem, key_pem })
    }
}

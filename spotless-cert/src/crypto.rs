use crate::algorithm::SigningAlgorithm;
use crate::error::{CertError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::Sha256;
use x509_parser::prelude::*;

const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";

/// Parse an RSA private key (PKCS#8 `PRIVATE KEY` or PKCS#1 `RSA PRIVATE KEY`)
pub fn parse_private_key(priv_key_pem: &str) -> Result<RsaPrivateKey> {
    let trimmed = priv_key_pem.trim();
    if trimmed.contains("BEGIN RSA PRIVATE KEY") {
        return RsaPrivateKey::from_pkcs1_pem(trimmed)
            .map_err(|e| CertError::InvalidKey(format!("PKCS#1 parse error: {}", e)));
    }
    RsaPrivateKey::from_pkcs8_pem(trimmed)
        .map_err(|e| CertError::InvalidKey(format!("PKCS#8 parse error: {}", e)))
}

/// Sign with an already-parsed key (RSASSA-PKCS1-v1_5)
pub fn sign_with_key(
    key: &RsaPrivateKey,
    data: &[u8],
    algorithm: SigningAlgorithm,
) -> Result<Vec<u8>> {
    let signature = match algorithm {
        SigningAlgorithm::Sha1 => SigningKey::<Sha1>::new(key.clone())
            .try_sign(data)
            .map(|s| s.to_vec()),
        SigningAlgorithm::Sha256 => SigningKey::<Sha256>::new(key.clone())
            .try_sign(data)
            .map(|s| s.to_vec()),
    };
    signature.map_err(|e| CertError::Signing(e.to_string()))
}

/// Sign data using a PEM private key
pub fn sign(priv_key_pem: &str, data: &[u8], algorithm: SigningAlgorithm) -> Result<Vec<u8>> {
    let key = parse_private_key(priv_key_pem)?;
    sign_with_key(&key, data, algorithm)
}

/// Sign and base64-encode (the form print agents expect)
pub fn sign_base64(priv_key_pem: &str, data: &[u8], algorithm: SigningAlgorithm) -> Result<String> {
    sign(priv_key_pem, data, algorithm).map(|sig| BASE64.encode(sig))
}

/// Extract the RSA public key from a PEM certificate
pub fn public_key_from_certificate(cert_pem: &str) -> Result<RsaPublicKey> {
    let (_, pem) = parse_x509_pem(cert_pem.as_bytes())
        .map_err(|e| CertError::InvalidCertificate(format!("PEM parse error: {}", e)))?;
    let (_, x509) = x509_parser::parse_x509_certificate(&pem.contents)
        .map_err(|e| CertError::InvalidCertificate(format!("X509 parse error: {}", e)))?;

    let spki = x509.tbs_certificate.subject_pki;
    let oid = spki.algorithm.algorithm.to_id_string();
    if oid != OID_RSA_ENCRYPTION {
        return Err(CertError::InvalidCertificate(format!(
            "Unsupported algorithm OID: {}",
            oid
        )));
    }

    RsaPublicKey::from_pkcs1_der(&spki.subject_public_key.data)
        .map_err(|e| CertError::InvalidCertificate(format!("Invalid RSA public key: {}", e)))
}

/// Verify signature using the public key of a certificate
pub fn verify(
    cert_pem: &str,
    data: &[u8],
    sig: &[u8],
    algorithm: SigningAlgorithm,
) -> Result<()> {
    let public_key = public_key_from_certificate(cert_pem)?;
    verify_with_key(&public_key, data, sig, algorithm)
}

pub fn verify_with_key(
    public_key: &RsaPublicKey,
    data: &[u8],
    sig: &[u8],
    algorithm: SigningAlgorithm,
) -> Result<()> {
    let signature = Signature::try_from(sig)
        .map_err(|e| CertError::VerificationFailed(format!("Malformed signature: {}", e)))?;

    let outcome = match algorithm {
        SigningAlgorithm::Sha1 => {
            VerifyingKey::<Sha1>::new(public_key.clone()).verify(data, &signature)
        }
        SigningAlgorithm::Sha256 => {
            VerifyingKey::<Sha256>::new(public_key.clone()).verify(data, &signature)
        }
    };
    outcome.map_err(|_| CertError::VerificationFailed("Signature verification failed".into()))
}

/// Verify a base64 signature
pub fn verify_base64(
    cert_pem: &str,
    data: &[u8],
    sig_b64: &str,
    algorithm: SigningAlgorithm,
) -> Result<()> {
    let sig = BASE64
        .decode(sig_b64.trim())
        .map_err(|e| CertError::VerificationFailed(format!("Invalid base64: {}", e)))?;
    verify(cert_pem, data, &sig, algorithm)
}

/// Lowercase hex of the leading bytes, for log lines that must not carry
/// the full payload
pub fn hex_prefix(data: &[u8], max_chars: usize) -> String {
    let take = max_chars.div_ceil(2).min(data.len());
    let mut out = hex::encode(&data[..take]);
    out.truncate(max_chars);
    out
}

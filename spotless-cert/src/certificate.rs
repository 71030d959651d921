//! Certificate inspection.
//!
//! The print agent trusts whatever certificate the console presents, so the
//! only gate on our side is that the text is a well-formed X.509 PEM.

use crate::error::{CertError, Result};
use x509_parser::prelude::*;

/// Marker every PEM certificate carries in its armour line
pub const CERTIFICATE_MARKER: &str = "BEGIN CERTIFICATE";

/// Summary of a parsed certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub common_name: Option<String>,
    pub organization: Option<String>,
    /// Unix seconds
    pub not_before: i64,
    /// Unix seconds
    pub not_after: i64,
    pub is_currently_valid: bool,
}

/// Quick textual check used before any parsing
pub fn looks_like_certificate(text: &str) -> bool {
    text.contains(CERTIFICATE_MARKER)
}

/// Parse and summarise a PEM certificate
pub fn inspect_certificate(cert_pem: &str) -> Result<CertificateInfo> {
    if !looks_like_certificate(cert_pem) {
        return Err(CertError::InvalidCertificate(
            "missing certificate header".into(),
        ));
    }

    let (_, pem) = parse_x509_pem(cert_pem.trim().as_bytes())
        .map_err(|e| CertError::InvalidCertificate(format!("PEM parse error: {}", e)))?;
    let (_, x509) = x509_parser::parse_x509_certificate(&pem.contents)
        .map_err(|e| CertError::InvalidCertificate(format!("X509 parse error: {}", e)))?;

    let common_name = x509
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string);
    let organization = x509
        .subject()
        .iter_organization()
        .next()
        .and_then(|o| o.as_str().ok())
        .map(str::to_string);

    let validity = x509.validity();
    Ok(CertificateInfo {
        common_name,
        organization,
        not_before: validity.not_before.timestamp(),
        not_after: validity.not_after.timestamp(),
        is_currently_valid: validity.is_valid(),
    })
}

//! Signing bridge between the print agent and the signing authority
//!
//! Trust is decided once, at setup: a well-formed certificate makes the
//! bridge `Trusted`, anything else makes it `Disabled` and the agent falls
//! back to asking the operator. Individual signing failures never move the
//! bridge out of its state.

use crate::agent::SecurityProvider;
use crate::authority::SignatureAuthority;
use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared::signing::{CERTIFICATE_PATH, SignRequest};
use spotless_cert::{inspect_certificate, looks_like_certificate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Default bound on one signing round-trip
pub const DEFAULT_SIGN_TIMEOUT: Duration = Duration::from_secs(10);

/// Trust state of the bridge
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrustState {
    /// setup() has not run yet
    #[default]
    Unloaded,
    /// Certificate loaded; challenges are forwarded
    Trusted(String),
    /// No usable certificate; the reason is kept for diagnostics
    Disabled(String),
}

/// Where the public certificate comes from
#[async_trait]
pub trait CertificateSource: Send + Sync {
    async fn fetch(&self) -> PrintResult<String>;
}

/// Certificate published over HTTP next to the console
pub struct HttpCertificateSource {
    client: reqwest::Client,
    url: String,
}

impl HttpCertificateSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// `{base_url}/qz-digital-certificate.txt`
    pub fn at(base_url: &str) -> Self {
        Self::new(format!(
            "{}{}",
            base_url.trim_end_matches('/'),
            CERTIFICATE_PATH
        ))
    }
}

#[async_trait]
impl CertificateSource for HttpCertificateSource {
    async fn fetch(&self) -> PrintResult<String> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PrintError::Certificate(format!(
                "{} returned {status}",
                self.url
            )));
        }
        Ok(response.text().await?)
    }
}

/// Certificate known up front (configuration, tests)
#[derive(Debug, Clone, Default)]
pub struct StaticCertificateSource(pub Option<String>);

impl StaticCertificateSource {
    pub fn new(pem: impl Into<String>) -> Self {
        Self(Some(pem.into()))
    }
}

#[async_trait]
impl CertificateSource for StaticCertificateSource {
    async fn fetch(&self) -> PrintResult<String> {
        self.0
            .clone()
            .ok_or_else(|| PrintError::Certificate("No certificate configured".into()))
    }
}

pub struct SigningBridge {
    source: Arc<dyn CertificateSource>,
    authority: Arc<dyn SignatureAuthority>,
    sign_timeout: Duration,
    state: RwLock<TrustState>,
}

impl SigningBridge {
    pub fn new(source: Arc<dyn CertificateSource>, authority: Arc<dyn SignatureAuthority>) -> Self {
        Self {
            source,
            authority,
            sign_timeout: DEFAULT_SIGN_TIMEOUT,
            state: RwLock::new(TrustState::Unloaded),
        }
    }

    pub fn with_sign_timeout(mut self, timeout: Duration) -> Self {
        self.sign_timeout = timeout;
        self
    }

    /// Load the certificate and decide trust
    #[instrument(skip(self))]
    pub async fn setup(&self) -> TrustState {
        let state = match self.source.fetch().await {
            Ok(pem) => Self::evaluate(pem),
            Err(e) => TrustState::Disabled(e.to_string()),
        };

        match &state {
            TrustState::Trusted(_) => info!("Signing bridge trusted; silent printing enabled"),
            TrustState::Disabled(reason) => {
                warn!(%reason, "Signing bridge disabled; the print agent will prompt")
            }
            TrustState::Unloaded => {}
        }

        *self.state.write() = state.clone();
        state
    }

    fn evaluate(pem: String) -> TrustState {
        if !looks_like_certificate(&pem) {
            return TrustState::Disabled("Certificate file missing or invalid".into());
        }
        match inspect_certificate(&pem) {
            Ok(info) => {
                if !info.is_currently_valid {
                    warn!(
                        not_after = info.not_after,
                        "Signing certificate is outside its validity period"
                    );
                }
                TrustState::Trusted(pem)
            }
            Err(e) => TrustState::Disabled(e.to_string()),
        }
    }

    pub fn state(&self) -> TrustState {
        self.state.read().clone()
    }

    pub fn is_trusted(&self) -> bool {
        matches!(*self.state.read(), TrustState::Trusted(_))
    }
}

#[async_trait]
impl SecurityProvider for SigningBridge {
    fn certificate(&self) -> Option<String> {
        match &*self.state.read() {
            TrustState::Trusted(pem) => Some(pem.clone()),
            _ => None,
        }
    }

    #[instrument(skip(self, challenge), fields(len = challenge.message.len(), algorithm = %challenge.resolved_algorithm()))]
    async fn sign(&self, challenge: &SignRequest) -> PrintResult<String> {
        match self.state() {
            TrustState::Trusted(_) => {}
            TrustState::Unloaded => {
                return Err(PrintError::SigningDisabled("Bridge not set up".into()));
            }
            TrustState::Disabled(reason) => return Err(PrintError::SigningDisabled(reason)),
        }

        let signature = tokio::time::timeout(self.sign_timeout, self.authority.sign(challenge))
            .await
            .map_err(|_| {
                PrintError::Timeout(format!(
                    "No signature within {}s",
                    self.sign_timeout.as_secs_f32()
                ))
            })?
            .inspect_err(|e| warn!(error = %e, "Signing request rejected"))?;

        if signature.trim().is_empty() {
            return Err(PrintError::SigningFailed("No signature returned".into()));
        }
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        reply: PrintResult<String>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn ok(sig: &str) -> Self {
            Self {
                reply: Ok(sig.to_string()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SignatureAuthority for Scripted {
        async fn sign(&self, _challenge: &SignRequest) -> PrintResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match &self.reply {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(PrintError::SigningFailed(e.to_string())),
            }
        }
    }

    fn certificate() -> String {
        spotless_cert::SigningIdentity::generate(&Default::default())
            .unwrap()
            .cert_pem()
            .to_string()
    }

    #[tokio::test]
    async fn test_missing_certificate_disables_bridge() {
        let authority = Arc::new(Scripted::ok("c2ln"));
        let bridge = SigningBridge::new(
            Arc::new(StaticCertificateSource::default()),
            authority.clone(),
        );
        assert!(matches!(bridge.setup().await, TrustState::Disabled(_)));
        assert!(bridge.certificate().is_none());

        let err = bridge.sign(&SignRequest::new("abc", Default::default())).await;
        assert!(matches!(err, Err(PrintError::SigningDisabled(_))));
        assert_eq!(authority.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_text_without_header_disables_bridge() {
        let bridge = SigningBridge::new(
            Arc::new(StaticCertificateSource::new("<html>not found</html>")),
            Arc::new(Scripted::ok("c2ln")),
        );
        assert_eq!(
            bridge.setup().await,
            TrustState::Disabled("Certificate file missing or invalid".into())
        );
    }

    #[tokio::test]
    async fn test_trusted_bridge_forwards_challenge() {
        let pem = certificate();
        let bridge = SigningBridge::new(
            Arc::new(StaticCertificateSource::new(pem.clone())),
            Arc::new(Scripted::ok("c2lnbmF0dXJl")),
        );
        assert!(bridge.sign(&SignRequest::default()).await.is_err());

        assert_eq!(bridge.setup().await, TrustState::Trusted(pem.clone()));
        assert_eq!(bridge.certificate(), Some(pem));
        let sig = bridge
            .sign(&SignRequest::new("abc", Default::default()))
            .await
            .unwrap();
        assert_eq!(sig, "c2lnbmF0dXJl");
    }

    #[tokio::test]
    async fn test_empty_signature_rejected_without_losing_trust() {
        let bridge = SigningBridge::new(
            Arc::new(StaticCertificateSource::new(certificate())),
            Arc::new(Scripted::ok("")),
        );
        bridge.setup().await;

        let err = bridge.sign(&SignRequest::default()).await.unwrap_err();
        assert!(matches!(err, PrintError::SigningFailed(_)));
        assert!(bridge.is_trusted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_authority_times_out() {
        let authority = Scripted {
            delay: Duration::from_secs(30),
            ..Scripted::ok("late")
        };
        let bridge = SigningBridge::new(
            Arc::new(StaticCertificateSource::new(certificate())),
            Arc::new(authority),
        );
        bridge.setup().await;

        let err = bridge.sign(&SignRequest::default()).await.unwrap_err();
        assert!(matches!(err, PrintError::Timeout(_)));
        assert!(bridge.is_trusted());
    }
}

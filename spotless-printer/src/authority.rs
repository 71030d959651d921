//! Signature authorities
//!
//! The private key never lives in the console. [`RemoteAuthority`] forwards
//! challenges to the signing service under the operator's session;
//! [`LocalAuthority`] signs in-process for development and tests.

use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use base64::Engine;
use shared::signing::{SIGN_PATH, SignReply, SignRequest};
use spotless_cert::SecureSigner;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Produces a base64 signature for an agent challenge
#[async_trait]
pub trait SignatureAuthority: Send + Sync {
    async fn sign(&self, challenge: &SignRequest) -> PrintResult<String>;
}

/// Source of the operator's current session token
#[async_trait]
pub trait SessionTokens: Send + Sync {
    async fn access_token(&self) -> Option<String>;
}

/// Fixed token (or none)
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }
}

#[async_trait]
impl SessionTokens for StaticToken {
    async fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Signing service reached over HTTPS
pub struct RemoteAuthority {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    tokens: Arc<dyn SessionTokens>,
}

impl RemoteAuthority {
    pub fn new(endpoint: impl Into<String>, tokens: Arc<dyn SessionTokens>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
            tokens,
        }
    }

    /// Authority hosted as an edge function next to the data gateway
    pub fn for_gateway(base_url: &str, tokens: Arc<dyn SessionTokens>) -> Self {
        let base = base_url.trim_end_matches('/');
        Self::new(format!("{base}{SIGN_PATH}"), tokens)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SignatureAuthority for RemoteAuthority {
    #[instrument(skip(self, challenge), fields(endpoint = %self.endpoint, len = challenge.message.len()))]
    async fn sign(&self, challenge: &SignRequest) -> PrintResult<String> {
        let token = self
            .tokens
            .access_token()
            .await
            .ok_or_else(|| PrintError::SigningFailed("Not signed in".into()))?;

        let mut request = self.client.post(&self.endpoint).bearer_auth(token).json(challenge);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let reply: SignReply = match serde_json::from_str(&body) {
            Ok(reply) => reply,
            Err(_) => {
                warn!(%status, "Signing service returned a non-JSON body");
                return Err(PrintError::SigningFailed(format!(
                    "Unexpected response ({status})"
                )));
            }
        };

        match (reply.signature, reply.error) {
            (Some(signature), _) if !signature.is_empty() => {
                debug!(%status, "Challenge signed");
                Ok(signature)
            }
            (_, Some(error)) => Err(PrintError::SigningFailed(error)),
            _ => Err(PrintError::SigningFailed("No signature returned".into())),
        }
    }
}

/// In-process signer
pub struct LocalAuthority {
    signer: Arc<dyn SecureSigner>,
}

impl LocalAuthority {
    pub fn new(signer: Arc<dyn SecureSigner>) -> Self {
        Self { signer }
    }
}

#[async_trait]
impl SignatureAuthority for LocalAuthority {
    async fn sign(&self, challenge: &SignRequest) -> PrintResult<String> {
        let algorithm = challenge.resolved_algorithm();
        let signature = self
            .signer
            .sign(challenge.message.as_bytes(), algorithm)
            .await
            .map_err(|e| PrintError::SigningFailed(e.to_string()))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(signature))
    }
}

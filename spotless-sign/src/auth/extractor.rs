//! Session Extractor
//!
//! Validates the bearer session token before a handler runs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use super::{SessionError, SessionVerifier};
use crate::error::AppError;
use crate::security_log;
use crate::state::AppState;

/// Signed-in caller
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
}

impl FromRequestParts<Arc<AppState>> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<SessionUser>() {
            return Ok(user.clone());
        }

        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match auth_header.and_then(SessionVerifier::extract_from_header) {
            Some(token) => token,
            None => {
                security_log!("WARN", "session_missing", uri = format!("{:?}", parts.uri));
                return Err(AppError::Unauthorized);
            }
        };

        let verifier = state.sessions.as_ref().ok_or_else(|| {
            AppError::NotConfigured("Session verification is not configured".into())
        })?;

        match verifier.validate_token(token) {
            Ok(claims) => {
                let user = SessionUser {
                    id: claims.sub,
                    email: claims.email,
                };
                parts.extensions.insert(user.clone());
                Ok(user)
            }
            Err(e) => {
                security_log!(
                    "WARN",
                    "session_rejected",
                    error = format!("{}", e),
                    uri = format!("{:?}", parts.uri)
                );
                match e {
                    SessionError::ExpiredToken => Err(AppError::TokenExpired),
                    other => Err(AppError::InvalidToken(other.to_string())),
                }
            }
        }
    }
}

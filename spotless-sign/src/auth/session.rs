//! 会话令牌校验
//!
//! 令牌由外部身份提供方签发 (HS256)，这里只负责验证，不签发。

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 会话令牌中的 Claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// 用户 ID
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// 过期时间戳
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    pub aud: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Session token expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,
}

/// 会话校验器
#[derive(Clone)]
pub struct SessionVerifier {
    decoding_key: DecodingKey,
    audience: String,
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionVerifier")
            .field("audience", &self.audience)
            .finish()
    }
}

impl SessionVerifier {
    pub fn new(secret: &str, audience: impl Into<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            audience: audience.into(),
        }
    }

    /// 验证并解码令牌
    pub fn validate_token(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["sub", "exp", "aud"]);

        let token_data =
            decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => SessionError::ExpiredToken,
                    ErrorKind::InvalidSignature => SessionError::InvalidSignature,
                    _ => SessionError::InvalidToken(e.to_string()),
                }
            })?;

        Ok(token_data.claims)
    }

    /// 从 Authorization 头提取令牌
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

    fn token(secret: &str, aud: &str, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = SessionClaims {
            sub: "user-1".into(),
            email: Some("ops@example.com".into()),
            role: Some("authenticated".into()),
            exp: now + exp_offset,
            iat: Some(now),
            aud: aud.into(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token() {
        let verifier = SessionVerifier::new(SECRET, "authenticated");
        let claims = verifier
            .validate_token(&token(SECRET, "authenticated", 3600))
            .unwrap();
        assert_eq!(claims.sub, "user-1");
    }

    #[test]
    fn test_rejections() {
        let verifier = SessionVerifier::new(SECRET, "authenticated");
        assert_eq!(
            verifier.validate_token(&token(SECRET, "authenticated", -3600)),
            Err(SessionError::ExpiredToken)
        );
        assert_eq!(
            verifier.validate_token(&token("another-secret-entirely-for-testing", "authenticated", 3600)),
            Err(SessionError::InvalidSignature)
        );
        assert!(matches!(
            verifier.validate_token(&token(SECRET, "anon", 3600)),
            Err(SessionError::InvalidToken(_))
        ));
        assert!(matches!(
            verifier.validate_token("not.a.jwt"),
            Err(SessionError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(SessionVerifier::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(SessionVerifier::extract_from_header("Bearer "), None);
        assert_eq!(SessionVerifier::extract_from_header("Basic abc"), None);
    }
}

//! 统一错误处理
//!
//! 所有失败都以 `{"error": "..."}` 返回，签名字段永远不会出现在错误响应里。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shared::signing::SignErrorBody;
use tracing::error;

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    /// 缺少会话令牌 (401)
    Unauthorized,

    #[error("Session expired")]
    /// 会话过期 (401)
    TokenExpired,

    #[error("Invalid session: {0}")]
    /// 无效会话 (401)
    InvalidToken(String),

    #[error("Validation failed: {0}")]
    /// 请求参数错误 (400)
    Validation(String),

    #[error("Not found: {0}")]
    /// 资源不存在 (404)
    NotFound(String),

    #[error("Misconfigured: {0}")]
    /// 服务端配置缺失 (500)，不可重试
    NotConfigured(String),

    #[error("Signing failed: {0}")]
    /// 签名失败 (500)
    Signing(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::TokenExpired | AppError::InvalidToken(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotConfigured(_) | AppError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Unauthorized => "Authentication required".to_string(),
            AppError::TokenExpired => "Session expired".to_string(),
            AppError::InvalidToken(_) => "Invalid session".to_string(),
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::NotConfigured(msg) => {
                error!(target: "config", error = %msg, "Signing service misconfigured");
                msg.clone()
            }
            AppError::Signing(msg) => {
                error!(target: "signing", error = %msg, "Signing failed");
                "Signing failed".to_string()
            }
        };

        (status, Json(SignErrorBody { error: message })).into_response()
    }
}

impl From<spotless_cert::CertError> for AppError {
    fn from(e: spotless_cert::CertError) -> Self {
        AppError::Signing(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

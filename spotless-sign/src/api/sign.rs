use crate::auth::SessionUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{FromRequest, Request, State};
use axum::extract::rejection::JsonRejection;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use shared::signing::{SignRequest, SignResponse};
use spotless_cert::hex_prefix;
use std::sync::Arc;
use tracing::{debug, info};

/// Characters of the message hex kept in logs
const LOG_PREFIX_CHARS: usize = 64;

/// JSON body whose rejection still answers with an `{error}` body
pub struct SignBody<T>(pub T);

impl<S, T> FromRequest<S> for SignBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(status = %rejection.status(), "Malformed sign request");
                Err(AppError::Validation(rejection.body_text()))
            }
        }
    }
}

/// Sign a print-agent challenge with the service key.
///
/// The message is opaque: it is signed byte-for-byte and only its length,
/// digest and a short hex prefix are ever logged.
pub async fn sign_message(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    SignBody(req): SignBody<SignRequest>,
) -> AppResult<Json<SignResponse>> {
    if req.message.is_empty() {
        return Err(AppError::Validation("No message to sign".into()));
    }

    let signer = state.signer.as_ref().ok_or_else(|| {
        AppError::NotConfigured("Signing key is not configured on the server".into())
    })?;

    let algorithm = req.resolved_algorithm();
    let bytes = req.message.as_bytes();
    debug!(
        user_id = %user.id,
        message_len = bytes.len(),
        algorithm = %algorithm,
        message_hex_prefix = %hex_prefix(bytes, LOG_PREFIX_CHARS),
        "Signing request"
    );

    let signature = signer.sign(bytes, algorithm).await?;

    info!(user_id = %user.id, algorithm = %algorithm, "Message signed");
    Ok(Json(SignResponse {
        signature: BASE64.encode(signature),
        algo_used: algorithm.as_str().to_string(),
    }))
}

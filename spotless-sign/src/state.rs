use crate::auth::SessionVerifier;
use crate::config::Config;
use spotless_cert::{SecureSigner, SoftwareSigner, inspect_certificate};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct AppState {
    /// 签名器；私钥缺失或无效时为 None
    pub signer: Option<Arc<dyn SecureSigner>>,
    /// 会话校验器；密钥缺失时为 None (所有签名请求失败)
    pub sessions: Option<SessionVerifier>,
    /// 对外发布的证书
    pub certificate: Option<String>,
}

impl AppState {
    pub fn new(
        signer: Option<Arc<dyn SecureSigner>>,
        sessions: Option<SessionVerifier>,
    ) -> Self {
        let certificate = signer.as_ref().and_then(|s| s.certificate_pem());
        Self {
            signer,
            sessions,
            certificate,
        }
    }

    /// 配置问题只禁用对应功能，不阻止服务启动
    pub fn from_config(config: &Config) -> Self {
        let signer: Option<Arc<dyn SecureSigner>> = match config.signing_private_key.as_deref() {
            Some(key_pem) => {
                match SoftwareSigner::new(key_pem, config.signing_certificate.clone()) {
                    Ok(signer) => {
                        info!("Signing key loaded");
                        Some(Arc::new(signer))
                    }
                    Err(e) => {
                        error!(error = %e, "Signing key rejected; signing disabled");
                        None
                    }
                }
            }
            None => {
                warn!("SIGNING_PRIVATE_KEY not set; signing disabled");
                None
            }
        };

        if let Some(cert) = config.signing_certificate.as_deref() {
            match inspect_certificate(cert) {
                Ok(info) if !info.is_currently_valid => {
                    warn!(not_after = info.not_after, "Published certificate is outside its validity period")
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Published certificate is not a valid X.509 PEM"),
            }
        }

        let sessions = match config.session_jwt_secret.as_deref() {
            Some(secret) => Some(SessionVerifier::new(secret, &config.session_jwt_audience)),
            None => {
                warn!("SESSION_JWT_SECRET not set; every signing request will be refused");
                None
            }
        };

        let mut state = Self::new(signer, sessions);
        if state.certificate.is_none() {
            state.certificate = config.signing_certificate.clone();
        }
        state
    }
}

use crate::algorithm::SigningAlgorithm;
use crate::crypto;
use crate::error::{CertError, Result};
use async_trait::async_trait;
use rsa::RsaPrivateKey;
use rsa::pkcs1::EncodeRsaPublicKey;
use std::path::Path;
use tracing::{debug, warn};

/// 签名提供方类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Software,
    Kms,
}

/// 安全签名器接口
///
/// 调用者永远拿不到私钥本身，只能请求"对这段数据签名"。
/// 签名服务和本地开发用的签名桥都通过这个接口访问密钥。
#[async_trait]
pub trait SecureSigner: Send + Sync {
    /// 公钥 (PKCS#1 DER)
    fn public_key(&self) -> Result<Vec<u8>>;

    /// 对外发布的证书 (PEM)，没有配置时为 None
    fn certificate_pem(&self) -> Option<String>;

    /// 数据进去，签名出来
    async fn sign(&self, data: &[u8], algorithm: SigningAlgorithm) -> Result<Vec<u8>>;

    fn provider_type(&self) -> ProviderType;
}

/// 软件签名器：私钥常驻内存，只解析一次
pub struct SoftwareSigner {
    key: RsaPrivateKey,
    cert_pem: Option<String>,
}

impl SoftwareSigner {
    pub fn new(priv_key_pem: &str, cert_pem: Option<String>) -> Result<Self> {
        let key = crypto::parse_private_key(priv_key_pem)?;

        // 证书必须和私钥配对，否则代理端验签一定失败
        if let Some(cert) = cert_pem.as_deref() {
            let cert_key = crypto::public_key_from_certificate(cert)?;
            if cert_key != key.to_public_key() {
                warn!("Signing certificate does not match the private key");
                return Err(CertError::InvalidCertificate(
                    "certificate does not match private key".into(),
                ));
            }
        }

        Ok(Self { key, cert_pem })
    }

    pub fn from_files(priv_path: impl AsRef<Path>, cert_path: Option<&Path>) -> Result<Self> {
        let priv_path = priv_path.as_ref();
        debug!(key = %priv_path.display(), cert = ?cert_path, "Loading signing identity");
        let priv_pem = std::fs::read_to_string(priv_path)?;
        let cert_pem = match cert_path {
            Some(p) => Some(std::fs::read_to_string(p)?),
            None => None,
        };
        Self::new(&priv_pem, cert_pem)
    }
}

#[async_trait]
impl SecureSigner for SoftwareSigner {
    fn public_key(&self) -> Result<Vec<u8>> {
        self.key
            .to_public_key()
            .to_pkcs1_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CertError::InvalidKey(e.to_string()))
    }

    fn certificate_pem(&self) -> Option<String> {
        self.cert_pem.clone()
    }

    async fn sign(&self, data: &[u8], algorithm: SigningAlgorithm) -> Result<Vec<u8>> {
        crypto::sign_with_key(&self.key, data, algorithm)
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Software
    }
}

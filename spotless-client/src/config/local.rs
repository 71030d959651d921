// 本机配置 - JSON 文件存储 (网关地址/密钥、门店打印机覆盖)

use super::ClientConfig;
use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use spotless_printer::PrintConfig;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const LOCAL_CONFIG_FILE: &str = "local-config.json";
pub const ENV_GATEWAY_URL: &str = "SPOTLESS_GATEWAY_URL";
pub const ENV_GATEWAY_KEY: &str = "SPOTLESS_GATEWAY_KEY";

/// Workstation-local settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_key: Option<String>,
    /// store id -> printer name on this workstation
    #[serde(default)]
    pub printer_overrides: BTreeMap<String, String>,
}

impl LocalConfig {
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.gateway_url) && present(&self.gateway_key)
    }

    /// Store the gateway pair: trimmed, URL without trailing slash
    pub fn set_gateway(&mut self, url: &str, key: &str) {
        let url = url.trim();
        self.gateway_url = Some(url.strip_suffix('/').unwrap_or(url).to_string());
        self.gateway_key = Some(key.trim().to_string());
    }

    pub fn clear_gateway(&mut self) {
        self.gateway_url = None;
        self.gateway_key = None;
    }

    /// `None` or a blank name removes the override
    pub fn set_printer_override(&mut self, store_id: &str, printer: Option<&str>) {
        match printer.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => {
                self.printer_overrides
                    .insert(store_id.to_string(), p.to_string());
            }
            None => {
                self.printer_overrides.remove(store_id);
            }
        }
    }

    /// Apply environment overrides (`lookup` is `std::env::var` in production)
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_GATEWAY_URL).filter(|v| !v.trim().is_empty()) {
            self.gateway_url = Some(url.trim().trim_end_matches('/').to_string());
        }
        if let Some(key) = lookup(ENV_GATEWAY_KEY).filter(|v| !v.trim().is_empty()) {
            self.gateway_key = Some(key.trim().to_string());
        }
        self
    }

    pub fn client_config(&self) -> ClientResult<ClientConfig> {
        match (&self.gateway_url, &self.gateway_key) {
            (Some(url), Some(key)) if self.is_configured() => Ok(ClientConfig::new(url, key)),
            _ => Err(ClientError::Config(
                "Gateway URL and key must both be set".into(),
            )),
        }
    }

    pub fn print_config(&self) -> PrintConfig {
        self.printer_overrides
            .iter()
            .fold(PrintConfig::new(), |config, (store, printer)| {
                config.with_printer_override(store, printer)
            })
    }
}

/// JSON file holding the [`LocalConfig`]
#[derive(Debug, Clone)]
pub struct LocalConfigStorage {
    path: PathBuf,
}

impl LocalConfigStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            path: base_path.into().join(LOCAL_CONFIG_FILE),
        }
    }

    /// Missing or unreadable files read as an empty config
    pub fn load(&self) -> LocalConfig {
        if !self.path.exists() {
            return LocalConfig::default();
        }
        match fs::read_to_string(&self.path)
            .map_err(ClientError::from)
            .and_then(|json| serde_json::from_str(&json).map_err(ClientError::from))
        {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Ignoring unreadable local config: {e}");
                LocalConfig::default()
            }
        }
    }

    pub fn save(&self, config: &LocalConfig) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Save the gateway pair, keeping everything else in the file
    pub fn save_gateway(&self, url: &str, key: &str) -> ClientResult<LocalConfig> {
        let mut config = self.load();
        config.set_gateway(url, key);
        self.save(&config)?;
        Ok(config)
    }

    pub fn clear_gateway(&self) -> ClientResult<LocalConfig> {
        let mut config = self.load();
        config.clear_gateway();
        self.save(&config)?;
        Ok(config)
    }

    /// File contents with environment overrides applied
    pub fn resolve(&self) -> LocalConfig {
        self.load().with_env(|name| std::env::var(name).ok())
    }

    pub fn delete(&self) -> std::io::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

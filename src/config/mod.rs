#[cfg(feature = "cli")]
pub mod cli;

use crate::adapters::gemini::{DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};
use crate::core::token_broker::DEFAULT_SAFETY_MARGIN_SECS;
use crate::utils::error::{AstroError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

pub const DEFAULT_API_HOST: &str = "https://api.prokerala.com";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 20;

#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_host")]
    pub api_host: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_token_margin")]
    pub token_margin_seconds: i64,
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_seconds: u64,
    pub insight: Option<InsightConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

fn default_api_host() -> String {
    DEFAULT_API_HOST.to_string()
}

fn default_token_margin() -> i64 {
    DEFAULT_SAFETY_MARGIN_SECS
}

fn default_upstream_timeout() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_SECS
}

fn default_gemini_endpoint() -> String {
    DEFAULT_GEMINI_ENDPOINT.to_string()
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_host: default_api_host(),
            client_id: String::new(),
            client_secret: String::new(),
            token_margin_seconds: default_token_margin(),
            upstream_timeout_seconds: default_upstream_timeout(),
            insight: None,
        }
    }
}

// client_secret 與 api_key 不得出現在日誌中
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_host", &self.api_host)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_margin_seconds", &self.token_margin_seconds)
            .field("upstream_timeout_seconds", &self.upstream_timeout_seconds)
            .field(
                "insight",
                &self.insight.as_ref().map(|i| (&i.endpoint, &i.model)),
            )
            .finish()
    }
}

impl AppConfig {
    /// 從環境變數載入 (Lambda 與 CLI 共用)
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            api_host: env::var("API_HOST").unwrap_or_else(|_| default_api_host()),
            client_id: env::var("CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("CLIENT_SECRET").unwrap_or_default(),
            token_margin_seconds: parse_env("TOKEN_MARGIN_SECONDS", default_token_margin())?,
            upstream_timeout_seconds: parse_env(
                "UPSTREAM_TIMEOUT_SECONDS",
                default_upstream_timeout(),
            )?,
            insight: None,
        };

        if let Ok(api_key) = env::var("GEMINI_API_KEY") {
            config.insight = Some(InsightConfig {
                api_key: Some(api_key),
                endpoint: env::var("GEMINI_ENDPOINT").unwrap_or_else(|_| default_gemini_endpoint()),
                model: env::var("GEMINI_MODEL").unwrap_or_else(|_| default_gemini_model()),
            });
        }

        Ok(config)
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AstroError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| AstroError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CLIENT_SECRET})；未設定的變數替換成空字串，
    /// 讓缺少的憑證在驗證時以設定錯誤回報
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid");

        re.replace_all(content, |caps: &regex::Captures| {
            env::var(&caps[1]).unwrap_or_default()
        })
        .to_string()
    }

    pub fn has_credentials(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AstroError::InvalidConfigValueError {
                field: name.to_string(),
                value: raw.clone(),
                reason: "not a valid number".to_string(),
            }),
        Err(_) => Ok(default),
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        use crate::utils::validation::*;

        validate_url("api_host", &self.api_host)?;

        if self.client_id.trim().is_empty() {
            return Err(AstroError::MissingConfigError {
                field: "CLIENT_ID".to_string(),
            });
        }
        if self.client_secret.trim().is_empty() {
            return Err(AstroError::MissingConfigError {
                field: "CLIENT_SECRET".to_string(),
            });
        }

        validate_range("upstream_timeout_seconds", self.upstream_timeout_seconds, 1, 120)?;
        validate_range("token_margin_seconds", self.token_margin_seconds, 0, 3600)?;

        if let Some(insight) = &self.insight {
            validate_url("insight.endpoint", &insight.endpoint)?;
            validate_non_empty_string("insight.model", &insight.model)?;
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }
}

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// 上游 HTTP 呼叫失敗的種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 連線失敗或逾時
    Network,
    /// 上游回傳非 2xx
    HttpStatus,
    /// 回應內容無法解析
    Parse,
}

/// 在 HTTP client 邊界統一後的上游錯誤
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpFailure {
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub message: String,
}

impl HttpFailure {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Network,
            status: None,
            message: message.into(),
        }
    }

    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::HttpStatus,
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn parse(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Parse,
            status,
            message: message.into(),
        }
    }

    /// reqwest 錯誤一律歸類為網路錯誤，逾時也視同非 2xx 回應處理
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network(format!("request timed out: {}", err))
        } else if err.is_decode() {
            Self::parse(err.status().map(|s| s.as_u16()), err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

#[derive(Error, Debug)]
pub enum AstroError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Authentication failed: {}", describe_auth(.status, .body))]
    AuthenticationError { status: Option<u16>, body: String },

    #[error("Upstream {endpoint} failed: {failure}")]
    UpstreamError {
        endpoint: String,
        failure: HttpFailure,
    },

    #[error("Invalid request: {message}")]
    RequestError { message: String },

    #[error("Insight generation failed: {message}")]
    InsightError { message: String },

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

fn describe_auth(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(status) => format!("token endpoint responded with {}: {}", status, body),
        None => format!("token endpoint unreachable: {}", body),
    }
}

impl AstroError {
    pub fn config(message: impl Into<String>) -> Self {
        AstroError::ConfigError {
            message: message.into(),
        }
    }

    pub fn upstream(endpoint: impl Into<String>, failure: HttpFailure) -> Self {
        AstroError::UpstreamError {
            endpoint: endpoint.into(),
            failure,
        }
    }

    /// 是否屬於設定錯誤（不應重試）
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AstroError::ConfigError { .. }
                | AstroError::MissingConfigError { .. }
                | AstroError::InvalidConfigValueError { .. }
        )
    }

    /// 對應給呼叫端的 HTTP 狀態碼
    pub fn status_code(&self) -> u16 {
        match self {
            AstroError::ConfigError { .. }
            | AstroError::MissingConfigError { .. }
            | AstroError::InvalidConfigValueError { .. } => 500,
            AstroError::AuthenticationError { .. } => 502,
            AstroError::UpstreamError { .. } => 502,
            AstroError::RequestError { .. } => 400,
            AstroError::InsightError { .. } => 502,
            AstroError::HttpClientError(_) => 502,
            AstroError::IoError(_) | AstroError::SerializationError(_) => 500,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AstroError::ConfigError { .. }
            | AstroError::MissingConfigError { .. }
            | AstroError::InvalidConfigValueError { .. } => "Proxy Configuration Error",
            AstroError::AuthenticationError { .. } => "Token Error",
            AstroError::UpstreamError { .. } | AstroError::HttpClientError(_) => "Upstream Error",
            AstroError::RequestError { .. } => "Invalid Request",
            AstroError::InsightError { .. } => "Insight Error",
            AstroError::IoError(_) | AstroError::SerializationError(_) => "Proxy Error",
        }
    }

    /// 給最終使用者看的訊息，不含任何憑證內容
    pub fn user_friendly_message(&self) -> String {
        match self {
            AstroError::ConfigError { message } => message.clone(),
            AstroError::MissingConfigError { .. } => "API credentials are not configured.".to_string(),
            AstroError::AuthenticationError { .. } => {
                "Failed to fetch token from the astrology API.".to_string()
            }
            AstroError::UpstreamError { endpoint, failure } => {
                format!("{} request failed: {}", endpoint, failure.message)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AstroError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(AstroError::config("missing").status_code(), 500);
        assert_eq!(
            AstroError::AuthenticationError {
                status: Some(401),
                body: "bad client".to_string()
            }
            .status_code(),
            502
        );
        assert_eq!(
            AstroError::upstream("kundli", HttpFailure::http_status(503, "down")).status_code(),
            502
        );
        assert_eq!(
            AstroError::RequestError {
                message: "no datetime".to_string()
            }
            .status_code(),
            400
        );
    }

    #[test]
    fn test_upstream_error_message_names_endpoint() {
        let err = AstroError::upstream(
            "dasha-periods",
            HttpFailure::http_status(503, "Service Unavailable"),
        );
        assert_eq!(
            err.to_string(),
            "Upstream dasha-periods failed: HTTP 503: Service Unavailable"
        );
        assert_eq!(
            err.user_friendly_message(),
            "dasha-periods request failed: Service Unavailable"
        );
    }

    #[test]
    fn test_authentication_error_without_status() {
        let err = AstroError::AuthenticationError {
            status: None,
            body: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("unreachable"));
        assert!(!err.is_configuration());
    }
}

use crate::domain::model::{AccessToken, ChakraProfile, DharmaType, Verdict};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 單一欄位的權杖快取；後寫入者覆蓋先寫入者
pub trait TokenStore: Send + Sync {
    /// 回傳仍在有效期內的權杖
    fn load(&self, now: DateTime<Utc>) -> Option<AccessToken>;
    fn store(&self, token: AccessToken);
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 提供給 AI 模型的命盤摘要
#[derive(Debug, Clone)]
pub struct InsightContext<'a> {
    pub dharma_type: &'a Verdict<DharmaType>,
    pub chakra_profile: &'a Verdict<ChakraProfile>,
    pub ascendant: Option<&'a serde_json::Value>,
    pub question: &'a str,
}

#[async_trait]
pub trait InsightProvider: Send + Sync {
    async fn generate_insight(&self, context: InsightContext<'_>) -> Result<String>;
}

use crate::adapters::{GeminiInsight, InMemoryTokenStore, SystemClock};
use crate::config::AppConfig;
use crate::core::orchestrator::{ForwardedResponse, ProfileOrchestrator};
use crate::core::query::token_url;
use crate::core::token_broker::TokenBroker;
use crate::domain::classifier::{classify_chakra, classify_dharma_type};
use crate::domain::model::{AnalysisReport, BirthQuery, Credentials};
use crate::domain::ports::{Clock, InsightContext, InsightProvider, TokenStore};
use crate::utils::error::{AstroError, Result};
use crate::utils::validation::Validate;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// 對外的單一入口：權杖代理 → 並行抓取 → 分類 → (選用) AI 洞察
pub struct ProxyService {
    orchestrator: ProfileOrchestrator,
    insight: Option<Arc<dyn InsightProvider>>,
    clock: Arc<dyn Clock>,
}

impl ProxyService {
    pub fn new(
        orchestrator: ProfileOrchestrator,
        insight: Option<Arc<dyn InsightProvider>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            orchestrator,
            insight,
            clock,
        }
    }

    /// 依設定組裝整個服務；權杖快取在整個行程內共用
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::from_config_with(
            config,
            Arc::new(InMemoryTokenStore::new()),
            Arc::new(SystemClock),
        )
    }

    pub fn from_config_with(
        config: &AppConfig,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let timeout = Duration::from_secs(config.upstream_timeout_seconds);
        let client = Client::builder()
            .user_agent(concat!("vedic-proxy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let broker = TokenBroker::new(
            client.clone(),
            token_url(&config.api_host)?.to_string(),
            store,
            clock.clone(),
        )
        .with_safety_margin(config.token_margin_seconds)
        .with_timeout(timeout);

        let orchestrator = ProfileOrchestrator::new(
            client.clone(),
            config.api_host.clone(),
            Arc::new(broker),
            Credentials::new(config.client_id.clone(), config.client_secret.clone()),
        )
        .with_timeout(timeout);

        let insight = config.insight.as_ref().and_then(|insight| {
            insight.api_key.as_ref().filter(|key| !key.trim().is_empty()).map(|key| {
                Arc::new(
                    GeminiInsight::new(
                        client.clone(),
                        insight.endpoint.clone(),
                        insight.model.clone(),
                        key.clone(),
                    )
                    .with_timeout(timeout),
                ) as Arc<dyn InsightProvider>
            })
        });

        Ok(Self::new(orchestrator, insight, clock))
    }

    /// 完整分析：合併命盤並計算 Dharma Type 與 Chakra；有問題時再產生 AI 洞察
    pub async fn analyze(
        &self,
        query: &BirthQuery,
        question: Option<&str>,
    ) -> Result<AnalysisReport> {
        query.validate()?;

        let profile = self.orchestrator.build_profile(query).await?;

        let dharma_type = classify_dharma_type(profile.planets());
        let chakra_profile = classify_chakra(profile.dasha_periods(), self.clock.now());

        if dharma_type.is_inconclusive() || chakra_profile.is_inconclusive() {
            tracing::warn!(
                "⚠️ Classification inconclusive: dharma={:?} chakra={:?}",
                dharma_type,
                chakra_profile
            );
        } else {
            tracing::info!("🔮 Classification complete");
        }

        let question = question.map(str::trim).filter(|q| !q.is_empty());
        let insight = match question {
            Some(question) => {
                let provider = self
                    .insight
                    .as_ref()
                    .ok_or_else(|| AstroError::config("Gemini API key is not configured."))?;
                let text = provider
                    .generate_insight(InsightContext {
                        dharma_type: &dharma_type,
                        chakra_profile: &chakra_profile,
                        ascendant: profile.ascendant(),
                        question,
                    })
                    .await?;
                Some(text)
            }
            None => None,
        };

        Ok(AnalysisReport {
            profile,
            dharma_type,
            chakra_profile,
            insight,
        })
    }

    pub async fn chart(&self, query: &BirthQuery) -> Result<String> {
        query.validate()?;
        self.orchestrator.build_chart(query).await
    }

    pub async fn forward(&self, path: &str, raw_query: Option<&str>) -> Result<ForwardedResponse> {
        self.orchestrator.forward(path, raw_query).await
    }
}

use crate::core::query::{endpoint_url, passthrough_url};
use crate::core::token_broker::TokenBroker;
use crate::domain::model::{BirthQuery, Credentials, Endpoint, MergedProfile};
use crate::utils::error::{AstroError, HttpFailure, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// 透傳代理收到的上游回應 (狀態碼與內容皆不變)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// 將多個上游 astrology 端點的呼叫並行發出後合併
pub struct ProfileOrchestrator {
    client: Client,
    api_host: String,
    broker: Arc<TokenBroker>,
    credentials: Credentials,
    timeout: Duration,
}

impl ProfileOrchestrator {
    pub fn new(
        client: Client,
        api_host: impl Into<String>,
        broker: Arc<TokenBroker>,
        credentials: Credentials,
    ) -> Self {
        Self {
            client,
            api_host: api_host.into(),
            broker,
            credentials,
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn bearer_token(&self) -> Result<String> {
        self.broker
            .get_access_token(&self.credentials.client_id, &self.credentials.client_secret)
            .await
    }

    /// 發出單一已認證的 GET；逾時與連線錯誤一律轉為 HttpFailure
    async fn send(&self, url: url::Url, token: &str) -> std::result::Result<Response, HttpFailure> {
        tracing::debug!("📡 GET {}", url);
        self.client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| HttpFailure::from_reqwest(&e))
    }

    async fn fetch_data(&self, url: url::Url, token: &str) -> std::result::Result<Value, HttpFailure> {
        let response = self.send(url, token).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| e.to_string());
            return Err(failure_from_body(status.as_u16(), &body));
        }

        let mut payload: Value = response
            .json()
            .await
            .map_err(|e| HttpFailure::parse(Some(status.as_u16()), e.to_string()))?;

        match payload.get_mut("data").map(Value::take) {
            Some(data) => Ok(data),
            None => Err(HttpFailure::parse(
                Some(status.as_u16()),
                "response has no data field",
            )),
        }
    }

    /// 並行呼叫 kundli、dasha-periods、natal-planet-position，全部成功才合併
    pub async fn build_profile(&self, query: &BirthQuery) -> Result<MergedProfile> {
        let kundli_url = endpoint_url(&self.api_host, Endpoint::Kundli, query)?;
        let dasha_url = endpoint_url(&self.api_host, Endpoint::DashaPeriods, query)?;
        let planets_url = endpoint_url(&self.api_host, Endpoint::NatalPlanetPosition, query)?;
        let token = self.bearer_token().await?;

        tracing::info!("🚀 Fanning out profile requests for {}", query.coordinates);

        let (kundli, dasha, planets) = tokio::join!(
            self.fetch_data(kundli_url, &token),
            self.fetch_data(dasha_url, &token),
            self.fetch_data(planets_url, &token),
        );

        for (endpoint, result) in [
            (Endpoint::Kundli, &kundli),
            (Endpoint::DashaPeriods, &dasha),
            (Endpoint::NatalPlanetPosition, &planets),
        ] {
            if let Err(failure) = result {
                tracing::warn!("⚠️ {} failed: {}", endpoint, failure);
            }
        }

        // 任一端點失敗就放棄整個合併
        let kundli = kundli.map_err(|f| AstroError::upstream(Endpoint::Kundli.name(), f))?;
        let dasha = dasha.map_err(|f| AstroError::upstream(Endpoint::DashaPeriods.name(), f))?;
        let planet_positions =
            planets.map_err(|f| AstroError::upstream(Endpoint::NatalPlanetPosition.name(), f))?;

        tracing::info!("✅ Profile assembled from kundli, dasha-periods and natal-planet-position");
        Ok(merge_profile(kundli, dasha, planet_positions))
    }

    /// 取得星盤 SVG；回應為圖片格式時原樣回傳文字內容
    pub async fn build_chart(&self, query: &BirthQuery) -> Result<String> {
        let token = self.bearer_token().await?;
        let endpoint = Endpoint::Chart;

        let url = endpoint_url(&self.api_host, endpoint, query)?;
        let response = self
            .send(url, &token)
            .await
            .map_err(|failure| AstroError::upstream(endpoint.name(), failure))?;

        let status = response.status();
        let content_type = content_type_of(&response);
        let body = response.text().await.map_err(|e| {
            AstroError::upstream(endpoint.name(), HttpFailure::from_reqwest(&e))
        })?;

        if !status.is_success() {
            return Err(AstroError::upstream(
                endpoint.name(),
                failure_from_body(status.as_u16(), &body),
            ));
        }

        match content_type.as_deref() {
            Some(ct) if ct.starts_with("image/") => {
                tracing::info!("🖼️ Chart received ({} bytes)", body.len());
                Ok(body)
            }
            other => Err(AstroError::upstream(
                endpoint.name(),
                HttpFailure::parse(
                    Some(status.as_u16()),
                    format!(
                        "expected an image response but got {}",
                        other.unwrap_or("no content type")
                    ),
                ),
            )),
        }
    }

    /// 已認證的透傳 GET，查詢字串逐字轉送
    pub async fn forward(&self, path: &str, raw_query: Option<&str>) -> Result<ForwardedResponse> {
        let token = self.bearer_token().await?;
        let url = passthrough_url(&self.api_host, path, raw_query)?;

        let response = self
            .send(url, &token)
            .await
            .map_err(|failure| AstroError::upstream(path, failure))?;

        let status = response.status().as_u16();
        let content_type = content_type_of(&response);
        let body = response
            .text()
            .await
            .map_err(|e| AstroError::upstream(path, HttpFailure::from_reqwest(&e)))?;

        Ok(ForwardedResponse {
            status,
            content_type,
            body,
        })
    }
}

fn content_type_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase())
}

/// 解析上游錯誤內容 `{errors:[{detail}]}`；無法解析時退回狀態碼與原始內容
pub fn failure_from_body(status: u16, body: &str) -> HttpFailure {
    let details: Vec<String> = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("errors").and_then(Value::as_array).cloned())
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("detail").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if details.is_empty() {
        let text = body.trim();
        let message = if text.is_empty() {
            reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("empty response body")
                .to_string()
        } else {
            text.to_string()
        };
        HttpFailure::http_status(status, message)
    } else {
        HttpFailure::http_status(status, details.join("; "))
    }
}

/// 合併各端點的 data，並把行星位置投影到 kundli 上
pub fn merge_profile(mut kundli: Value, dasha: Value, planet_positions: Value) -> MergedProfile {
    if !kundli.is_object() {
        kundli = Value::Object(serde_json::Map::new());
    }

    if let Value::Object(map) = &mut kundli {
        if let Some(ascendant) = planet_positions.get("ascendant") {
            map.insert("ascendant".to_string(), ascendant.clone());
        }
        if let Some(planets) = planet_positions.get("planets") {
            map.insert("planet_positions".to_string(), planets.clone());
        }
    }

    MergedProfile {
        kundli,
        dasha,
        planet_positions,
        chart_svg: None,
    }
}

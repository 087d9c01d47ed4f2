use crate::domain::model::Verdict;
use crate::domain::ports::{InsightContext, InsightProvider};
use crate::utils::error::{AstroError, HttpFailure, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

/// Gemini generateContent 的洞察產生器
pub struct GeminiInsight {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiInsight {
    pub fn new(client: Client, endpoint: String, model: String, api_key: String) -> Self {
        Self {
            client,
            endpoint,
            model,
            api_key,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

/// 組合給模型的提示詞
pub fn build_prompt(context: &InsightContext<'_>) -> String {
    let dharma = match context.dharma_type {
        Verdict::Conclusive { value } => value.label().to_string(),
        Verdict::Inconclusive { .. } => "Undetermined".to_string(),
    };

    let chakra = match context.chakra_profile {
        Verdict::Conclusive { value } => format!(
            "{} (driven by their current {} Dasha)",
            value.chakra_name, value.lord_planet
        ),
        Verdict::Inconclusive { .. } => "Undetermined".to_string(),
    };

    let ascendant = context
        .ascendant
        .map(describe_ascendant)
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "You are JyotishTherapist, an expert Vedic astrologer and a compassionate coach trained in \
Acceptance and Commitment Therapy (ACT) and Relational Frame Theory (RFT).
Your role is to analyze the provided Vedic Astrology data to understand the user's life context \
and then guide them through their presenting problem.

**Framework:**
1. **Astrological Context:** The user's Natal Chart (Kundli) is their life's blueprint. Their current Dasha period indicates the active themes.
2. **Dharma Type:** This is their innate path of purpose (e.g., Educator, Warrior).
3. **Chakra Profile:** This highlights their current core psychological and developmental needs.
4. **Your Method:** Do NOT just give astrological predictions. Use the data as context. Guide the user using evocative, RFT-based questions to build psychological flexibility. Help them clarify their values and identify a small, concrete \"Committed Action\" in line with ACT.

**User's Data:**
- Dharma Type: {}
- Active Chakra Theme: {}
- Ascendant: {}

Now, begin the coaching conversation. The user's presenting problem is: \"{}\"",
        dharma,
        chakra,
        ascendant,
        context.question.trim()
    )
}

fn describe_ascendant(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("rasi")
            .and_then(|rasi| rasi.get("name").or(Some(rasi)))
            .or_else(|| obj.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

/// 取出 candidates[0].content.parts[0].text
pub fn extract_insight_text(body: &Value) -> Option<String> {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl InsightProvider for GeminiInsight {
    async fn generate_insight(&self, context: InsightContext<'_>) -> Result<String> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": build_prompt(&context) }] }]
        });

        tracing::info!("🤖 Requesting insight from model {}", self.model);

        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AstroError::InsightError {
                message: HttpFailure::from_reqwest(&e).to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| e.to_string());
            tracing::warn!("Insight API responded with status {}", status);
            return Err(AstroError::InsightError {
                message: format!("Gemini API responded with status {}: {}", status.as_u16(), body),
            });
        }

        let body: Value = response.json().await.map_err(|e| AstroError::InsightError {
            message: format!("invalid response body: {}", e),
        })?;

        extract_insight_text(&body).ok_or_else(|| AstroError::InsightError {
            message: "response contained no candidate text".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::classifier::chakra_for_planet;
    use crate::domain::model::{DharmaType, Planet};

    #[test]
    fn test_prompt_includes_profile_context() {
        let dharma = Verdict::conclusive(DharmaType::Merchant);
        let chakra = Verdict::conclusive(chakra_for_planet(Planet::Saturn));
        let ascendant = json!({ "rasi": { "name": "Simha" } });

        let prompt = build_prompt(&InsightContext {
            dharma_type: &dharma,
            chakra_profile: &chakra,
            ascendant: Some(&ascendant),
            question: "  Should I change careers?  ",
        });

        assert!(prompt.contains("- Dharma Type: The Merchant"));
        assert!(prompt.contains("- Active Chakra Theme: Root (driven by their current Saturn Dasha)"));
        assert!(prompt.contains("- Ascendant: Simha"));
        assert!(prompt.ends_with("\"Should I change careers?\""));
    }

    #[test]
    fn test_prompt_with_inconclusive_verdicts() {
        let dharma: Verdict<DharmaType> = Verdict::inconclusive("no planets");
        let chakra = Verdict::inconclusive("no dasha");

        let prompt = build_prompt(&InsightContext {
            dharma_type: &dharma,
            chakra_profile: &chakra,
            ascendant: None,
            question: "Why?",
        });

        assert!(prompt.contains("- Dharma Type: Undetermined"));
        assert!(prompt.contains("- Ascendant: unknown"));
    }

    #[tokio::test]
    async fn test_truncated_error_body_is_reported() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            // 宣告的長度比實際送出的內容長，讀取 body 會失敗
            let _ = socket
                .write_all(b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 100\r\n\r\npartial")
                .await;
        });

        let provider = GeminiInsight::new(
            Client::new(),
            format!("http://{}", addr),
            DEFAULT_GEMINI_MODEL.to_string(),
            "key".to_string(),
        )
        .with_timeout(Duration::from_secs(5));

        let dharma = Verdict::conclusive(DharmaType::Warrior);
        let chakra = Verdict::conclusive(chakra_for_planet(Planet::Mars));
        let err = provider
            .generate_insight(InsightContext {
                dharma_type: &dharma,
                chakra_profile: &chakra,
                ascendant: None,
                question: "Why?",
            })
            .await
            .unwrap_err();

        match err {
            AstroError::InsightError { message } => {
                assert!(message.contains("503"));
                assert!(!message.trim_end().ends_with(':'), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_extract_insight_text() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Breathe first." }] } }]
        });
        assert_eq!(extract_insight_text(&body).as_deref(), Some("Breathe first."));
        assert_eq!(extract_insight_text(&json!({ "candidates": [] })), None);
    }
}

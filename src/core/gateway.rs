//! 入站請求的路由與回應封裝。
//!
//! Lambda 的入站事件經過這裡：把 HTTP 形狀的事件轉成 [`ProxyService`] 呼叫，
//! 任何錯誤都收斂成單一 JSON 錯誤信封，不會和成功內容一起回傳。

use crate::core::query::{encode_query, parse_birth_query};
use crate::core::service::ProxyService;
use crate::domain::model::BirthQuery;
use crate::utils::error::{AstroError, Result};
use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

const API_PREFIX: &str = "/api/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Profile,
    Chart,
    Insight,
    /// 透傳到上游的路徑 (以 `/` 開頭)
    Passthrough(String),
    NotFound,
}

/// 由路徑決定路由
pub fn route(path: &str) -> Route {
    let rest = match path.strip_prefix(API_PREFIX) {
        Some(rest) => rest.trim_end_matches('/'),
        None => return Route::NotFound,
    };

    match rest {
        "" => Route::NotFound,
        "profile" => Route::Profile,
        "chart" => Route::Chart,
        "insight" => Route::Insight,
        other => Route::Passthrough(format!("/{}", other)),
    }
}

/// HTTP 形狀的入站事件。
///
/// 同時接受 API Gateway REST (v1) 與 HTTP API / Function URL (v2) 的格式：
/// v2 讀 `rawPath`、`requestContext.http.method`、`rawQueryString`，
/// v1 讀 `path`、`httpMethod`、`queryStringParameters`。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawHttpEvent")]
pub struct HttpEvent {
    pub http_method: String,
    pub path: String,
    /// 未解碼的查詢字串 (不含 `?`)
    pub raw_query_string: Option<String>,
    pub body: Option<String>,
    pub is_base64_encoded: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHttpEvent {
    #[serde(default)]
    http_method: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    raw_path: Option<String>,
    #[serde(default)]
    raw_query_string: Option<String>,
    #[serde(default)]
    query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    request_context: Option<RequestContext>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    is_base64_encoded: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RequestContext {
    #[serde(default)]
    http: Option<HttpContext>,
}

#[derive(Debug, Default, Deserialize)]
struct HttpContext {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

impl From<RawHttpEvent> for HttpEvent {
    fn from(raw: RawHttpEvent) -> Self {
        let http = raw.request_context.and_then(|ctx| ctx.http).unwrap_or_default();

        let http_method = http
            .method
            .or(raw.http_method)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "GET".to_string());

        let path = raw.raw_path.or(http.path).or(raw.path).unwrap_or_default();

        // v1 只給已解碼的參數，重新編碼 (`+` → `%2B`) 後與 v2 一致
        let raw_query_string = raw
            .raw_query_string
            .filter(|q| !q.is_empty())
            .or_else(|| {
                raw.query_string_parameters
                    .filter(|params| !params.is_empty())
                    .map(|params| {
                        let mut pairs: Vec<(String, String)> = params.into_iter().collect();
                        pairs.sort();
                        encode_query(&pairs)
                    })
            });

        Self {
            http_method,
            path,
            raw_query_string,
            body: raw.body,
            is_base64_encoded: raw.is_base64_encoded.unwrap_or(false),
        }
    }
}

impl HttpEvent {
    /// 取得 body 文字；`isBase64Encoded` 時先解碼
    pub fn body_text(&self) -> Result<Option<String>> {
        let body = match self.body.as_deref() {
            Some(body) if !body.trim().is_empty() => body,
            _ => return Ok(None),
        };

        if !self.is_base64_encoded {
            return Ok(Some(body.to_string()));
        }

        let bytes = BASE64_STANDARD
            .decode(body.trim())
            .map_err(|e| AstroError::RequestError {
                message: format!("request body is not valid base64: {}", e),
            })?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| AstroError::RequestError {
                message: "request body is not valid UTF-8".to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    fn with_body(status_code: u16, content_type: &str, body: String) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), content_type.to_string());
        Self {
            status_code,
            headers,
            body,
        }
    }

    pub fn json(status_code: u16, value: &serde_json::Value) -> Self {
        Self::with_body(status_code, "application/json", value.to_string())
    }

    /// `{"errors":[{"title","detail","status"}]}`
    pub fn error(status_code: u16, title: &str, detail: &str) -> Self {
        Self::json(
            status_code,
            &json!({
                "errors": [{
                    "title": title,
                    "detail": detail,
                    "status": status_code,
                }]
            }),
        )
    }

    pub fn from_error(err: &AstroError) -> Self {
        Self::error(err.status_code(), err.title(), &err.user_friendly_message())
    }
}

/// POST body 的內容：BirthQuery 欄位加上選填的問題
#[derive(Debug, Deserialize)]
struct AnalysisPayload {
    #[serde(flatten)]
    query: BirthQuery,
    #[serde(default, alias = "userQuestion")]
    question: Option<String>,
}

fn read_birth_query(event: &HttpEvent) -> Result<(BirthQuery, Option<String>)> {
    if event.http_method.eq_ignore_ascii_case("POST") {
        let body = event.body_text()?.ok_or_else(|| AstroError::RequestError {
            message: "request body is required".to_string(),
        })?;
        let payload: AnalysisPayload =
            serde_json::from_str(&body).map_err(|e| AstroError::RequestError {
                message: format!("invalid request body: {}", e),
            })?;
        Ok((payload.query, payload.question))
    } else {
        parse_birth_query(event.raw_query_string.as_deref().unwrap_or_default())
    }
}

fn method_not_allowed(method: &str) -> HttpResponse {
    HttpResponse::error(
        405,
        "Method Not Allowed",
        &format!("{} is not supported on this route", method),
    )
}

async fn dispatch(service: &ProxyService, event: &HttpEvent) -> Result<HttpResponse> {
    let method = event.http_method.to_ascii_uppercase();

    match route(&event.path) {
        Route::NotFound => Ok(HttpResponse::error(
            404,
            "Not Found",
            &format!("No route for {}", event.path),
        )),
        Route::Passthrough(path) => {
            if method != "GET" {
                return Ok(method_not_allowed(&method));
            }
            let forwarded = service
                .forward(&path, event.raw_query_string.as_deref())
                .await?;
            let content_type = forwarded
                .content_type
                .unwrap_or_else(|| "application/json".to_string());
            Ok(HttpResponse::with_body(
                forwarded.status,
                &content_type,
                forwarded.body,
            ))
        }
        route => {
            if method != "GET" && method != "POST" {
                return Ok(method_not_allowed(&method));
            }
            let (query, question) = read_birth_query(event)?;

            match route {
                Route::Chart => {
                    let svg = service.chart(&query).await?;
                    Ok(HttpResponse::with_body(200, "image/svg+xml", svg))
                }
                Route::Insight if question.is_none() => Err(AstroError::RequestError {
                    message: "question is required".to_string(),
                }),
                _ => {
                    let report = service.analyze(&query, question.as_deref()).await?;
                    Ok(HttpResponse::json(200, &serde_json::to_value(&report)?))
                }
            }
        }
    }
}

/// 處理一個入站事件；永遠回傳回應，錯誤轉成錯誤信封
pub async fn handle(service: &ProxyService, event: &HttpEvent) -> HttpResponse {
    tracing::info!("📥 {} {}", event.http_method, event.path);

    match dispatch(service, event).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!("❌ Request failed: {} (status {})", err, err.status_code());
            HttpResponse::from_error(&err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_resolution() {
        assert_eq!(route("/api/profile"), Route::Profile);
        assert_eq!(route("/api/profile/"), Route::Profile);
        assert_eq!(route("/api/chart"), Route::Chart);
        assert_eq!(route("/api/insight"), Route::Insight);
        assert_eq!(
            route("/api/v2/astrology/kundli"),
            Route::Passthrough("/v2/astrology/kundli".to_string())
        );
        assert_eq!(route("/api/"), Route::NotFound);
        assert_eq!(route("/index.html"), Route::NotFound);
    }

    #[test]
    fn test_error_envelope_shape() {
        let err = AstroError::config("API credentials are not configured.");
        let response = HttpResponse::from_error(&err);

        assert_eq!(response.status_code, 500);
        assert_eq!(
            response.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );

        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["errors"][0]["title"], "Proxy Configuration Error");
        assert_eq!(body["errors"][0]["detail"], "API credentials are not configured.");
        assert_eq!(body["errors"][0]["status"], 500);
        assert!(body.get("data").is_none());
    }

    #[test]
    fn test_read_birth_query_from_post_body() {
        let event = HttpEvent {
            http_method: "POST".to_string(),
            path: "/api/profile".to_string(),
            raw_query_string: None,
            body: Some(
                r#"{"datetime":"2024-01-15T10:30:00+05:30","coordinates":"10.2,78.1","ayanamsa":3,"userQuestion":"Why?"}"#
                    .to_string(),
            ),
            is_base64_encoded: false,
        };

        let (query, question) = read_birth_query(&event).unwrap();
        assert_eq!(query.datetime, "2024-01-15T10:30:00+05:30");
        assert_eq!(query.ayanamsa.code(), 3);
        assert_eq!(question.as_deref(), Some("Why?"));
    }

    #[test]
    fn test_read_birth_query_rejects_empty_body() {
        let event = HttpEvent {
            http_method: "POST".to_string(),
            path: "/api/profile".to_string(),
            ..HttpEvent::default()
        };
        assert!(matches!(
            read_birth_query(&event),
            Err(AstroError::RequestError { .. })
        ));
    }

    #[test]
    fn test_event_deserialization_defaults() {
        let event: HttpEvent = serde_json::from_value(serde_json::json!({
            "path": "/api/chart",
            "rawQueryString": "datetime=2024-01-15T10%3A30%3A00%2B05%3A30&coordinates=1,2"
        }))
        .unwrap();

        assert_eq!(event.http_method, "GET");
        assert!(event.body.is_none());
    }

    #[test]
    fn test_http_api_v2_event() {
        let event: HttpEvent = serde_json::from_value(serde_json::json!({
            "version": "2.0",
            "routeKey": "$default",
            "rawPath": "/api/profile",
            "rawQueryString": "datetime=2024-01-15T10%3A30%3A00%2B05%3A30&coordinates=10.2,78.1",
            "headers": { "accept": "application/json" },
            "queryStringParameters": {
                "datetime": "2024-01-15T10:30:00+05:30",
                "coordinates": "10.2,78.1"
            },
            "requestContext": {
                "http": {
                    "method": "GET",
                    "path": "/api/profile",
                    "protocol": "HTTP/1.1",
                    "sourceIp": "203.0.113.10"
                },
                "stage": "$default"
            },
            "isBase64Encoded": false
        }))
        .unwrap();

        assert_eq!(event.http_method, "GET");
        assert_eq!(route(&event.path), Route::Profile);
        assert_eq!(
            event.raw_query_string.as_deref(),
            Some("datetime=2024-01-15T10%3A30%3A00%2B05%3A30&coordinates=10.2,78.1")
        );

        let (query, _) = read_birth_query(&event).unwrap();
        assert_eq!(query.datetime, "2024-01-15T10:30:00+05:30");
    }

    #[test]
    fn test_rest_api_v1_event() {
        let event: HttpEvent = serde_json::from_value(serde_json::json!({
            "resource": "/api/{proxy+}",
            "path": "/api/chart",
            "httpMethod": "GET",
            "headers": { "Accept": "image/svg+xml" },
            "queryStringParameters": {
                "datetime": "2024-01-15T10:30:00+05:30",
                "coordinates": "10.2,78.1",
                "chart_style": "south-indian"
            },
            "multiValueQueryStringParameters": null,
            "pathParameters": { "proxy": "chart" },
            "requestContext": { "httpMethod": "GET", "stage": "prod" },
            "body": null,
            "isBase64Encoded": false
        }))
        .unwrap();

        assert_eq!(event.http_method, "GET");
        assert_eq!(route(&event.path), Route::Chart);

        let (query, _) = read_birth_query(&event).unwrap();
        assert_eq!(query.datetime, "2024-01-15T10:30:00+05:30");
        assert_eq!(query.coordinates, "10.2,78.1");
        assert_eq!(query.chart_style, "south-indian");
    }

    #[test]
    fn test_v1_event_without_query_parameters() {
        let event: HttpEvent = serde_json::from_value(serde_json::json!({
            "path": "/api/v2/astrology/kundli",
            "httpMethod": "GET",
            "queryStringParameters": null
        }))
        .unwrap();

        assert!(event.raw_query_string.is_none());
    }

    #[test]
    fn test_base64_encoded_post_body() {
        use base64::Engine as _;

        let payload = r#"{"datetime":"2024-01-15T10:30:00+05:30","coordinates":"10.2,78.1","question":"Why?"}"#;
        let event: HttpEvent = serde_json::from_value(serde_json::json!({
            "rawPath": "/api/insight",
            "requestContext": { "http": { "method": "POST" } },
            "body": BASE64_STANDARD.encode(payload),
            "isBase64Encoded": true
        }))
        .unwrap();

        assert_eq!(event.http_method, "POST");
        let (query, question) = read_birth_query(&event).unwrap();
        assert_eq!(query.coordinates, "10.2,78.1");
        assert_eq!(question.as_deref(), Some("Why?"));
    }

    #[test]
    fn test_invalid_base64_body_is_bad_request() {
        let event = HttpEvent {
            http_method: "POST".to_string(),
            path: "/api/profile".to_string(),
            body: Some("%%% not base64 %%%".to_string()),
            is_base64_encoded: true,
            ..HttpEvent::default()
        };

        assert!(matches!(
            read_birth_query(&event),
            Err(AstroError::RequestError { .. })
        ));
    }
}

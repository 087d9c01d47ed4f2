#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::json;
use std::sync::Arc;
use vedic_proxy::adapters::InMemoryTokenStore;
use vedic_proxy::config::{AppConfig, InsightConfig};
use vedic_proxy::domain::ports::Clock;
use vedic_proxy::ProxyService;

pub const BIRTH_DATETIME: &str = "2024-01-15T10:30:00+05:30";
pub const BIRTH_COORDINATES: &str = "10.214747,78.097626";

/// 固定時間的時鐘
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        api_host: server.base_url(),
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        ..AppConfig::default()
    }
}

pub fn config_with_insight(server: &MockServer) -> AppConfig {
    AppConfig {
        insight: Some(InsightConfig {
            api_key: Some("gemini-test-key".to_string()),
            endpoint: server.base_url(),
            model: "gemini-pro".to_string(),
        }),
        ..config_for(server)
    }
}

pub fn service_with(config: &AppConfig) -> ProxyService {
    ProxyService::from_config_with(
        config,
        Arc::new(InMemoryTokenStore::new()),
        Arc::new(FixedClock(fixed_now())),
    )
    .unwrap()
}

pub fn mock_token<'a>(server: &'a MockServer) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/token")
            .x_www_form_urlencoded_tuple("grant_type", "client_credentials")
            .x_www_form_urlencoded_tuple("client_id", "test-client")
            .x_www_form_urlencoded_tuple("client_secret", "test-secret");
        then.status(200).json_body(json!({
            "access_token": "test-token",
            "token_type": "Bearer",
            "expires_in": 3600
        }));
    })
}

pub fn mock_kundli<'a>(server: &'a MockServer) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/v2/astrology/kundli")
            .header("authorization", "Bearer test-token")
            .query_param("datetime", BIRTH_DATETIME)
            .query_param("coordinates", BIRTH_COORDINATES)
            .query_param("ayanamsa", "1");
        then.status(200).json_body(json!({
            "status": "ok",
            "data": {
                "nakshatra_details": { "nakshatra": { "name": "Rohini" } }
            }
        }));
    })
}

pub fn mock_dasha<'a>(server: &'a MockServer) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/v2/astrology/dasha-periods")
            .header("authorization", "Bearer test-token")
            .query_param("datetime", BIRTH_DATETIME)
            .query_param("coordinates", BIRTH_COORDINATES);
        then.status(200).json_body(json!({
            "status": "ok",
            "data": {
                "dasha_periods": [
                    { "name": "Saturn", "start": "2010-01-01T00:00:00+00:00", "end": "2020-01-01T00:00:00+00:00" },
                    { "name": "Jupiter", "start": "2020-01-01T00:00:00+00:00", "end": "2036-01-01T00:00:00+00:00" }
                ]
            }
        }));
    })
}

pub fn mock_planets<'a>(server: &'a MockServer) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/v2/astrology/natal-planet-position")
            .header("authorization", "Bearer test-token")
            .query_param("profile[datetime]", BIRTH_DATETIME)
            .query_param("profile[coordinates]", BIRTH_COORDINATES)
            .query_param("ayanamsa", "1");
        then.status(200).json_body(json!({
            "status": "ok",
            "data": {
                "ascendant": { "rasi": { "name": "Mesha" } },
                "planets": [
                    { "name": "Jupiter", "house": 1 },
                    { "name": "Mercury", "house": 9 },
                    { "name": "Mars", "house": 10 }
                ]
            }
        }));
    })
}

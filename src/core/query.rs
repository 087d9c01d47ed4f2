//! 上游 URL 與查詢字串的組裝。
//!
//! 全部是純函式，不需要網路即可測試。datetime 裡的 `+` 時區符號一律編碼成 `%2B`，
//! 上游解碼一次後得到字面上的 `+`；透傳代理則原封不動轉送呼叫端的查詢字串，
//! 不做任何 decode / re-encode。

use crate::domain::model::{Ayanamsa, BirthQuery, Endpoint};
use crate::utils::error::{AstroError, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::{form_urlencoded, Url};

/// 各端點需要的查詢參數 (依上游規格的順序與名稱)
pub fn endpoint_params(endpoint: Endpoint, query: &BirthQuery) -> Vec<(&'static str, String)> {
    let ayanamsa = query.ayanamsa.code().to_string();

    match endpoint {
        Endpoint::Kundli | Endpoint::DashaPeriods => vec![
            ("datetime", query.datetime.clone()),
            ("coordinates", query.coordinates.clone()),
            ("ayanamsa", ayanamsa),
        ],
        // natal-planet-position 的出生資料必須放在 profile[...] 底下
        Endpoint::NatalPlanetPosition => vec![
            ("profile[datetime]", query.datetime.clone()),
            ("profile[coordinates]", query.coordinates.clone()),
            ("ayanamsa", ayanamsa),
        ],
        Endpoint::Chart => vec![
            ("datetime", query.datetime.clone()),
            ("coordinates", query.coordinates.clone()),
            ("ayanamsa", ayanamsa),
            ("chart_type", query.chart_type.clone()),
            ("chart_style", query.chart_style.clone()),
        ],
    }
}

/// 以 application/x-www-form-urlencoded 規則編碼；`+` → `%2B`，空白 → `+`
pub fn encode_query<K: AsRef<str>, V: AsRef<str>>(params: &[(K, V)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key.as_ref(), value.as_ref());
    }
    serializer.finish()
}

fn parse_host(api_host: &str) -> Result<Url> {
    Url::parse(api_host).map_err(|e| AstroError::InvalidConfigValueError {
        field: "api_host".to_string(),
        value: api_host.to_string(),
        reason: format!("Invalid URL format: {}", e),
    })
}

/// 組出某個 astrology 端點的完整 URL
pub fn endpoint_url(api_host: &str, endpoint: Endpoint, query: &BirthQuery) -> Result<Url> {
    let mut url = parse_host(api_host)?;
    url.set_path(&endpoint.path());
    // 已編碼的字串直接設定；url 不會再次編碼 '%'
    url.set_query(Some(&encode_query(&endpoint_params(endpoint, query))));
    Ok(url)
}

pub fn token_url(api_host: &str) -> Result<Url> {
    let mut url = parse_host(api_host)?;
    url.set_path("/token");
    Ok(url)
}

/// 透傳代理的目標 URL；`raw_query` 不含開頭的 `?`，逐字轉送
pub fn passthrough_url(api_host: &str, path: &str, raw_query: Option<&str>) -> Result<Url> {
    let mut url = parse_host(api_host)?;
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    url.set_path(&path);

    match raw_query.map(|q| q.trim_start_matches('?')) {
        Some(q) if !q.is_empty() => url.set_query(Some(q)),
        _ => url.set_query(None),
    }
    Ok(url)
}

fn mangled_offset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?) (\d{2}:?\d{2})$")
            .expect("offset pattern is valid")
    })
}

/// 還原被 form 解碼成空白的 `+` 時區符號，例如
/// `2024-01-15T10:30:00 05:30` → `2024-01-15T10:30:00+05:30`
pub fn restore_offset_sign(datetime: &str) -> String {
    let trimmed = datetime.trim_start();
    match mangled_offset_pattern().captures(trimmed) {
        Some(caps) => format!("{}+{}", &caps[1], &caps[2]),
        None => trimmed.trim_end().to_string(),
    }
}

/// 從呼叫端的查詢字串解析出 BirthQuery 與選填的問題
pub fn parse_birth_query(raw_query: &str) -> Result<(BirthQuery, Option<String>)> {
    let mut datetime = None;
    let mut coordinates = None;
    let mut ayanamsa = Ayanamsa::default();
    let mut chart_type = None;
    let mut chart_style = None;
    let mut question = None;

    for (key, value) in form_urlencoded::parse(raw_query.trim_start_matches('?').as_bytes()) {
        match key.as_ref() {
            "datetime" => datetime = Some(restore_offset_sign(&value)),
            "coordinates" => coordinates = Some(value.trim().to_string()),
            "ayanamsa" => {
                ayanamsa = value
                    .parse()
                    .map_err(|message| AstroError::RequestError { message })?
            }
            "chart_type" => chart_type = Some(value.into_owned()),
            "chart_style" => chart_style = Some(value.into_owned()),
            "question" => question = Some(value.into_owned()).filter(|q| !q.trim().is_empty()),
            _ => {}
        }
    }

    let datetime = datetime.ok_or_else(|| AstroError::RequestError {
        message: "datetime is required".to_string(),
    })?;
    let coordinates = coordinates.ok_or_else(|| AstroError::RequestError {
        message: "coordinates is required".to_string(),
    })?;

    let mut query = BirthQuery::new(datetime, coordinates).with_ayanamsa(ayanamsa);
    if let Some(chart_type) = chart_type {
        query = query.with_chart_type(chart_type);
    }
    if let Some(chart_style) = chart_style {
        query = query.with_chart_style(chart_style);
    }
    Ok((query, question))
}

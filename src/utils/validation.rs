use crate::utils::error::{AstroError, Result};
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(AstroError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(AstroError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(AstroError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AstroError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(AstroError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

fn coordinates_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(-?\d{1,3}(?:\.\d+)?)\s*,\s*(-?\d{1,3}(?:\.\d+)?)\s*$")
            .expect("coordinates pattern is valid")
    })
}

/// 驗證 "lat,lon" 格式並回傳解析後的經緯度
pub fn validate_coordinates(field_name: &str, value: &str) -> Result<(f64, f64)> {
    let invalid = |reason: &str| AstroError::RequestError {
        message: format!("{} '{}': {}", field_name, value, reason),
    };

    let caps = coordinates_pattern()
        .captures(value)
        .ok_or_else(|| invalid("expected \"latitude,longitude\""))?;

    let lat: f64 = caps[1].parse().map_err(|_| invalid("latitude is not a number"))?;
    let lon: f64 = caps[2].parse().map_err(|_| invalid("longitude is not a number"))?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(invalid("latitude must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(invalid("longitude must be between -180 and 180"));
    }

    Ok((lat, lon))
}

/// 驗證 ISO-8601 日期時間，且必須帶有明確的 UTC 偏移
pub fn validate_offset_datetime(field_name: &str, value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value.trim()).map_err(|e| AstroError::RequestError {
        message: format!(
            "{} '{}' must be an ISO-8601 datetime with an explicit UTC offset: {}",
            field_name, value, e
        ),
    })
}

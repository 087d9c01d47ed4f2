use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OAuth2 client-credentials 取得的存取權杖
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    /// 已扣除安全邊際的到期時間
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

// secret 不得出現在日誌中
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// 上游 API 支援的 ayanamsa
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Ayanamsa {
    #[default]
    Lahiri,
    Raman,
    Krishnamurti,
}

impl Ayanamsa {
    pub fn code(self) -> u8 {
        match self {
            Ayanamsa::Lahiri => 1,
            Ayanamsa::Raman => 3,
            Ayanamsa::Krishnamurti => 5,
        }
    }
}

impl TryFrom<u8> for Ayanamsa {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Ayanamsa::Lahiri),
            3 => Ok(Ayanamsa::Raman),
            5 => Ok(Ayanamsa::Krishnamurti),
            other => Err(format!(
                "unsupported ayanamsa {} (expected 1 = Lahiri, 3 = Raman, 5 = KP)",
                other
            )),
        }
    }
}

impl From<Ayanamsa> for u8 {
    fn from(value: Ayanamsa) -> Self {
        value.code()
    }
}

impl std::str::FromStr for Ayanamsa {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lahiri" => Ok(Ayanamsa::Lahiri),
            "raman" => Ok(Ayanamsa::Raman),
            "kp" | "krishnamurti" => Ok(Ayanamsa::Krishnamurti),
            other => other
                .parse::<u8>()
                .map_err(|_| format!("unsupported ayanamsa '{}'", s))
                .and_then(Ayanamsa::try_from),
        }
    }
}

/// 每個請求建立一次的出生資料查詢，建立後唯讀
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthQuery {
    pub datetime: String,
    pub coordinates: String,
    #[serde(default)]
    pub ayanamsa: Ayanamsa,
    #[serde(default = "default_chart_type")]
    pub chart_type: String,
    #[serde(default = "default_chart_style")]
    pub chart_style: String,
}

pub const DEFAULT_CHART_TYPE: &str = "rasi";
pub const DEFAULT_CHART_STYLE: &str = "north-indian";

fn default_chart_type() -> String {
    DEFAULT_CHART_TYPE.to_string()
}

fn default_chart_style() -> String {
    DEFAULT_CHART_STYLE.to_string()
}

impl BirthQuery {
    pub fn new(datetime: impl Into<String>, coordinates: impl Into<String>) -> Self {
        Self {
            datetime: datetime.into(),
            coordinates: coordinates.into(),
            ayanamsa: Ayanamsa::default(),
            chart_type: default_chart_type(),
            chart_style: default_chart_style(),
        }
    }

    pub fn with_ayanamsa(mut self, ayanamsa: Ayanamsa) -> Self {
        self.ayanamsa = ayanamsa;
        self
    }

    pub fn with_chart_style(mut self, chart_style: impl Into<String>) -> Self {
        self.chart_style = chart_style.into();
        self
    }

    pub fn with_chart_type(mut self, chart_type: impl Into<String>) -> Self {
        self.chart_type = chart_type.into();
        self
    }
}

impl crate::utils::validation::Validate for BirthQuery {
    fn validate(&self) -> crate::utils::error::Result<()> {
        use crate::utils::error::AstroError;
        use crate::utils::validation::*;

        if self.datetime.trim().is_empty() {
            return Err(AstroError::RequestError {
                message: "datetime is required".to_string(),
            });
        }
        if self.coordinates.trim().is_empty() {
            return Err(AstroError::RequestError {
                message: "coordinates is required".to_string(),
            });
        }

        validate_offset_datetime("datetime", &self.datetime)?;
        validate_coordinates("coordinates", &self.coordinates)?;
        validate_non_empty_string("chart_type", &self.chart_type)?;
        validate_non_empty_string("chart_style", &self.chart_style)?;
        Ok(())
    }
}

/// 上游 astrology 端點
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Kundli,
    DashaPeriods,
    NatalPlanetPosition,
    Chart,
}

impl Endpoint {
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::Kundli => "kundli",
            Endpoint::DashaPeriods => "dasha-periods",
            Endpoint::NatalPlanetPosition => "natal-planet-position",
            Endpoint::Chart => "chart",
        }
    }

    pub fn path(self) -> String {
        format!("/v2/astrology/{}", self.name())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 多個上游回應合併後的命盤資料；只有在所有呼叫都成功時才會建立
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedProfile {
    pub kundli: serde_json::Value,
    pub dasha: serde_json::Value,
    pub planet_positions: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_svg: Option<String>,
}

impl MergedProfile {
    /// 分類器使用的行星列表 (由 natal-planet-position 投影到 kundli 上)
    pub fn planets(&self) -> Option<&serde_json::Value> {
        self.kundli.get("planet_positions")
    }

    pub fn dasha_periods(&self) -> Option<&serde_json::Value> {
        self.dasha.get("dasha_periods")
    }

    pub fn ascendant(&self) -> Option<&serde_json::Value> {
        self.kundli.get("ascendant")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DharmaType {
    Educator,
    Warrior,
    Merchant,
    Laborer,
    Outsider,
}

impl DharmaType {
    /// 宣告順序，同分時以此順序決定
    pub const ALL: [DharmaType; 5] = [
        DharmaType::Educator,
        DharmaType::Warrior,
        DharmaType::Merchant,
        DharmaType::Laborer,
        DharmaType::Outsider,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DharmaType::Educator => "The Educator",
            DharmaType::Warrior => "The Warrior",
            DharmaType::Merchant => "The Merchant",
            DharmaType::Laborer => "The Laborer",
            DharmaType::Outsider => "The Outsider",
        }
    }
}

impl fmt::Display for DharmaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Planet {
    Sun,
    Moon,
    Mars,
    Mercury,
    Jupiter,
    Venus,
    Saturn,
    Rahu,
    Ketu,
}

impl Planet {
    pub const ALL: [Planet; 9] = [
        Planet::Sun,
        Planet::Moon,
        Planet::Mars,
        Planet::Mercury,
        Planet::Jupiter,
        Planet::Venus,
        Planet::Saturn,
        Planet::Rahu,
        Planet::Ketu,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Planet::Sun => "Sun",
            Planet::Moon => "Moon",
            Planet::Mars => "Mars",
            Planet::Mercury => "Mercury",
            Planet::Jupiter => "Jupiter",
            Planet::Venus => "Venus",
            Planet::Saturn => "Saturn",
            Planet::Rahu => "Rahu",
            Planet::Ketu => "Ketu",
        }
    }

    /// 不分大小寫比對上游的行星名稱
    pub fn from_name(name: &str) -> Option<Planet> {
        let name = name.trim();
        Planet::ALL
            .into_iter()
            .find(|planet| planet.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Planet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chakra {
    Root,
    Sacral,
    #[serde(rename = "Solar Plexus")]
    SolarPlexus,
    Heart,
    Throat,
    #[serde(rename = "Third Eye")]
    ThirdEye,
    Crown,
}

impl Chakra {
    pub fn name(self) -> &'static str {
        match self {
            Chakra::Root => "Root",
            Chakra::Sacral => "Sacral",
            Chakra::SolarPlexus => "Solar Plexus",
            Chakra::Heart => "Heart",
            Chakra::Throat => "Throat",
            Chakra::ThirdEye => "Third Eye",
            Chakra::Crown => "Crown",
        }
    }
}

impl fmt::Display for Chakra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChakraProfile {
    pub lord_planet: Planet,
    pub chakra_name: Chakra,
    pub description: String,
}

/// 分類結果；資料不足時回傳 Inconclusive 而不是錯誤
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict<T> {
    Conclusive { value: T },
    Inconclusive { reason: String },
}

impl<T> Verdict<T> {
    pub fn conclusive(value: T) -> Self {
        Verdict::Conclusive { value }
    }

    pub fn inconclusive(reason: impl Into<String>) -> Self {
        Verdict::Inconclusive {
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Verdict::Conclusive { value } => Some(value),
            Verdict::Inconclusive { .. } => None,
        }
    }

    pub fn is_inconclusive(&self) -> bool {
        matches!(self, Verdict::Inconclusive { .. })
    }
}

/// 一次完整分析的結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub profile: MergedProfile,
    pub dharma_type: Verdict<DharmaType>,
    pub chakra_profile: Verdict<ChakraProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<String>,
}

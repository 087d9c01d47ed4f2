//! Dharma Type 與 Chakra 分類器。
//!
//! 純函式：不做 I/O，沒有共享狀態。輸入是上游回傳的原始 JSON，資料缺漏或格式錯誤時
//! 回傳 [`Verdict::Inconclusive`]，永遠不會失敗。

use crate::domain::model::{Chakra, ChakraProfile, DharmaType, Planet, Verdict};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// 行星 → Dharma Type 的代表星表
const SIGNIFICATORS: [(Planet, &[DharmaType]); 9] = [
    (Planet::Jupiter, &[DharmaType::Educator]),
    (Planet::Mercury, &[DharmaType::Educator, DharmaType::Merchant]),
    (Planet::Mars, &[DharmaType::Warrior]),
    (Planet::Sun, &[DharmaType::Warrior]),
    (Planet::Venus, &[DharmaType::Merchant]),
    (Planet::Moon, &[DharmaType::Laborer]),
    (Planet::Saturn, &[DharmaType::Laborer]),
    (Planet::Rahu, &[DharmaType::Outsider]),
    (Planet::Ketu, &[DharmaType::Outsider]),
];

/// 行星 → (脈輪, 主題)。以行星為鍵，同一脈輪可對應多顆行星
fn chakra_entry(planet: Planet) -> (Chakra, &'static str) {
    match planet {
        Planet::Sun => (
            Chakra::SolarPlexus,
            "identity, confidence and the courage to lead",
        ),
        Planet::Moon => (
            Chakra::Sacral,
            "emotional security, nurturing and the need to belong",
        ),
        Planet::Mars => (
            Chakra::SolarPlexus,
            "willpower, drive and the energy to act on your goals",
        ),
        Planet::Mercury => (
            Chakra::Throat,
            "communication, learning and finding your own voice",
        ),
        Planet::Jupiter => (
            Chakra::Heart,
            "wisdom, generosity and opening to meaning and purpose",
        ),
        Planet::Venus => (
            Chakra::Sacral,
            "pleasure, creativity and harmony in relationships",
        ),
        Planet::Saturn => (
            Chakra::Root,
            "discipline, stability and building lasting foundations",
        ),
        Planet::Rahu => (
            Chakra::ThirdEye,
            "ambition, unconventional insight and questioning illusions",
        ),
        Planet::Ketu => (
            Chakra::Crown,
            "detachment, spirituality and letting go of what no longer serves",
        ),
    }
}

fn significators(planet: Planet) -> &'static [DharmaType] {
    SIGNIFICATORS
        .iter()
        .find(|(p, _)| *p == planet)
        .map(|(_, types)| *types)
        .unwrap_or(&[])
}

/// 依行星列表計分，回傳分數最高的 Dharma Type。
///
/// 同分時依 [`DharmaType::ALL`] 的宣告順序取第一個，所以空列表會得到 `Educator`。
/// 無法辨識的行星名稱 (例如 Ascendant) 不計分。
pub fn classify_dharma_type(planets: Option<&Value>) -> Verdict<DharmaType> {
    let items = match planets {
        Some(Value::Array(items)) => items,
        Some(_) => return Verdict::inconclusive("planet positions are not a list"),
        None => return Verdict::inconclusive("planet positions are missing"),
    };

    let mut scores = [0u32; DharmaType::ALL.len()];

    for planet in items
        .iter()
        .filter_map(|item| item.get("name").and_then(Value::as_str))
        .filter_map(Planet::from_name)
    {
        for dharma in significators(planet) {
            if let Some(index) = DharmaType::ALL.iter().position(|d| d == dharma) {
                scores[index] += 1;
            }
        }
    }

    let mut best = 0;
    for index in 1..scores.len() {
        if scores[index] > scores[best] {
            best = index;
        }
    }

    tracing::debug!("Dharma scores: {:?}", scores);
    Verdict::conclusive(DharmaType::ALL[best])
}

/// 查表取得行星對應的脈輪資料
pub fn chakra_for_planet(planet: Planet) -> ChakraProfile {
    let (chakra, theme) = chakra_entry(planet);

    ChakraProfile {
        lord_planet: planet,
        chakra_name: chakra,
        description: format!(
            "Your current life chapter (Dasha) is ruled by {}, highlighting themes related to the {} Chakra: {}.",
            planet, chakra, theme
        ),
    }
}

fn period_bound(period: &Value, keys: [&str; 2]) -> Option<DateTime<Utc>> {
    keys.iter()
        .find_map(|key| period.get(*key).and_then(Value::as_str))
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn contains_instant(period: &Value, now: DateTime<Utc>) -> bool {
    match (
        period_bound(period, ["start", "startDate"]),
        period_bound(period, ["end", "endDate"]),
    ) {
        (Some(start), Some(end)) => start <= now && now <= end,
        _ => false,
    }
}

/// 以目前所在的 Dasha 週期決定主導脈輪。
///
/// 找不到包含 `now` 的週期時退回第一個週期；只有空列表 (或缺漏) 才是 inconclusive。
pub fn classify_chakra(dasha_periods: Option<&Value>, now: DateTime<Utc>) -> Verdict<ChakraProfile> {
    let periods = match dasha_periods {
        Some(Value::Array(periods)) if !periods.is_empty() => periods,
        Some(Value::Array(_)) => return Verdict::inconclusive("dasha period list is empty"),
        Some(_) => return Verdict::inconclusive("dasha periods are not a list"),
        None => return Verdict::inconclusive("dasha periods are missing"),
    };

    let selected = match periods.iter().find(|p| contains_instant(p, now)) {
        Some(period) => period,
        None => {
            tracing::debug!("No dasha period contains {}, falling back to the first", now);
            &periods[0]
        }
    };

    let name = match selected.get("name").and_then(Value::as_str) {
        Some(name) => name,
        None => return Verdict::inconclusive("selected dasha period has no ruling planet"),
    };

    match Planet::from_name(name) {
        Some(planet) => Verdict::conclusive(chakra_for_planet(planet)),
        None => Verdict::inconclusive(format!("unknown dasha lord '{}'", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_jupiter_and_mercury_is_educator() {
        let planets = json!([{ "name": "Jupiter" }, { "name": "Mercury" }]);
        for _ in 0..10 {
            assert_eq!(
                classify_dharma_type(Some(&planets)),
                Verdict::conclusive(DharmaType::Educator)
            );
        }
    }

    #[test]
    fn test_mars_and_sun_is_warrior() {
        let planets = json!([{ "name": "Mars", "house": 10 }, { "name": "Sun", "house": 1 }]);
        assert_eq!(
            classify_dharma_type(Some(&planets)),
            Verdict::conclusive(DharmaType::Warrior)
        );
    }

    #[test]
    fn test_ties_resolve_to_declaration_order() {
        assert_eq!(
            classify_dharma_type(Some(&json!([]))),
            Verdict::conclusive(DharmaType::Educator)
        );

        // Warrior 1 vs Merchant 1
        let planets = json!([{ "name": "Venus" }, { "name": "Sun" }]);
        assert_eq!(
            classify_dharma_type(Some(&planets)),
            Verdict::conclusive(DharmaType::Warrior)
        );

        // Laborer 2 vs Outsider 2
        let planets = json!([
            { "name": "Rahu" }, { "name": "Ketu" }, { "name": "Moon" }, { "name": "Saturn" }
        ]);
        assert_eq!(
            classify_dharma_type(Some(&planets)),
            Verdict::conclusive(DharmaType::Laborer)
        );
    }

    #[test]
    fn test_full_chart_scores() {
        // Educator 2, Warrior 2, Merchant 2, Laborer 2, Outsider 2
        let planets = json!([
            { "name": "Sun" }, { "name": "Moon" }, { "name": "Mars" }, { "name": "Mercury" },
            { "name": "Jupiter" }, { "name": "Venus" }, { "name": "Saturn" }, { "name": "Rahu" },
            { "name": "Ketu" }, { "name": "Ascendant" }
        ]);
        assert_eq!(
            classify_dharma_type(Some(&planets)),
            Verdict::conclusive(DharmaType::Educator)
        );

        let planets = json!([{ "name": "rahu" }, { "name": "KETU" }, { "name": "Jupiter" }]);
        assert_eq!(
            classify_dharma_type(Some(&planets)),
            Verdict::conclusive(DharmaType::Outsider)
        );
    }

    #[test]
    fn test_malformed_planets_are_inconclusive() {
        assert!(classify_dharma_type(None).is_inconclusive());
        assert!(classify_dharma_type(Some(&json!({ "name": "Sun" }))).is_inconclusive());
        assert!(classify_dharma_type(Some(&json!("Sun"))).is_inconclusive());
    }

    #[test]
    fn test_chakra_selects_current_period() {
        let periods = json!([
            { "name": "Saturn", "start": "2001-01-01T00:00:00+00:00", "end": "2020-01-01T00:00:00+00:00" },
            { "name": "Mercury", "start": "2020-01-01T00:00:00+00:00", "end": "2037-01-01T00:00:00+00:00" }
        ]);

        let profile = classify_chakra(Some(&periods), now());
        let profile = profile.value().unwrap();
        assert_eq!(profile.lord_planet, Planet::Mercury);
        assert_eq!(profile.chakra_name, Chakra::Throat);
    }

    #[test]
    fn test_chakra_interval_is_inclusive() {
        let periods = json!([
            { "name": "Ketu", "start": "1990-01-01T00:00:00Z", "end": "1997-01-01T00:00:00Z" },
            { "name": "Venus", "startDate": "2024-06-01T12:00:00Z", "endDate": "2044-06-01T12:00:00Z" }
        ]);

        let profile = classify_chakra(Some(&periods), now());
        assert_eq!(profile.value().unwrap().lord_planet, Planet::Venus);
    }

    #[test]
    fn test_chakra_falls_back_to_first_period() {
        let periods = json!([
            { "name": "Jupiter", "start": "1980-01-01T00:00:00+05:30", "end": "1996-01-01T00:00:00+05:30" },
            { "name": "Saturn", "start": "1996-01-01T00:00:00+05:30", "end": "2015-01-01T00:00:00+05:30" }
        ]);

        let profile = classify_chakra(Some(&periods), now());
        let profile = profile.value().unwrap();
        assert_eq!(profile.lord_planet, Planet::Jupiter);
        assert_eq!(profile.chakra_name, Chakra::Heart);

        let undated = json!([{ "name": "Rahu" }]);
        let profile = classify_chakra(Some(&undated), now());
        assert_eq!(profile.value().unwrap().chakra_name, Chakra::ThirdEye);
    }

    #[test]
    fn test_chakra_inconclusive_only_for_missing_periods() {
        assert!(classify_chakra(Some(&json!([])), now()).is_inconclusive());
        assert!(classify_chakra(None, now()).is_inconclusive());
        assert!(classify_chakra(Some(&json!({})), now()).is_inconclusive());
    }

    #[test]
    fn test_sun_and_mars_share_chakra_not_description() {
        let sun = chakra_for_planet(Planet::Sun);
        let mars = chakra_for_planet(Planet::Mars);

        assert_eq!(sun.chakra_name, Chakra::SolarPlexus);
        assert_eq!(mars.chakra_name, Chakra::SolarPlexus);
        assert_ne!(sun.description, mars.description);
        assert!(sun.description.contains("ruled by Sun"));
    }

    #[test]
    fn test_every_planet_has_a_chakra() {
        for planet in Planet::ALL {
            let profile = chakra_for_planet(planet);
            assert_eq!(profile.lord_planet, planet);
            assert!(profile
                .description
                .contains(&format!("the {} Chakra", profile.chakra_name)));
        }
    }
}

//! Records of the Sportradar tennis v3 feeds consumed by the pipeline.
//!
//! Every field is optional: the feeds omit keys freely and the pipeline decides
//! per record what is required. Nested sequences are kept as raw JSON values so
//! each element can be decoded (and skipped) on its own.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `competitions.json` element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitionRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default, rename = "type")]
    pub competition_type: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub category: Option<CategoryRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

/// `complexes.json` element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Anything other than an array is treated as "no venues".
    #[serde(default, deserialize_with = "lenient_items")]
    pub venues: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VenueRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default)]
    pub country_name: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub map_coordinates: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// `double_competitors_rankings.json` element: one group per tour (ATP, WTA).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingGroupRecord {
    #[serde(default)]
    pub type_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub week: Option<i32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub competitor_rankings: Vec<Value>,
}

/// Ranking values that are not integers in `i32` range read as absent, so a
/// bad value skips the ranking without losing the competitor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingEntryRecord {
    #[serde(default, deserialize_with = "lenient_int")]
    pub rank: Option<i32>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub movement: Option<i32>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub points: Option<i32>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub competitions_played: Option<i32>,
    #[serde(default)]
    pub competitor: Option<CompetitorRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitorRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

/// Decode one element of a listing, reporting the JSON path of the first
/// mismatch (e.g. `competitor.id: invalid type: integer`).
pub fn decode_record<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_path_to_error::deserialize(value).map_err(|e| {
        let path = e.path().to_string();
        if path == "." {
            e.into_inner().to_string()
        } else {
            format!("{}: {}", path, e.into_inner())
        }
    })
}

fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        _ => None,
    })
}

//! Star system records as returned by EDSM.
//!
//! Records keep every provider field: the ones we use are typed, the rest are
//! carried in `extra` so cache and export files round-trip without loss.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Galactic coordinates in light-years
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinates {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={}, y={}, z={}", self.x, self.y, self.z)
    }
}

/// Primary star block of a sphere-systems record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryStar {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub star_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "isScoopable", default, skip_serializing_if = "Option::is_none")]
    pub is_scoopable: Option<bool>,
}

/// One nearby system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarSystem {
    #[serde(default = "unknown_name", deserialize_with = "lenient_name")]
    pub name: String,

    /// Distance from the query origin in ly; unparseable values read as 0
    #[serde(default, deserialize_with = "lenient_distance")]
    pub distance: f64,

    #[serde(
        default,
        deserialize_with = "lenient_coords",
        skip_serializing_if = "Option::is_none"
    )]
    pub coords: Option<Coordinates>,

    #[serde(
        rename = "primaryStar",
        default,
        deserialize_with = "lenient_primary_star",
        skip_serializing_if = "Option::is_none"
    )]
    pub primary_star: Option<PrimaryStar>,

    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<u64>,

    /// Provider fields we do not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unknown_name() -> String {
    "Unknown".to_string()
}

impl StarSystem {
    pub fn new(name: impl Into<String>, distance: f64) -> Self {
        Self {
            name: name.into(),
            distance,
            coords: None,
            primary_star: None,
            id: None,
            extra: Map::new(),
        }
    }

    pub fn with_coords(mut self, coords: Coordinates) -> Self {
        self.coords = Some(coords);
        self
    }

    pub fn with_primary_star_type(mut self, star_type: impl Into<String>) -> Self {
        self.primary_star = Some(PrimaryStar {
            star_type: Some(star_type.into()),
            name: None,
            is_scoopable: None,
        });
        self
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Type of the primary star, falling back to a flat `starType` field
    pub fn primary_star_type(&self) -> Option<&str> {
        self.primary_star
            .as_ref()
            .and_then(|p| p.star_type.as_deref())
            .or_else(|| self.extra.get("starType").and_then(Value::as_str))
            .filter(|t| !t.trim().is_empty())
    }

    /// Spectral class letter (O, B, A, F, G, K, M, ...) or "Unknown"
    pub fn spectral_class(&self) -> String {
        self.primary_star_type()
            .and_then(|t| t.trim().chars().next())
            .map(|c| c.to_ascii_uppercase().to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// All non-empty fields in provider form, for the detailed view
    pub fn detail_fields(&self) -> Vec<(String, String)> {
        let value = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => return Vec::new(),
        };
        value
            .into_iter()
            .filter(|(_, v)| is_truthy(v))
            .map(|(k, v)| {
                let rendered = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, rendered)
            })
            .collect()
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Parse a distance that may be a number, a numeric string, null or garbage
pub fn parse_distance(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn lenient_distance<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let distance = parse_distance(&value);
    Ok(if distance.is_finite() { distance } else { 0.0 })
}

fn lenient_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => s,
        Value::Number(n) => n.to_string(),
        _ => unknown_name(),
    })
}

fn lenient_coords<'de, D>(deserializer: D) -> Result<Option<Coordinates>, D::Error>
where
    D: Deserializer<'de>,
{
    // partial coordinates (`{"y": null}`) are as good as none
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_primary_star<'de, D>(deserializer: D) -> Result<Option<PrimaryStar>, D::Error>
where
    D: Deserializer<'de>,
{
    // EDSM sends `[]` instead of an object when the primary star is unknown
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Object(_) => Ok(serde_json::from_value(value).ok()),
        _ => Ok(None),
    }
}

use std::{collections::HashMap, fmt};

use serde::Deserialize;

use crate::crs::crs_utils::{EpsgCode, WGS84_EPSG_CODE};

/// Scalar attribute value of a feature.
///
/// Datasets disagree on how they encode category codes (`1` vs `"1"`), so
/// comparisons between a number and numeric text are done on the numeric value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttributeValue {
    /// Numeric view of the value, parsing numeric text.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(number) => Some(*number),
            AttributeValue::Text(text) => text.trim().parse().ok(),
            AttributeValue::Bool(_) => None,
        }
    }

    pub fn matches(&self, other: &AttributeValue) -> bool {
        match (self, other) {
            (AttributeValue::Text(a), AttributeValue::Text(b)) => a == b,
            (AttributeValue::Bool(a), AttributeValue::Bool(b)) => a == b,
            (AttributeValue::Number(_), _) | (_, AttributeValue::Number(_)) => {
                match (self.as_number(), other.as_number()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// Converts a GeoJSON property value. `null` has no attribute value.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(flag) => Some(AttributeValue::Bool(*flag)),
            serde_json::Value::Number(number) => number.as_f64().map(AttributeValue::Number),
            serde_json::Value::String(text) => Some(AttributeValue::Text(text.clone())),
            other => Some(AttributeValue::Text(other.to_string())),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeValue::Bool(flag) => serde_json::Value::Bool(*flag),
            AttributeValue::Number(number) => serde_json::Number::from_f64(*number)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttributeValue::Text(text) => serde_json::Value::String(text.clone()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(flag) => write!(f, "{}", flag),
            // Whole numbers are category codes far more often than measurements.
            AttributeValue::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
                write!(f, "{}", *number as i64)
            }
            AttributeValue::Number(number) => write!(f, "{}", number),
            AttributeValue::Text(text) => write!(f, "{}", text),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: geo::Geometry,
    pub attributes: HashMap<String, AttributeValue>,
}

impl Feature {
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

impl From<geo::Geometry> for Feature {
    fn from(value: geo::Geometry) -> Self {
        Self {
            geometry: value,
            attributes: HashMap::new(),
        }
    }
}

/// Ordered features sharing one coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub crs: EpsgCode,
}

impl FeatureCollection {
    /// A geographic (EPSG:4326) collection.
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            features,
            crs: WGS84_EPSG_CODE,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Attribute names over all features, sorted.
    pub fn attribute_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .features
            .iter()
            .flat_map(|feature| feature.attributes.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

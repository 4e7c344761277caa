use serde::Deserialize;

use crate::geofile::feature::{AttributeValue, Feature, FeatureCollection};

/// Accepted attribute values, as resolved from a dashboard widget.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub enum Predicate {
    /// A single category, e.g. from a dropdown.
    Equals(AttributeValue),
    /// Any of several categories, e.g. from a multi-select.
    OneOf(Vec<AttributeValue>),
    /// Inclusive numeric range, e.g. from a slider. A missing bound is open.
    Range {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
}

impl Predicate {
    pub fn accepts(&self, value: &AttributeValue) -> bool {
        match self {
            Predicate::Equals(accepted) => accepted.matches(value),
            Predicate::OneOf(accepted) => accepted.iter().any(|accepted| accepted.matches(value)),
            Predicate::Range { min, max } => match value.as_number() {
                Some(number) if !number.is_nan() => {
                    min.map_or(true, |min| min <= number) && max.map_or(true, |max| number <= max)
                }
                _ => false,
            },
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AttributeFilter {
    pub attribute: String,
    pub predicate: Predicate,
}

impl AttributeFilter {
    pub fn new(attribute: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            attribute: attribute.into(),
            predicate,
        }
    }

    /// Features lacking the attribute never match.
    pub fn matches(&self, feature: &Feature) -> bool {
        feature
            .attribute(&self.attribute)
            .map_or(false, |value| self.predicate.accepts(value))
    }
}

/// Subset of `collection` whose features satisfy `filter`, in input order.
///
/// An empty result is a valid outcome, callers decide how to report it.
pub fn filter_features(collection: &FeatureCollection, filter: &AttributeFilter) -> FeatureCollection {
    let features: Vec<Feature> = collection
        .features
        .iter()
        .filter(|feature| filter.matches(feature))
        .cloned()
        .collect();
    log::debug!(
        "Filter on '{}' kept {} of {} features",
        filter.attribute,
        features.len(),
        collection.len()
    );
    FeatureCollection {
        features,
        crs: collection.crs,
    }
}

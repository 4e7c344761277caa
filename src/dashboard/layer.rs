use serde::Deserialize;

use crate::geofile::feature::{Feature, FeatureCollection};

use super::style::StyleRuleTable;

/// Attribute shown on hover, under a human readable label.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TooltipField {
    pub attribute: String,
    pub label: String,
}

impl TooltipField {
    pub fn new(attribute: &str, label: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            label: label.to_string(),
        }
    }
}

/// A styled, named and toggleable group of features.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub collection: FeatureCollection,
    pub style: StyleRuleTable,
    pub tooltip: Vec<TooltipField>,
    /// Whether the overlay is switched on when the page opens.
    pub show: bool,
}

impl Layer {
    pub fn new(name: &str, collection: FeatureCollection, style: StyleRuleTable) -> Self {
        Self {
            name: name.to_string(),
            collection,
            style,
            tooltip: Vec::new(),
            show: true,
        }
    }

    pub fn with_tooltip(mut self, tooltip: Vec<TooltipField>) -> Self {
        self.tooltip = tooltip;
        self
    }
}

/// Label and displayed value per tooltip field. Missing attributes have no value.
pub fn tooltip_rows(fields: &[TooltipField], feature: &Feature) -> Vec<(String, Option<String>)> {
    fields
        .iter()
        .map(|field| {
            (
                field.label.clone(),
                feature
                    .attribute(&field.attribute)
                    .map(|value| value.to_string()),
            )
        })
        .collect()
}

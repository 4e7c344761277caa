use serde::{Deserialize, Serialize};

use crate::geofile::feature::{AttributeValue, Feature};

/// Neutral grey used for features no rule applies to. None of the preset
/// palettes use it.
pub const DEFAULT_COLOR: &str = "#9e9e9e";

/// Visual style of a feature, in the terms of the Leaflet path options.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_color")]
    pub fill_color: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_fill_opacity")]
    pub fill_opacity: f64,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_weight() -> f64 {
    1.0
}

fn default_opacity() -> f64 {
    1.0
}

fn default_fill_opacity() -> f64 {
    0.6
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: default_color(),
            fill_color: default_color(),
            weight: default_weight(),
            opacity: default_opacity(),
            fill_opacity: default_fill_opacity(),
        }
    }
}

impl Style {
    /// Style with the same stroke and fill color.
    pub fn filled(color: &str) -> Self {
        Self {
            color: color.to_string(),
            fill_color: color.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CategoryRule {
    pub value: AttributeValue,
    pub style: Style,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ClassBreak {
    /// Inclusive upper bound of the class.
    pub max: f64,
    pub style: Style,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub enum StyleRules {
    /// One style per category value. The first matching rule wins.
    Categorical(Vec<CategoryRule>),
    /// Numeric classes in ascending order of `max`. The first class whose
    /// upper bound is not below the value wins.
    Graduated(Vec<ClassBreak>),
}

/// Named preset tables for the recurring datasets.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum Palette {
    LocalClimateZones,
    UrbanDensity,
    LandUse,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct StyleRuleTable {
    pub attribute: String,
    pub rules: StyleRules,
    #[serde(default)]
    pub default: Style,
}

impl StyleRuleTable {
    pub fn categorical(attribute: &str, categories: &[(AttributeValue, &str)]) -> Self {
        Self {
            attribute: attribute.to_string(),
            rules: StyleRules::Categorical(
                categories
                    .iter()
                    .map(|(value, color)| CategoryRule {
                        value: value.clone(),
                        style: Style::filled(color),
                    })
                    .collect(),
            ),
            default: Style::default(),
        }
    }

    /// Preset table of `palette` applied to `attribute`.
    pub fn from_palette(palette: Palette, attribute: &str) -> Self {
        let text = |code: &str| AttributeValue::Text(code.to_string());
        let code = |code: f64| AttributeValue::Number(code);
        match palette {
            // Standard LCZ colors of the WUDAPT classification.
            Palette::LocalClimateZones => Self::categorical(
                attribute,
                &[
                    (code(1.0), "#8c0000"),
                    (code(2.0), "#d10000"),
                    (code(3.0), "#ff0000"),
                    (code(4.0), "#bf4d00"),
                    (code(5.0), "#ff6600"),
                    (code(6.0), "#ff9955"),
                    (code(7.0), "#faee05"),
                    (code(8.0), "#bcbcbc"),
                    (code(9.0), "#ffccaa"),
                    (code(10.0), "#555555"),
                    (text("A"), "#006a00"),
                    (text("B"), "#00aa00"),
                    (text("C"), "#648525"),
                    (text("D"), "#b9db79"),
                    (text("E"), "#000000"),
                    (text("F"), "#fbf7ae"),
                    (text("G"), "#6a6aff"),
                ],
            ),
            Palette::UrbanDensity => Self::categorical(
                attribute,
                &[
                    (code(1.0), "#fee5d9"),
                    (code(2.0), "#fcae91"),
                    (code(3.0), "#fb6a4a"),
                    (code(4.0), "#de2d26"),
                    (code(5.0), "#a50f15"),
                ],
            ),
            Palette::LandUse => Self::categorical(
                attribute,
                &[
                    (text("residential"), "#f4a582"),
                    (text("commercial"), "#d6604d"),
                    (text("industrial"), "#8073ac"),
                    (text("agricultural"), "#fee08b"),
                    (text("forest"), "#1a9850"),
                    (text("park"), "#91cf60"),
                    (text("water"), "#4393c3"),
                ],
            ),
        }
    }
}

/// Style of `feature` according to `table`.
///
/// Falls back to the table default when the feature lacks the styled attribute
/// or no rule covers its value.
pub fn resolve_style(table: &StyleRuleTable, feature: &Feature) -> Style {
    let value = match feature.attribute(&table.attribute) {
        Some(value) => value,
        None => return table.default.clone(),
    };
    let style = match &table.rules {
        StyleRules::Categorical(categories) => categories
            .iter()
            .find(|category| category.value.matches(value))
            .map(|category| &category.style),
        StyleRules::Graduated(breaks) => value.as_number().and_then(|number| {
            breaks
                .iter()
                .find(|class_break| number <= class_break.max)
                .map(|class_break| &class_break.style)
        }),
    };
    style.unwrap_or(&table.default).clone()
}

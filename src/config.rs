use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::{
    dashboard::{
        canvas::MapOptions,
        filter::{AttributeFilter, Predicate},
        layer::TooltipField,
        style::{Palette, StyleRuleTable},
    },
    geofile::feature::AttributeValue,
};

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub enum DatasetSource {
    Geofile { filepath: PathBuf },
    Url { url: String },
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub enum StyleConfig {
    /// One of the preset tables, keyed on `attribute`.
    Palette { palette: Palette, attribute: String },
    Rules(StyleRuleTable),
}

impl StyleConfig {
    pub fn to_rule_table(&self) -> StyleRuleTable {
        match self {
            StyleConfig::Palette { palette, attribute } => {
                StyleRuleTable::from_palette(*palette, attribute)
            }
            StyleConfig::Rules(table) => table.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LayerConfig {
    pub name: String,
    pub source: DatasetSource,
    pub style: StyleConfig,
    #[serde(default)]
    pub filter: Option<AttributeFilter>,
    #[serde(default)]
    pub tooltip: Vec<TooltipField>,
    #[serde(default = "default_show")]
    pub show: bool,
}

fn default_show() -> bool {
    true
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub map: MapOptions,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
    /// Where remote datasets are cached.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_output_filepath")]
    pub output_filepath: PathBuf,
    /// Rows of the attribute preview, 0 disables it.
    #[serde(default = "default_table_rows")]
    pub table_rows: usize,
}

fn default_title() -> String {
    "Map layers".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_filepath() -> PathBuf {
    PathBuf::from("map.html")
}

fn default_table_rows() -> usize {
    20
}

impl DashboardConfig {
    /// Make relative paths relative to `base_dir` instead of the working directory.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        };
        resolve(&mut self.data_dir);
        resolve(&mut self.output_filepath);
        for layer in self.layers.iter_mut() {
            if let DatasetSource::Geofile { filepath } = &mut layer.source {
                resolve(filepath);
            }
        }
    }
}

pub fn read_config(config_filepath: &Path) -> anyhow::Result<DashboardConfig> {
    if !config_filepath.exists() {
        return Err(anyhow!("Config file {:?} not found", config_filepath));
    }
    let config_contents = read_to_string(config_filepath)?;
    let mut config: DashboardConfig = serde_yaml::from_str(&config_contents)
        .with_context(|| format!("Parsing config file {:?}", config_filepath))?;
    if let Some(base_dir) = config_filepath.parent() {
        config.resolve_paths(base_dir);
    }
    Ok(config)
}

fn parse_attribute_value(text: &str) -> AttributeValue {
    match text.parse::<f64>() {
        Ok(number) => AttributeValue::Number(number),
        Err(_) => AttributeValue::Text(text.to_string()),
    }
}

/// Range bounds of `MIN..MAX` when both sides are numbers or left out.
fn parse_range(text: &str) -> Option<(Option<f64>, Option<f64>)> {
    let (min, max) = text.split_once("..")?;
    let parse_bound = |bound: &str| -> Option<Option<f64>> {
        let bound = bound.trim();
        if bound.is_empty() {
            Some(None)
        } else {
            bound.parse().ok().map(Some)
        }
    };
    Some((parse_bound(min)?, parse_bound(max)?))
}

/// Parse a filter given on the command line, as `LAYER:ATTRIBUTE=VALUES`.
///
/// `VALUES` is either a comma separated list of accepted values or an
/// inclusive numeric range `MIN..MAX` where either bound may be left out.
/// Values like `a..b` are categories, not ranges.
pub fn parse_filter_override(text: &str) -> anyhow::Result<(String, AttributeFilter)> {
    let (target, values) = text
        .split_once('=')
        .ok_or_else(|| anyhow!("Filter '{}' is missing '='", text))?;
    let (layer, attribute) = target
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("Filter '{}' must name a layer and an attribute", text))?;
    if layer.is_empty() || attribute.is_empty() {
        return Err(anyhow!("Filter '{}' must name a layer and an attribute", text));
    }
    let predicate = if let Some((min, max)) = parse_range(values) {
        Predicate::Range { min, max }
    } else {
        let mut accepted: Vec<AttributeValue> =
            values.split(',').map(|value| parse_attribute_value(value.trim())).collect();
        if accepted.len() == 1 {
            Predicate::Equals(accepted.remove(0))
        } else {
            Predicate::OneOf(accepted)
        }
    };
    Ok((layer.to_string(), AttributeFilter::new(attribute, predicate)))
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use rstest::rstest;
    use testdir::testdir;

    use crate::{
        dashboard::{
            canvas::Tiles,
            filter::Predicate,
            style::{Palette, StyleRules},
        },
        geofile::feature::AttributeValue,
    };

    use super::{parse_filter_override, read_config, DatasetSource, StyleConfig};

    const CONFIG: &str = r##"
title: Urban heat dashboard
map:
  zoom: 11
  tiles: CartoDbPositron
layers:
  - name: Urban density
    source: !Geofile
      filepath: urban_density.geojson
    style: !Palette
      palette: UrbanDensity
      attribute: density_class
    filter:
      attribute: density_class
      predicate: !OneOf [2, 4]
    tooltip:
      - attribute: density_class
        label: Density
  - name: Roads
    source: !Url
      url: https://example.org/roads.geojson
    show: false
    style: !Rules
      attribute: highway
      rules: !Categorical
        - value: primary
          style: {color: "#e31a1c", weight: 3}
"##;

    #[test]
    fn test_read_config() {
        let test_dir = testdir!();
        let config_filepath = test_dir.join("dashboard.yaml");
        fs::write(&config_filepath, CONFIG).unwrap();
        let config = read_config(&config_filepath).unwrap();

        assert_eq!("Urban heat dashboard", config.title);
        assert_eq!(11, config.map.zoom);
        assert_eq!(Tiles::CartoDbPositron, config.map.tiles);
        assert_eq!(700, config.map.width);
        assert_eq!(20, config.table_rows);
        assert_eq!(test_dir.join("map.html"), config.output_filepath);
        assert_eq!(2, config.layers.len());

        let density = &config.layers[0];
        assert_eq!(
            DatasetSource::Geofile {
                filepath: test_dir.join("urban_density.geojson")
            },
            density.source
        );
        assert!(density.show);
        assert!(matches!(
            density.filter.as_ref().unwrap().predicate,
            Predicate::OneOf(_)
        ));
        assert_eq!(
            StyleConfig::Palette {
                palette: Palette::UrbanDensity,
                attribute: "density_class".to_string()
            },
            density.style
        );

        let roads = &config.layers[1];
        assert!(!roads.show);
        assert!(roads.tooltip.is_empty());
        match roads.style.to_rule_table().rules {
            StyleRules::Categorical(categories) => assert_eq!(3.0, categories[0].style.weight),
            StyleRules::Graduated(_) => panic!("Expected categorical rules"),
        }
    }

    #[test]
    fn test_missing_config_file() {
        let result = read_config(&PathBuf::from("does/not/exist.yaml"));
        assert!(result.is_err());
    }

    #[rstest]
    #[case("Urban density:density_class=2", "Urban density", "density_class", Predicate::Equals(AttributeValue::Number(2.0)))]
    #[case("LCZ:label=A, B", "LCZ", "label", Predicate::OneOf(vec!["A".into(), "B".into()]))]
    #[case("NDVI:ndvi=0.2..0.5", "NDVI", "ndvi", Predicate::Range { min: Some(0.2), max: Some(0.5) })]
    #[case("Roads:lanes=2..", "Roads", "lanes", Predicate::Range { min: Some(2.0), max: None })]
    #[case("a:b:c=x", "a:b", "c", Predicate::Equals(AttributeValue::Text("x".into())))]
    #[case("Land use:kind=a..b", "Land use", "kind", Predicate::Equals(AttributeValue::Text("a..b".into())))]
    #[case("NDVI:class=low..high,none", "NDVI", "class", Predicate::OneOf(vec!["low..high".into(), "none".into()]))]
    #[case("NDVI:ndvi=..", "NDVI", "ndvi", Predicate::Range { min: None, max: None })]
    fn test_parse_filter_override(
        #[case] text: &str,
        #[case] expected_layer: &str,
        #[case] expected_attribute: &str,
        #[case] expected_predicate: Predicate,
    ) {
        let (layer, filter) = parse_filter_override(text).unwrap();
        assert_eq!(expected_layer, layer);
        assert_eq!(expected_attribute, filter.attribute);
        assert_eq!(expected_predicate, filter.predicate);
    }

    #[rstest]
    #[case("density_class=2")]
    #[case("Urban density:density_class")]
    #[case(":density_class=2")]
    fn test_parse_invalid_filter_override(#[case] text: &str) {
        assert!(parse_filter_override(text).is_err());
    }
}

use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;

use crate::{
    crs::crs_utils::{crs_from_foreign_members, project_features_to_wgs84, WGS84_EPSG_CODE},
    error::DashboardError,
};

use super::feature::{AttributeValue, Feature, FeatureCollection};

/// Read a GeoJSON file into a feature collection in WGS84.
///
/// Fails with `DashboardError::Load` when the file does not exist, cannot be
/// parsed, or holds no features.
pub fn read_features_from_geojson(filepath: &Path) -> Result<FeatureCollection, DashboardError> {
    let source_name = filepath.display().to_string();
    if !filepath.exists() {
        return Err(DashboardError::load(source_name, "file not found"));
    }
    let contents =
        fs::read(filepath).map_err(|err| DashboardError::load(source_name.as_str(), err))?;
    read_features_from_geojson_bytes(&contents, &source_name)
}

/// Parse an uploaded GeoJSON byte stream. `source_name` identifies the upload in errors.
pub fn read_features_from_geojson_bytes(
    bytes: &[u8],
    source_name: &str,
) -> Result<FeatureCollection, DashboardError> {
    let geojson = geojson::GeoJson::from_reader(bytes)
        .map_err(|err| DashboardError::load(source_name, err))?;
    let collection = geojson_to_collection(geojson)
        .map_err(|err| DashboardError::load(source_name, format!("{:#}", err)))?;
    if collection.is_empty() {
        return Err(DashboardError::load(source_name, "dataset has no features"));
    }
    log::info!("Read {} features from {}", collection.len(), source_name);
    Ok(collection)
}

fn geojson_to_collection(geojson: geojson::GeoJson) -> anyhow::Result<FeatureCollection> {
    let (geojson_features, foreign_members) = match geojson {
        geojson::GeoJson::FeatureCollection(collection) => {
            (collection.features, collection.foreign_members)
        }
        geojson::GeoJson::Feature(feature) => {
            let foreign_members = feature.foreign_members.clone();
            (vec![feature], foreign_members)
        }
        geojson::GeoJson::Geometry(geometry) => {
            let foreign_members = geometry.foreign_members.clone();
            (vec![geojson::Feature::from(geometry)], foreign_members)
        }
    };
    let crs = crs_from_foreign_members(foreign_members.as_ref())?;

    let num_features = geojson_features.len();
    let mut features = Vec::with_capacity(num_features);
    for (index, geojson_feature) in geojson_features.into_iter().enumerate() {
        let geometry = match geojson_feature.geometry {
            Some(geometry) => geo::Geometry::<f64>::try_from(geometry.value)
                .with_context(|| format!("Converting geometry of feature {}", index))?,
            None => continue,
        };
        let attributes: HashMap<String, AttributeValue> = geojson_feature
            .properties
            .unwrap_or_default()
            .iter()
            .filter_map(|(key, value)| {
                AttributeValue::from_json(value).map(|value| (key.clone(), value))
            })
            .collect();
        features.push(Feature {
            geometry,
            attributes,
        });
    }
    if features.len() != num_features {
        log::warn!(
            "Out of {} features read, only {} had a geometry.",
            num_features,
            features.len()
        )
    }

    project_features_to_wgs84(&mut features, crs)?;
    Ok(FeatureCollection {
        features,
        crs: WGS84_EPSG_CODE,
    })
}

/// Convert a feature to GeoJSON, keeping its attributes as properties.
pub fn feature_to_geojson(feature: &Feature) -> geojson::Feature {
    let properties: geojson::JsonObject = feature
        .attributes
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect();
    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(
            &feature.geometry,
        ))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn write_features_to_geojson(
    collection: &FeatureCollection,
    output_filepath: &Path,
) -> anyhow::Result<()> {
    let feature_collection: geojson::FeatureCollection =
        collection.features.iter().map(feature_to_geojson).collect();
    let geojson_contents = geojson::GeoJson::from(feature_collection);
    fs::write(output_filepath, geojson_contents.to_string())
        .with_context(|| format!("Writing GeoJSON to {:?}", output_filepath))
}

pub mod feature;
pub mod geojson;
pub mod remote;

#[cfg(test)]
pub mod test_utils {
    use super::{feature::FeatureCollection, geojson::read_features_from_geojson_bytes};

    /// Three unit squares side by side with `density_class` 1, 2 and 4.
    pub const URBAN_DENSITY: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"density_class": 1, "name": "outskirts"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
            {"type": "Feature", "properties": {"density_class": 2, "name": "suburb"},
             "geometry": {"type": "Polygon", "coordinates": [[[1,0],[2,0],[2,1],[1,1],[1,0]]]}},
            {"type": "Feature", "properties": {"density_class": 4, "name": null},
             "geometry": {"type": "Polygon", "coordinates": [[[2,0],[3,0],[3,1],[2,1],[2,0]]]}}
        ]
    }"#;

    /// Vegetation index points, one of them without an `ndvi` value.
    pub const VEGETATION_INDEX: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"ndvi": 0.05},
             "geometry": {"type": "Point", "coordinates": [-122.42, 37.77]}},
            {"type": "Feature", "properties": {"ndvi": "0.45"},
             "geometry": {"type": "Point", "coordinates": [-122.41, 37.78]}},
            {"type": "Feature", "properties": {"ndvi": 0.8},
             "geometry": {"type": "Point", "coordinates": [-122.40, 37.79]}},
            {"type": "Feature", "properties": {"station": "S4"},
             "geometry": {"type": "Point", "coordinates": [-122.43, 37.76]}}
        ]
    }"#;

    pub fn urban_density() -> FeatureCollection {
        read_features_from_geojson_bytes(URBAN_DENSITY.as_bytes(), "urban_density").unwrap()
    }

    pub fn vegetation_index() -> FeatureCollection {
        read_features_from_geojson_bytes(VEGETATION_INDEX.as_bytes(), "vegetation_index").unwrap()
    }
}

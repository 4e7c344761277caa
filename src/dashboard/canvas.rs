use geo::Centroid;
use serde::Deserialize;

use crate::{error::DashboardError, geofile::feature::FeatureCollection};

use super::{
    display::Notice,
    layer::{tooltip_rows, Layer},
    style::{resolve_style, Style},
};

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl From<geo::Point> for LatLon {
    fn from(point: geo::Point) -> Self {
        Self {
            lat: point.y(),
            lon: point.x(),
        }
    }
}

/// Base map tiles.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub enum Tiles {
    #[default]
    OpenStreetMap,
    CartoDbPositron,
    EsriWorldImagery,
}

impl Tiles {
    pub fn url(&self) -> &'static str {
        match self {
            Tiles::OpenStreetMap => "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            Tiles::CartoDbPositron => {
                "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png"
            }
            Tiles::EsriWorldImagery => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            Tiles::OpenStreetMap => "&copy; OpenStreetMap contributors",
            Tiles::CartoDbPositron => "&copy; OpenStreetMap contributors &copy; CARTO",
            Tiles::EsriWorldImagery => "Tiles &copy; Esri",
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct MapOptions {
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    /// Pinned center. When unset the map centers on the data.
    #[serde(default)]
    pub center: Option<LatLon>,
    /// Center used when no centroid can be computed.
    #[serde(default = "default_fallback_center")]
    pub fallback_center: LatLon,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub tiles: Tiles,
}

fn default_zoom() -> u8 {
    12
}

fn default_fallback_center() -> LatLon {
    // San Francisco.
    LatLon {
        lat: 37.7749,
        lon: -122.4194,
    }
}

fn default_width() -> u32 {
    700
}

fn default_height() -> u32 {
    500
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            zoom: default_zoom(),
            center: None,
            fallback_center: default_fallback_center(),
            width: default_width(),
            height: default_height(),
            tiles: Tiles::default(),
        }
    }
}

/// Feature with its style and tooltip already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledFeature {
    pub geometry: geo::Geometry,
    pub style: Style,
    pub tooltip: Vec<(String, Option<String>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub name: String,
    pub show: bool,
    pub features: Vec<StyledFeature>,
}

/// Control toggling the visibility of the listed overlays.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerControl {
    pub overlay_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapCanvas {
    pub center: LatLon,
    pub zoom: u8,
    pub width: u32,
    pub height: u32,
    pub tiles: Tiles,
    overlays: Vec<Overlay>,
    layer_control: Option<LayerControl>,
}

impl MapCanvas {
    pub fn new(center: LatLon, options: &MapOptions) -> Self {
        Self {
            center,
            zoom: options.zoom,
            width: options.width,
            height: options.height,
            tiles: options.tiles,
            overlays: Vec::new(),
            layer_control: None,
        }
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    pub fn layer_control(&self) -> Option<&LayerControl> {
        self.layer_control.as_ref()
    }

    /// Add `layer` as an overlay, resolving every feature's style with the
    /// layer's own rule table.
    pub fn add_layer(&mut self, layer: &Layer) {
        let features = layer
            .collection
            .features
            .iter()
            .map(|feature| StyledFeature {
                geometry: feature.geometry.clone(),
                style: resolve_style(&layer.style, feature),
                tooltip: tooltip_rows(&layer.tooltip, feature),
            })
            .collect();
        self.overlays.push(Overlay {
            name: layer.name.clone(),
            show: layer.show,
            features,
        });
    }

    /// Attach the visibility control over the overlays added so far. A second
    /// call does nothing.
    pub fn attach_layer_control(&mut self) {
        if self.layer_control.is_some() {
            log::debug!("Layer control already attached");
            return;
        }
        self.layer_control = Some(LayerControl {
            overlay_names: self
                .overlays
                .iter()
                .map(|overlay| overlay.name.clone())
                .collect(),
        });
    }
}

/// Mean of the centroids of the collection's geometries.
pub fn compute_centroid(collection: &FeatureCollection) -> Result<geo::Point, DashboardError> {
    let centroids: Vec<geo::Point> = collection
        .features
        .iter()
        .filter_map(|feature| feature.geometry.centroid())
        .collect();
    if centroids.is_empty() {
        return Err(DashboardError::EmptyDataset);
    }
    let count = centroids.len() as f64;
    let (sum_x, sum_y) = centroids
        .iter()
        .fold((0.0, 0.0), |(x, y), point| (x + point.x(), y + point.y()));
    Ok(geo::Point::new(sum_x / count, sum_y / count))
}

fn resolve_center(layers: &[Layer], options: &MapOptions, notices: &mut Vec<Notice>) -> LatLon {
    if let Some(center) = options.center {
        return center;
    }
    let centroid = match layers.iter().find(|layer| !layer.collection.is_empty()) {
        Some(layer) => compute_centroid(&layer.collection),
        None => Err(DashboardError::EmptyDataset),
    };
    match centroid {
        Ok(point) => LatLon::from(point),
        Err(err) => {
            log::warn!("{}, using the fallback center", err);
            notices.push(Notice::warning(format!(
                "{}. The map shows its default location.",
                err
            )));
            options.fallback_center
        }
    }
}

/// Lay out `layers` on a new map canvas, in order, each as its own overlay.
///
/// Returns the canvas along with the warnings raised while rendering.
pub fn render_map(layers: &[Layer], options: &MapOptions) -> (MapCanvas, Vec<Notice>) {
    let mut notices = Vec::new();
    let center = resolve_center(layers, options, &mut notices);
    let mut canvas = MapCanvas::new(center, options);
    for layer in layers {
        log::info!(
            "Adding layer '{}' with {} features",
            layer.name,
            layer.collection.len()
        );
        canvas.add_layer(layer);
    }
    canvas.attach_layer_control();
    (canvas, notices)
}

use std::collections::HashMap;

use indicatif::ProgressBar;

use crate::{
    config::{DashboardConfig, LayerConfig},
    error::DashboardError,
    geofile::feature::FeatureCollection,
};

use super::{
    cache::DatasetCache,
    canvas::render_map,
    display::{attribute_table, Notice, Page},
    filter::{filter_features, AttributeFilter},
    layer::Layer,
};

/// Widget state resolved for one render pass.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Names of the layers to show. `None` shows every configured layer.
    pub layers: Option<Vec<String>>,
    /// Filters replacing the configured filter of the named layer.
    pub filters: HashMap<String, AttributeFilter>,
}

pub struct RenderOutput {
    /// Layers that made it onto the map, with their filtered features.
    pub layers: Vec<Layer>,
    pub page: Page,
}

fn select_layers<'a>(
    config: &'a DashboardConfig,
    selection: &Selection,
    notices: &mut Vec<Notice>,
) -> Vec<&'a LayerConfig> {
    let names = match &selection.layers {
        Some(names) => names,
        None => return config.layers.iter().collect(),
    };
    for name in names {
        if !config.layers.iter().any(|layer| &layer.name == name) {
            log::warn!("Selected layer '{}' is not configured", name);
            notices.push(Notice::warning(format!("Unknown layer '{}'", name)));
        }
    }
    config
        .layers
        .iter()
        .filter(|layer| names.contains(&layer.name))
        .collect()
}

fn warn_about_missing_attributes(layer: &Layer, notices: &mut Vec<Notice>) {
    let present = layer.collection.attribute_names();
    if !present.contains(&layer.style.attribute) {
        let err = DashboardError::MissingAttribute(layer.style.attribute.clone());
        log::warn!("{} in layer '{}', using the default style", err, layer.name);
        notices.push(Notice::warning(format!(
            "{} in layer '{}', features are drawn with the default style",
            err, layer.name
        )));
    }
    for field in &layer.tooltip {
        if !present.contains(&field.attribute) {
            log::warn!(
                "{} in layer '{}', tooltip '{}' stays empty",
                DashboardError::MissingAttribute(field.attribute.clone()),
                layer.name,
                field.label
            );
        }
    }
}

/// Build one layer: load through the cache, then filter. Errors and empty
/// results are reported as notices and leave the layer out.
fn build_layer(
    layer_config: &LayerConfig,
    filter: Option<&AttributeFilter>,
    cache: &mut DatasetCache,
    notices: &mut Vec<Notice>,
) -> Option<Layer> {
    let collection = match cache.get_or_load(&layer_config.source) {
        Ok(collection) => collection,
        Err(err) => {
            log::warn!("Skipping layer '{}': {}", layer_config.name, err);
            notices.push(Notice::error(err.to_string()));
            return None;
        }
    };
    let collection: FeatureCollection = match filter {
        Some(filter) => filter_features(&collection, filter),
        None => (*collection).clone(),
    };
    if collection.is_empty() {
        let err = DashboardError::EmptyResult(layer_config.name.clone());
        log::warn!("{}", err);
        notices.push(Notice::warning(err.to_string()));
        return None;
    }

    let mut layer = Layer::new(
        &layer_config.name,
        collection,
        layer_config.style.to_rule_table(),
    )
    .with_tooltip(layer_config.tooltip.clone());
    layer.show = layer_config.show;
    warn_about_missing_attributes(&layer, notices);
    Some(layer)
}

/// One full pass: load, filter, style and render the selected layers.
///
/// A failing layer never aborts the pass, it is left out and reported on the page.
pub fn run_render_pass(
    config: &DashboardConfig,
    selection: &Selection,
    cache: &mut DatasetCache,
    show_progress: bool,
) -> RenderOutput {
    let mut notices = Vec::new();
    let layer_configs = select_layers(config, selection, &mut notices);
    log::info!("Rendering {} layers", layer_configs.len());

    let bar = if show_progress {
        ProgressBar::new(layer_configs.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    let mut layers = Vec::new();
    for layer_config in layer_configs {
        let filter = selection
            .filters
            .get(&layer_config.name)
            .or(layer_config.filter.as_ref());
        if let Some(layer) = build_layer(layer_config, filter, cache, &mut notices) {
            layers.push(layer);
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    let (canvas, render_notices) = render_map(&layers, &config.map);
    notices.extend(render_notices);

    let table = match layers.first() {
        Some(layer) if config.table_rows > 0 => Some(attribute_table(
            &layer.name,
            &layer.collection,
            config.table_rows,
        )),
        _ => None,
    };

    RenderOutput {
        layers,
        page: Page {
            title: config.title.clone(),
            canvas,
            notices,
            table,
        },
    }
}

use anyhow::Context;
use serde::Serialize;
use tabled::builder::Builder;

use crate::geofile::feature::FeatureCollection;

use super::{
    canvas::{MapCanvas, StyledFeature},
    style::Style,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// Inline message shown above the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Attribute preview of a feature collection, limited to its first rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeTable {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

impl AttributeTable {
    pub fn to_terminal_table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.columns.iter().cloned());
        for row in &self.rows {
            builder.push_record(row.iter().cloned());
        }
        builder.build().to_string()
    }
}

pub fn attribute_table(title: &str, collection: &FeatureCollection, max_rows: usize) -> AttributeTable {
    let columns = collection.attribute_names();
    let rows = collection
        .features
        .iter()
        .take(max_rows)
        .map(|feature| {
            columns
                .iter()
                .map(|column| {
                    feature
                        .attribute(column)
                        .map(|value| value.to_string())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();
    AttributeTable {
        title: title.to_string(),
        columns,
        rows,
        total_rows: collection.len(),
    }
}

/// Everything a render pass produces for the page response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub title: String,
    pub canvas: MapCanvas,
    pub notices: Vec<Notice>,
    pub table: Option<AttributeTable>,
}

/// JSON that can be placed inside a `<script>` element.
fn script_json(value: &serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}

fn tooltip_html(rows: &[(String, Option<String>)]) -> String {
    rows.iter()
        .map(|(label, value)| {
            format!(
                "<b>{}</b>: {}",
                tera::escape_html(label),
                tera::escape_html(value.as_deref().unwrap_or_default())
            )
        })
        .collect::<Vec<String>>()
        .join("<br>")
}

fn styled_feature_to_json(feature: &StyledFeature) -> serde_json::Value {
    let geometry = geojson::Geometry::new(geojson::Value::from(&feature.geometry));
    let style = serde_json::to_value(&feature.style).unwrap_or_else(|err| {
        log::warn!("Could not serialize style, using the default: {}", err);
        serde_json::to_value(Style::default()).unwrap_or_default()
    });
    let mut properties = serde_json::json!({ "style": style });
    if !feature.tooltip.is_empty() {
        properties["tooltip"] = serde_json::Value::String(tooltip_html(&feature.tooltip));
    }
    serde_json::json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": properties,
    })
}

fn notices_context(notices: &[Notice]) -> Vec<serde_json::Value> {
    notices
        .iter()
        .map(|notice| {
            let class = match notice.level {
                NoticeLevel::Warning => "notice warning",
                NoticeLevel::Error => "notice error",
            };
            serde_json::json!({ "class": class, "message": notice.message })
        })
        .collect()
}

fn render_map_script(canvas: &MapCanvas) -> String {
    let mut script = format!(
        "var map = L.map('map').setView([{}, {}], {});\n\
         L.tileLayer({}, {{attribution: {}}}).addTo(map);\n\
         var overlays = {{}};\n\
         function addOverlay(name, data, show) {{\n\
         \x20 var layer = L.geoJSON(data, {{\n\
         \x20   style: function (feature) {{ return feature.properties.style; }},\n\
         \x20   pointToLayer: function (feature, latlng) {{ return L.circleMarker(latlng, feature.properties.style); }},\n\
         \x20   onEachFeature: function (feature, layer) {{\n\
         \x20     if (feature.properties.tooltip) {{ layer.bindTooltip(feature.properties.tooltip); }}\n\
         \x20   }}\n\
         \x20 }});\n\
         \x20 if (show) {{ layer.addTo(map); }}\n\
         \x20 overlays[name] = layer;\n\
         }}\n",
        canvas.center.lat,
        canvas.center.lon,
        canvas.zoom,
        script_json(&serde_json::Value::from(canvas.tiles.url())),
        script_json(&serde_json::Value::from(canvas.tiles.attribution())),
    );
    for overlay in canvas.overlays() {
        let features: Vec<serde_json::Value> =
            overlay.features.iter().map(styled_feature_to_json).collect();
        let data = serde_json::json!({ "type": "FeatureCollection", "features": features });
        script.push_str(&format!(
            "addOverlay({}, {}, {});\n",
            script_json(&serde_json::Value::from(overlay.name.as_str())),
            script_json(&data),
            overlay.show
        ));
    }
    if let Some(control) = canvas.layer_control() {
        let names = serde_json::Value::from(control.overlay_names.clone());
        script.push_str(&format!(
            "var controlled = {{}};\n\
             {}.forEach(function (name) {{ controlled[name] = overlays[name]; }});\n\
             L.control.layers(null, controlled, {{collapsed: false}}).addTo(map);\n",
            script_json(&names)
        ));
    }
    script
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
body { font-family: sans-serif; margin: 1em; }
#map { width: {{ width }}px; height: {{ height }}px; }
.notice { padding: 0.5em; margin-bottom: 0.5em; border-radius: 4px; }
.warning { background: #fff3cd; }
.error { background: #f8d7da; }
table { border-collapse: collapse; }
td, th { border: 1px solid #ccc; padding: 2px 6px; }
</style>
</head>
<body>
<h1>{{ title }}</h1>
{% for notice in notices %}<div class="{{ notice.class }}">{{ notice.message }}</div>
{% endfor %}<div id="map"></div>
<script>
{{ script | safe }}</script>
{% if table %}<h2>{{ table.title }}</h2>
<p>Showing {{ table.rows | length }} of {{ table.total_rows }} features</p>
<table>
<thead><tr>{% for column in table.columns %}<th>{{ column }}</th>{% endfor %}</tr></thead>
<tbody>
{% for row in table.rows %}<tr>{% for cell in row %}<td>{{ cell }}</td>{% endfor %}</tr>
{% endfor %}</tbody>
</table>
{% endif %}</body>
</html>
"#;

/// Standalone HTML document with the map, notices and attribute table.
///
/// Text is escaped by the template; the map script is inserted as is.
pub fn render_page(page: &Page) -> anyhow::Result<String> {
    let mut context = tera::Context::new();
    context.insert("title", &page.title);
    context.insert("width", &page.canvas.width);
    context.insert("height", &page.canvas.height);
    context.insert("notices", &notices_context(&page.notices));
    context.insert("script", &render_map_script(&page.canvas));
    context.insert("table", &page.table);
    tera::Tera::one_off(PAGE_TEMPLATE, &context, true).context("Rendering map page")
}

#[cfg(test)]
mod tests {
    use crate::{
        dashboard::{
            canvas::{render_map, MapOptions},
            layer::{Layer, TooltipField},
            style::{Palette, StyleRuleTable},
        },
        geofile::test_utils::urban_density,
    };

    use super::{attribute_table, render_page, AttributeTable, Notice, Page};

    fn density_page(title: &str) -> Page {
        let layer = Layer::new(
            "Urban density",
            urban_density(),
            StyleRuleTable::from_palette(Palette::UrbanDensity, "density_class"),
        )
        .with_tooltip(vec![TooltipField::new("name", "Name")]);
        let (canvas, notices) = render_map(&[layer], &MapOptions::default());
        Page {
            title: title.to_string(),
            canvas,
            notices,
            table: Some(attribute_table("Urban density", &urban_density(), 2)),
        }
    }

    #[test]
    fn test_attribute_table_preview() {
        let table = attribute_table("Urban density", &urban_density(), 2);
        assert_eq!(vec!["density_class", "name"], table.columns);
        assert_eq!(
            vec![vec!["1", "outskirts"], vec!["2", "suburb"]],
            table.rows
        );
        assert_eq!(3, table.total_rows);
        let terminal = table.to_terminal_table();
        assert!(terminal.contains("density_class"));
        assert!(terminal.contains("suburb"));
    }

    #[test]
    fn test_render_page() {
        let mut page = density_page("Land <use>");
        page.notices.push(Notice::warning("No data in layer 'Roads'"));
        let html = render_page(&page).unwrap();
        assert!(html.contains("<title>Land &lt;use&gt;</title>"));
        assert!(html.contains("addOverlay(\"Urban density\""));
        assert!(html.contains("#fcae91"));
        // Embedded JSON has every "</" written as "<\/".
        assert!(html.contains("<b>Name<\\/b>: suburb"));
        assert!(html.contains("No data in layer &#x27;Roads&#x27;"));
        assert!(html.contains("Showing 2 of 3 features"));
        assert_eq!(1, html.matches("L.control.layers").count());
    }

    #[test]
    fn test_script_data_cannot_close_script_element() {
        let mut page = density_page("Density");
        page.canvas = {
            let layer = Layer::new(
                "</script><script>alert(1)",
                urban_density(),
                StyleRuleTable::from_palette(Palette::UrbanDensity, "density_class"),
            );
            render_map(&[layer], &MapOptions::default()).0
        };
        let html = render_page(&page).unwrap();
        // Only the Leaflet include and the map script itself close an element.
        assert_eq!(2, html.matches("</script>").count());
        assert!(html.contains("<\\/script><script>alert(1)"));
    }

    #[test]
    fn test_page_text_is_escaped() {
        let mut page = density_page("Density");
        page.notices.push(Notice::error("Could not load <b>roads</b>"));
        page.table = Some(AttributeTable {
            title: "Roads & paths".to_string(),
            columns: vec!["<name>".to_string()],
            rows: vec![vec!["<img src=x onerror=alert(1)>".to_string()]],
            total_rows: 1,
        });
        let html = render_page(&page).unwrap();
        assert!(html.contains("Could not load &lt;b&gt;roads&lt;&#x2F;b&gt;"));
        assert!(html.contains("<h2>Roads &amp; paths</h2>"));
        assert!(html.contains("<th>&lt;name&gt;</th>"));
        assert!(html.contains("<td>&lt;img src=x onerror=alert(1)&gt;</td>"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_tooltip_text_is_escaped() {
        let mut collection = urban_density();
        collection.features[0].attributes.insert(
            "name".to_string(),
            "<i>old town</i>".into(),
        );
        let layer = Layer::new(
            "Urban density",
            collection,
            StyleRuleTable::from_palette(Palette::UrbanDensity, "density_class"),
        )
        .with_tooltip(vec![TooltipField::new("name", "Name")]);
        let mut page = density_page("Density");
        page.canvas = render_map(&[layer], &MapOptions::default()).0;
        let html = render_page(&page).unwrap();
        assert!(html.contains("&lt;i&gt;old town&lt;&#x2F;i&gt;"));
        assert!(!html.contains("<i>old town"));
    }
}

extern crate log;
pub mod config;
pub mod crs;
pub mod dashboard;
pub mod error;
pub mod geofile;
use crate::config::{parse_filter_override, read_config};
use crate::dashboard::cache::DatasetCache;
use crate::dashboard::display::{render_page, NoticeLevel};
use crate::dashboard::pipeline::{run_render_pass, Selection};
use crate::geofile::geojson::write_features_to_geojson;
use anyhow::Context;
use clap::Parser;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Render configured GeoJSON datasets as toggleable layers of an interactive map page.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the dashboard config file.
    #[arg(short, long)]
    config_filepath: PathBuf,

    /// Name of a layer to show, repeat for several. All layers are shown by default.
    #[arg(short, long)]
    layer: Vec<String>,

    /// Filter replacing a layer's configured one, as LAYER:ATTRIBUTE=VALUE[,VALUE...]
    /// or LAYER:ATTRIBUTE=MIN..MAX.
    #[arg(short, long)]
    filter: Vec<String>,

    /// Write the page here instead of the configured output path.
    #[arg(short, long)]
    output_filepath: Option<PathBuf>,

    /// Also write each rendered layer's features as GeoJSON to this directory.
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Print the attribute preview to the terminal.
    #[arg(long)]
    preview: bool,
}

fn file_stem_for_layer(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

fn export_layers(layers: &[dashboard::layer::Layer], export_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(export_dir)
        .with_context(|| format!("Creating export directory {:?}", export_dir))?;
    for layer in layers {
        let filepath = export_dir.join(format!("{}.geojson", file_stem_for_layer(&layer.name)));
        log::info!(
            "Writing {} features of layer '{}' to {:?}",
            layer.collection.len(),
            layer.name,
            filepath
        );
        write_features_to_geojson(&layer.collection, &filepath)?;
    }
    Ok(())
}

fn try_main() -> anyhow::Result<()> {
    let args = Args::try_parse()?;
    let config = read_config(&args.config_filepath)?;

    let filters = args
        .filter
        .iter()
        .map(|filter| parse_filter_override(filter))
        .collect::<anyhow::Result<HashMap<_, _>>>()?;
    let selection = Selection {
        layers: if args.layer.is_empty() {
            None
        } else {
            Some(args.layer.clone())
        },
        filters,
    };

    let mut cache = DatasetCache::new(&config.data_dir);
    let output = run_render_pass(&config, &selection, &mut cache, true);
    for notice in &output.page.notices {
        match notice.level {
            NoticeLevel::Warning => log::warn!("{}", notice.message),
            NoticeLevel::Error => log::error!("{}", notice.message),
        }
    }

    let output_filepath = args
        .output_filepath
        .unwrap_or_else(|| config.output_filepath.clone());
    if let Some(parent) = output_filepath.parent() {
        fs::create_dir_all(parent)?;
    }
    log::info!("Writing map page to {:?}", output_filepath);
    fs::write(&output_filepath, render_page(&output.page)?)
        .with_context(|| format!("Writing map page to {:?}", output_filepath))?;

    if let Some(export_dir) = &args.export_dir {
        export_layers(&output.layers, export_dir)?;
    }
    if args.preview {
        match &output.page.table {
            Some(table) => {
                println!("{} ({} features)", table.title, table.total_rows);
                println!("{}", table.to_terminal_table());
            }
            None => println!("No data to preview"),
        }
    }
    Ok(())
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}

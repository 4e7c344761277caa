use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{
    config::DatasetSource,
    error::DashboardError,
    geofile::{feature::FeatureCollection, geojson::read_features_from_geojson, remote},
};

/// Identity of a dataset source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKey {
    Path(PathBuf),
    Url(String),
}

impl SourceKey {
    pub fn for_source(source: &DatasetSource) -> Self {
        match source {
            DatasetSource::Geofile { filepath } => {
                SourceKey::Path(filepath.canonicalize().unwrap_or_else(|_| filepath.clone()))
            }
            DatasetSource::Url { url } => SourceKey::Url(url.clone()),
        }
    }
}

/// Loaded datasets by source. Entries are shared read-only and never replaced;
/// failed loads are not remembered.
pub struct DatasetCache {
    data_dir: PathBuf,
    entries: HashMap<SourceKey, Rc<FeatureCollection>>,
}

impl DatasetCache {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_or_load(
        &mut self,
        source: &DatasetSource,
    ) -> Result<Rc<FeatureCollection>, DashboardError> {
        let key = SourceKey::for_source(source);
        if let Some(collection) = self.entries.get(&key) {
            log::debug!("Using cached dataset {:?}", key);
            return Ok(Rc::clone(collection));
        }
        let collection = Rc::new(load_source(source, &self.data_dir)?);
        self.entries.insert(key, Rc::clone(&collection));
        Ok(collection)
    }
}

fn load_source(
    source: &DatasetSource,
    data_dir: &Path,
) -> Result<FeatureCollection, DashboardError> {
    match source {
        DatasetSource::Geofile { filepath } => read_features_from_geojson(filepath),
        DatasetSource::Url { url } => {
            let filepath = remote::sync_remote_dataset_to_file(url, data_dir)
                .map_err(|err| DashboardError::load(url.as_str(), format!("{:#}", err)))?;
            read_features_from_geojson(&filepath)
        }
    }
}

use anyhow::{anyhow, Context};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::geofile::geojson::read_features_from_geojson_bytes;

/// Local file name for a remote dataset, stable for a given URL.
pub fn get_filename_for_url(url: &str) -> anyhow::Result<String> {
    let without_scheme = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .ok_or_else(|| anyhow!("URL '{}' has no scheme", url))?;
    let mut filename: String = without_scheme
        .trim_end_matches('/')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if filename.is_empty() {
        return Err(anyhow!("URL '{}' has no host", url));
    }
    if !filename.ends_with(".geojson") && !filename.ends_with(".json") {
        filename.push_str(".geojson");
    }
    Ok(filename)
}

pub fn download_dataset(url: &str) -> anyhow::Result<String> {
    let client = reqwest::blocking::Client::builder()
        .user_agent("geo-layers")
        .build()?;
    let response = client.get(url).send()?.error_for_status()?;
    response.text().or(Err(anyhow!("No response text")))
}

/// Write a downloaded dataset to `output_filepath` if it holds readable features.
///
/// The body goes to a temporary file that is renamed once validated, so an
/// error page or a truncated response never takes the dataset's place.
pub fn store_downloaded_dataset(
    url: &str,
    contents: &str,
    output_filepath: &Path,
) -> anyhow::Result<()> {
    read_features_from_geojson_bytes(contents.as_bytes(), url)
        .with_context(|| format!("Downloaded data from {} is not usable", url))?;
    let partial_filepath = output_filepath.with_extension("part");
    fs::write(&partial_filepath, contents)
        .with_context(|| format!("Writing downloaded dataset to {:?}", partial_filepath))?;
    fs::rename(&partial_filepath, output_filepath)
        .with_context(|| format!("Moving downloaded dataset to {:?}", output_filepath))?;
    Ok(())
}

/// Make sure a remote dataset is present in `output_dir` and return its path.
/// Already downloaded datasets are not fetched again.
pub fn sync_remote_dataset_to_file(url: &str, output_dir: &Path) -> anyhow::Result<PathBuf> {
    let filename = get_filename_for_url(url)?;
    let output_filepath = output_dir.join(filename);
    if output_filepath.exists() {
        log::info!("Local file exists for {}: {:?}", url, output_filepath);
        return Ok(output_filepath);
    }

    log::info!("Downloading {}", url);
    let contents = download_dataset(url)?;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Creating data directory {:?}", output_dir))?;
    store_downloaded_dataset(url, &contents, &output_filepath)?;
    Ok(output_filepath)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::rstest;
    use testdir::testdir;

    use crate::geofile::test_utils::URBAN_DENSITY;

    use super::{get_filename_for_url, store_downloaded_dataset, sync_remote_dataset_to_file};

    #[rstest]
    #[case("https://example.org/data/lcz.geojson", "example.org_data_lcz.geojson")]
    #[case("http://example.org/roads?bbox=1,2", "example.org_roads_bbox_1_2.geojson")]
    #[case("https://example.org/", "example.org.geojson")]
    fn test_get_filename_for_url(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(expected, get_filename_for_url(url).unwrap());
    }

    #[rstest]
    #[case("example.org/lcz.geojson")]
    #[case("https://")]
    fn test_get_filename_for_invalid_url(#[case] url: &str) {
        assert!(get_filename_for_url(url).is_err());
    }

    #[test]
    fn test_sync_reuses_existing_file() {
        let test_dir = testdir!();
        let url = "https://example.invalid/landuse.geojson";
        let existing = test_dir.join(get_filename_for_url(url).unwrap());
        fs::write(&existing, URBAN_DENSITY).unwrap();
        // No request is made for a file that is already there.
        assert_eq!(existing, sync_remote_dataset_to_file(url, &test_dir).unwrap());
    }

    #[test]
    fn test_store_valid_download() {
        let test_dir = testdir!();
        let url = "https://example.invalid/urban_density.geojson";
        let output_filepath = test_dir.join(get_filename_for_url(url).unwrap());
        store_downloaded_dataset(url, URBAN_DENSITY, &output_filepath).unwrap();
        assert_eq!(URBAN_DENSITY, fs::read_to_string(&output_filepath).unwrap());
        assert!(!output_filepath.with_extension("part").exists());
    }

    #[rstest]
    #[case("<html><body>Please log in to the network</body></html>")]
    #[case(r#"{"type": "FeatureCollection", "features": [{"type": "Feat"#)]
    #[case(r#"{"type": "FeatureCollection", "features": []}"#)]
    fn test_invalid_download_is_not_kept(#[case] contents: &str) {
        let test_dir = testdir!();
        let url = "https://example.invalid/landuse.geojson";
        let output_filepath = test_dir.join(get_filename_for_url(url).unwrap());
        assert!(store_downloaded_dataset(url, contents, &output_filepath).is_err());
        assert!(!output_filepath.exists());
        assert!(!output_filepath.with_extension("part").exists());
        // Nothing to reuse, so the next sync tries to download again.
        assert!(sync_remote_dataset_to_file(url, &test_dir).is_err());
    }
}

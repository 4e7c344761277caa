use anyhow::anyhow;
use proj::Transform;

use crate::geofile::feature::Feature;

pub type EpsgCode = u32;

pub const WGS84_EPSG_CODE: EpsgCode = 4326;

pub fn epsg_code_to_authority_string(code: EpsgCode) -> String {
    format!("EPSG:{}", code)
}

/// Parse a CRS name as found in the legacy GeoJSON `crs` member.
///
/// Accepted forms:
/// * `EPSG:3857`
/// * `urn:ogc:def:crs:EPSG::3857` (and with a version, `urn:ogc:def:crs:EPSG:6.6:3857`)
/// * `urn:ogc:def:crs:OGC:1.3:CRS84` and `CRS84`, which are WGS84 in lon/lat order.
pub fn parse_crs_name(name: &str) -> anyhow::Result<EpsgCode> {
    let name = name.trim();
    if name.ends_with("CRS84") {
        return Ok(WGS84_EPSG_CODE);
    }
    let upper = name.to_uppercase();
    let code = if let Some(code) = upper.strip_prefix("EPSG:") {
        code
    } else if upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
        upper
            .rsplit(':')
            .next()
            .ok_or_else(|| anyhow!("CRS '{}' does not end in a code", name))?
    } else {
        return Err(anyhow!("Unsupported CRS name '{}'", name));
    };
    code.parse()
        .map_err(|err| anyhow!("Could not parse EPSG code of CRS '{}': {}", name, err))
}

/// Find the CRS of a GeoJSON document from its foreign members. Without a `crs`
/// member, GeoJSON coordinates are WGS84.
pub fn crs_from_foreign_members(
    foreign_members: Option<&geojson::JsonObject>,
) -> anyhow::Result<EpsgCode> {
    let crs = match foreign_members.and_then(|members| members.get("crs")) {
        Some(crs) => crs,
        None => return Ok(WGS84_EPSG_CODE),
    };
    let name = crs
        .get("properties")
        .and_then(|properties| properties.get("name"))
        .and_then(|name| name.as_str())
        .ok_or_else(|| anyhow!("Only named CRS members are supported, got {}", crs))?;
    parse_crs_name(name)
}

/// Reproject feature geometries in place from `from_crs` to WGS84 lon/lat.
pub fn project_features_to_wgs84(
    features: &mut [Feature],
    from_crs: EpsgCode,
) -> anyhow::Result<()> {
    if from_crs == WGS84_EPSG_CODE {
        return Ok(());
    }
    log::debug!(
        "Projecting {} features from {} to {}",
        features.len(),
        epsg_code_to_authority_string(from_crs),
        epsg_code_to_authority_string(WGS84_EPSG_CODE)
    );
    // new_known_crs normalizes the axis order to lon/lat.
    let projection = proj::Proj::new_known_crs(
        &epsg_code_to_authority_string(from_crs),
        &epsg_code_to_authority_string(WGS84_EPSG_CODE),
        None,
    )?;
    for feature in features.iter_mut() {
        feature.geometry.transform(&projection)?;
    }
    Ok(())
}

//! Route and airway file loading.
//!
//! Routes come from delimited text (`lat,lon` per line) or GPX track
//! points; airways from a GeoJSON FeatureCollection of LineStrings.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use propviz_core::types::{Airway, AirwaySet, GeoPoint, Route};

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid airway GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("route invalid or too short ({0} points)")]
    TooShort(usize),
}

/// Parse `lat,lon` lines. Blank lines and lines without two finite numbers are skipped.
pub fn parse_route_csv(text: &str) -> Route {
    let points = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.split(',').map(str::trim);
            let lat = fields.next()?.parse::<f64>().ok()?;
            let lon = fields.next()?.parse::<f64>().ok()?;
            let p = GeoPoint::new(lat, lon);
            p.is_finite().then_some(p)
        })
        .collect();
    Route::new(points)
}

/// Parse `<trkpt lat=".." lon="..">` elements in document order.
pub fn parse_route_gpx(text: &str) -> Route {
    let mut points = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("<trkpt") {
        let tag_start = &rest[start + "<trkpt".len()..];
        let end = tag_start.find('>').unwrap_or(tag_start.len());
        let tag = &tag_start[..end];
        if let (Some(lat), Some(lon)) = (attribute(tag, "lat"), attribute(tag, "lon")) {
            let p = GeoPoint::new(lat, lon);
            if p.is_finite() {
                points.push(p);
            }
        }
        rest = &tag_start[end..];
    }
    Route::new(points)
}

/// Numeric value of `name="…"` (or single-quoted) inside a tag body.
fn attribute(tag: &str, name: &str) -> Option<f64> {
    let mut search = tag;
    loop {
        let idx = search.find(name)?;
        let preceded_by_space = search[..idx]
            .chars()
            .next_back()
            .is_none_or(char::is_whitespace);
        let after = search[idx + name.len()..].trim_start();
        if preceded_by_space {
            if let Some(value) = after.strip_prefix('=') {
                let value = value.trim_start();
                let quote = value.chars().next()?;
                if quote == '"' || quote == '\'' {
                    let body = &value[1..];
                    let close = body.find(quote)?;
                    return body[..close].trim().parse().ok();
                }
            }
        }
        search = &search[idx + name.len()..];
    }
}

/// Route from file, GPX when the extension says so, delimited text otherwise.
///
/// Fails when fewer than two usable points remain.
pub fn load_route(path: &Path) -> Result<Route, TrackError> {
    let text = read(path)?;
    let is_gpx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gpx"));
    let route = if is_gpx {
        parse_route_gpx(&text)
    } else {
        parse_route_csv(&text)
    };
    if route.len() < 2 {
        return Err(TrackError::TooShort(route.len()));
    }
    Ok(route)
}

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: serde_json::Value,
}

/// Parse airway LineStrings. Coordinates are `[lon, lat, ...]`; other
/// geometry types are ignored. Unnamed features get `airway-<n>`.
pub fn parse_airways_geojson(text: &str) -> Result<AirwaySet, TrackError> {
    let collection: FeatureCollection = serde_json::from_str(text)?;
    let mut airways = Vec::new();
    for (i, feature) in collection.features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry else {
            continue;
        };
        if geometry.kind != "LineString" {
            continue;
        }
        let coords: Vec<Vec<f64>> = serde_json::from_value(geometry.coordinates)?;
        let points: Vec<GeoPoint> = coords
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| GeoPoint::new(c[1], c[0]))
            .filter(GeoPoint::is_finite)
            .collect();
        let name = feature
            .properties
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(|n| n.as_str())
            .map_or_else(|| format!("airway-{i}"), str::to_string);
        airways.push(Airway::new(name, points));
    }
    Ok(airways)
}

pub fn load_airways(path: &Path) -> Result<AirwaySet, TrackError> {
    parse_airways_geojson(&read(path)?)
}

fn read(path: &Path) -> Result<String, TrackError> {
    std::fs::read_to_string(path).map_err(|source| TrackError::Io {
        path: path.display().to_string(),
        source,
    })
}

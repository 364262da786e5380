//! Route input from GeoJSON documents.
//!
//! Accepts a `LineString` geometry, a `Feature` wrapping one, or a
//! `FeatureCollection` whose first line feature is used. Anything else is an
//! [`FlightError::InvalidPath`].

use serde::Deserialize;

use crate::error::{FlightError, Result};
use crate::geo_path::GeoPath;
use crate::spatial::LngLat;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Document {
    FeatureCollection { features: Vec<Feature> },
    Feature(Feature),
    LineString { coordinates: Vec<Vec<f64>> },
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    LineString {
        coordinates: Vec<Vec<f64>>,
    },
    #[serde(other)]
    Other,
}

/// Parse a GeoJSON string into a route path.
pub fn path_from_geojson_str(input: &str) -> Result<GeoPath> {
    let document: Document = serde_json::from_str(input)
        .map_err(|e| FlightError::invalid_path(format!("unreadable GeoJSON: {e}")))?;

    let coordinates = match document {
        Document::LineString { coordinates } => coordinates,
        Document::Feature(feature) => line_coordinates(feature)
            .ok_or_else(|| FlightError::invalid_path("feature geometry is not a LineString"))?,
        Document::FeatureCollection { features } => features
            .into_iter()
            .find_map(line_coordinates)
            .ok_or_else(|| FlightError::invalid_path("collection holds no LineString feature"))?,
    };

    let points = coordinates
        .iter()
        .enumerate()
        .map(|(idx, position)| match position.as_slice() {
            // Positions may carry an altitude as a third element.
            [lng, lat, ..] => Ok(LngLat::new(*lng, *lat)),
            _ => Err(FlightError::invalid_path(format!(
                "position {idx} has {} element(s)",
                position.len()
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    GeoPath::new(points)
}

fn line_coordinates(feature: Feature) -> Option<Vec<Vec<f64>>> {
    match feature.geometry? {
        Geometry::LineString { coordinates } => Some(coordinates),
        Geometry::Other => None,
    }
}

//! Immutable route geometry with arc-length parameterization.

use std::time::Duration;

use crate::error::{FlightError, Result};
use crate::spatial::{lerp_longitude, LngLat};

const MS_PER_KM: f64 = 500.0;
const MIN_SUGGESTED_MS: f64 = 3_000.0;
const MAX_SUGGESTED_MS: f64 = 30_000.0;

/// Ordered route points with precomputed cumulative distances.
///
/// Positions are parameterized by traveled distance, not by point index:
/// equal fraction steps cover equal distances along the route.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPath {
    points: Vec<LngLat>,
    /// Cumulative distance in km at each point; `cumulative_km[0] == 0`.
    cumulative_km: Vec<f64>,
}

/// Lng/lat bounding box.
///
/// `min.lng` is the western edge and `max.lng` the eastern one. When the box
/// crosses the antimeridian the western edge is greater than the eastern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: LngLat,
    pub max: LngLat,
}

impl Bounds {
    pub fn crosses_antimeridian(&self) -> bool {
        self.min.lng > self.max.lng
    }

    pub fn contains(&self, point: &LngLat) -> bool {
        let lng_inside = if self.crosses_antimeridian() {
            point.lng >= self.min.lng || point.lng <= self.max.lng
        } else {
            point.lng >= self.min.lng && point.lng <= self.max.lng
        };
        lng_inside && point.lat >= self.min.lat && point.lat <= self.max.lat
    }
}

impl GeoPath {
    /// Build a path from at least two valid coordinates.
    pub fn new(points: impl IntoIterator<Item = LngLat>) -> Result<Self> {
        let points: Vec<LngLat> = points.into_iter().collect();
        if points.len() < 2 {
            return Err(FlightError::invalid_path(format!(
                "need at least 2 points, got {}",
                points.len()
            )));
        }
        if let Some((idx, bad)) = points.iter().enumerate().find(|(_, p)| !p.is_valid()) {
            return Err(FlightError::invalid_path(format!(
                "point {idx} out of range: ({}, {})",
                bad.lng, bad.lat
            )));
        }

        let mut cumulative_km = Vec::with_capacity(points.len());
        let mut total = 0.0;
        cumulative_km.push(total);
        for pair in points.windows(2) {
            total += pair[0].distance_km(&pair[1]);
            cumulative_km.push(total);
        }

        Ok(Self {
            points,
            cumulative_km,
        })
    }

    /// Build a path from `[lng, lat]` pairs, the GeoJSON coordinate order.
    pub fn from_coordinates(coordinates: &[[f64; 2]]) -> Result<Self> {
        Self::new(coordinates.iter().copied().map(LngLat::from))
    }

    /// Total arc length in kilometers.
    pub fn length(&self) -> f64 {
        self.cumulative_km.last().copied().unwrap_or(0.0)
    }

    pub fn points(&self) -> &[LngLat] {
        &self.points
    }

    pub fn first(&self) -> LngLat {
        self.points[0]
    }

    pub fn last(&self) -> LngLat {
        self.points[self.points.len() - 1]
    }

    /// Smallest box holding every point, following segments that cross the
    /// antimeridian the short way.
    pub fn bounds(&self) -> Bounds {
        let first = self.first();
        let (mut min, mut max) = (first, first);
        // Longitudes unwrapped along the route, paired with the point's own value.
        let (mut west, mut east) = ((first.lng, first.lng), (first.lng, first.lng));
        let mut offset = 0.0;
        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b.lng - a.lng > 180.0 {
                offset -= 360.0;
            } else if b.lng - a.lng < -180.0 {
                offset += 360.0;
            }
            let unwrapped = b.lng + offset;
            if unwrapped < west.0 {
                west = (unwrapped, b.lng);
            }
            if unwrapped > east.0 {
                east = (unwrapped, b.lng);
            }
            min.lat = min.lat.min(b.lat);
            max.lat = max.lat.max(b.lat);
        }

        if east.0 - west.0 >= 360.0 {
            min.lng = -180.0;
            max.lng = 180.0;
        } else {
            min.lng = west.1;
            max.lng = east.1;
        }
        Bounds { min, max }
    }

    /// Position at `fraction` of the total arc length.
    ///
    /// `0` returns the first point and `1` the last point exactly; values in
    /// between interpolate linearly inside the segment that contains the
    /// target distance.
    pub fn position_at(&self, fraction: f64) -> Result<LngLat> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(FlightError::invalid_argument(format!(
                "fraction {fraction} outside [0, 1]"
            )));
        }
        if fraction == 0.0 {
            return Ok(self.first());
        }
        if fraction == 1.0 {
            return Ok(self.last());
        }

        let total = self.length();
        if total <= 0.0 {
            return Ok(self.first());
        }

        let target = fraction * total;
        // First index whose cumulative distance reaches the target; zero-length
        // segments are skipped because their start already reaches it.
        let end = self
            .cumulative_km
            .partition_point(|&d| d < target)
            .clamp(1, self.points.len() - 1);
        let start = end - 1;

        let seg_start = self.cumulative_km[start];
        let seg_len = self.cumulative_km[end] - seg_start;
        let a = self.points[start];
        let b = self.points[end];
        if seg_len <= 0.0 {
            return Ok(b);
        }

        let ratio = ((target - seg_start) / seg_len).clamp(0.0, 1.0);
        // Segment lengths are great-circle distances, which cross the
        // antimeridian the short way; longitude has to follow.
        let lng = if (b.lng - a.lng).abs() > 180.0 {
            lerp_longitude(a.lng, b.lng, ratio)
        } else {
            interpolate_within(a.lng, b.lng, ratio)
        };
        Ok(LngLat {
            lng,
            lat: interpolate_within(a.lat, b.lat, ratio),
        })
    }

    /// Follow duration proportional to route length: 0.5 s per km, kept within 3-30 s.
    pub fn suggested_duration(&self) -> Duration {
        let ms = (self.length() * MS_PER_KM).clamp(MIN_SUGGESTED_MS, MAX_SUGGESTED_MS);
        Duration::from_millis(ms.round() as u64)
    }
}

/// Linear interpolation that never rounds past either endpoint.
fn interpolate_within(a: f64, b: f64, ratio: f64) -> f64 {
    (a + (b - a) * ratio).clamp(a.min(b), a.max(b))
}

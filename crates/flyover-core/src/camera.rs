//! Camera pose value type and zoom/altitude conversion.

use serde::{Deserialize, Serialize};

use crate::error::{FlightError, Result};
use crate::spatial::{normalize_bearing, LngLat};

/// Ground resolution at zoom 0 on the equator, meters per 256px tile pixel.
const METERS_PER_PIXEL_Z0: f64 = 156_543.033_92;
/// Viewport-height factor turning ground resolution into a camera distance
/// (512px viewport, ~37° vertical field of view).
const CAMERA_DISTANCE_PX: f64 = 768.0;

/// Pitch limits supported by the renderer, in degrees from straight down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchRange {
    pub min_deg: f64,
    pub max_deg: f64,
}

impl Default for PitchRange {
    fn default() -> Self {
        Self {
            min_deg: 0.0,
            max_deg: 85.0,
        }
    }
}

impl PitchRange {
    pub fn clamp(&self, pitch_deg: f64) -> f64 {
        pitch_deg.clamp(self.min_deg, self.max_deg)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.min_deg.is_finite() || !self.max_deg.is_finite() || self.min_deg > self.max_deg {
            return Err(FlightError::invalid_argument(format!(
                "pitch range [{}, {}] is not a valid interval",
                self.min_deg, self.max_deg
            )));
        }
        Ok(())
    }
}

/// A camera looking at `center` from `altitude_m` above it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub center: LngLat,
    /// Compass bearing in degrees, `[0, 360)`.
    pub bearing: f64,
    /// Tilt in degrees away from looking straight down.
    pub pitch: f64,
    pub altitude_m: f64,
}

impl CameraPose {
    /// Build a pose, normalizing bearing and clamping pitch into `range`.
    pub fn new(center: LngLat, bearing: f64, pitch: f64, altitude_m: f64, range: &PitchRange) -> Self {
        Self {
            center,
            bearing: normalize_bearing(bearing),
            pitch: range.clamp(pitch),
            altitude_m,
        }
    }

    /// Pose for a renderer that reports its view as a web-mercator zoom level.
    pub fn from_zoom(center: LngLat, zoom: f64, bearing: f64, pitch: f64, range: &PitchRange) -> Self {
        Self::new(center, bearing, pitch, altitude_for_zoom(zoom, center.lat), range)
    }

    pub fn zoom(&self) -> f64 {
        zoom_for_altitude(self.altitude_m, self.center.lat)
    }
}

/// Approximate camera altitude in meters for a zoom level at `lat`.
pub fn altitude_for_zoom(zoom: f64, lat: f64) -> f64 {
    let meters_per_px = METERS_PER_PIXEL_Z0 * lat.to_radians().cos().abs().max(0.01) / 2f64.powf(zoom);
    meters_per_px * CAMERA_DISTANCE_PX
}

/// Inverse of [`altitude_for_zoom`].
pub fn zoom_for_altitude(altitude_m: f64, lat: f64) -> f64 {
    let scale = METERS_PER_PIXEL_Z0 * lat.to_radians().cos().abs().max(0.01) * CAMERA_DISTANCE_PX;
    (scale / altitude_m.max(f64::MIN_POSITIVE)).log2()
}

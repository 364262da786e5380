//! Flight tuning: phase durations, camera targets and easing.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::camera::PitchRange;
use crate::easing::Easing;
use crate::error::{FlightError, Result};

/// Configuration for a flight controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// Hold before the fly-in starts, letting the caller finish renderer setup
    pub pre_roll_ms: u64,
    /// Hold after the follow phase before the flight reports success
    pub settle_ms: u64,
    /// Pitch limits of the renderer
    pub pitch_range: PitchRange,
    pub fly_in: FlyInParams,
    pub follow: FollowParams,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            pre_roll_ms: 1_000,
            settle_ms: 3_000,
            pitch_range: PitchRange::default(),
            fly_in: FlyInParams::default(),
            follow: FollowParams::default(),
        }
    }
}

impl FlightConfig {
    pub fn pre_roll(&self) -> Duration {
        Duration::from_millis(self.pre_roll_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn validate(&self) -> Result<()> {
        self.pitch_range.validate()?;
        self.fly_in.validate()?;
        self.follow.validate()
    }
}

/// Establishing shot from the current view down onto the route start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyInParams {
    pub duration_ms: u64,
    /// Starting altitude; `None` keeps the renderer's current altitude
    pub start_altitude_m: Option<f64>,
    pub end_altitude_m: f64,
    /// Starting bearing; `None` keeps the renderer's current bearing
    pub start_bearing_deg: Option<f64>,
    pub end_bearing_deg: f64,
    /// Starting pitch; `None` keeps the renderer's current pitch
    pub start_pitch_deg: Option<f64>,
    pub end_pitch_deg: f64,
    pub easing: Easing,
}

impl Default for FlyInParams {
    fn default() -> Self {
        Self {
            duration_ms: 6_000,
            start_altitude_m: None,
            end_altitude_m: 8_000.0,
            start_bearing_deg: None,
            end_bearing_deg: -20.0,
            start_pitch_deg: None,
            end_pitch_deg: 50.0,
            easing: Easing::Linear,
        }
    }
}

impl FlyInParams {
    /// Dive from orbit: starts 1 000 km up, facing north, tilted 40°.
    pub fn establishing() -> Self {
        Self::default().starting_in_orbit()
    }

    /// Replace the start values with the orbit preset, keeping duration,
    /// end pose and easing.
    pub fn starting_in_orbit(mut self) -> Self {
        self.start_altitude_m = Some(1_000_000.0);
        self.start_bearing_deg = Some(0.0);
        self.start_pitch_deg = Some(40.0);
        self
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(altitude) = self.start_altitude_m {
            check_altitude("fly-in start altitude", altitude)?;
        }
        check_altitude("fly-in end altitude", self.end_altitude_m)?;
        if let Some(bearing) = self.start_bearing_deg {
            check_angle("fly-in start bearing", bearing)?;
        }
        check_angle("fly-in end bearing", self.end_bearing_deg)?;
        if let Some(pitch) = self.start_pitch_deg {
            check_angle("fly-in start pitch", pitch)?;
        }
        check_angle("fly-in end pitch", self.end_pitch_deg)
    }
}

/// How the camera bearing evolves while following the route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "deg")]
pub enum FollowBearing {
    /// Keep the bearing reached at the end of the fly-in.
    Hold,
    /// Turn along the shorter arc toward a target bearing by the end of the route.
    RampTo(f64),
}

/// Camera behavior while camera and marker traverse the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowParams {
    /// Used when a play request carries no duration
    pub default_duration_ms: u64,
    pub bearing: FollowBearing,
    /// Pitch reached at the route end; `None` holds the fly-in pitch
    pub end_pitch_deg: Option<f64>,
    pub easing: Easing,
}

impl Default for FollowParams {
    fn default() -> Self {
        Self {
            default_duration_ms: 20_000,
            bearing: FollowBearing::Hold,
            end_pitch_deg: None,
            easing: Easing::Linear,
        }
    }
}

impl FollowParams {
    pub fn default_duration(&self) -> Duration {
        Duration::from_millis(self.default_duration_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_duration_ms == 0 {
            return Err(FlightError::invalid_argument(
                "default follow duration must be positive",
            ));
        }
        if let FollowBearing::RampTo(bearing) = self.bearing {
            check_angle("follow target bearing", bearing)?;
        }
        if let Some(pitch) = self.end_pitch_deg {
            check_angle("follow end pitch", pitch)?;
        }
        Ok(())
    }
}

fn check_altitude(what: &str, altitude_m: f64) -> Result<()> {
    if !altitude_m.is_finite() || altitude_m <= 0.0 {
        return Err(FlightError::invalid_argument(format!(
            "{what} must be a positive number of meters, got {altitude_m}"
        )));
    }
    Ok(())
}

fn check_angle(what: &str, deg: f64) -> Result<()> {
    if !deg.is_finite() {
        return Err(FlightError::invalid_argument(format!(
            "{what} must be finite, got {deg}"
        )));
    }
    Ok(())
}

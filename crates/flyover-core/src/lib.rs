//! Flyover core: camera and marker animation along a route.
//!
//! Given a [`GeoPath`] and a duration, a [`CameraFlightController`] dives the
//! camera onto the route start and then follows the route to its end, moving
//! a marker in lockstep. Time comes from a [`FrameScheduler`], so the same
//! flight runs against a paint loop, a fixed-rate timer or a virtual clock.

pub mod camera;
pub mod config;
pub mod controller;
pub mod easing;
pub mod error;
pub mod geo_path;
pub mod geojson;
pub mod marker;
pub mod phase;
pub mod renderer;
pub mod scheduler;
pub mod spatial;

pub use camera::{CameraPose, PitchRange};
pub use config::{FlightConfig, FlyInParams, FollowBearing, FollowParams};
pub use controller::{CameraFlightController, FlightHandle, FlightOutcome, FlightState, PlayRequest};
pub use easing::Easing;
pub use error::{FlightError, RendererError};
pub use geo_path::GeoPath;
pub use geojson::path_from_geojson_str;
pub use marker::MarkerSynchronizer;
pub use phase::{Phase, PhaseOutcome, PhaseRunner, PhaseTick};
pub use renderer::{MapRenderer, MarkerHandle};
pub use scheduler::{CancelToken, FrameScheduler, IntervalScheduler, SteppedScheduler};
pub use spatial::{haversine_distance, LngLat};

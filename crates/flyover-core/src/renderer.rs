//! Interfaces to the rendering surface that paints camera poses and markers.

use crate::camera::CameraPose;
use crate::error::RendererError;
use crate::spatial::LngLat;

/// The map surface a flight drives.
///
/// Both calls are expected to return promptly; the animation core never
/// waits on the renderer between frames.
pub trait MapRenderer: Send + Sync {
    /// Apply a camera pose. Last write within a frame wins.
    fn set_camera(&self, pose: &CameraPose) -> Result<(), RendererError>;

    /// Current camera, used as the starting pose of a fly-in.
    fn current_camera(&self) -> Result<CameraPose, RendererError>;
}

/// A movable marker owned by the renderer.
///
/// The animation core only moves markers; whoever created the marker removes it.
pub trait MarkerHandle: Send + Sync {
    fn move_to(&self, position: LngLat) -> Result<(), RendererError>;

    fn remove(&self);
}

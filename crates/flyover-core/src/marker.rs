//! Keeps the route marker on the same path position as the camera.

use std::sync::Arc;

use crate::error::Result;
use crate::geo_path::GeoPath;
use crate::renderer::MarkerHandle;
use crate::spatial::LngLat;

/// Moves a marker along a path using the progress values of the follow phase.
///
/// The synchronizer has no clock of its own. The follow phase hands it the
/// exact progress value of each tick, and the returned position is the one
/// the camera is centered on for that tick.
pub struct MarkerSynchronizer {
    path: Arc<GeoPath>,
    marker: Option<Arc<dyn MarkerHandle>>,
    last: Option<(f64, LngLat)>,
}

impl MarkerSynchronizer {
    pub fn new(path: Arc<GeoPath>, marker: Option<Arc<dyn MarkerHandle>>) -> Self {
        Self {
            path,
            marker,
            last: None,
        }
    }

    /// Resolve `progress` on the path, move the marker there and return the position.
    pub fn follow(&mut self, progress: f64) -> Result<LngLat> {
        let position = self.path.position_at(progress)?;
        if let Some(marker) = &self.marker {
            marker.move_to(position)?;
        }
        self.last = Some((progress, position));
        Ok(position)
    }

    /// Progress and position of the most recent tick.
    pub fn last(&self) -> Option<(f64, LngLat)> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FlightError, RendererError};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMarker {
        moves: Mutex<Vec<LngLat>>,
    }

    impl MarkerHandle for RecordingMarker {
        fn move_to(&self, position: LngLat) -> Result<(), RendererError> {
            self.moves.lock().unwrap().push(position);
            Ok(())
        }

        fn remove(&self) {}
    }

    struct DetachedMarker;

    impl MarkerHandle for DetachedMarker {
        fn move_to(&self, _position: LngLat) -> Result<(), RendererError> {
            Err(RendererError::Surface("marker removed".into()))
        }

        fn remove(&self) {}
    }

    fn straight_path() -> Arc<GeoPath> {
        Arc::new(GeoPath::from_coordinates(&[[0.0, 0.0], [0.0, 1.0]]).unwrap())
    }

    #[test]
    fn moves_marker_to_path_position() {
        let marker = Arc::new(RecordingMarker::default());
        let mut sync = MarkerSynchronizer::new(straight_path(), Some(marker.clone()));

        let position = sync.follow(0.5).unwrap();
        assert_eq!(position, LngLat::new(0.0, 0.5));
        assert_eq!(sync.last(), Some((0.5, LngLat::new(0.0, 0.5))));
        assert_eq!(*marker.moves.lock().unwrap(), vec![LngLat::new(0.0, 0.5)]);
    }

    #[test]
    fn works_without_a_marker() {
        let mut sync = MarkerSynchronizer::new(straight_path(), None);
        assert_eq!(sync.follow(1.0).unwrap(), LngLat::new(0.0, 1.0));
    }

    #[test]
    fn propagates_marker_failures() {
        let mut sync = MarkerSynchronizer::new(straight_path(), Some(Arc::new(DetachedMarker)));
        assert!(matches!(sync.follow(0.2), Err(FlightError::Renderer(_))));
        assert_eq!(sync.last(), None);
    }

    #[test]
    fn rejects_out_of_range_progress() {
        let mut sync = MarkerSynchronizer::new(straight_path(), None);
        assert!(matches!(sync.follow(1.5), Err(FlightError::InvalidArgument(_))));
    }
}

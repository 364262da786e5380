//! Headless renderer that logs camera poses and optionally records them.
//!
//! Recordings are newline-delimited JSON, one record per camera or marker
//! update, so a flight can be replayed or plotted after the fact.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use flyover_core::{CameraPose, LngLat, MapRenderer, MarkerHandle, RendererError};
use serde::Serialize;

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record<'a> {
    Camera { frame: u64, pose: &'a CameraPose },
    Marker { frame: u64, position: LngLat },
}

type Sink = Mutex<Box<dyn Write + Send>>;

/// A [`MapRenderer`] with no surface: it holds the camera in memory.
pub struct TraceRenderer {
    camera: Mutex<CameraPose>,
    frames: AtomicU64,
    sink: Option<Arc<Sink>>,
}

impl TraceRenderer {
    pub fn new(initial: CameraPose) -> Self {
        Self {
            camera: Mutex::new(initial),
            frames: AtomicU64::new(0),
            sink: None,
        }
    }

    /// Record every update as NDJSON into `sink`.
    pub fn with_recording(mut self, sink: impl Write + Send + 'static) -> Self {
        self.sink = Some(Arc::new(Mutex::new(Box::new(sink))));
        self
    }

    /// Number of camera poses applied so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// A marker that records into the same sink as this renderer.
    pub fn marker(&self) -> TraceMarker {
        TraceMarker {
            position: Mutex::new(None),
            moves: AtomicU64::new(0),
            sink: self.sink.clone(),
        }
    }

    /// Flush any pending recording output.
    pub fn flush(&self) -> Result<(), RendererError> {
        if let Some(sink) = &self.sink {
            lock(sink)?.flush().map_err(surface)?;
        }
        Ok(())
    }
}

impl MapRenderer for TraceRenderer {
    fn set_camera(&self, pose: &CameraPose) -> Result<(), RendererError> {
        let frame = self.frames.fetch_add(1, Ordering::Relaxed);
        *lock(&self.camera)? = *pose;

        tracing::trace!(
            "frame {} camera ({:.6}, {:.6}) bearing {:.1} pitch {:.1} alt {:.0}m (zoom {:.2})",
            frame,
            pose.center.lng,
            pose.center.lat,
            pose.bearing,
            pose.pitch,
            pose.altitude_m,
            pose.zoom()
        );
        record(self.sink.as_deref(), &Record::Camera { frame, pose })
    }

    fn current_camera(&self) -> Result<CameraPose, RendererError> {
        Ok(*lock(&self.camera)?)
    }
}

/// Marker companion of [`TraceRenderer`].
pub struct TraceMarker {
    position: Mutex<Option<LngLat>>,
    moves: AtomicU64,
    sink: Option<Arc<Sink>>,
}

impl TraceMarker {
    pub fn position(&self) -> Option<LngLat> {
        self.position.lock().ok().and_then(|p| *p)
    }

    pub fn moves(&self) -> u64 {
        self.moves.load(Ordering::Relaxed)
    }
}

impl MarkerHandle for TraceMarker {
    fn move_to(&self, position: LngLat) -> Result<(), RendererError> {
        let frame = self.moves.fetch_add(1, Ordering::Relaxed);
        *lock(&self.position)? = Some(position);
        record(self.sink.as_deref(), &Record::Marker { frame, position })
    }

    fn remove(&self) {
        if let Ok(mut position) = self.position.lock() {
            if let Some(last) = position.take() {
                tracing::debug!("Marker removed at ({:.6}, {:.6})", last.lng, last.lat);
            }
        }
    }
}

fn record(sink: Option<&Sink>, record: &Record<'_>) -> Result<(), RendererError> {
    let Some(sink) = sink else {
        return Ok(());
    };
    let line = serde_json::to_string(record).map_err(surface)?;
    writeln!(lock(sink)?, "{line}").map_err(surface)
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, RendererError> {
    mutex
        .lock()
        .map_err(|_| RendererError::Surface("renderer state poisoned".into()))
}

fn surface(err: impl std::fmt::Display) -> RendererError {
    RendererError::Surface(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flyover_core::PitchRange;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn pose(lng: f64) -> CameraPose {
        CameraPose::new(LngLat::new(lng, 0.0), 0.0, 40.0, 8_000.0, &PitchRange::default())
    }

    #[test]
    fn test_camera_is_held_and_counted() {
        let renderer = TraceRenderer::new(pose(0.0));
        assert_eq!(renderer.current_camera().unwrap(), pose(0.0));

        renderer.set_camera(&pose(1.0)).unwrap();
        renderer.set_camera(&pose(2.0)).unwrap();
        assert_eq!(renderer.current_camera().unwrap(), pose(2.0));
        assert_eq!(renderer.frames(), 2);
    }

    #[test]
    fn test_recording_writes_ndjson() {
        let buf = SharedBuf::default();
        let renderer = TraceRenderer::new(pose(0.0)).with_recording(buf.clone());
        let marker = renderer.marker();

        renderer.set_camera(&pose(1.0)).unwrap();
        marker.move_to(LngLat::new(1.0, 0.0)).unwrap();
        renderer.flush().unwrap();

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["kind"], "camera");
        assert_eq!(lines[0]["pose"]["center"]["lng"], 1.0);
        assert_eq!(lines[1]["kind"], "marker");
        assert_eq!(lines[1]["position"]["lng"], 1.0);
    }

    #[test]
    fn test_marker_remove_clears_position() {
        let renderer = TraceRenderer::new(pose(0.0));
        let marker = renderer.marker();
        marker.move_to(LngLat::new(3.0, 4.0)).unwrap();
        assert_eq!(marker.position(), Some(LngLat::new(3.0, 4.0)));

        marker.remove();
        assert_eq!(marker.position(), None);
        assert_eq!(marker.moves(), 1);
    }
}

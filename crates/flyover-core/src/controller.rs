//! Two-phase camera flight over a route.
//!
//! A flight is an explicit state machine:
//!
//! ```text
//! Idle -> FlyIn -> Follow -> Settling -> Done
//!           \________\__________\______-> Cancelled
//! ```
//!
//! `FlyIn` covers the pre-roll hold and the establishing dive onto the route
//! start. `Follow` moves camera and marker along the route. `Settling` holds
//! the final frame before the flight reports success. Each `play` call owns
//! one session task; a controller runs at most one session at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::camera::{CameraPose, PitchRange};
use crate::config::{FlightConfig, FlyInParams, FollowBearing, FollowParams};
use crate::error::{FlightError, Result};
use crate::geo_path::GeoPath;
use crate::marker::MarkerSynchronizer;
use crate::phase::{Phase, PhaseOutcome, PhaseRunner};
use crate::renderer::{MapRenderer, MarkerHandle};
use crate::scheduler::{CancelToken, FrameScheduler};
use crate::spatial::{lerp, lerp_bearing, lerp_longitude, LngLat};

/// Lifecycle state of a flight session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    Idle,
    FlyIn,
    Follow,
    Settling,
    Done,
    Cancelled,
}

impl FlightState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FlightState::Done | FlightState::Cancelled)
    }
}

/// How a flight ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightOutcome {
    /// Follow phase and settle delay both ran to completion.
    Finished,
    /// The caller (or a newer `play`) cancelled the flight.
    Cancelled,
}

/// Everything needed to fly one route.
pub struct PlayRequest {
    pub path: GeoPath,
    /// Follow phase duration; `None` uses the configured default.
    pub total_duration: Option<Duration>,
    /// Overrides the configured fly-in for this flight.
    pub fly_in: Option<FlyInParams>,
    pub marker: Option<Arc<dyn MarkerHandle>>,
}

impl PlayRequest {
    pub fn new(path: GeoPath) -> Self {
        Self {
            path,
            total_duration: None,
            fly_in: None,
            marker: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = Some(duration);
        self
    }

    pub fn with_fly_in(mut self, fly_in: FlyInParams) -> Self {
        self.fly_in = Some(fly_in);
        self
    }

    pub fn with_marker(mut self, marker: Arc<dyn MarkerHandle>) -> Self {
        self.marker = Some(marker);
        self
    }
}

/// Caller's view of a running flight.
///
/// Dropping the handle does not stop the flight.
pub struct FlightHandle {
    id: u64,
    cancel: CancelToken,
    state: watch::Receiver<FlightState>,
    outcome: oneshot::Receiver<Result<FlightOutcome>>,
}

impl FlightHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop the flight at its next frame. Idempotent; a no-op once it has ended.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> FlightState {
        *self.state.borrow()
    }

    /// A token that cancels this flight, for use from other tasks.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the flight to end.
    ///
    /// Renderer failures surface here as errors; the session is then in
    /// [`FlightState::Cancelled`].
    pub async fn finished(self) -> Result<FlightOutcome> {
        self.outcome.await.unwrap_or(Err(FlightError::SessionAborted))
    }
}

struct ActiveSession {
    id: u64,
    cancel: CancelToken,
    state: watch::Receiver<FlightState>,
    task: JoinHandle<()>,
}

/// Plays camera flights on one renderer, one session at a time.
///
/// `play` spawns the session on the current tokio runtime. Each session gets
/// its own clone of the scheduler.
pub struct CameraFlightController<S: FrameScheduler + Clone> {
    renderer: Arc<dyn MapRenderer>,
    scheduler: S,
    config: FlightConfig,
    next_id: u64,
    active: Option<ActiveSession>,
}

impl<S: FrameScheduler + Clone> CameraFlightController<S> {
    pub fn new(renderer: Arc<dyn MapRenderer>, scheduler: S, config: FlightConfig) -> Self {
        Self {
            renderer,
            scheduler,
            config,
            next_id: 0,
            active: None,
        }
    }

    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    /// State of the active session; `Idle` when none is running.
    pub fn state(&self) -> FlightState {
        match &self.active {
            Some(active) => {
                let state = *active.state.borrow();
                if state.is_terminal() {
                    FlightState::Idle
                } else {
                    state
                }
            }
            None => FlightState::Idle,
        }
    }

    /// Cancel the active session. Returns whether a running flight was stopped.
    pub fn cancel(&mut self) -> bool {
        self.stop_active().is_some_and(|(running, _)| running)
    }

    /// Cancel the active session and hand back its task, which may still be
    /// finishing a frame.
    fn stop_active(&mut self) -> Option<(bool, JoinHandle<()>)> {
        let active = self.active.take()?;
        let running = !active.state.borrow().is_terminal();
        active.cancel.cancel();
        if running {
            tracing::info!("Flight {} cancelled by controller", active.id);
        }
        Some((running, active.task))
    }

    /// Start flying `request`, replacing any flight still in progress.
    ///
    /// Arguments are checked before anything else happens; on error the
    /// previous flight keeps running. A replaced flight is cancelled at once,
    /// and the new flight makes no renderer call until the old task has
    /// exited. Must be called within a tokio runtime.
    pub fn play(&mut self, request: PlayRequest) -> Result<FlightHandle> {
        self.config.validate()?;
        let fly_in = request
            .fly_in
            .unwrap_or_else(|| self.config.fly_in.clone());
        fly_in.validate()?;
        let follow_duration = match request.total_duration {
            Some(duration) if duration.is_zero() => {
                return Err(FlightError::invalid_argument(
                    "total duration must be positive",
                ));
            }
            Some(duration) => duration,
            None => self.config.follow.default_duration(),
        };

        // The new session waits for this task before touching the renderer.
        let previous = self.stop_active().map(|(_, task)| task);

        self.next_id += 1;
        let id = self.next_id;
        let cancel = CancelToken::new();
        let (state_tx, state_rx) = watch::channel(FlightState::FlyIn);
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let path = Arc::new(request.path);
        tracing::info!(
            "Flight {} starting: {} points, {:.2} km, follow {:?}",
            id,
            path.points().len(),
            path.length(),
            follow_duration
        );

        let session = Session {
            id,
            renderer: self.renderer.clone(),
            scheduler: self.scheduler.clone(),
            config: self.config.clone(),
            fly_in,
            follow_duration,
            path: path.clone(),
            markers: MarkerSynchronizer::new(path, request.marker),
            cancel: cancel.clone(),
            state: state_tx,
            previous,
        };
        let task = tokio::spawn(async move {
            let result = session.run().await;
            // The handle may already be gone.
            let _ = outcome_tx.send(result);
        });

        self.active = Some(ActiveSession {
            id,
            cancel: cancel.clone(),
            state: state_rx.clone(),
            task,
        });

        Ok(FlightHandle {
            id,
            cancel,
            state: state_rx,
            outcome: outcome_rx,
        })
    }
}

impl<S: FrameScheduler + Clone> Drop for CameraFlightController<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// State owned by one `play` invocation.
struct Session<S: FrameScheduler> {
    id: u64,
    renderer: Arc<dyn MapRenderer>,
    scheduler: S,
    config: FlightConfig,
    fly_in: FlyInParams,
    follow_duration: Duration,
    path: Arc<GeoPath>,
    markers: MarkerSynchronizer,
    cancel: CancelToken,
    state: watch::Sender<FlightState>,
    /// Task of the session this one replaced.
    previous: Option<JoinHandle<()>>,
}

impl<S: FrameScheduler> Session<S> {
    async fn run(mut self) -> Result<FlightOutcome> {
        let result = self.fly().await;
        // Route progress the marker reached, 0 when the follow phase never ran.
        let (progress, position) = self
            .markers
            .last()
            .unwrap_or((0.0, self.path.first()));
        match &result {
            Ok(FlightOutcome::Finished) => {
                tracing::info!(
                    "Flight {} finished at ({:.6}, {:.6})",
                    self.id,
                    position.lng,
                    position.lat
                );
                self.enter(FlightState::Done);
            }
            Ok(FlightOutcome::Cancelled) => {
                tracing::info!(
                    "Flight {} cancelled at {:.0}% of the route",
                    self.id,
                    progress * 100.0
                );
                self.enter(FlightState::Cancelled);
            }
            Err(e) => {
                tracing::warn!(
                    "Flight {} aborted at {:.0}% of the route: {}",
                    self.id,
                    progress * 100.0,
                    e
                );
                self.enter(FlightState::Cancelled);
            }
        }
        result
    }

    async fn fly(&mut self) -> Result<FlightOutcome> {
        self.enter(FlightState::FlyIn);
        if let Some(previous) = self.previous.take() {
            tracing::debug!("Flight {} waiting for the previous flight to stop", self.id);
            // A panicked predecessor has stopped too.
            let _ = previous.await;
        }
        if self.hold(self.config.pre_roll()).await?.is_cancelled() {
            return Ok(FlightOutcome::Cancelled);
        }

        let current = self.renderer.current_camera()?;
        let target = self.path.position_at(0.0)?;
        let fly_in = FlyInPlan::new(&current, target, &self.fly_in, self.config.pitch_range)?;
        let mut reached = fly_in.from;

        let renderer = &self.renderer;
        let outcome = PhaseRunner::new(&mut self.scheduler, &self.cancel)
            .run(&fly_in.phase, |tick| {
                let pose = fly_in.pose_at(tick.progress);
                renderer.set_camera(&pose)?;
                reached = pose;
                Ok(())
            })
            .await?;
        if outcome.is_cancelled() {
            return Ok(FlightOutcome::Cancelled);
        }

        self.enter(FlightState::Follow);
        let follow = FollowPlan::new(
            &reached,
            &self.config.follow,
            self.follow_duration,
            self.config.pitch_range,
        );
        let renderer = &self.renderer;
        let markers = &mut self.markers;
        let outcome = PhaseRunner::new(&mut self.scheduler, &self.cancel)
            .run(&follow.phase, |tick| {
                let position = markers.follow(tick.progress)?;
                renderer.set_camera(&follow.pose_at(position, tick.progress))?;
                Ok(())
            })
            .await?;
        if outcome.is_cancelled() {
            return Ok(FlightOutcome::Cancelled);
        }

        self.enter(FlightState::Settling);
        if self.hold(self.config.settle()).await?.is_cancelled() {
            return Ok(FlightOutcome::Cancelled);
        }
        Ok(FlightOutcome::Finished)
    }

    async fn hold(&mut self, duration: Duration) -> Result<PhaseOutcome> {
        PhaseRunner::new(&mut self.scheduler, &self.cancel)
            .run(&Phase::hold(duration), |_| Ok(()))
            .await
    }

    fn enter(&self, state: FlightState) {
        tracing::debug!("Flight {} entering {:?}", self.id, state);
        self.state.send_replace(state);
    }
}

/// Interpolation from the current view down onto the route start.
struct FlyInPlan {
    phase: Phase,
    from: CameraPose,
    to: CameraPose,
    range: PitchRange,
}

impl FlyInPlan {
    fn new(current: &CameraPose, target: LngLat, params: &FlyInParams, range: PitchRange) -> Result<Self> {
        let altitude = params.start_altitude_m.unwrap_or(current.altitude_m);
        let bearing = params.start_bearing_deg.unwrap_or(current.bearing);
        let pitch = params.start_pitch_deg.unwrap_or(current.pitch);
        if !current.center.is_valid()
            || !altitude.is_finite()
            || altitude <= 0.0
            || !bearing.is_finite()
            || !pitch.is_finite()
        {
            return Err(FlightError::invalid_argument(format!(
                "cannot fly in from camera {current:?}"
            )));
        }

        Ok(Self {
            phase: Phase::new(params.duration(), params.easing),
            from: CameraPose::new(current.center, bearing, pitch, altitude, &range),
            to: CameraPose::new(
                target,
                params.end_bearing_deg,
                params.end_pitch_deg,
                params.end_altitude_m,
                &range,
            ),
            range,
        })
    }

    fn pose_at(&self, t: f64) -> CameraPose {
        let center = LngLat::new(
            lerp_longitude(self.from.center.lng, self.to.center.lng, t),
            lerp(self.from.center.lat, self.to.center.lat, t),
        );
        CameraPose::new(
            center,
            lerp_bearing(self.from.bearing, self.to.bearing, t),
            lerp(self.from.pitch, self.to.pitch, t),
            lerp(self.from.altitude_m, self.to.altitude_m, t),
            &self.range,
        )
    }
}

/// Camera that rides along the route at the altitude the fly-in ended at.
struct FollowPlan {
    phase: Phase,
    start: CameraPose,
    bearing: FollowBearing,
    end_pitch: f64,
    range: PitchRange,
}

impl FollowPlan {
    fn new(start: &CameraPose, params: &FollowParams, duration: Duration, range: PitchRange) -> Self {
        Self {
            phase: Phase::new(duration, params.easing),
            start: *start,
            bearing: params.bearing,
            end_pitch: params.end_pitch_deg.unwrap_or(start.pitch),
            range,
        }
    }

    fn pose_at(&self, position: LngLat, t: f64) -> CameraPose {
        let bearing = match self.bearing {
            FollowBearing::Hold => self.start.bearing,
            FollowBearing::RampTo(target) => lerp_bearing(self.start.bearing, target, t),
        };
        CameraPose::new(
            position,
            bearing,
            lerp(self.start.pitch, self.end_pitch, t),
            self.start.altitude_m,
            &self.range,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> PitchRange {
        PitchRange::default()
    }

    #[test]
    fn fly_in_plan_uses_overrides_and_current_camera() {
        let current = CameraPose::new(LngLat::new(10.0, 10.0), 90.0, 30.0, 50_000.0, &range());
        let params = FlyInParams {
            start_altitude_m: Some(200_000.0),
            ..FlyInParams::default()
        };
        let plan = FlyInPlan::new(&current, LngLat::new(11.0, 12.0), &params, range()).unwrap();

        let start = plan.pose_at(0.0);
        assert_eq!(start.center, LngLat::new(10.0, 10.0));
        assert_eq!(start.altitude_m, 200_000.0);
        assert_eq!(start.bearing, 90.0);
        assert_eq!(start.pitch, 30.0);

        let end = plan.pose_at(1.0);
        assert_eq!(end.center, LngLat::new(11.0, 12.0));
        assert_eq!(end.altitude_m, 8_000.0);
        assert_eq!(end.bearing, 340.0);
        assert_eq!(end.pitch, 50.0);
    }

    #[test]
    fn fly_in_rejects_unusable_camera() {
        let current = CameraPose {
            center: LngLat::new(0.0, 0.0),
            bearing: 0.0,
            pitch: 0.0,
            altitude_m: 0.0,
        };
        let result = FlyInPlan::new(&current, LngLat::new(1.0, 1.0), &FlyInParams::default(), range());
        assert!(matches!(result, Err(FlightError::InvalidArgument(_))));
    }

    #[test]
    fn follow_plan_holds_altitude_and_ramps_bearing() {
        let start = CameraPose::new(LngLat::new(0.0, 0.0), 350.0, 50.0, 8_000.0, &range());
        let params = FollowParams {
            bearing: FollowBearing::RampTo(30.0),
            end_pitch_deg: Some(60.0),
            ..FollowParams::default()
        };
        let plan = FollowPlan::new(&start, &params, Duration::from_secs(1), range());

        let first = plan.pose_at(LngLat::new(0.0, 0.0), 0.0);
        assert_eq!(first.bearing, 350.0);
        assert_eq!(first.pitch, 50.0);

        let mid = plan.pose_at(LngLat::new(0.0, 0.5), 0.5);
        assert!((mid.bearing - 10.0).abs() < 1e-9, "got {}", mid.bearing);
        assert_eq!(mid.pitch, 55.0);
        assert_eq!(mid.altitude_m, 8_000.0);
        assert_eq!(mid.center, LngLat::new(0.0, 0.5));

        let last = plan.pose_at(LngLat::new(0.0, 1.0), 1.0);
        assert_eq!(last.bearing, 30.0);
        assert_eq!(last.pitch, 60.0);
    }

    #[test]
    fn terminal_states() {
        assert!(FlightState::Done.is_terminal());
        assert!(FlightState::Cancelled.is_terminal());
        assert!(!FlightState::Follow.is_terminal());
        assert!(!FlightState::Idle.is_terminal());
    }
}

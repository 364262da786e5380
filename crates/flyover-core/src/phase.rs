//! Single timed interpolation phase driven one tick per frame.

use std::time::Duration;

use crate::easing::Easing;
use crate::error::Result;
use crate::scheduler::{CancelToken, FrameScheduler};

/// Duration and easing of one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Phase {
    pub duration: Duration,
    pub easing: Easing,
}

impl Phase {
    pub fn new(duration: Duration, easing: Easing) -> Self {
        Self { duration, easing }
    }

    /// A phase whose only purpose is to let time pass (pre-roll, settle).
    pub fn hold(duration: Duration) -> Self {
        Self::new(duration, Easing::Linear)
    }
}

/// Progress handed to the tick callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseTick {
    /// Elapsed share of the duration, clamped to `[0, 1]`.
    pub raw: f64,
    /// `raw` after easing; the value interpolation should use.
    pub progress: f64,
    pub elapsed: Duration,
}

/// How a phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    Completed,
    Cancelled,
}

impl PhaseOutcome {
    pub fn is_cancelled(self) -> bool {
        self == PhaseOutcome::Cancelled
    }
}

/// Runs one phase on a scheduler, honoring a cancellation token.
pub struct PhaseRunner<'a, S: FrameScheduler> {
    scheduler: &'a mut S,
    cancel: &'a CancelToken,
}

impl<'a, S: FrameScheduler> PhaseRunner<'a, S> {
    pub fn new(scheduler: &'a mut S, cancel: &'a CancelToken) -> Self {
        Self { scheduler, cancel }
    }

    /// Drive `phase` to completion, calling `on_tick` once per frame.
    ///
    /// The first frame defines the phase start, so the first tick reports
    /// zero progress unless the duration is zero, in which case that single
    /// tick reports `1.0` and the phase completes. Returns
    /// [`PhaseOutcome::Completed`] after the tick that reaches `raw == 1`.
    /// Once the token is cancelled no further tick runs and the phase never
    /// reports completion. An error from `on_tick` ends the phase.
    pub async fn run<F>(&mut self, phase: &Phase, mut on_tick: F) -> Result<PhaseOutcome>
    where
        F: FnMut(PhaseTick) -> Result<()>,
    {
        let mut started_at: Option<Duration> = None;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(PhaseOutcome::Cancelled);
            }

            let now = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(PhaseOutcome::Cancelled),
                now = self.scheduler.next_frame() => now,
            };

            let start = *started_at.get_or_insert(now);
            let elapsed = now.saturating_sub(start);
            let raw = if phase.duration.is_zero() {
                1.0
            } else {
                (elapsed.as_secs_f64() / phase.duration.as_secs_f64()).clamp(0.0, 1.0)
            };

            on_tick(PhaseTick {
                raw,
                progress: phase.easing.apply(raw),
                elapsed,
            })?;

            if self.cancel.is_cancelled() {
                return Ok(PhaseOutcome::Cancelled);
            }
            if raw >= 1.0 {
                return Ok(PhaseOutcome::Completed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlightError;
    use crate::scheduler::{IntervalScheduler, SteppedScheduler};

    fn stepped() -> SteppedScheduler {
        SteppedScheduler::new(Duration::from_millis(16))
    }

    #[tokio::test]
    async fn raw_fraction_is_non_decreasing_and_completes_once() {
        let mut scheduler = stepped();
        let cancel = CancelToken::new();
        let phase = Phase::new(Duration::from_millis(500), Easing::EaseInOutCubic);

        let mut ticks = Vec::new();
        let outcome = PhaseRunner::new(&mut scheduler, &cancel)
            .run(&phase, |tick| {
                ticks.push(tick);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(outcome, PhaseOutcome::Completed);
        assert_eq!(ticks.first().map(|t| t.raw), Some(0.0));
        assert!(ticks.windows(2).all(|w| w[1].raw >= w[0].raw));
        assert!(ticks.windows(2).all(|w| w[1].progress >= w[0].progress));
        // Exactly one tick reaches the end.
        assert_eq!(ticks.iter().filter(|t| t.raw >= 1.0).count(), 1);
        assert_eq!(ticks.last().map(|t| t.progress), Some(1.0));
        // 0, 16, ..., 496, 512 ms
        assert_eq!(ticks.len(), 33);
    }

    #[tokio::test]
    async fn zero_duration_ticks_once_at_one() {
        let mut scheduler = stepped();
        let cancel = CancelToken::new();

        let mut ticks = Vec::new();
        let outcome = PhaseRunner::new(&mut scheduler, &cancel)
            .run(&Phase::hold(Duration::ZERO), |tick| {
                ticks.push(tick.progress);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(outcome, PhaseOutcome::Completed);
        assert_eq!(ticks, vec![1.0]);
        assert_eq!(scheduler.frames(), 1);
    }

    #[tokio::test]
    async fn cancel_before_start_runs_no_ticks() {
        let mut scheduler = stepped();
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut called = false;
        let outcome = PhaseRunner::new(&mut scheduler, &cancel)
            .run(&Phase::hold(Duration::from_secs(1)), |_| {
                called = true;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(outcome, PhaseOutcome::Cancelled);
        assert!(!called);
    }

    #[tokio::test]
    async fn cancel_mid_phase_suppresses_completion() {
        let mut scheduler = stepped();
        let cancel = CancelToken::new();
        let phase = Phase::hold(Duration::from_millis(160));

        let mut ticks = 0;
        let outcome = PhaseRunner::new(&mut scheduler, &cancel)
            .run(&phase, |_| {
                ticks += 1;
                if ticks == 3 {
                    cancel.cancel();
                    cancel.cancel();
                }
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(outcome, PhaseOutcome::Cancelled);
        assert_eq!(ticks, 3);

        // Cancelling after the fact stays a no-op.
        cancel.cancel();
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_on_final_tick_still_reports_cancelled() {
        let mut scheduler = stepped();
        let cancel = CancelToken::new();

        let outcome = PhaseRunner::new(&mut scheduler, &cancel)
            .run(&Phase::hold(Duration::ZERO), |_| {
                cancel.cancel();
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(outcome, PhaseOutcome::Cancelled);
    }

    #[tokio::test]
    async fn tick_errors_end_the_phase() {
        let mut scheduler = stepped();
        let cancel = CancelToken::new();

        let mut ticks = 0;
        let result = PhaseRunner::new(&mut scheduler, &cancel)
            .run(&Phase::hold(Duration::from_secs(1)), |_| {
                ticks += 1;
                Err(FlightError::InvalidArgument("boom".into()))
            })
            .await;

        assert!(matches!(result, Err(FlightError::InvalidArgument(_))));
        assert_eq!(ticks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_from_another_task_interrupts_wait() {
        let mut scheduler = IntervalScheduler::new(30.0).unwrap();
        let cancel = CancelToken::new();
        let remote = cancel.clone();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            remote.cancel();
        });

        let mut ticks = 0;
        let outcome = PhaseRunner::new(&mut scheduler, &cancel)
            .run(&Phase::hold(Duration::from_secs(10)), |_| {
                ticks += 1;
                Ok(())
            })
            .await
            .unwrap();

        canceller.await.unwrap();
        assert_eq!(outcome, PhaseOutcome::Cancelled);
        // ~3 frames at 30 fps fit into the 100 ms before cancellation.
        assert!((3..=5).contains(&ticks), "got {ticks}");
    }
}

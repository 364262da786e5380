//! Frame tick sources and cooperative cancellation.
//!
//! A [`FrameScheduler`] is the only place an animation suspends: awaiting
//! `next_frame` subscribes for the next tick, dropping the future cancels the
//! subscription. Ticks come from a tokio interval in production and from a
//! virtual clock in tests.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::error::{FlightError, Result};

/// Source of per-frame ticks.
///
/// Timestamps are monotonic and measured from an arbitrary origin; only
/// differences between them are meaningful.
pub trait FrameScheduler: Send + 'static {
    /// Wait for the next frame and return its timestamp.
    fn next_frame(&mut self) -> impl Future<Output = Duration> + Send;
}

/// Real-time ticks from a tokio interval. Missed frames are skipped, not replayed.
///
/// Cloning yields an independent scheduler with the same frame period.
#[derive(Debug)]
pub struct IntervalScheduler {
    period: Duration,
    ticker: Option<(Interval, Instant)>,
}

impl IntervalScheduler {
    pub fn new(fps: f64) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(FlightError::invalid_argument(format!(
                "frame rate must be positive, got {fps}"
            )));
        }
        Self::with_period(Duration::from_secs_f64(1.0 / fps))
    }

    pub fn with_period(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(FlightError::invalid_argument("frame period must be non-zero"));
        }
        Ok(Self {
            period,
            ticker: None,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Clone for IntervalScheduler {
    fn clone(&self) -> Self {
        Self {
            period: self.period,
            ticker: None,
        }
    }
}

impl FrameScheduler for IntervalScheduler {
    fn next_frame(&mut self) -> impl Future<Output = Duration> + Send {
        async move {
            let period = self.period;
            // The interval is created lazily so it binds to the runtime that drives it.
            let (ticker, origin) = self.ticker.get_or_insert_with(|| {
                let origin = Instant::now();
                let mut ticker = tokio::time::interval_at(origin, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                (ticker, origin)
            });
            let at = ticker.tick().await;
            at.saturating_duration_since(*origin)
        }
    }
}

/// Virtual clock: each frame yields to the runtime, then advances by a fixed step.
///
/// The first frame is stamped zero. Nothing waits on wall-clock time, so
/// animations driven by it run as fast as the runtime polls them.
#[derive(Debug, Clone)]
pub struct SteppedScheduler {
    step: Duration,
    next: Duration,
    frames: u64,
}

impl SteppedScheduler {
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            next: Duration::ZERO,
            frames: 0,
        }
    }

    /// Frames handed out so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameScheduler for SteppedScheduler {
    fn next_frame(&mut self) -> impl Future<Output = Duration> + Send {
        async move {
            tokio::task::yield_now().await;
            let now = self.next;
            self.next += self.step;
            self.frames += 1;
            now
        }
    }
}

/// Idempotent cancellation flag shared between a session and its handles.
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Request cancellation. Safe to call any number of times, before or after completion.
    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives inside `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stepped_scheduler_advances_by_step() {
        let mut scheduler = SteppedScheduler::new(Duration::from_millis(16));
        assert_eq!(scheduler.next_frame().await, Duration::ZERO);
        assert_eq!(scheduler.next_frame().await, Duration::from_millis(16));
        assert_eq!(scheduler.next_frame().await, Duration::from_millis(32));
        assert_eq!(scheduler.frames(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_scheduler_ticks_at_period() {
        let mut scheduler = IntervalScheduler::new(50.0).unwrap();
        let first = scheduler.next_frame().await;
        let second = scheduler.next_frame().await;
        let third = scheduler.next_frame().await;
        assert_eq!(first, Duration::ZERO);
        assert_eq!(second - first, Duration::from_millis(20));
        assert_eq!(third - second, Duration::from_millis(20));
    }

    #[test]
    fn interval_scheduler_rejects_bad_rates() {
        assert!(IntervalScheduler::new(0.0).is_err());
        assert!(IntervalScheduler::new(f64::NAN).is_err());
        assert!(IntervalScheduler::with_period(Duration::ZERO).is_err());
    }

    #[tokio::test]
    async fn cancel_token_is_idempotent_and_wakes_waiters() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        tokio::task::yield_now().await;

        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
        waiter.await.unwrap();

        // Already-cancelled tokens resolve immediately.
        token.cancelled().await;
    }
}

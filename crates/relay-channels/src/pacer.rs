//! Inter-message pacing.
//!
//! The dispatcher asks a [`Pacer`] to wait between consecutive sends so a
//! multi-part reply reads like someone typing. Production uses
//! [`TokioPacer`]; tests substitute [`NoDelay`] or a recording double.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

/// Inclusive range a pause duration is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindow {
    min: Duration,
    max: Duration,
}

impl DelayWindow {
    /// Returns `None` when `min > max`.
    pub fn new(min: Duration, max: Duration) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> Option<Self> {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    pub const fn zero() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn is_zero(&self) -> bool {
        self.max.is_zero()
    }

    pub fn contains(&self, d: Duration) -> bool {
        self.min <= d && d <= self.max
    }

    /// Uniform sample from `[min, max]`.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }

    /// Shrink the window so no sample exceeds `budget`.
    pub fn capped(&self, budget: Duration) -> Self {
        Self {
            min: self.min.min(budget),
            max: self.max.min(budget),
        }
    }
}

#[async_trait]
pub trait Pacer: Send + Sync {
    /// Wait for a duration drawn from `window`; returns how long it waited.
    async fn pause(&self, window: DelayWindow) -> Duration;
}

/// Sleeps on the tokio timer for a randomly sampled duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, window: DelayWindow) -> Duration {
        let delay = window.sample(&mut rand::thread_rng());
        tokio::time::sleep(delay).await;
        delay
    }
}

/// Returns immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn pause(&self, _window: DelayWindow) -> Duration {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn inverted_window_rejected() {
        assert!(DelayWindow::from_millis(10, 5).is_none());
        assert!(DelayWindow::from_millis(5, 5).is_some());
    }

    #[test]
    fn samples_stay_inside_window() {
        let window = DelayWindow::from_millis(500, 1000).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let d = window.sample(&mut rng);
            assert!(window.contains(d), "sample {d:?} outside window");
        }
    }

    #[test]
    fn degenerate_window_is_constant() {
        let window = DelayWindow::from_millis(250, 250).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(window.sample(&mut rng), Duration::from_millis(250));
    }

    #[test]
    fn capped_window_respects_budget() {
        let window = DelayWindow::from_millis(500, 1000).unwrap();
        let capped = window.capped(Duration::from_millis(700));
        assert_eq!(capped.min(), Duration::from_millis(500));
        assert_eq!(capped.max(), Duration::from_millis(700));
        assert!(window.capped(Duration::ZERO).is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_pacer_sleeps_for_sampled_duration() {
        let window = DelayWindow::from_millis(500, 1000).unwrap();
        let started = tokio::time::Instant::now();
        let slept = TokioPacer.pause(window).await;
        assert!(window.contains(slept));
        assert!(started.elapsed() >= slept);
    }
}

use async_trait::async_trait;
use rand::Rng;
use shaku::Component;
use std::collections::VecDeque;
use std::time::Duration;
use sync_application::{RateLimiter, RateLimiterError};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RateLimitWindow {
    pub limit: usize,
    pub duration: Duration,
}

impl RateLimitWindow {
    pub const fn new(limit: usize, duration_secs: u64) -> Self {
        Self {
            limit,
            duration: Duration::from_secs(duration_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JitterRateLimiterConfig {
    /// Minimum spacing between two upstream calls.
    pub base_delay: Duration,
    /// Upper bound of the random extra pause added to `base_delay`.
    pub jitter: Duration,
    /// Rolling quotas, e.g. 200 calls per minute for a basic account.
    pub windows: Vec<RateLimitWindow>,
}

impl Default for JitterRateLimiterConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(3),
            jitter: Duration::from_secs(1),
            windows: vec![RateLimitWindow::new(200, 60)],
        }
    }
}

#[derive(Debug, Default)]
pub struct LimiterState {
    last_call: Option<Instant>,
    history: VecDeque<Instant>,
}

impl LimiterState {
    fn wait_time(&mut self, now: Instant, pause: Duration, windows: &[RateLimitWindow]) -> Duration {
        let mut wait = self
            .last_call
            .map(|last| (last + pause).saturating_duration_since(now))
            .unwrap_or_default();

        let horizon = windows.iter().map(|w| w.duration).max().unwrap_or_default();
        while let Some(oldest) = self.history.front() {
            if now.saturating_duration_since(*oldest) >= horizon {
                self.history.pop_front();
            } else {
                break;
            }
        }

        for window in windows {
            let in_window: Vec<&Instant> = self
                .history
                .iter()
                .filter(|at| now.saturating_duration_since(**at) < window.duration)
                .collect();
            if in_window.len() >= window.limit {
                let oldest = in_window[in_window.len() - window.limit];
                wait = wait.max((*oldest + window.duration).saturating_duration_since(now));
            }
        }

        wait
    }

    fn record(&mut self, now: Instant) {
        self.last_call = Some(now);
        self.history.push_back(now);
    }
}

/// Paces upstream calls with a fixed delay plus random jitter and keeps them
/// under the provider's rolling quotas. Callers wait, they never fail.
#[derive(Component)]
#[shaku(interface = RateLimiter)]
pub struct JitterRateLimiter {
    #[shaku(default = JitterRateLimiterConfig::default())]
    config: JitterRateLimiterConfig,

    #[shaku(default = Mutex::new(LimiterState::default()))]
    state: Mutex<LimiterState>,
}

impl JitterRateLimiter {
    pub fn new(config: JitterRateLimiterConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LimiterState::default()),
        }
    }

    fn sample_pause(&self) -> Duration {
        let jitter_ms = self.config.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ms)
        };
        self.config.base_delay + Duration::from_millis(extra)
    }
}

#[async_trait]
impl RateLimiter for JitterRateLimiter {
    async fn acquire(&self) -> Result<(), RateLimiterError> {
        if let Some(window) = self.config.windows.iter().find(|w| w.limit == 0) {
            return Err(RateLimiterError::Misconfigured(format!(
                "window of {:?} allows no calls",
                window.duration
            )));
        }

        let pause = self.sample_pause();

        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let wait = state.wait_time(now, pause, &self.config.windows);
                if wait.is_zero() {
                    state.record(now);
                    return Ok(());
                }
                wait
            };

            debug!("Rate limiter holding call for {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(base_ms: u64, windows: Vec<RateLimitWindow>) -> JitterRateLimiter {
        JitterRateLimiter::new(JitterRateLimiterConfig {
            base_delay: Duration::from_millis(base_ms),
            jitter: Duration::ZERO,
            windows,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaces_calls_by_base_delay() {
        let limiter = limiter(3_000, vec![]);
        let started = Instant::now();

        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(6_000));
        assert!(started.elapsed() < Duration::from_millis(6_100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_quota_blocks_until_oldest_call_expires() {
        let limiter = limiter(0, vec![RateLimitWindow::new(2, 60)]);
        let started = Instant::now();

        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));

        limiter.acquire().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_zero_limit_window_is_rejected() {
        let limiter = limiter(0, vec![RateLimitWindow::new(0, 60)]);
        assert!(matches!(
            limiter.acquire().await,
            Err(RateLimiterError::Misconfigured(_))
        ));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let limiter = JitterRateLimiter::new(JitterRateLimiterConfig {
            base_delay: Duration::from_millis(100),
            jitter: Duration::from_millis(50),
            windows: vec![],
        });

        for _ in 0..100 {
            let pause = limiter.sample_pause();
            assert!(pause >= Duration::from_millis(100));
            assert!(pause <= Duration::from_millis(150));
        }
    }
}

//! Bounded exponential backoff for reads that may not be visible yet

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::info;

/// Upper bound on a single wait
pub const MAX_DELAY: Duration = Duration::from_secs(300);

/// Retry schedule: at most `steps` attempts, waiting `duration * factor^i`
/// (± `jitter` as a fraction) after the i-th failed attempt.
///
/// A factor that is negative or not finite counts as 1, jitter is clamped to
/// `[0, 1]` and no single wait exceeds [`MAX_DELAY`].
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    pub steps: u32,
    pub duration: Duration,
    pub factor: f64,
    pub jitter: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            steps: 4,
            duration: Duration::from_millis(20),
            factor: 5.0,
            jitter: 0.1,
        }
    }
}

impl Backoff {
    /// Delay after the `attempt`-th failure (zero based), before jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = if self.factor.is_finite() && self.factor >= 0.0 {
            self.factor
        } else {
            1.0
        };
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        scale(self.duration, factor.powi(exponent))
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter.is_nan() || self.jitter <= 0.0 {
            return base;
        }
        let jitter = self.jitter.min(1.0);
        let spread = rand::thread_rng().gen_range(-jitter..=jitter);
        scale(base, 1.0 + spread)
    }
}

fn scale(duration: Duration, by: f64) -> Duration {
    if by <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(duration.as_secs_f64() * by)
        .map_or(MAX_DELAY, |scaled| scaled.min(MAX_DELAY))
}

/// Run `op` until it succeeds, fails with an error `is_retriable` rejects, or
/// the backoff runs out of steps. The last error is returned.
pub async fn retry_on_error<T, E, F, Fut, P>(
    backoff: &Backoff,
    is_retriable: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let steps = backoff.steps.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= steps || !is_retriable(&err) {
                    return Err(err);
                }
                let wait = backoff.jittered(attempt - 1);
                let wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
                info!(attempt, wait_ms, "Retrying getting the repository");
                tokio::time::sleep(wait).await;
            }
        }
    }
}

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(25),
            max_backoff: Duration::from_millis(400),
            jitter_max: Some(Duration::from_millis(25)),
        }
    }
}

impl RetryConfig {
    fn delay_for(&self, backoff: Duration) -> Duration {
        match self.jitter_max {
            Some(jitter_max) if !jitter_max.is_zero() => {
                let jitter_ms = jitter_max.as_millis() as u64;
                backoff + Duration::from_millis(rand::random::<u64>() % (jitter_ms + 1))
            }
            _ => backoff,
        }
    }
}

/// Run `f` until it succeeds or `max_attempts` is used up, doubling the backoff
/// (capped at `max_backoff`) between tries. The last error is returned.
pub async fn retry_async_with_config<F, Fut, T, E>(
    operation: &str,
    config: &RetryConfig,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0usize;
    let mut backoff = config.base_backoff;

    loop {
        attempt += 1;
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= config.max_attempts.max(1) => {
                tracing::error!(operation, attempt, "giving up: {}", e);
                return Err(e);
            }
            Err(e) => {
                let wait = config.delay_for(backoff);
                tracing::warn!(
                    operation,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "retrying after error: {}",
                    e
                );
                tokio::time::sleep(wait).await;
                backoff = std::cmp::min(backoff * 2, config.max_backoff);
            }
        }
    }
}

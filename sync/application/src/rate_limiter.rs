use async_trait::async_trait;
use shaku::Interface;

#[async_trait]
pub trait RateLimiter: Interface {
    /// Waits until one more upstream call is allowed.
    async fn acquire(&self) -> Result<(), RateLimiterError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimiterError {
    #[error("Rate limiter misconfigured: {0}")]
    Misconfigured(String),
}

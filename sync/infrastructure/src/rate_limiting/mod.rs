pub mod jitter;

pub use jitter::{
    JitterRateLimiter, JitterRateLimiterConfig, JitterRateLimiterParameters, RateLimitWindow,
};

//! Error types for the Floodgate engine.

use thiserror::Error;

/// Main error type for Floodgate operations.
#[derive(Error, Debug)]
pub enum FloodgateError {
    /// Invalid algorithm parameters
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The key store could not serve a read or write
    #[error("key store unavailable: {0}")]
    Store(#[from] StoreError),

    /// I/O errors (rule file loading)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid rate limit configuration.
///
/// Raised when parameters are constructed or loaded, and again by
/// [`RateLimiter::check`](crate::limiter::RateLimiter::check) before any state
/// is touched, never mid-decision.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Bucket capacity of zero can never admit a request.
    #[error("capacity must be greater than zero")]
    ZeroCapacity,

    /// Window limit of zero can never admit a request.
    #[error("limit must be greater than zero")]
    ZeroLimit,

    /// Zero-length windows never reset.
    #[error("window must be at least one second")]
    ZeroWindow,

    /// A non-positive leak/refill rate would make a bucket never drain.
    #[error("rate must be positive and finite, got {0}")]
    NonPositiveRate(f64),

    /// Rule file could not be parsed.
    #[error("failed to parse rate limit rules: {0}")]
    Parse(String),

    /// No rule (and no default) covers the requested resource.
    #[error("no rate limit rule matches resource {0:?}")]
    NoMatchingRule(String),
}

/// A key store read or write failed.
///
/// The engine propagates these untouched: whether a store outage fails open
/// (allow) or closed (deny) is the caller's policy.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for Floodgate operations.
pub type Result<T> = std::result::Result<T, FloodgateError>;

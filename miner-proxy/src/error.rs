//! Common error types for miner-proxy.

use thiserror::Error;

/// Main error type for miner-proxy operations.
///
/// Subprocess and network failures never surface here; they collapse into
/// the per-request `{status:"error"}` envelope instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

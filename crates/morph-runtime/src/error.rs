//! Error taxonomy for the runtime.
//!
//! Public operations never panic and never throw synchronously past the API
//! boundary: a failed background computation degrades to the static end
//! state, a vanished element is skipped per key, and malformed geometry is
//! clamped long before it gets here. What remains is the small set of
//! failures a caller can actually act on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The background context reported a failure while diffing/synthesizing.
    #[error("background computation failed: {0}")]
    Computation(String),

    /// The worker channel closed underneath us.
    #[error("worker channel disconnected")]
    Disconnected,

    /// A transport payload could not be encoded or decoded.
    #[error("transport payload error: {0}")]
    Codec(#[from] serde_json::Error),

    /// `seek` was handed a non-finite progress value.
    #[error("progress must be a finite number, got {0}")]
    InvalidProgress(f64),

    /// The configuration file was unreadable or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = EngineError::Computation("diff panicked".to_string());
        assert_eq!(e.to_string(), "background computation failed: diff panicked");
        assert_eq!(
            EngineError::Disconnected.to_string(),
            "worker channel disconnected"
        );
    }
}

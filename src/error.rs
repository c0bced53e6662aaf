//! Error types for Stimulus.
//!
//! Nothing in the bus is fatal: every failure is logged and the broadcast
//! continues. The types here exist so subscribers can report *why* a delivery
//! failed, and so helpers that decode payloads have a typed error to return.

use thiserror::Error;

/// Failure reported by a subscriber while consuming a delivery.
///
/// A trigger never propagates these to the caller that fired it; they are
/// logged and delivery moves on to the next subscriber.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Delivery rejected by subscriber: {reason}")]
    Rejected {
        reason: String,
    },

    #[error("Payload for trigger '{trigger}' could not be decoded: {source}")]
    Decode {
        trigger: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Subscriber panicked while receiving '{trigger}': {message}")]
    Panicked {
        trigger: String,
        message: String,
    },

    #[error("Stream for subscriber {subscriber} is disconnected")]
    Disconnected {
        subscriber: u64,
    },
}

impl DeliveryError {
    /// Creates a rejection with a free-form reason.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Returns true if the failure was a caught panic.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }
}

/// Errors surfaced by stream handles.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("Timed out after {duration_ms}ms waiting for an event")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Stream for subscriber {subscriber} is disconnected")]
    Disconnected {
        subscriber: u64,
    },
}

/// Top-level error type for Stimulus.
#[derive(Debug, Error)]
pub enum StimulusError {
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl StimulusError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a delivery error.
    #[must_use]
    pub const fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }

    /// Returns true if this is a stream error.
    #[must_use]
    pub const fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Returns true if waiting again could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Stream(StreamError::Timeout { .. }))
    }
}

/// Result type alias for Stimulus operations.
pub type StimulusResult<T> = Result<T, StimulusError>;

//! Sensor configuration.

use serde::{Deserialize, Serialize};

/// Tunables for a [`Sensor`](crate::sensor::Sensor).
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Reject `propagate` while the trigger is running, the way `fire` does.
    ///
    /// Off by default: direct propagation is an override path and may be
    /// called while a fire cycle is still in flight.
    pub guard_propagation: bool,
    /// Emit a warning when a trigger is created implicitly by name.
    pub warn_on_implicit_create: bool,
    /// Default buffer capacity for [`TriggerStream`](crate::stream::TriggerStream).
    pub stream_capacity: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            guard_propagation: false,
            warn_on_implicit_create: true,
            stream_capacity: 1024,
        }
    }
}

impl SensorConfig {
    /// Enable or disable the reentrancy guard on direct propagation.
    #[must_use]
    pub fn with_guard_propagation(mut self, guard: bool) -> Self {
        self.guard_propagation = guard;
        self
    }

    /// Set the default stream buffer capacity. Zero is clamped to one.
    #[must_use]
    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity.max(1);
        self
    }
}

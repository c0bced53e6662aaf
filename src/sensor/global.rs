//! Process-wide sensor.
//!
//! Explicit [`Sensor`] values are the primary API. For code that wants one
//! shared bus per process without threading a handle through, the global
//! instance is created on first access. [`init`] can install a custom
//! configuration, but only before anything has touched the global.
//!
//! # Example
//!
//! ```ignore
//! // At startup, optionally:
//! stimulus::sensor::global::init(SensorConfig::default())?;
//!
//! // Anywhere:
//! Sensor::global().propagate("ready", json!(true), Args::new());
//! ```

use std::sync::OnceLock;

use crate::config::SensorConfig;
use crate::error::{StimulusError, StimulusResult};

use super::Sensor;

static GLOBAL: OnceLock<Sensor> = OnceLock::new();

/// Install the global sensor with `config`.
///
/// Fails if the global was already initialised, either by an earlier `init`
/// or by a call to [`Sensor::global`].
pub fn init(config: SensorConfig) -> StimulusResult<&'static Sensor> {
    let mut installed = false;
    let sensor = GLOBAL.get_or_init(|| {
        installed = true;
        Sensor::new(config)
    });
    if installed {
        Ok(sensor)
    } else {
        Err(StimulusError::internal("global sensor already initialized"))
    }
}

impl Sensor {
    /// The process-wide sensor, created with default configuration on first
    /// access.
    pub fn global() -> &'static Sensor {
        GLOBAL.get_or_init(Sensor::default)
    }
}

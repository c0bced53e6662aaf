//! Payload and identity types carried through the bus.
//!
//! Trigger data is untyped JSON. `Value::Null` is the "absent" marker: a
//! trigger that has never delivered, or that delivered `null`, has no data.
//! Falsy values such as `0`, `false` or `""` are present data.

use std::fmt;

use serde::{Deserialize, Serialize};

pub use serde_json::Value;

/// Invocation context attached to a fire cycle.
///
/// Reaction cascades add the completed trigger's output under its name.
pub type Args = serde_json::Map<String, Value>;

/// Identity of a subscriber, assigned once by [`Sensor::next_id`](crate::Sensor::next_id).
///
/// Only used for identity comparison (unsubscribe, shared-state keys).
///
/// # Examples
///
/// ```
/// use stimulus::SubscriberId;
///
/// let id = SubscriberId::from_raw(7);
/// assert_eq!(id.state_key(), "7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Wrap a raw counter value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw counter value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Key under which this subscriber's entry lives in a shared-state map.
    #[must_use]
    pub fn state_key(self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns true if `value` counts as present trigger data.
#[must_use]
pub fn is_present(value: &Value) -> bool {
    !value.is_null()
}

/// Convert stored data into the `Option` form exposed by accessors.
pub(crate) fn present(value: &Value) -> Option<Value> {
    if is_present(value) {
        Some(value.clone())
    } else {
        None
    }
}

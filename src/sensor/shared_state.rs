//! Shared state built on triggers.
//!
//! A shared-state trigger holds a JSON object keyed by subscriber id. Each
//! subscriber owns its own key: pushing overwrites it, popping removes it,
//! and every change re-broadcasts the whole object through direct
//! propagation.

use tracing::warn;

use crate::trigger::FireOutcome;
use crate::value::{Args, SubscriberId, Value};

use super::Sensor;

impl Sensor {
    /// Set `owner`'s entry in the `state_name` map to `value` and broadcast.
    pub fn push_state(&self, owner: SubscriberId, state_name: &str, value: Value) -> FireOutcome {
        self.update_state(state_name, |entries| {
            entries.insert(owner.state_key(), value);
        })
    }

    /// Remove `owner`'s entry from the `state_name` map and broadcast.
    pub fn pop_state(&self, owner: SubscriberId, state_name: &str) -> FireOutcome {
        self.update_state(state_name, |entries| {
            entries.remove(&owner.state_key());
        })
    }

    fn update_state(
        &self,
        state_name: &str,
        f: impl FnOnce(&mut serde_json::Map<String, Value>),
    ) -> FireOutcome {
        let guard = self.config().guard_propagation;
        self.resolve(state_name).propagate_with(
            |data| {
                if !data.is_object() {
                    if !data.is_null() {
                        warn!(trigger = %state_name, "shared state held a non-object value, resetting");
                    }
                    *data = Value::Object(serde_json::Map::new());
                }
                if let Value::Object(entries) = data {
                    f(entries);
                }
            },
            Args::new(),
            guard,
        )
    }
}

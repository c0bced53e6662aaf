//! A ready-made subscriber that keeps the latest value of every trigger it
//! follows.
//!
//! `Listener` gets its id from the sensor at construction, records each
//! accepted delivery under the trigger's name, and removes itself from every
//! trigger when dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;

use crate::error::{DeliveryError, StimulusResult};
use crate::sensor::Sensor;
use crate::subscriber::Subscriber;
use crate::sync::{read, write};
use crate::trigger::{FireOutcome, Trigger};
use crate::value::{is_present, present, Args, SubscriberId, Value};

type Filter = Box<dyn Fn(&Trigger) -> bool + Send + Sync>;

struct ListenerState {
    id: SubscriberId,
    values: RwLock<HashMap<String, Value>>,
    filter: Option<Filter>,
}

impl ListenerState {
    fn seed(&self, name: &str, default: Option<Value>) {
        if let Some(value) = default.filter(is_present) {
            write(&self.values).insert(name.to_string(), value);
        }
    }
}

impl Subscriber for ListenerState {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn accepts(&self, trigger: &Trigger) -> bool {
        self.filter.as_ref().map_or(true, |f| f(trigger))
    }

    fn receive(&self, trigger: &Trigger) -> Result<(), DeliveryError> {
        let data = trigger.data().unwrap_or(Value::Null);
        write(&self.values).insert(trigger.name().to_string(), data);
        Ok(())
    }
}

/// Subscriber with a local `trigger name -> data` store.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use stimulus::{Args, Listener, Sensor};
///
/// let sensor = Sensor::default();
/// let listener = Listener::new(&sensor);
/// listener.listen_to("theme", Some(json!("light")));
/// assert_eq!(listener.get("theme"), Some(json!("light")));
///
/// sensor.propagate("theme", json!("dark"), Args::new());
/// assert_eq!(listener.get("theme"), Some(json!("dark")));
/// ```
pub struct Listener {
    state: Arc<ListenerState>,
    sensor: Sensor,
}

impl Listener {
    /// Create a listener that accepts every delivery.
    #[must_use]
    pub fn new(sensor: &Sensor) -> Self {
        Self::build(sensor, None)
    }

    /// Create a listener that only accepts deliveries for which `filter`
    /// returns true.
    #[must_use]
    pub fn with_filter<F>(sensor: &Sensor, filter: F) -> Self
    where
        F: Fn(&Trigger) -> bool + Send + Sync + 'static,
    {
        Self::build(sensor, Some(Box::new(filter)))
    }

    fn build(sensor: &Sensor, filter: Option<Filter>) -> Self {
        Self {
            state: Arc::new(ListenerState {
                id: sensor.next_id(),
                values: RwLock::new(HashMap::new()),
                filter,
            }),
            sensor: sensor.clone(),
        }
    }

    /// This listener's subscriber id.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.state.id
    }

    fn as_subscriber(&self) -> Arc<dyn Subscriber> {
        let state: Arc<ListenerState> = Arc::clone(&self.state);
        state
    }

    /// Seed `name` with `default`, subscribe, and pick up any data the
    /// trigger already holds.
    pub fn listen_to(&self, name: &str, default: Option<Value>) -> &Self {
        self.state.seed(name, default);
        self.sensor.listen_to(self.as_subscriber(), name);
        self
    }

    /// Seed `name` with `default` and subscribe for future deliveries only.
    pub fn follow(&self, name: &str, default: Option<Value>) -> &Self {
        self.state.seed(name, default);
        self.sensor.subscribe(self.as_subscriber(), name);
        self
    }

    /// Fire `name` on the listener's sensor.
    pub fn fire(&self, name: &str, args: Args) -> FireOutcome {
        self.sensor.fire(name, args)
    }

    /// Propagate `data` on `name` through the listener's sensor.
    pub fn propagate(&self, name: &str, data: Value, args: Args) -> FireOutcome {
        self.sensor.propagate(name, data, args)
    }

    /// Publish this listener's entry in a shared state.
    pub fn push_state(&self, state_name: &str, value: Value) -> FireOutcome {
        self.sensor.push_state(self.id(), state_name, value)
    }

    /// Withdraw this listener's entry from a shared state.
    pub fn pop_state(&self, state_name: &str) -> FireOutcome {
        self.sensor.pop_state(self.id(), state_name)
    }

    /// Latest value recorded for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        read(&self.state.values).get(name).and_then(present)
    }

    /// Latest value recorded for `name`, decoded into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> StimulusResult<Option<T>> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        let decoded = serde_json::from_value(value).map_err(|source| DeliveryError::Decode {
            trigger: name.to_string(),
            source,
        })?;
        Ok(Some(decoded))
    }

    /// Copy of every recorded value.
    #[must_use]
    pub fn values(&self) -> HashMap<String, Value> {
        read(&self.state.values).clone()
    }

    /// Remove one subscription per trigger. Returns the number removed.
    pub fn stop_listening(&self) -> usize {
        self.sensor.unsubscribe_all(self.id())
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.state.id)
            .field("values", &*read(&self.state.values))
            .finish_non_exhaustive()
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        // Repeat until no trigger holds this listener, duplicates included.
        while self.stop_listening() > 0 {}
    }
}

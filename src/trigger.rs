//! Triggers: named event slots.
//!
//! A trigger holds the last delivered data, its subscribers and a producer.
//! Two entry points lead to a delivery:
//!
//! - [`Trigger::fire`] invokes the producer, guarded against re-entry while a
//!   previous cycle is still in flight.
//! - [`Trigger::propagate`] pushes already-computed data straight to the
//!   delivery step, bypassing the producer.
//!
//! The producer receives a [`Completion`] and must eventually call
//! [`Completion::deliver`], synchronously or later from another thread.
//! After every subscriber has been visited the trigger reports back to its
//! sensor, which may cascade into reactions, and only then clears `running`.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock, Weak};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::DeliveryError;
use crate::subscriber::Subscriber;
use crate::sync::{lock, read, write};
use crate::value::{present, Args, SubscriberId, Value};

/// Callback invoked when a trigger fires.
pub type Producer = Arc<dyn Fn(Completion) + Send + Sync>;

/// Wrap a closure as a [`Producer`].
pub fn producer<F>(f: F) -> Producer
where
    F: Fn(Completion) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Producer used for implicitly created triggers: re-deliver the current
/// data unchanged.
#[must_use]
pub fn pass_through() -> Producer {
    producer(Completion::redeliver)
}

/// Receives completion reports from triggers.
pub(crate) trait CompletionHook: Send + Sync {
    fn on_trigger_completed(&self, trigger: &Trigger);
}

/// Result of asking a trigger to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireOutcome {
    /// The producer was invoked; delivery may still be pending.
    Started,
    /// Data was delivered directly to subscribers.
    Delivered,
    /// The trigger was already running; the request was dropped.
    Collision,
    /// No trigger is registered under that name.
    Missing,
}

#[derive(Default)]
struct TriggerState {
    data: Value,
    subscribers: Vec<Arc<dyn Subscriber>>,
    running: bool,
    args: Args,
    stack: Vec<String>,
    updated_at: Option<DateTime<Utc>>,
}

/// A named event slot.
pub struct Trigger {
    name: String,
    producer: RwLock<Producer>,
    state: Mutex<TriggerState>,
    hook: Weak<dyn CompletionHook>,
}

impl Trigger {
    pub(crate) fn new(name: impl Into<String>, producer: Producer, hook: Weak<dyn CompletionHook>) -> Self {
        Self {
            name: name.into(),
            producer: RwLock::new(producer),
            state: Mutex::new(TriggerState::default()),
            hook,
        }
    }

    /// Trigger name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last delivered data, `None` if nothing (or `null`) was delivered.
    #[must_use]
    pub fn data(&self) -> Option<Value> {
        present(&lock(&self.state).data)
    }

    /// Returns true if the trigger holds data.
    #[must_use]
    pub fn has_data(&self) -> bool {
        !lock(&self.state).data.is_null()
    }

    /// Decode the current data into `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>, DeliveryError> {
        let Some(data) = self.data() else {
            return Ok(None);
        };
        serde_json::from_value(data)
            .map(Some)
            .map_err(|source| DeliveryError::Decode {
                trigger: self.name.clone(),
                source,
            })
    }

    /// Context of the last fire or propagation.
    #[must_use]
    pub fn args(&self) -> Args {
        lock(&self.state).args.clone()
    }

    /// Trigger names already traversed by the cascade this trigger belongs to.
    #[must_use]
    pub fn stack(&self) -> Vec<String> {
        lock(&self.state).stack.clone()
    }

    /// Returns true while a fire or propagation cycle is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    /// Number of subscriber entries, duplicates included.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).subscribers.len()
    }

    /// When data was last delivered.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.state).updated_at
    }

    /// Point-in-time copy of the trigger's observable state.
    #[must_use]
    pub fn snapshot(&self) -> TriggerSnapshot {
        let state = lock(&self.state);
        TriggerSnapshot {
            name: self.name.clone(),
            data: state.data.clone(),
            running: state.running,
            arguments: state.args.clone(),
            subscribers: state.subscribers.len(),
            updated_at: state.updated_at,
        }
    }

    pub(crate) fn set_producer(&self, producer: Producer) {
        *write(&self.producer) = producer;
    }

    pub(crate) fn add_subscriber(&self, subscriber: Arc<dyn Subscriber>) {
        lock(&self.state).subscribers.push(subscriber);
    }

    /// Remove the first entry whose id matches. Duplicates stay.
    pub(crate) fn remove_subscriber(&self, id: SubscriberId) -> bool {
        let mut state = lock(&self.state);
        match state.subscribers.iter().position(|s| s.id() == id) {
            Some(idx) => {
                state.subscribers.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Run the producer.
    ///
    /// Dropped with a warning if the trigger is already running.
    pub fn fire(self: &Arc<Self>, args: Args, stack: Vec<String>) -> FireOutcome {
        info!(trigger = %self.name, "trigger fired");
        {
            let mut state = lock(&self.state);
            if state.running {
                warn!(trigger = %self.name, "trigger already running, possible collision");
                return FireOutcome::Collision;
            }
            state.running = true;
            state.args = args;
            state.stack = stack;
        }

        let producer = Arc::clone(&*read(&self.producer));
        producer(Completion::new(Arc::clone(self)));
        FireOutcome::Started
    }

    /// Deliver `data` directly, bypassing the producer.
    ///
    /// With `guard` unset this ignores `running`; a top-level propagation
    /// starts a new cascade with an empty visited stack.
    pub fn propagate(self: &Arc<Self>, data: Value, args: Args, guard: bool) -> FireOutcome {
        self.propagate_with(|stored| *stored = data, args, guard)
    }

    /// Like [`propagate`](Self::propagate), but derives the new data from
    /// the stored data.
    ///
    /// The guard check, the change and the store happen under one lock, so a
    /// rejected call leaves the data untouched and concurrent callers never
    /// overwrite each other's changes.
    pub(crate) fn propagate_with(
        self: &Arc<Self>,
        change: impl FnOnce(&mut Value),
        args: Args,
        guard: bool,
    ) -> FireOutcome {
        info!(trigger = %self.name, "propagating");
        let subscribers = {
            let mut state = lock(&self.state);
            if guard && state.running {
                warn!(trigger = %self.name, "trigger already running, propagation dropped");
                return FireOutcome::Collision;
            }
            state.running = true;
            state.args = args;
            state.stack.clear();
            change(&mut state.data);
            state.updated_at = Some(Utc::now());
            state.subscribers.clone()
        };

        self.broadcast(&subscribers);
        FireOutcome::Delivered
    }

    /// Hand the current data to one subscriber, subject to its accept check.
    ///
    /// Errors and panics are logged and swallowed. Returns true if the
    /// subscriber accepted and consumed the data.
    pub(crate) fn deliver_to(&self, subscriber: &dyn Subscriber) -> bool {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            if subscriber.accepts(self) {
                subscriber.receive(self).map(|()| true)
            } else {
                Ok(false)
            }
        }));

        let failure = match outcome {
            Ok(Ok(accepted)) => return accepted,
            Ok(Err(e)) => e,
            Err(payload) => DeliveryError::Panicked {
                trigger: self.name.clone(),
                message: panic_message(&*payload),
            },
        };
        error!(
            trigger = %self.name,
            subscriber = %subscriber.id(),
            error = %failure,
            "subscriber failed to receive data"
        );
        false
    }

    /// Delivery step: store, broadcast in subscription order, report, go idle.
    fn notify(&self, data: Value) {
        let subscribers = {
            let mut state = lock(&self.state);
            state.data = data;
            state.updated_at = Some(Utc::now());
            state.subscribers.clone()
        };
        self.broadcast(&subscribers);
    }

    fn broadcast(&self, subscribers: &[Arc<dyn Subscriber>]) {
        for subscriber in subscribers {
            self.deliver_to(subscriber.as_ref());
        }

        if let Some(hook) = self.hook.upgrade() {
            hook.on_trigger_completed(self);
        }
        lock(&self.state).running = false;
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("Trigger")
            .field("name", &self.name)
            .field("data", &state.data)
            .field("running", &state.running)
            .field("subscribers", &state.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.snapshot(), f)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Serializable view of a trigger.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSnapshot {
    pub name: String,
    pub data: Value,
    pub running: bool,
    pub arguments: Args,
    pub subscribers: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl fmt::Display for TriggerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Continuation handed to a producer.
///
/// The trigger stays `running` until [`deliver`](Self::deliver) is called.
/// There is no cancellation: dropping a completion without delivering leaves
/// the trigger running, and further fires are rejected as collisions.
#[must_use = "the trigger stays running until the completion delivers"]
pub struct Completion {
    trigger: Arc<Trigger>,
    delivered: bool,
}

impl Completion {
    fn new(trigger: Arc<Trigger>) -> Self {
        Self {
            trigger,
            delivered: false,
        }
    }

    /// The trigger being produced for.
    #[must_use]
    pub fn trigger(&self) -> &Arc<Trigger> {
        &self.trigger
    }

    /// Trigger name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.trigger.name()
    }

    /// Data currently held by the trigger.
    #[must_use]
    pub fn data(&self) -> Option<Value> {
        self.trigger.data()
    }

    /// Arguments the trigger was fired with.
    #[must_use]
    pub fn args(&self) -> Args {
        self.trigger.args()
    }

    /// Store `data` and broadcast it.
    pub fn deliver(mut self, data: Value) {
        self.delivered = true;
        let trigger = Arc::clone(&self.trigger);
        drop(self);
        trigger.notify(data);
    }

    /// Broadcast the trigger's current data unchanged.
    pub fn redeliver(self) {
        let data = self.data().unwrap_or(Value::Null);
        self.deliver(data);
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("trigger", &self.trigger.name())
            .field("delivered", &self.delivered)
            .finish()
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if !self.delivered {
            debug!(trigger = %self.trigger.name(), "completion dropped without delivery, trigger stays running");
        }
    }
}

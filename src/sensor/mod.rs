//! The sensor: registry of triggers and reactions.
//!
//! A [`Sensor`] owns every trigger by name, the reaction graph, and the
//! subscriber id counter. It is a cheap, cloneable handle; clones share the
//! same registry. Construct one explicitly and pass it around, or use
//! [`Sensor::global`] when a single process-wide bus is wanted.
//!
//! Operations that reference a trigger by name create it on first use with a
//! pass-through producer, except [`Sensor::fire`], which requires the
//! trigger to exist.

mod cascade;
pub mod global;
mod shared_state;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use tracing::warn;

use crate::config::SensorConfig;
use crate::reaction::{ReactionGraph, ReactionTargets};
use crate::subscriber::Subscriber;
use crate::sync::{read, write};
use crate::trigger::{pass_through, CompletionHook, FireOutcome, Producer, Trigger, TriggerSnapshot};
use crate::value::{Args, SubscriberId, Value};

pub(crate) struct SensorInner {
    config: SensorConfig,
    triggers: RwLock<HashMap<String, Arc<Trigger>>>,
    reactions: RwLock<ReactionGraph>,
    next_id: AtomicU64,
}

impl SensorInner {
    fn lookup(&self, name: &str) -> Option<Arc<Trigger>> {
        read(&self.triggers).get(name).cloned()
    }
}

/// Handle to a trigger registry.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use stimulus::{producer, Args, Sensor};
///
/// let sensor = Sensor::default();
/// sensor.register_trigger("answer", producer(|c| c.deliver(json!(42))));
/// sensor.fire("answer", Args::new());
///
/// assert_eq!(sensor.trigger_data("answer"), Some(json!(42)));
/// ```
#[derive(Clone)]
pub struct Sensor {
    inner: Arc<SensorInner>,
}

impl Default for Sensor {
    fn default() -> Self {
        Self::new(SensorConfig::default())
    }
}

impl Sensor {
    /// Create an empty registry.
    #[must_use]
    pub fn new(config: SensorConfig) -> Self {
        Self {
            inner: Arc::new(SensorInner {
                config,
                triggers: RwLock::new(HashMap::new()),
                reactions: RwLock::new(ReactionGraph::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Configuration this sensor was built with.
    #[must_use]
    pub fn config(&self) -> &SensorConfig {
        &self.inner.config
    }

    fn hook(&self) -> Weak<dyn CompletionHook> {
        let weak: Weak<SensorInner> = Arc::downgrade(&self.inner);
        weak
    }

    /// Register `name` with `producer`.
    ///
    /// If the trigger exists only its producer is replaced; data and
    /// subscribers are kept.
    pub fn register_trigger(&self, name: &str, producer: Producer) -> &Self {
        let mut triggers = write(&self.inner.triggers);
        if let Some(existing) = triggers.get(name) {
            warn!(trigger = %name, "trigger exists, replacing producer");
            existing.set_producer(producer);
        } else {
            triggers.insert(name.to_string(), Arc::new(Trigger::new(name, producer, self.hook())));
        }
        self
    }

    /// Look up a trigger without creating it.
    #[must_use]
    pub fn trigger(&self, name: &str) -> Option<Arc<Trigger>> {
        self.inner.lookup(name)
    }

    /// Get the trigger for `name`, creating it with a pass-through producer
    /// if it does not exist yet.
    pub fn resolve(&self, name: &str) -> Arc<Trigger> {
        if let Some(trigger) = self.inner.lookup(name) {
            return trigger;
        }

        let mut triggers = write(&self.inner.triggers);
        if let Some(trigger) = triggers.get(name) {
            return Arc::clone(trigger);
        }
        if self.inner.config.warn_on_implicit_create {
            warn!(trigger = %name, "registering missing trigger");
        }
        let trigger = Arc::new(Trigger::new(name, pass_through(), self.hook()));
        triggers.insert(name.to_string(), Arc::clone(&trigger));
        trigger
    }

    /// Current data of `name`, creating the trigger if needed.
    #[must_use]
    pub fn trigger_data(&self, name: &str) -> Option<Value> {
        self.resolve(name).data()
    }

    /// Append `subscriber` to `name`'s subscribers. No immediate delivery.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>, name: &str) -> &Self {
        self.resolve(name).add_subscriber(subscriber);
        self
    }

    /// Subscribe, then hand any data the trigger already holds to the new
    /// subscriber before returning.
    pub fn listen_to(&self, subscriber: Arc<dyn Subscriber>, name: &str) -> &Self {
        let trigger = self.resolve(name);
        trigger.add_subscriber(Arc::clone(&subscriber));
        if trigger.has_data() {
            trigger.deliver_to(subscriber.as_ref());
        }
        self
    }

    /// Run `name`'s producer with `args`.
    ///
    /// The trigger must already exist; a missing name is logged and ignored.
    pub fn fire(&self, name: &str, args: Args) -> FireOutcome {
        let Some(trigger) = self.inner.lookup(name) else {
            warn!(trigger = %name, "cannot fire missing trigger");
            return FireOutcome::Missing;
        };
        trigger.fire(args, Vec::new())
    }

    /// Broadcast `data` on `name` without running its producer.
    pub fn propagate(&self, name: &str, data: Value, args: Args) -> FireOutcome {
        self.resolve(name)
            .propagate(data, args, self.inner.config.guard_propagation)
    }

    /// Fire every target in `targets` whenever `source` completes.
    ///
    /// Cycles are allowed; they are cut at run time.
    pub fn register_reaction(&self, source: &str, targets: impl Into<ReactionTargets>) -> &Self {
        write(&self.inner.reactions).add(source, targets.into());
        self
    }

    /// Reactions registered for `source`.
    #[must_use]
    pub fn reactions(&self, source: &str) -> Vec<String> {
        read(&self.inner.reactions)
            .reactions(source)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    /// Remove `id` from every trigger.
    ///
    /// At most one entry is removed per trigger, so a subscriber registered
    /// twice on the same trigger keeps one subscription there. Returns the
    /// number of entries removed.
    pub fn unsubscribe_all(&self, id: SubscriberId) -> usize {
        let triggers: Vec<Arc<Trigger>> = read(&self.inner.triggers).values().cloned().collect();
        triggers
            .iter()
            .filter(|trigger| trigger.remove_subscriber(id))
            .count()
    }

    /// Allocate the next subscriber id.
    pub fn next_id(&self) -> SubscriberId {
        SubscriberId::from_raw(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Names of all registered triggers, sorted.
    #[must_use]
    pub fn trigger_names(&self) -> Vec<String> {
        let mut names: Vec<String> = read(&self.inner.triggers).keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshots of every trigger, sorted by name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TriggerSnapshot> {
        let mut triggers: Vec<Arc<Trigger>> = read(&self.inner.triggers).values().cloned().collect();
        triggers.sort_by(|a, b| a.name().cmp(b.name()));
        triggers.iter().map(|t| t.snapshot()).collect()
    }
}

impl fmt::Debug for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensor")
            .field("config", &self.inner.config)
            .field("triggers", &self.trigger_names())
            .finish_non_exhaustive()
    }
}

/// One JSON line per trigger.
impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, snapshot) in self.snapshot().iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            fmt::Display::fmt(snapshot, f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::error::DeliveryError;
    use crate::trigger::producer;

    struct Recorder {
        id: SubscriberId,
        seen: Mutex<Vec<Value>>,
    }

    impl Recorder {
        fn new(sensor: &Sensor) -> Arc<Self> {
            Arc::new(Self {
                id: sensor.next_id(),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<Value> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Subscriber for Recorder {
        fn id(&self) -> SubscriberId {
            self.id
        }

        fn receive(&self, trigger: &Trigger) -> Result<(), DeliveryError> {
            self.seen.lock().unwrap().push(trigger.data().unwrap_or(Value::Null));
            Ok(())
        }
    }

    #[test]
    fn register_replaces_producer_but_keeps_state() {
        let sensor = Sensor::default();
        sensor.register_trigger("t", producer(|c| c.deliver(json!(1))));
        let rec = Recorder::new(&sensor);
        sensor.subscribe(rec.clone(), "t");
        sensor.fire("t", Args::new());

        sensor.register_trigger("t", producer(|c| c.deliver(json!(2))));
        assert_eq!(sensor.trigger_data("t"), Some(json!(1)));
        assert_eq!(sensor.trigger("t").unwrap().subscriber_count(), 1);

        sensor.fire("t", Args::new());
        assert_eq!(rec.seen(), vec![json!(1), json!(2)]);
    }

    #[test]
    fn fire_on_missing_trigger_is_a_noop() {
        let sensor = Sensor::default();
        assert_eq!(sensor.fire("nope", Args::new()), FireOutcome::Missing);
        assert!(sensor.trigger("nope").is_none());
    }

    #[test]
    fn subscribe_creates_trigger_implicitly() {
        let sensor = Sensor::default();
        let rec = Recorder::new(&sensor);
        sensor.subscribe(rec.clone(), "lazy");

        let trigger = sensor.trigger("lazy").unwrap();
        assert_eq!(trigger.subscriber_count(), 1);
        assert!(rec.seen().is_empty());

        // Implicit triggers re-deliver whatever they hold.
        assert_eq!(sensor.fire("lazy", Args::new()), FireOutcome::Started);
        assert_eq!(rec.seen(), vec![Value::Null]);
    }

    #[test]
    fn resolve_returns_the_same_trigger() {
        let sensor = Sensor::default();
        let a = sensor.resolve("x");
        let b = sensor.resolve("x");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(sensor.trigger_names(), vec!["x".to_string()]);
    }

    #[test]
    fn listen_to_catches_up_once() {
        let sensor = Sensor::default();
        sensor.propagate("n", json!(0), Args::new());

        let rec = Recorder::new(&sensor);
        sensor.listen_to(rec.clone(), "n");
        assert_eq!(rec.seen(), vec![json!(0)]);
    }

    #[test]
    fn listen_to_without_data_does_not_deliver() {
        let sensor = Sensor::default();
        let rec = Recorder::new(&sensor);
        sensor.listen_to(rec.clone(), "empty");
        assert!(rec.seen().is_empty());
    }

    #[test]
    fn duplicate_subscription_gets_two_deliveries() {
        let sensor = Sensor::default();
        let rec = Recorder::new(&sensor);
        sensor.subscribe(rec.clone(), "d").subscribe(rec.clone(), "d");
        sensor.propagate("d", json!("x"), Args::new());
        assert_eq!(rec.seen().len(), 2);
    }

    #[test]
    fn next_id_is_strictly_increasing() {
        let sensor = Sensor::default();
        let a = sensor.next_id();
        let b = sensor.next_id();
        let c = sensor.next_id();
        assert!(a < b && b < c);
        assert_eq!(a.as_u64(), 0);
    }

    #[test]
    fn clones_share_the_registry() {
        let sensor = Sensor::default();
        let other = sensor.clone();
        other.propagate("shared", json!(true), Args::new());
        assert_eq!(sensor.trigger_data("shared"), Some(json!(true)));
        assert_ne!(sensor.next_id(), other.next_id());
    }

    #[test]
    fn guarded_propagation_respects_running() {
        let sensor = Sensor::new(SensorConfig::default().with_guard_propagation(true));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = Arc::clone(&calls);
        sensor.register_trigger(
            "slow",
            producer(move |_c| {
                calls_in.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(sensor.fire("slow", Args::new()), FireOutcome::Started);
        assert_eq!(sensor.propagate("slow", json!(1), Args::new()), FireOutcome::Collision);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn display_lists_one_line_per_trigger() {
        let sensor = Sensor::default();
        sensor.propagate("b", json!(2), Args::new());
        sensor.propagate("a", json!(1), Args::new());

        let rendered = sensor.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: TriggerSnapshot = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.name, "a");
        assert_eq!(first.data, json!(1));
    }
}

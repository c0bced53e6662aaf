//! Channel-backed subscriber streams.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DeliveryError, StimulusResult, StreamError};
use crate::sensor::Sensor;
use crate::subscriber::Subscriber;
use crate::trigger::Trigger;
use crate::value::{Args, SubscriberId, Value};

/// A delivery observed by a [`TriggerStream`].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusEvent {
    pub event_id: Uuid,
    pub trigger: String,
    pub data: Value,
    pub args: Args,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
struct StreamSink {
    id: SubscriberId,
    tx: Sender<StimulusEvent>,
    dropped: AtomicU64,
}

impl Subscriber for StreamSink {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn receive(&self, trigger: &Trigger) -> Result<(), DeliveryError> {
        let event = StimulusEvent {
            event_id: Uuid::new_v4(),
            trigger: trigger.name().to_string(),
            data: trigger.data().unwrap_or(Value::Null),
            args: trigger.args(),
            timestamp: Utc::now(),
        };

        // Never block the delivering thread: drop if the reader is slow.
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(DeliveryError::Disconnected {
                    subscriber: self.id.as_u64(),
                })
            }
        }
    }
}

/// A subscriber that queues deliveries into a bounded channel.
///
/// Dropping this stream unsubscribes it from every trigger.
#[derive(Debug)]
pub struct TriggerStream {
    sink: Arc<StreamSink>,
    rx: Receiver<StimulusEvent>,
    sensor: Sensor,
    unregistered: AtomicBool,
}

impl TriggerStream {
    /// Create a stream using the sensor's configured capacity.
    #[must_use]
    pub fn new(sensor: &Sensor) -> Self {
        Self::with_capacity(sensor, sensor.config().stream_capacity)
    }

    /// Create a stream buffering at most `capacity` events.
    #[must_use]
    pub fn with_capacity(sensor: &Sensor, capacity: usize) -> Self {
        let (tx, rx) = bounded::<StimulusEvent>(capacity.max(1));
        Self {
            sink: Arc::new(StreamSink {
                id: sensor.next_id(),
                tx,
                dropped: AtomicU64::new(0),
            }),
            rx,
            sensor: sensor.clone(),
            unregistered: AtomicBool::new(false),
        }
    }

    /// The subscriber id backing this stream.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.sink.id
    }

    fn as_subscriber(&self) -> Arc<dyn Subscriber> {
        let sink: Arc<StreamSink> = Arc::clone(&self.sink);
        sink
    }

    /// Queue future deliveries of `name`.
    pub fn follow(&self, name: &str) -> &Self {
        self.sensor.subscribe(self.as_subscriber(), name);
        self
    }

    /// Queue future deliveries of `name`, plus its current data if any.
    pub fn listen_to(&self, name: &str) -> &Self {
        self.sensor.listen_to(self.as_subscriber(), name);
        self
    }

    /// Number of events dropped because the buffer was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.sink.dropped.load(Ordering::Relaxed)
    }

    /// Receive the next event (blocking).
    pub fn recv(&self) -> StimulusResult<StimulusEvent> {
        self.rx.recv().map_err(|_| {
            StreamError::Disconnected {
                subscriber: self.id().as_u64(),
            }
            .into()
        })
    }

    /// Receive the next event with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> StimulusResult<StimulusEvent> {
        self.rx.recv_timeout(timeout).map_err(|err| {
            match err {
                RecvTimeoutError::Timeout => StreamError::Timeout {
                    duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                },
                RecvTimeoutError::Disconnected => StreamError::Disconnected {
                    subscriber: self.id().as_u64(),
                },
            }
            .into()
        })
    }

    /// Receive an event if one is queued.
    #[must_use]
    pub fn try_recv(&self) -> Option<StimulusEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain all queued events.
    #[must_use]
    pub fn drain(&self) -> Vec<StimulusEvent> {
        self.rx.try_iter().collect()
    }

    /// Remove this stream from every trigger. Idempotent.
    pub fn unsubscribe(&self) {
        if self.unregistered.swap(true, Ordering::AcqRel) {
            return;
        }
        while self.sensor.unsubscribe_all(self.id()) > 0 {}
    }
}

impl Drop for TriggerStream {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

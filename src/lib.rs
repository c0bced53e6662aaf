//! # Stimulus - an in-process trigger bus
//!
//! Stimulus is a synchronous publish/subscribe bus. Named triggers hold the
//! latest value of some piece of data and a list of subscribers. Firing a
//! trigger runs its producer, which eventually delivers new data to every
//! subscriber in subscription order. Completing one trigger can fire others
//! ("reactions"), and cyclic reaction graphs are cut at run time.
//!
//! ## Core Concepts
//!
//! - **Sensor**: the registry owning triggers, reactions and subscriber ids
//! - **Trigger**: a named event slot with data, subscribers and a producer
//! - **Subscriber**: anything that can accept and receive trigger data
//! - **Reaction**: "when A completes, fire B"
//! - **Shared state**: a trigger whose data is a map merged from many owners
//!
//! ## Usage
//!
//! ```rust
//! use serde_json::json;
//! use stimulus::{producer, Args, Listener, Sensor};
//!
//! let sensor = Sensor::default();
//! sensor
//!     .register_trigger("user", producer(|c| c.deliver(json!({"name": "ada"}))))
//!     .register_trigger("greeting", producer(|c| {
//!         let user = c.args().get("user").cloned().unwrap_or_default();
//!         c.deliver(json!(format!("hello {}", user["name"].as_str().unwrap_or("?"))));
//!     }))
//!     .register_reaction("user", "greeting");
//!
//! let listener = Listener::new(&sensor);
//! listener.follow("greeting", None);
//!
//! sensor.fire("user", Args::new());
//! assert_eq!(listener.get("greeting"), Some(json!("hello ada")));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod listener;
pub mod reaction;
pub mod sensor;
pub mod stream;
pub mod subscriber;
mod sync;
pub mod trigger;
pub mod value;

// Re-export primary types at crate root for convenience
pub use config::SensorConfig;
pub use error::{DeliveryError, StimulusError, StimulusResult, StreamError};
pub use listener::Listener;
pub use reaction::{ReactionGraph, ReactionTargets};
pub use sensor::Sensor;
pub use stream::{StimulusEvent, TriggerStream};
pub use subscriber::Subscriber;
pub use trigger::{pass_through, producer, Completion, FireOutcome, Producer, Trigger, TriggerSnapshot};
pub use value::{Args, SubscriberId, Value};

//! The subscriber capability.
//!
//! Anything that wants trigger data implements [`Subscriber`]. Triggers hold
//! `Arc<dyn Subscriber>` handles and never manage subscriber lifetime; owners
//! call [`Sensor::unsubscribe_all`](crate::Sensor::unsubscribe_all) before
//! letting a subscriber go.

use crate::error::DeliveryError;
use crate::trigger::Trigger;
use crate::value::SubscriberId;

/// Receives broadcasts from triggers.
///
/// Both methods are called synchronously from inside the trigger's delivery
/// step, with no locks held, so implementations may call back into the
/// sensor (fire, propagate, subscribe).
pub trait Subscriber: Send + Sync {
    /// Identity used for unsubscription and shared-state keys.
    fn id(&self) -> SubscriberId;

    /// Decide whether to accept this trigger's current data.
    fn accepts(&self, _trigger: &Trigger) -> bool {
        true
    }

    /// Consume the trigger's current data.
    ///
    /// An error (or a panic) is logged by the trigger and does not stop
    /// delivery to the remaining subscribers.
    fn receive(&self, trigger: &Trigger) -> Result<(), DeliveryError>;
}

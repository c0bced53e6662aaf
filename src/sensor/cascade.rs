//! Reaction cascades.
//!
//! When a trigger finishes delivering, every reaction registered for it is
//! fired with the completed trigger's data merged into its args. The visited
//! stack grows by one name per hop; a target already on the stack is skipped,
//! which cuts that edge only and lets the rest of the cascade continue.

use tracing::{info, warn};

use crate::sync::read;
use crate::trigger::{CompletionHook, Trigger};
use crate::value::Value;

use super::SensorInner;

impl CompletionHook for SensorInner {
    fn on_trigger_completed(&self, trigger: &Trigger) {
        let reactions = match read(&self.reactions).reactions(trigger.name()) {
            Some(targets) if !targets.is_empty() => targets.to_vec(),
            _ => return,
        };

        let source = trigger.name();
        let mut stack = trigger.stack();
        stack.push(source.to_string());

        let data = trigger.data().unwrap_or(Value::Null);
        let base_args = trigger.args();

        for target in reactions {
            info!(reaction = %target, source = %source, "reaction burning");

            if stack.contains(&target) {
                warn!(reaction = %target, stack = ?stack, "reaction loop detected, skipping");
                continue;
            }

            let Some(reaction) = self.lookup(&target) else {
                warn!(reaction = %target, source = %source, "reaction target is not registered, skipping");
                continue;
            };

            let mut args = base_args.clone();
            args.insert(source.to_string(), data.clone());
            reaction.fire(args, stack.clone());
        }
    }
}

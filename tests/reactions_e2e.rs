use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use stimulus::{producer, Args, Listener, Producer, Sensor, Value};

/// Producer that counts invocations, records its args, and delivers `value`.
fn counting(value: Value, calls: &Arc<AtomicUsize>, seen_args: &Arc<Mutex<Vec<Args>>>) -> Producer {
    let calls = Arc::clone(calls);
    let seen_args = Arc::clone(seen_args);
    producer(move |c| {
        calls.fetch_add(1, Ordering::SeqCst);
        seen_args.lock().unwrap().push(c.args());
        c.deliver(value.clone());
    })
}

#[test]
fn completing_a_fires_b_once_with_a_data_in_args() {
    let sensor = Sensor::default();
    let b_calls = Arc::new(AtomicUsize::new(0));
    let b_args = Arc::new(Mutex::new(Vec::new()));

    sensor
        .register_trigger("a", producer(|c| c.deliver(json!({"id": 1}))))
        .register_trigger("b", counting(json!("b-done"), &b_calls, &b_args))
        .register_reaction("a", "b");

    sensor.fire("a", Args::new());

    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    let args = b_args.lock().unwrap();
    assert_eq!(args[0].get("a"), Some(&json!({"id": 1})));
    assert_eq!(sensor.trigger("b").unwrap().stack(), vec!["a".to_string()]);
}

#[test]
fn two_node_cycle_stops_after_one_lap() {
    let sensor = Sensor::default();
    let a_calls = Arc::new(AtomicUsize::new(0));
    let b_calls = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(Mutex::new(Vec::new()));

    sensor
        .register_trigger("a", counting(json!("a"), &a_calls, &sink))
        .register_trigger("b", counting(json!("b"), &b_calls, &sink))
        .register_reaction("a", "b")
        .register_reaction("b", "a");

    sensor.fire("a", Args::new());

    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    assert!(!sensor.trigger("a").unwrap().is_running());
    assert!(!sensor.trigger("b").unwrap().is_running());
}

#[test]
fn self_reaction_is_skipped() {
    let sensor = Sensor::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(Mutex::new(Vec::new()));

    sensor
        .register_trigger("loop", counting(json!(1), &calls, &sink))
        .register_reaction("loop", "loop");

    sensor.fire("loop", Args::new());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn multi_hop_cycle_is_detected_across_the_cascade() {
    let sensor = Sensor::default();
    let counts: Vec<Arc<AtomicUsize>> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();
    let sink = Arc::new(Mutex::new(Vec::new()));

    sensor
        .register_trigger("a", counting(json!("a"), &counts[0], &sink))
        .register_trigger("b", counting(json!("b"), &counts[1], &sink))
        .register_trigger("c", counting(json!("c"), &counts[2], &sink))
        .register_reaction("a", "b")
        .register_reaction("b", "c")
        .register_reaction("c", "a");

    sensor.fire("a", Args::new());

    for count in &counts {
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
    assert_eq!(sensor.trigger("c").unwrap().stack(), vec!["a".to_string(), "b".to_string()]);

    // The last hop carries every upstream output.
    let args = sink.lock().unwrap();
    let c_args = &args[2];
    assert_eq!(c_args.get("a"), Some(&json!("a")));
    assert_eq!(c_args.get("b"), Some(&json!("b")));
}

#[test]
fn skipped_edge_does_not_abort_remaining_reactions() {
    let sensor = Sensor::default();
    let a_calls = Arc::new(AtomicUsize::new(0));
    let c_calls = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(Mutex::new(Vec::new()));

    sensor
        .register_trigger("a", counting(json!(1), &a_calls, &sink))
        .register_trigger("c", counting(json!(3), &c_calls, &sink))
        .register_reaction("a", ["a", "c"]);

    sensor.fire("a", Args::new());

    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    assert_eq!(c_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn multi_target_registration_fires_each_target() {
    let sensor = Sensor::default();
    let listener = Listener::new(&sensor);

    sensor
        .register_trigger("load", producer(|c| c.deliver(json!([1, 2]))))
        .register_trigger("count", producer(|c| {
            let n = c.args().get("load").and_then(Value::as_array).map_or(0, Vec::len);
            c.deliver(json!(n));
        }))
        .register_trigger("first", producer(|c| {
            let first = c.args().get("load").and_then(|v| v.get(0)).cloned().unwrap_or(Value::Null);
            c.deliver(first);
        }))
        .register_reaction("load", vec!["count".to_string(), "first".to_string()]);

    listener.follow("count", None).follow("first", None);
    sensor.fire("load", Args::new());

    assert_eq!(sensor.reactions("load"), vec!["count", "first"]);
    assert_eq!(listener.get("count"), Some(json!(2)));
    assert_eq!(listener.get("first"), Some(json!(1)));
}

#[test]
fn missing_reaction_target_is_skipped() {
    let sensor = Sensor::default();
    let b_calls = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(Mutex::new(Vec::new()));

    sensor
        .register_trigger("a", producer(|c| c.deliver(json!(1))))
        .register_trigger("b", counting(json!(2), &b_calls, &sink))
        .register_reaction("a", ["ghost", "b"]);

    sensor.fire("a", Args::new());
    assert!(sensor.trigger("ghost").is_none());
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn propagation_also_triggers_reactions() {
    let sensor = Sensor::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let args = Arc::new(Mutex::new(Vec::new()));

    sensor
        .register_trigger("derived", counting(json!("ok"), &calls, &args))
        .register_reaction("input", "derived");

    sensor.propagate("input", json!(5), Args::new());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(args.lock().unwrap()[0].get("input"), Some(&json!(5)));
}

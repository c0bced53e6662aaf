use serde_json::json;

use stimulus::{Listener, Sensor, SubscriberId, TriggerStream, Value};

fn entries(pairs: &[(SubscriberId, Value)]) -> Value {
    Value::Object(pairs.iter().map(|(id, v)| (id.state_key(), v.clone())).collect())
}

#[test]
fn push_push_pop_broadcasts_each_merged_state() {
    let sensor = Sensor::default();
    let observer = TriggerStream::new(&sensor);
    observer.follow("s");

    let sub1 = sensor.next_id();
    let sub2 = sensor.next_id();

    sensor.push_state(sub1, "s", json!(1));
    sensor.push_state(sub2, "s", json!(2));
    sensor.pop_state(sub1, "s");

    let broadcasts: Vec<Value> = observer.drain().into_iter().map(|e| e.data).collect();
    assert_eq!(
        broadcasts,
        vec![
            entries(&[(sub1, json!(1))]),
            entries(&[(sub1, json!(1)), (sub2, json!(2))]),
            entries(&[(sub2, json!(2))]),
        ]
    );
}

#[test]
fn listeners_co_own_a_shared_state() {
    let sensor = Sensor::default();
    let modal_a = Listener::new(&sensor);
    let modal_b = Listener::new(&sensor);
    let overlay = Listener::new(&sensor);
    overlay.listen_to("open_modals", Some(json!({})));

    modal_a.push_state("open_modals", json!(true));
    modal_b.push_state("open_modals", json!(true));
    assert_eq!(
        overlay.get("open_modals"),
        Some(entries(&[(modal_a.id(), json!(true)), (modal_b.id(), json!(true))]))
    );

    modal_a.pop_state("open_modals");
    modal_b.pop_state("open_modals");
    assert_eq!(overlay.get("open_modals"), Some(json!({})));
}

#[test]
fn shared_state_bypasses_the_producer() {
    let sensor = Sensor::default();
    sensor.register_trigger(
        "s",
        stimulus::producer(|c| c.deliver(json!("from producer"))),
    );

    let id = sensor.next_id();
    sensor.push_state(id, "s", json!("mine"));
    assert_eq!(sensor.trigger_data("s"), Some(entries(&[(id, json!("mine"))])));
}

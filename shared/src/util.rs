/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a new entity id (UUID v4)
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate a provider transaction reference scoped to an event.
///
/// Layout: `{event_id}-{epoch_millis}-{random hex}`. The timestamp keeps
/// references sortable per event; the random suffix breaks ties when two
/// checkouts for the same event land in the same millisecond.
pub fn order_reference(event_id: &str) -> String {
    use rand::Rng;
    let suffix: [u8; 4] = rand::thread_rng().r#gen();
    format!("{}-{}-{}", event_id, now_millis(), hex::encode(suffix))
}

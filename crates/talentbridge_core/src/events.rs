use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::{json, Value};

pub const EVENT_WAITING_ROOM_ADMITTED: &str = "waiting-room://admitted";
pub const EVENT_WAITING_ROOM_REMOVED: &str = "waiting-room://removed";
pub const EVENT_WAITING_ROOM_CHANGED: &str = "waiting-room://changed";
pub const EVENT_CALL_STATE: &str = "call://state";
pub const EVENT_CALL_TICK: &str = "call://tick";
pub const EVENT_CALL_CONTROLS: &str = "call://controls";
pub const EVENT_RUNTIME_ERROR: &str = "runtime://error";

type SharedCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Fan-out point for events pushed to the embedding client.
#[derive(Clone, Default)]
pub struct EventEmitter {
    callback: Arc<Mutex<Option<SharedCallback>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        let mut guard = self.callback.lock().expect("callback mutex poisoned");
        *guard = Some(Arc::new(callback));
    }

    pub fn clear_callback(&self) {
        let mut guard = self.callback.lock().expect("callback mutex poisoned");
        *guard = None;
    }

    pub fn emit<T: Serialize>(&self, event: &str, payload: &T) {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(event, %error, "dropping event with unserializable payload");
                return;
            }
        };

        // Clone out of the lock so a callback may re-register itself.
        let callback = {
            let guard = self.callback.lock().expect("callback mutex poisoned");
            guard.clone()
        };
        if let Some(callback) = callback {
            let event_payload = json!({
                "event": event,
                "payload": payload
            });
            callback(event, &event_payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_wraps_payload() {
        let emitter = EventEmitter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        emitter.set_callback(move |event, payload| {
            sink.lock().unwrap().push((event.to_string(), payload.clone()));
        });

        emitter.emit(EVENT_CALL_TICK, &json!({ "elapsedSeconds": 3 }));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, EVENT_CALL_TICK);
        assert_eq!(seen[0].1["event"], EVENT_CALL_TICK);
        assert_eq!(seen[0].1["payload"]["elapsedSeconds"], 3);
    }

    #[test]
    fn test_cleared_callback_receives_nothing() {
        let emitter = EventEmitter::new();
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        emitter.set_callback(move |_, _| *sink.lock().unwrap() += 1);
        emitter.clear_callback();

        emitter.emit(EVENT_CALL_STATE, &json!({}));

        assert_eq!(*seen.lock().unwrap(), 0);
    }
}

//! Structured progress events and the sink they flow through
//!
//! The engine reports what it is doing (retries, cooldowns, admissions,
//! batch lifecycle) as [`ProgressEvent`]s pushed into an injected
//! [`ProgressSink`]. Events are purely observational: nothing a sink does can
//! feed back into scheduling, and the trait is infallible by signature so a
//! sink cannot fail into the engine.

use serde::Serialize;
use serde_json::{Map, Value};

/// A structured progress message with free-form diagnostic fields.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub message: String,
    pub data: Map<String, Value>,
}

/// Receives progress events from the engine.
///
/// Implemented for any `Fn(ProgressEvent)` closure, so a caller can inject
/// `Arc::new(|event| { ... })` directly.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards every event; the default when no sink is injected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Forwards events to `tracing` at info level, with the diagnostic map
/// rendered as a structured field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: ProgressEvent) {
        tracing::info!(data = %serde_json::Value::Object(event.data), "{}", event.message);
    }
}

/// Builds an event from a `json!` object literal and pushes it to `sink`.
/// Non-object payloads degrade to an empty map rather than erroring.
pub(crate) fn emit(sink: &dyn ProgressSink, message: &str, data: Value) {
    let data = match data {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    sink.emit(ProgressEvent {
        message: message.to_string(),
        data,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_closure_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cl = seen.clone();
        let sink = move |event: ProgressEvent| {
            seen_cl.lock().unwrap().push(event.message);
        };

        emit(&sink, "hello", json!({ "n": 1 }));
        assert_eq!(seen.lock().unwrap().as_slice(), ["hello"]);
    }

    #[test]
    fn test_emit_keeps_object_fields() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cl = seen.clone();
        let sink = move |event: ProgressEvent| seen_cl.lock().unwrap().push(event);

        emit(&sink, "with data", json!({ "attempt": 2, "ok": false }));
        emit(&sink, "scalar payload", json!(42));

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].data.get("attempt"), Some(&json!(2)));
        assert_eq!(seen[0].data.get("ok"), Some(&json!(false)));
        assert!(seen[1].data.is_empty());
    }

    #[test]
    fn test_noop_sink_accepts_events() {
        emit(&NoopSink, "dropped", json!({}));
    }
}

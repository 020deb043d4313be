//! Host-side request handler.
//!
//! A request is a document `{verb, id, data}`. Every request gets exactly one
//! response, `{verb: "$response", id, success: {...}}` or
//! `{verb: "$response", id, failure: "message"}`, carrying a `log` string
//! when the kernel printed anything.
//!
//! Supported verbs:
//! - `describe`: `data.packaged_call_name` -> `success.description`, the
//!   filter's description as JSON text.
//! - `call`: `data.packaged_call_name`, `data.num_threads`, `data.inputs` ->
//!   `success.outputs` and `success.time_usec`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use log::{debug, info, warn};
use serde_json::{Map, Value, json};

use crate::call_context::{CallConfig, CallContext, MIN_THREADS};
use crate::codec::SerdeJsonPackager;
use crate::describe::describe_as_json;
use crate::packaged_call::make_packaged_call;
use crate::registry::FilterRegistry;

pub const RESPONSE_VERB: &str = "$response";

pub const BADLY_FORMED_MESSAGE: &str = "badly formed message";
pub const UNKNOWN_VERB: &str = "unknown verb";
pub const DESCRIPTION_FAILED: &str = "Unable to construct description";

/// Source of request handles. Starts at 1 so a handle is never the null handle.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Default)]
struct SinkState {
    log: String,
    response: Option<Value>,
}

/// Call context that produces at most one response for a request.
///
/// Kernel errors become the failure response as soon as they are reported;
/// any later success or failure for the same request is dropped. Kernel
/// prints are accumulated into the response's `log`. Each sink carries a
/// process-unique handle that kernels receive in their opaque-handle argument.
#[derive(Debug)]
pub struct ResponseSink {
    id: String,
    handle: u64,
    config: CallConfig,
    state: Mutex<SinkState>,
}

impl ResponseSink {
    pub fn new(id: impl Into<String>, config: CallConfig) -> Self {
        Self {
            id: id.into(),
            handle: NEXT_HANDLE.fetch_add(1, Ordering::Relaxed),
            config,
            state: Mutex::new(SinkState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn success(&self, success: Value) {
        self.respond("success", success);
    }

    pub fn failure(&self, message: &str) {
        self.respond("failure", Value::from(message));
    }

    pub fn has_responded(&self) -> bool {
        self.lock().response.is_some()
    }

    /// The response, if one was produced.
    pub fn into_response(self) -> Option<Value> {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .response
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn respond(&self, outcome: &str, payload: Value) {
        let mut state = self.lock();
        if state.response.is_some() {
            debug!("request {}: dropping extra {outcome} response", self.id);
            return;
        }
        let mut response = Map::new();
        response.insert("verb".to_string(), Value::from(RESPONSE_VERB));
        response.insert("id".to_string(), Value::from(self.id.as_str()));
        response.insert(outcome.to_string(), payload);
        if !state.log.is_empty() {
            response.insert("log".to_string(), Value::from(state.log.as_str()));
        }
        state.response = Some(Value::Object(response));
    }
}

impl CallContext for ResponseSink {
    fn error(&self, message: &str) {
        self.failure(message);
    }

    fn print(&self, message: &str) {
        let mut state = self.lock();
        state.log.push_str(message);
        state.log.push('\n');
    }

    fn handle(&self) -> u64 {
        self.handle
    }

    fn num_threads(&self) -> usize {
        self.config.get_threads()
    }
}

/// Dispatches verb requests against a filter registry.
#[derive(Debug, Clone, Default)]
pub struct Shell {
    registry: FilterRegistry,
}

impl Shell {
    pub fn new(registry: FilterRegistry) -> Self {
        Self { registry }
    }

    /// A shell over every filter linked into this crate.
    ///
    /// A failed enumeration leaves the shell with no filters; lookups then
    /// fail with the usual not-found message.
    pub fn with_registered_filters() -> Self {
        let registry = FilterRegistry::with_registered_filters().unwrap_or_else(|e| {
            warn!("{e}; starting with no filters");
            FilterRegistry::default()
        });
        Self::new(registry)
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Parses one line of JSON text and handles it as a request.
    pub fn handle_line(&self, line: &str) -> Value {
        match serde_json::from_str::<Value>(line) {
            Ok(message) => self.handle_message(message),
            Err(e) => {
                warn!("unparsable request: {e}");
                badly_formed()
            }
        }
    }

    /// Handles one request document and returns its response.
    pub fn handle_message(&self, message: Value) -> Value {
        let Value::Object(mut request) = message else {
            return badly_formed();
        };
        let verb = request
            .get("verb")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let id = match request.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => String::new(),
        };
        let data = match request.remove("data") {
            Some(Value::Object(data)) => data,
            _ => Map::new(),
        };

        let threads = data
            .get("num_threads")
            .and_then(Value::as_i64)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(MIN_THREADS);
        let sink = ResponseSink::new(id, CallConfig::new().with_threads(threads));
        info!("request {}: {verb}", sink.id());

        match verb.as_str() {
            "describe" => self.describe(&sink, &data),
            "call" => self.call(&sink, data),
            _ => sink.failure(UNKNOWN_VERB),
        }

        let id = sink.id().to_string();
        sink.into_response().unwrap_or_else(|| {
            warn!("request {id}: no response was produced");
            json!({"verb": RESPONSE_VERB, "id": id, "failure": "no response produced"})
        })
    }

    fn describe(&self, sink: &ResponseSink, data: &Map<String, Value>) {
        let name = packaged_call_name(data);
        let info = match self.registry.find(name) {
            Ok(info) => info,
            Err(e) => return sink.failure(&e.to_string()),
        };
        match describe_as_json(info.metadata) {
            Ok(description) => sink.success(json!({ "description": description })),
            Err(e) => {
                warn!("{}: {e}", info.name());
                sink.failure(DESCRIPTION_FAILED);
            }
        }
    }

    fn call(&self, sink: &ResponseSink, data: Map<String, Value>) {
        let name = packaged_call_name(&data).to_string();
        let info = match self.registry.find(&name) {
            Ok(info) => info,
            Err(e) => return sink.failure(&e.to_string()),
        };
        let mut packager = SerdeJsonPackager::from_message(Value::Object(data));
        match make_packaged_call(sink, info, &mut packager) {
            Ok(_) => sink.success(packager.into_results()),
            // The kernel or the engine has normally responded already.
            Err(e) => sink.failure(&e.to_string()),
        }
    }
}

fn packaged_call_name(data: &Map<String, Value>) -> &str {
    data.get("packaged_call_name")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn badly_formed() -> Value {
    json!({"verb": RESPONSE_VERB, "id": "", "failure": BADLY_FORMED_MESSAGE})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_keeps_first_response() {
        let sink = ResponseSink::new("7", CallConfig::new());
        sink.error("kernel exploded");
        sink.success(json!({"late": true}));
        assert!(sink.has_responded());
        assert_eq!(
            sink.into_response().unwrap(),
            json!({"verb": "$response", "id": "7", "failure": "kernel exploded"})
        );
    }

    #[test]
    fn test_sink_attaches_log() {
        let sink = ResponseSink::new("1", CallConfig::new());
        sink.print("hello");
        sink.print("world");
        sink.success(json!({}));
        assert_eq!(
            sink.into_response().unwrap()["log"],
            json!("hello\nworld\n")
        );
    }

    #[test]
    fn test_sink_threads_from_config() {
        let sink = ResponseSink::new("1", CallConfig::new().with_threads(64));
        assert_eq!(sink.num_threads(), 32);
    }

    #[test]
    fn test_each_sink_has_its_own_handle() {
        let first = ResponseSink::new("1", CallConfig::new());
        let second = ResponseSink::new("1", CallConfig::new());
        assert_ne!(first.handle(), 0);
        assert_ne!(second.handle(), 0);
        assert_ne!(first.handle(), second.handle());
    }

    #[test]
    fn test_unknown_verb() {
        let shell = Shell::default();
        let response = shell.handle_message(json!({"verb": "dance", "id": "3", "data": {}}));
        assert_eq!(
            response,
            json!({"verb": "$response", "id": "3", "failure": "unknown verb"})
        );
    }

    #[test]
    fn test_badly_formed_message() {
        let shell = Shell::default();
        assert_eq!(shell.handle_message(json!("describe"))["failure"], json!(BADLY_FORMED_MESSAGE));
        assert_eq!(shell.handle_line("{not json")["failure"], json!(BADLY_FORMED_MESSAGE));
    }
}

//! Scripted interactive service
//!
//! Answers the methods a session sends over a `MockSocket`:
//! - `getTime`, `getScenes`, `getGroups` from configurable state
//! - `capture`, failing for transactions marked as rejected
//! - `ready`, echoed back as `onReady`
//! - anything else with an empty result unless it was sent with `discard`

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use interact_wire::methods;
use interact_wire::{MethodPacket, Packet};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::trace;

use crate::frames::{self, button_scene};
use crate::mock::MockSocket;

/// Error code the service answers rejected captures with
pub const CAPTURE_REJECTED: i32 = 4006;

pub struct ScriptedService {
    server_time_ms: AtomicU64,
    scenes: Mutex<Value>,
    groups: Mutex<Value>,
    rejected_captures: Mutex<HashSet<String>>,
    silent: Mutex<HashSet<String>>,
    received: Mutex<Vec<MethodPacket>>,
}

impl Default for ScriptedService {
    fn default() -> Self {
        ScriptedService {
            server_time_ms: AtomicU64::new(1_000_000),
            scenes: Mutex::new(json!([button_scene("default", &["fire"])])),
            groups: Mutex::new(json!([{"groupID": "default", "sceneID": "default"}])),
            rejected_captures: Mutex::new(HashSet::new()),
            silent: Mutex::new(HashSet::new()),
            received: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedService {
    pub fn new() -> Arc<Self> {
        Arc::new(ScriptedService::default())
    }

    /// Answer `socket`, greeting every connection with `hello`
    pub fn install(self: &Arc<Self>, socket: &MockSocket) {
        let service = Arc::clone(self);
        socket.set_greeting(Some(frames::hello()));
        socket.set_responder(Arc::new(move |socket: &MockSocket, text: &str| {
            service.respond(socket, text)
        }));
    }

    pub fn set_server_time(&self, ms: u64) {
        self.server_time_ms.store(ms, Ordering::Release);
    }

    pub fn set_scenes(&self, scenes: Value) {
        *self.scenes.lock() = scenes;
    }

    pub fn set_groups(&self, groups: Value) {
        *self.groups.lock() = groups;
    }

    pub fn reject_capture(&self, transaction: &str) {
        self.rejected_captures.lock().insert(transaction.to_string());
    }

    /// Never answer `method`
    pub fn silence(&self, method: &str) {
        self.silent.lock().insert(method.to_string());
    }

    /// Methods received, in order
    pub fn received(&self) -> Vec<MethodPacket> {
        self.received.lock().clone()
    }

    pub fn received_named(&self, name: &str) -> Vec<MethodPacket> {
        self.received
            .lock()
            .iter()
            .filter(|m| m.method == name)
            .cloned()
            .collect()
    }

    fn respond(&self, socket: &MockSocket, text: &str) {
        let Ok(Packet::Method(method)) = Packet::parse(text) else {
            return;
        };
        trace!(method = %method.method, id = %method.id, "service received method");
        self.received.lock().push(method.clone());
        if self.silent.lock().contains(&method.method) {
            return;
        }

        let id = method.id.value();
        let result = match method.method.as_str() {
            methods::GET_TIME => json!({"time": self.server_time_ms.load(Ordering::Acquire)}),
            methods::GET_SCENES => json!({"scenes": self.scenes.lock().clone()}),
            methods::GET_GROUPS => json!({"groups": self.groups.lock().clone()}),
            methods::CAPTURE => {
                let tx = method.params["transactionID"].as_str().unwrap_or_default();
                if self.rejected_captures.lock().contains(tx) {
                    socket.deliver(frames::error_frame(id, CAPTURE_REJECTED, "insufficient sparks"));
                    return;
                }
                json!({})
            }
            methods::READY => {
                let is_ready = method.params["isReady"].as_bool().unwrap_or(false);
                socket.deliver(frames::method_frame(methods::ON_READY, json!({"isReady": is_ready})));
                json!({})
            }
            _ => json!({}),
        };
        if !method.discard {
            socket.deliver(frames::reply_frame(id, result));
        }
    }
}

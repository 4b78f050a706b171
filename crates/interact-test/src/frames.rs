//! Service-originated frames

use std::sync::atomic::{AtomicU32, Ordering};

use interact_wire::methods;
use serde_json::{json, Value};

static NEXT_ID: AtomicU32 = AtomicU32::new(1_000_000);

/// A method frame from the service. Service events never expect a reply.
pub fn method_frame(method: &str, params: Value) -> String {
    json!({
        "type": "method",
        "id": NEXT_ID.fetch_add(1, Ordering::Relaxed),
        "method": method,
        "params": params,
        "discard": true,
    })
    .to_string()
}

pub fn reply_frame(id: u32, result: Value) -> String {
    json!({"type": "reply", "id": id, "result": result}).to_string()
}

pub fn error_frame(id: u32, code: i32, message: &str) -> String {
    json!({"type": "reply", "id": id, "error": {"code": code, "message": message}}).to_string()
}

pub fn hello() -> String {
    method_frame(methods::HELLO, json!({}))
}

/// `giveInput` for a button press or release
pub fn button_input(participant: &str, control: &str, pressed: bool, transaction: Option<&str>) -> String {
    let mut params = json!({
        "participantID": participant,
        "input": {
            "controlID": control,
            "event": if pressed { "mousedown" } else { "mouseup" },
        },
    });
    if let Some(tx) = transaction {
        params["transactionID"] = json!(tx);
    }
    method_frame(methods::GIVE_INPUT, params)
}

pub fn participant_join(session_id: &str, username: &str) -> String {
    method_frame(
        methods::ON_PARTICIPANT_JOIN,
        json!({ "participants": [{ "sessionID": session_id, "username": username }] }),
    )
}

pub fn participant_leave(session_id: &str) -> String {
    method_frame(
        methods::ON_PARTICIPANT_LEAVE,
        json!({ "participants": [{ "sessionID": session_id }] }),
    )
}

pub fn control_create(scene: &str, control: &str, kind: &str) -> String {
    method_frame(
        methods::ON_CONTROL_CREATE,
        json!({ "sceneID": scene, "controls": [{ "controlID": control, "kind": kind }] }),
    )
}

/// One scene holding buttons named by `controls`
pub fn button_scene(scene: &str, controls: &[&str]) -> Value {
    let controls: Vec<_> = controls
        .iter()
        .map(|id| json!({ "controlID": id, "kind": "button", "text": id }))
        .collect();
    json!({ "sceneID": scene, "controls": controls })
}

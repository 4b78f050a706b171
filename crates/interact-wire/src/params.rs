//! Parameter builders for client-originated methods

use interact_core::{ControlId, GroupId, ParticipantId, SceneId, TransactionId};
use serde_json::{json, Map, Value};

use crate::methods::{self, keys};

/// Which traffic a bandwidth throttle applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThrottleKind {
    /// Every method
    Global,
    Input,
    ParticipantJoin,
    ParticipantLeave,
}

impl ThrottleKind {
    /// Key the throttle is registered under
    pub fn method(self) -> &'static str {
        match self {
            ThrottleKind::Global => "*",
            ThrottleKind::Input => methods::GIVE_INPUT,
            ThrottleKind::ParticipantJoin => methods::ON_PARTICIPANT_JOIN,
            ThrottleKind::ParticipantLeave => methods::ON_PARTICIPANT_LEAVE,
        }
    }
}

/// Empty params for the bootstrap getters
pub fn empty() -> Value {
    Value::Object(Map::new())
}

pub fn ready(is_ready: bool) -> Value {
    json!({ "isReady": is_ready })
}

pub fn capture(transaction: &TransactionId) -> Value {
    json!({ "transactionID": transaction })
}

/// `updateControls` setting a single property on one control
pub fn set_control_property(scene: &SceneId, control: &ControlId, key: &str, value: Value) -> Value {
    let mut entry = Map::new();
    entry.insert(keys::CONTROL_ID.to_string(), json!(control));
    entry.insert(key.to_string(), value);
    json!({
        "sceneID": scene,
        "controls": [Value::Object(entry)],
    })
}

/// `updateControls` carrying a cooldown deadline in server milliseconds
pub fn cooldown(scene: &SceneId, control: &ControlId, deadline_ms: u64) -> Value {
    json!({
        "sceneID": scene,
        "priority": 1,
        "controls": [{ "controlID": control, "cooldown": deadline_ms }],
    })
}

/// `createGroups` / `updateGroups`
pub fn groups<'a>(entries: impl IntoIterator<Item = (&'a GroupId, &'a SceneId)>) -> Value {
    let groups: Vec<Value> = entries
        .into_iter()
        .map(|(group, scene)| json!({ "groupID": group, "sceneID": scene }))
        .collect();
    json!({ "groups": groups })
}

/// `updateParticipants` moving one participant to a group
pub fn participant_group(participant: &ParticipantId, group: &GroupId) -> Value {
    json!({
        "participants": [{ "sessionID": participant, "groupID": group }],
        "priority": 0,
    })
}

/// `setBandwidthThrottle`
pub fn bandwidth_throttle(kind: ThrottleKind, max_bytes: u32, bytes_per_second: u32) -> Value {
    let mut params = Map::new();
    params.insert(
        kind.method().to_string(),
        json!({ "capacity": max_bytes, "drainRate": bytes_per_second }),
    );
    Value::Object(params)
}

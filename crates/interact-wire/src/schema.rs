//! Typed payload schemas
//!
//! Only the fields the client interprets are typed. Everything else is kept
//! in a flattened property bag so nothing the service sends is lost.

use interact_core::{
    ControlId, GroupId, InteractiveError, InteractiveResult, ParticipantId, SceneId,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::methods::keys;

fn default_scene() -> SceneId {
    SceneId::default_scene()
}

/// Control as sent by the service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlRecord {
    #[serde(rename = "controlID")]
    pub id: ControlId,
    #[serde(default)]
    pub kind: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl ControlRecord {
    /// Full property object, including `controlID` and `kind`
    pub fn into_object(self) -> Map<String, Value> {
        let mut object = self.properties;
        object.insert(keys::CONTROL_ID.to_string(), Value::String(self.id.0));
        object.insert(keys::KIND.to_string(), Value::String(self.kind));
        object
    }
}

/// Scene as sent by the service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    #[serde(rename = "sceneID")]
    pub id: SceneId,
    #[serde(default)]
    pub controls: Vec<ControlRecord>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// `getScenes` result and `updateScenes` params
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenesPayload {
    #[serde(default)]
    pub scenes: Vec<SceneRecord>,
}

/// `onControlCreate` / `onControlUpdate` / `onControlDelete` params
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlsPayload {
    #[serde(rename = "sceneID")]
    pub scene: SceneId,
    #[serde(default)]
    pub controls: Vec<ControlRecord>,
}

/// Group as sent by the service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    #[serde(rename = "groupID")]
    pub id: GroupId,
    #[serde(rename = "sceneID", default = "default_scene")]
    pub scene: SceneId,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// `getGroups` result and `onGroupCreate` / `onGroupUpdate` params
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupsPayload {
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
}

/// Participant as sent by the service
///
/// Updates may carry any subset of fields, so everything but the id is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    #[serde(rename = "sessionID")]
    pub id: ParticipantId,
    #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(rename = "lastInputAt", default, skip_serializing_if = "Option::is_none")]
    pub last_input_at: Option<u64>,
    #[serde(rename = "connectedAt", default, skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(rename = "groupID", default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
}

/// `onParticipantJoin` / `onParticipantLeave` / `onParticipantUpdate` params
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantsPayload {
    #[serde(default)]
    pub participants: Vec<ParticipantRecord>,
}

/// `getTime` result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeReply {
    /// Server clock in unix milliseconds
    pub time: u64,
}

/// `onReady` params
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyPayload {
    #[serde(rename = "isReady")]
    pub is_ready: bool,
}

/// Decode a typed payload from method params or reply results
pub fn decode<T: serde::de::DeserializeOwned>(value: Value) -> InteractiveResult<T> {
    serde_json::from_value(value).map_err(|e| InteractiveError::UnrecognizedDataFormat(e.to_string()))
}

#[derive(Deserialize)]
struct HostRecord {
    address: String,
}

/// Parse the host discovery response `[{"address": "wss://..."}, ...]`
pub fn parse_hosts(body: &str) -> InteractiveResult<Vec<String>> {
    let value: Value = serde_json::from_str(body)?;
    let hosts: Vec<HostRecord> = decode(value)?;
    Ok(hosts
        .into_iter()
        .map(|h| h.address)
        .filter(|a| !a.is_empty())
        .collect())
}

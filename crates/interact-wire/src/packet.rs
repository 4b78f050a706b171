//! Method / reply envelope
//!
//! Every socket frame is one JSON object tagged by `type`:
//!
//! ```text
//! {"type":"method","id":7,"method":"giveInput","params":{..},"discard":false,"seq":12}
//! {"type":"reply","id":7,"result":{..},"error":null,"seq":12}
//! ```

use interact_core::{InteractiveError, InteractiveResult, PacketId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// RPC method, sent by either side
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodPacket {
    pub id: PacketId,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    /// Sender does not want a reply
    #[serde(default)]
    pub discard: bool,
    /// Latest sequence number seen by the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u32>,
}

impl MethodPacket {
    pub fn new(id: PacketId, method: impl Into<String>, params: Value, discard: bool) -> Self {
        MethodPacket {
            id,
            method: method.into(),
            params,
            discard,
            seq: None,
        }
    }
}

/// Error object carried by a reply
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyError {
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl From<ReplyError> for InteractiveError {
    fn from(e: ReplyError) -> Self {
        InteractiveError::Rpc {
            code: e.code,
            message: e.message,
            path: e.path,
        }
    }
}

/// Reply to a method, correlated by `id`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplyPacket {
    pub id: PacketId,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ReplyError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u32>,
}

impl ReplyPacket {
    pub fn ok(id: PacketId, result: Value) -> Self {
        ReplyPacket {
            id,
            result: Some(result),
            error: None,
            seq: None,
        }
    }

    pub fn err(id: PacketId, code: i32, message: impl Into<String>) -> Self {
        ReplyPacket {
            id,
            result: None,
            error: Some(ReplyError {
                code,
                message: message.into(),
                path: None,
            }),
            seq: None,
        }
    }

    /// Result payload, or the server error converted into an `InteractiveError`
    pub fn into_result(self) -> InteractiveResult<Value> {
        match self.error {
            Some(e) => Err(e.into()),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One socket frame
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Packet {
    Method(MethodPacket),
    Reply(ReplyPacket),
}

impl Packet {
    /// Parse a text frame.
    ///
    /// Text that is not JSON yields `JsonParse`; JSON that is not a method
    /// or reply yields `UnrecognizedDataFormat`.
    pub fn parse(text: &str) -> InteractiveResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        serde_json::from_value(value)
            .map_err(|e| InteractiveError::UnrecognizedDataFormat(e.to_string()))
    }

    /// Serialize to a text frame
    pub fn to_text(&self) -> InteractiveResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    #[inline]
    pub fn id(&self) -> PacketId {
        match self {
            Packet::Method(m) => m.id,
            Packet::Reply(r) => r.id,
        }
    }

    #[inline]
    pub fn seq(&self) -> Option<u32> {
        match self {
            Packet::Method(m) => m.seq,
            Packet::Reply(r) => r.seq,
        }
    }
}

impl From<MethodPacket> for Packet {
    fn from(m: MethodPacket) -> Self {
        Packet::Method(m)
    }
}

impl From<ReplyPacket> for Packet {
    fn from(r: ReplyPacket) -> Self {
        Packet::Reply(r)
    }
}

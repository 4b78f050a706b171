//! Cached entities and property access

use interact_core::{
    ControlId, GroupId, InteractiveError, InteractiveResult, ParticipantId, PropertyType, SceneId,
};
use interact_wire::methods::keys;
use interact_wire::{ControlRecord, ParticipantRecord};
use serde_json::{Map, Value};

use crate::Handle;

/// Control and its full property object
#[derive(Clone, Debug, PartialEq)]
pub struct Control {
    pub id: ControlId,
    pub kind: String,
    /// Owning scene
    pub scene: SceneId,
    /// Every field the service sent, including `controlID` and `kind`
    pub properties: Map<String, Value>,
}

impl Control {
    pub fn from_record(scene: SceneId, record: ControlRecord) -> Self {
        let id = record.id.clone();
        let kind = record.kind.clone();
        Control {
            id,
            kind,
            scene,
            properties: record.into_object(),
        }
    }

    /// Merge fields into the property object; absent fields are left untouched
    pub fn merge(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            if key == keys::KIND {
                if let Value::String(kind) = &value {
                    self.kind = kind.clone();
                }
            }
            if key == keys::CONTROL_ID {
                continue;
            }
            self.properties.insert(key, value);
        }
    }

    pub fn property(&self, key: &str) -> InteractiveResult<&Value> {
        self.properties
            .get(key)
            .ok_or_else(|| InteractiveError::PropertyNotFound(key.to_string()))
    }

    /// `meta/<key>/value`
    pub fn meta_property(&self, key: &str) -> InteractiveResult<&Value> {
        self.meta()
            .and_then(|meta| meta.get(key))
            .and_then(|entry| entry.get(keys::VALUE))
            .ok_or_else(|| InteractiveError::PropertyNotFound(format!("meta/{key}")))
    }

    fn meta(&self) -> Option<&Map<String, Value>> {
        self.properties.get(keys::META).and_then(Value::as_object)
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Property at `index` in enumeration order, with its type
    pub fn property_at(&self, index: usize) -> InteractiveResult<(&str, PropertyType)> {
        self.properties
            .iter()
            .nth(index)
            .map(|(k, v)| (k.as_str(), PropertyType::of(v)))
            .ok_or_else(|| InteractiveError::PropertyNotFound(format!("#{index}")))
    }

    pub fn meta_property_count(&self) -> usize {
        self.meta().map(Map::len).unwrap_or(0)
    }

    /// Meta property at `index`, typed by its `value` field
    pub fn meta_property_at(&self, index: usize) -> InteractiveResult<(&str, PropertyType)> {
        self.meta()
            .and_then(|meta| meta.iter().nth(index))
            .map(|(k, v)| {
                let ty = v.get(keys::VALUE).map(PropertyType::of).unwrap_or(PropertyType::Null);
                (k.as_str(), ty)
            })
            .ok_or_else(|| InteractiveError::PropertyNotFound(format!("meta#{index}")))
    }

    /// Cooldown deadline in server milliseconds, if one was set
    pub fn cooldown(&self) -> Option<u64> {
        self.properties.get(keys::COOLDOWN).and_then(Value::as_u64)
    }

    pub fn set_cooldown(&mut self, deadline_ms: u64) {
        self.properties
            .insert(keys::COOLDOWN.to_string(), Value::from(deadline_ms));
    }
}

fn type_error(key: &str) -> InteractiveError {
    InteractiveError::InvalidPropertyType(key.to_string())
}

/// Typed reads of a JSON property value
pub trait PropertyValue: Sized {
    fn from_property(key: &str, value: &Value) -> InteractiveResult<Self>;
}

impl PropertyValue for i32 {
    fn from_property(key: &str, value: &Value) -> InteractiveResult<Self> {
        value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| type_error(key))
    }
}

impl PropertyValue for i64 {
    fn from_property(key: &str, value: &Value) -> InteractiveResult<Self> {
        value.as_i64().ok_or_else(|| type_error(key))
    }
}

impl PropertyValue for bool {
    fn from_property(key: &str, value: &Value) -> InteractiveResult<Self> {
        value.as_bool().ok_or_else(|| type_error(key))
    }
}

impl PropertyValue for f32 {
    fn from_property(key: &str, value: &Value) -> InteractiveResult<Self> {
        value.as_f64().map(|v| v as f32).ok_or_else(|| type_error(key))
    }
}

impl PropertyValue for String {
    fn from_property(key: &str, value: &Value) -> InteractiveResult<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| type_error(key))
    }
}

impl Control {
    /// Typed property read
    pub fn get<T: PropertyValue>(&self, key: &str) -> InteractiveResult<T> {
        T::from_property(key, self.property(key)?)
    }

    /// Typed meta property read
    pub fn get_meta<T: PropertyValue>(&self, key: &str) -> InteractiveResult<T> {
        T::from_property(key, self.meta_property(key)?)
    }
}

/// Copy a string into a caller buffer, failing with the required size when it does not fit.
///
/// Returns the number of bytes written.
pub fn copy_str(value: &str, buf: &mut [u8]) -> InteractiveResult<usize> {
    let bytes = value.as_bytes();
    if buf.len() < bytes.len() {
        return Err(InteractiveError::BufferTooSmall {
            required: bytes.len(),
        });
    }
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len())
}

/// Scene and the ordered handles of its controls
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub id: SceneId,
    pub controls: Vec<Handle>,
    pub properties: Map<String, Value>,
}

/// Group and the scene it currently shows
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub id: GroupId,
    pub scene: SceneId,
    pub properties: Map<String, Value>,
}

/// Participant connected to the session
#[derive(Clone, Debug, PartialEq)]
pub struct Participant {
    pub id: ParticipantId,
    pub user_id: u32,
    pub username: String,
    pub level: u32,
    /// Server-clock milliseconds
    pub last_input_at: u64,
    /// Server-clock milliseconds
    pub connected_at: u64,
    pub disabled: bool,
    pub group: GroupId,
}

impl Participant {
    pub fn new(id: ParticipantId) -> Self {
        Participant {
            id,
            user_id: 0,
            username: String::new(),
            level: 0,
            last_input_at: 0,
            connected_at: 0,
            disabled: false,
            group: GroupId::default_group(),
        }
    }

    /// Apply the fields present in `record`
    pub fn merge(&mut self, record: ParticipantRecord) {
        if let Some(user_id) = record.user_id {
            self.user_id = user_id;
        }
        if let Some(username) = record.username {
            self.username = username;
        }
        if let Some(level) = record.level {
            self.level = level;
        }
        if let Some(at) = record.last_input_at {
            self.last_input_at = at;
        }
        if let Some(at) = record.connected_at {
            self.connected_at = at;
        }
        if let Some(disabled) = record.disabled {
            self.disabled = disabled;
        }
        if let Some(group) = record.group {
            self.group = group;
        }
    }
}

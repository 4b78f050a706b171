//! Batched updates
//!
//! A batch collects entries for one collection method (`updateControls`,
//! `updateParticipants`, `createGroups`, `updateGroups`, `updateScenes`) and
//! sends them as a single method:
//!
//! ```text
//! {"priority": 1, "sceneID": "default", "controls": [{"controlID": "fire", ...}, ...]}
//! ```

use std::collections::HashSet;

use interact_core::{InteractiveError, InteractiveResult, PacketId};
use interact_wire::methods::{self, keys};
use interact_wire::ReplyPacket;
use serde_json::{Map, Value};

use crate::engine::SessionCore;
use crate::rpc::ReplyHandler;
use crate::session::Session;

/// Builder for one batched method
pub struct Batch<'s> {
    session: &'s Session,
    method: String,
    collection: &'static str,
    id_key: &'static str,
    params: Map<String, Value>,
    entries: Vec<Map<String, Value>>,
    ids: HashSet<String>,
}

impl Session {
    /// Start a batch for `method`
    pub fn batch(&self, method: &str) -> InteractiveResult<Batch<'_>> {
        let (Some(collection), Some(id_key)) = (methods::collection_key(method), methods::entry_id_key(method)) else {
            return Err(InteractiveError::UnknownMethod(method.to_string()));
        };
        Ok(Batch {
            session: self,
            method: method.to_string(),
            collection,
            id_key,
            params: Map::new(),
            entries: Vec::new(),
            ids: HashSet::new(),
        })
    }
}

impl<'s> Batch<'s> {
    /// Set a top-level parameter such as `sceneID`
    pub fn param(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn priority(&mut self, priority: i32) -> &mut Self {
        self.param(keys::PRIORITY, priority)
    }

    /// Add an entry for `id`. Each id may appear once per batch.
    pub fn entry(&mut self, id: &str) -> InteractiveResult<BatchEntry<'_>> {
        if id.is_empty() {
            return Err(InteractiveError::InvalidArgument("batch entry id is empty"));
        }
        if !self.ids.insert(id.to_string()) {
            return Err(InteractiveError::DuplicateEntry(id.to_string()));
        }
        let mut object = Map::new();
        object.insert(self.id_key.to_string(), Value::String(id.to_string()));
        self.entries.push(object);
        let index = self.entries.len() - 1;
        Ok(BatchEntry {
            object: &mut self.entries[index],
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Params as they would be sent
    pub fn to_params(&self) -> Value {
        let mut params = self.params.clone();
        params.insert(
            self.collection.to_string(),
            Value::Array(self.entries.iter().cloned().map(Value::Object).collect()),
        );
        Value::Object(params)
    }

    /// Queue the batch. Error replies become error events.
    pub fn commit(self) -> InteractiveResult<PacketId> {
        let core = &self.session.core;
        core.require_connected()?;
        if self.entries.is_empty() {
            return Err(InteractiveError::InvalidArgument("batch has no entries"));
        }
        let params = self.to_params();
        let hook = |core: &SessionCore, reply: ReplyPacket| {
            if let Some(err) = reply.error {
                core.report(err.into());
            }
        };
        Ok(core.enqueue_method(
            &self.method,
            params,
            Some(ReplyHandler::Immediate(Box::new(hook))),
        ))
    }
}

/// One object in a batch
pub struct BatchEntry<'b> {
    object: &'b mut Map<String, Value>,
}

impl BatchEntry<'_> {
    /// Set a field; the entry id field cannot be overwritten
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        if !self.object.contains_key(key) || !is_id_key(key) {
            self.object.insert(key.to_string(), value.into());
        }
        self
    }

    /// Set a field nested under `path`, creating objects along the way.
    ///
    /// `set_path(&["meta", "color", "value"], "red")`
    pub fn set_path(&mut self, path: &[&str], value: impl Into<Value>) -> InteractiveResult<&mut Self> {
        let Some((last, parents)) = path.split_last() else {
            return Err(InteractiveError::InvalidArgument("empty property path"));
        };
        let mut object: &mut Map<String, Value> = &mut *self.object;
        for key in parents {
            let slot = object
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            object = slot
                .as_object_mut()
                .ok_or_else(|| InteractiveError::InvalidPropertyType(key.to_string()))?;
        }
        object.insert(last.to_string(), value.into());
        Ok(self)
    }

    /// Append to an array field, creating it if missing
    pub fn push(&mut self, key: &str, value: impl Into<Value>) -> InteractiveResult<&mut Self> {
        let slot = self
            .object
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        slot.as_array_mut()
            .ok_or_else(|| InteractiveError::InvalidPropertyType(key.to_string()))?
            .push(value.into());
        Ok(self)
    }
}

fn is_id_key(key: &str) -> bool {
    matches!(
        key,
        keys::CONTROL_ID | keys::SESSION_ID | keys::GROUP_ID | keys::SCENE_ID
    )
}

//! Scene cache - scenes, controls, groups and participants with their indexes
//!
//! INVARIANT: every scene, control, group and participant id appears at most
//! once in its index, and every indexed handle is live in its arena.

use std::collections::HashMap;

use interact_core::{
    ControlId, GroupId, InteractiveError, InteractiveResult, ParticipantId, SceneId,
};
use interact_wire::{ControlRecord, GroupRecord, ParticipantRecord, SceneRecord};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{Arena, Control, Group, Handle, Participant, Scene};

/// In-memory mirror of the service's interactive state
#[derive(Debug, Default)]
pub struct SceneCache {
    scenes: Arena<Scene>,
    scene_index: HashMap<SceneId, Handle>,
    /// Scene ids in service order
    scene_order: Vec<SceneId>,
    controls: Arena<Control>,
    control_index: HashMap<ControlId, Handle>,
    groups: HashMap<GroupId, Group>,
    group_order: Vec<GroupId>,
    participants: HashMap<ParticipantId, Participant>,
    /// group -> participant ids, in join order
    members: HashMap<GroupId, Vec<ParticipantId>>,
}

impl SceneCache {
    pub fn new() -> Self {
        SceneCache::default()
    }

    // ---------------------------------------------------------------------
    // Scenes and controls
    // ---------------------------------------------------------------------

    /// Replace every scene and control. Returns control ids dropped because an
    /// earlier scene already claimed them.
    pub fn replace_scenes(&mut self, scenes: Vec<SceneRecord>) -> Vec<ControlId> {
        self.scenes.clear();
        self.scene_index.clear();
        self.scene_order.clear();
        self.controls.clear();
        self.control_index.clear();

        let mut dropped = Vec::new();
        for scene in scenes {
            dropped.extend(self.upsert_scene(scene));
        }
        debug!(
            scenes = self.scenes.len(),
            controls = self.controls.len(),
            "scene cache replaced"
        );
        dropped
    }

    /// Insert a scene, or replace one with the same id and all of its controls.
    /// Returns control ids dropped as duplicates of other scenes' controls.
    pub fn upsert_scene(&mut self, record: SceneRecord) -> Vec<ControlId> {
        if let Some(handle) = self.scene_index.get(&record.id).copied() {
            self.remove_scene_controls(handle);
        }

        let mut dropped = Vec::new();
        let mut handles = Vec::with_capacity(record.controls.len());
        for control in record.controls {
            if self.control_index.contains_key(&control.id) {
                warn!(control = %control.id, scene = %record.id, "duplicate control id dropped");
                dropped.push(control.id);
                continue;
            }
            let id = control.id.clone();
            let handle = self
                .controls
                .insert(Control::from_record(record.id.clone(), control));
            self.control_index.insert(id, handle);
            handles.push(handle);
        }

        match self.scene_index.get(&record.id).copied() {
            Some(handle) => {
                if let Some(scene) = self.scenes.get_mut(handle) {
                    scene.controls = handles;
                    scene.properties = record.properties;
                }
            }
            None => {
                let id = record.id.clone();
                let handle = self.scenes.insert(Scene {
                    id: record.id,
                    controls: handles,
                    properties: record.properties,
                });
                self.scene_index.insert(id.clone(), handle);
                self.scene_order.push(id);
            }
        }
        dropped
    }

    fn remove_scene_controls(&mut self, scene: Handle) {
        let handles = match self.scenes.get_mut(scene) {
            Some(scene) => std::mem::take(&mut scene.controls),
            None => return,
        };
        for handle in handles {
            if let Some(control) = self.controls.remove(handle) {
                self.control_index.remove(&control.id);
            }
        }
    }

    /// Append a new control to a scene
    pub fn create_control(&mut self, scene: &SceneId, record: ControlRecord) -> InteractiveResult<()> {
        let scene_handle = *self
            .scene_index
            .get(scene)
            .ok_or_else(|| InteractiveError::ObjectNotFound(scene.to_string()))?;
        if self.control_index.contains_key(&record.id) {
            return Err(InteractiveError::DuplicateEntry(record.id.to_string()));
        }

        let id = record.id.clone();
        let handle = self.controls.insert(Control::from_record(scene.clone(), record));
        self.control_index.insert(id, handle);
        if let Some(scene) = self.scenes.get_mut(scene_handle) {
            scene.controls.push(handle);
        }
        Ok(())
    }

    /// Merge fields into an existing control
    pub fn update_control(&mut self, record: ControlRecord) -> InteractiveResult<()> {
        let control = self.control_mut(record.id.as_str())?;
        let mut patch = record.properties;
        if !record.kind.is_empty() {
            patch.insert(interact_wire::methods::keys::KIND.to_string(), Value::String(record.kind));
        }
        control.merge(patch);
        Ok(())
    }

    /// Remove a control from its scene. Unknown ids are ignored.
    pub fn delete_control(&mut self, id: &ControlId) -> Option<Control> {
        let handle = self.control_index.remove(id)?;
        let control = self.controls.remove(handle)?;
        if let Some(scene_handle) = self.scene_index.get(&control.scene).copied() {
            if let Some(scene) = self.scenes.get_mut(scene_handle) {
                scene.controls.retain(|h| *h != handle);
            }
        }
        Some(control)
    }

    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scene_index.get(id).and_then(|h| self.scenes.get(*h))
    }

    pub fn scene_ids(&self) -> &[SceneId] {
        &self.scene_order
    }

    pub fn scene_count(&self) -> usize {
        self.scene_order.len()
    }

    /// Controls of a scene in service order
    pub fn scene_controls(&self, id: &str) -> InteractiveResult<Vec<&Control>> {
        let scene = self
            .scene(id)
            .ok_or_else(|| InteractiveError::ObjectNotFound(id.to_string()))?;
        Ok(scene
            .controls
            .iter()
            .filter_map(|h| self.controls.get(*h))
            .collect())
    }

    /// Groups currently showing a scene
    pub fn scene_groups(&self, id: &str) -> Vec<GroupId> {
        self.group_order
            .iter()
            .filter(|g| self.groups.get(*g).map(|g| g.scene.as_str() == id).unwrap_or(false))
            .cloned()
            .collect()
    }

    pub fn control(&self, id: &str) -> InteractiveResult<&Control> {
        self.control_index
            .get(id)
            .and_then(|h| self.controls.get(*h))
            .ok_or_else(|| InteractiveError::ObjectNotFound(id.to_string()))
    }

    pub fn control_mut(&mut self, id: &str) -> InteractiveResult<&mut Control> {
        let handle = *self
            .control_index
            .get(id)
            .ok_or_else(|| InteractiveError::ObjectNotFound(id.to_string()))?;
        self.controls
            .get_mut(handle)
            .ok_or_else(|| InteractiveError::ObjectNotFound(id.to_string()))
    }

    pub fn control_count(&self) -> usize {
        self.control_index.len()
    }

    // ---------------------------------------------------------------------
    // Groups
    // ---------------------------------------------------------------------

    /// Replace every group. The `default` group is added if missing.
    pub fn replace_groups(&mut self, groups: Vec<GroupRecord>) {
        self.groups.clear();
        self.group_order.clear();
        self.merge_groups(groups);
        let default = GroupId::default_group();
        if !self.groups.contains_key(&default) {
            self.insert_group(Group {
                id: default,
                scene: SceneId::default_scene(),
                properties: Map::new(),
            });
        }
    }

    /// Insert unknown groups, merge known ones
    pub fn merge_groups(&mut self, groups: Vec<GroupRecord>) {
        for record in groups {
            match self.groups.get_mut(&record.id) {
                Some(group) => {
                    group.scene = record.scene;
                    group.properties.extend(record.properties);
                }
                None => self.insert_group(Group {
                    id: record.id,
                    scene: record.scene,
                    properties: record.properties,
                }),
            }
        }
    }

    fn insert_group(&mut self, group: Group) {
        self.group_order.push(group.id.clone());
        self.groups.insert(group.id.clone(), group);
    }

    /// Point a group at a scene, returning the scene it showed before
    pub fn set_group_scene(&mut self, group: &GroupId, scene: &SceneId) -> InteractiveResult<SceneId> {
        let entry = self
            .groups
            .get_mut(group)
            .ok_or_else(|| InteractiveError::ObjectNotFound(group.to_string()))?;
        Ok(std::mem::replace(&mut entry.scene, scene.clone()))
    }

    pub fn group(&self, id: &str) -> Option<&Group> {
        self.groups.get(id)
    }

    pub fn group_ids(&self) -> &[GroupId] {
        &self.group_order
    }

    // ---------------------------------------------------------------------
    // Participants
    // ---------------------------------------------------------------------

    /// Insert a participant, or merge into the existing entry
    pub fn participant_join(&mut self, record: ParticipantRecord) -> &Participant {
        let id = record.id.clone();
        if self.participants.contains_key(&id) {
            self.participant_update(record);
        } else {
            let mut participant = Participant::new(id.clone());
            participant.merge(record);
            self.members
                .entry(participant.group.clone())
                .or_default()
                .push(id.clone());
            self.participants.insert(id.clone(), participant);
        }
        &self.participants[&id]
    }

    /// Merge fields into a known participant, moving it between groups if needed
    pub fn participant_update(&mut self, record: ParticipantRecord) -> Option<&Participant> {
        let participant = self.participants.get_mut(&record.id)?;
        let previous = participant.group.clone();
        participant.merge(record);
        let current = participant.group.clone();
        let id = participant.id.clone();

        if previous != current {
            self.remove_member(&previous, &id);
            self.members.entry(current).or_default().push(id.clone());
        }
        self.participants.get(&id)
    }

    pub fn participant_leave(&mut self, id: &ParticipantId) -> Option<Participant> {
        let participant = self.participants.remove(id)?;
        self.remove_member(&participant.group, id);
        Some(participant)
    }

    fn remove_member(&mut self, group: &GroupId, id: &ParticipantId) {
        if let Some(list) = self.members.get_mut(group) {
            list.retain(|p| p != id);
            if list.is_empty() {
                self.members.remove(group);
            }
        }
    }

    pub fn participant(&self, id: &str) -> InteractiveResult<&Participant> {
        self.participants
            .get(id)
            .ok_or_else(|| InteractiveError::ObjectNotFound(id.to_string()))
    }

    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.participants.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn group_members(&self, group: &str) -> &[ParticipantId] {
        self.members.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Drop everything, e.g. before a fresh bootstrap
    pub fn clear(&mut self) {
        *self = SceneCache::default();
    }
}

//! Event dispatch on the application thread
//!
//! Cache mutations driven by service methods happen here, under the cache
//! write lock, and the lock is released before any callback runs.

use interact_core::{
    ControlChange, Input, InteractiveError, InteractiveResult, ParticipantAction, SceneId,
};
use interact_wire::methods;
use interact_wire::schema::decode;
use interact_wire::{
    decode_input, ControlsPayload, GroupsPayload, MethodPacket, ParticipantsPayload, ReadyPayload,
    ScenesPayload,
};
use tracing::{debug, trace, warn};

use crate::queue::IncomingEvent;
use crate::session::Session;

impl Session {
    pub(crate) fn dispatch(&self, event: IncomingEvent) {
        match event {
            IncomingEvent::Error(err) => self.notify_error(&err),
            IncomingEvent::StateChange(change) => {
                if let Some(callback) = self.callbacks().state_changed {
                    callback(self, change.previous, change.current);
                }
            }
            IncomingEvent::HttpResponse { response, handler } => handler(self, response),
            IncomingEvent::RpcReply { result, handler, .. } => handler(self, result),
            IncomingEvent::RpcMethod(method) => {
                if let Err(err) = self.dispatch_method(method) {
                    warn!(code = err.reported_code(), error = %err, "method dispatch failed");
                    self.notify_error(&err);
                }
            }
        }
    }

    pub(crate) fn notify_error(&self, err: &InteractiveError) {
        if let Some(callback) = self.callbacks().error {
            callback(self, err.reported_code(), &err.reported_message());
        }
    }

    fn dispatch_method(&self, method: MethodPacket) -> InteractiveResult<()> {
        trace!(method = %method.method, id = %method.id, "dispatching method");
        match method.method.as_str() {
            methods::ON_READY => {
                let payload: ReadyPayload = decode(method.params)?;
                self.core.apply_ready(payload.is_ready);
                Ok(())
            }
            methods::GIVE_INPUT | methods::ON_INPUT => self.dispatch_input(method),
            methods::ON_PARTICIPANT_JOIN => self.dispatch_participants(method, ParticipantAction::Join),
            methods::ON_PARTICIPANT_LEAVE => self.dispatch_participants(method, ParticipantAction::Leave),
            methods::ON_PARTICIPANT_UPDATE => {
                self.dispatch_participants(method, ParticipantAction::Update)
            }
            methods::ON_GROUP_CREATE | methods::ON_GROUP_UPDATE => {
                let payload: GroupsPayload = decode(method.params)?;
                self.core.cache.write().merge_groups(payload.groups);
                Ok(())
            }
            methods::ON_CONTROL_CREATE => self.dispatch_controls(method, ControlChange::Created),
            methods::ON_CONTROL_UPDATE => self.dispatch_controls(method, ControlChange::Updated),
            methods::ON_CONTROL_DELETE => self.dispatch_controls(method, ControlChange::Deleted),
            methods::UPDATE_SCENES => {
                let payload: ScenesPayload = decode(method.params)?;
                let mut cache = self.core.cache.write();
                for scene in payload.scenes {
                    let dropped = cache.upsert_scene(scene);
                    if !dropped.is_empty() {
                        warn!(count = dropped.len(), "duplicate control ids dropped from scene update");
                    }
                }
                Ok(())
            }
            _ => {
                debug!(method = %method.method, "unhandled method");
                if let Some(callback) = self.callbacks().unhandled_method {
                    callback(self, &method);
                }
                Ok(())
            }
        }
    }

    fn dispatch_input(&self, method: MethodPacket) -> InteractiveResult<()> {
        let decoded = decode_input(method.params)?;
        let control_kind = self.core.cache.read().control(decoded.control.as_str())?.kind.clone();

        let input = Input {
            participant: decoded.participant,
            control: decoded.control,
            control_kind,
            transaction: decoded.transaction,
            kind: decoded.kind,
            raw: decoded.raw,
        };
        if let Some(callback) = self.callbacks().input {
            callback(self, &input);
        }
        Ok(())
    }

    fn dispatch_participants(&self, method: MethodPacket, action: ParticipantAction) -> InteractiveResult<()> {
        let payload: ParticipantsPayload = decode(method.params)?;
        let callback = self.callbacks().participants_changed;

        for record in payload.participants {
            let participant = {
                let mut cache = self.core.cache.write();
                match action {
                    ParticipantAction::Join => Some(cache.participant_join(record).clone()),
                    ParticipantAction::Update => cache.participant_update(record).cloned(),
                    ParticipantAction::Leave => cache.participant_leave(&record.id),
                }
            };
            match (participant, &callback) {
                (Some(participant), Some(callback)) => callback(self, action, &participant),
                (None, _) => debug!(?action, "participant not cached"),
                _ => {}
            }
        }
        Ok(())
    }

    fn dispatch_controls(&self, method: MethodPacket, change: ControlChange) -> InteractiveResult<()> {
        let payload: ControlsPayload = decode(method.params)?;
        let scene: SceneId = payload.scene;
        let callback = self.callbacks().control_changed;

        for record in payload.controls {
            let id = record.id.clone();
            let control = {
                let mut cache = self.core.cache.write();
                match change {
                    ControlChange::Created => {
                        if let Err(err) = cache.create_control(&scene, record) {
                            drop(cache);
                            self.notify_error(&err);
                            continue;
                        }
                        cache.control(id.as_str()).ok().cloned()
                    }
                    ControlChange::Updated => match cache.update_control(record) {
                        Ok(()) => cache.control(id.as_str()).ok().cloned(),
                        Err(err) => {
                            drop(cache);
                            self.notify_error(&err);
                            continue;
                        }
                    },
                    ControlChange::Deleted => cache.delete_control(&id),
                }
            };
            if let (Some(control), Some(callback)) = (control, &callback) {
                callback(self, change, &control);
            }
        }
        Ok(())
    }
}

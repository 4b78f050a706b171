//! Cache accessors and client-originated operations
//!
//! Accessors read under the shared cache lock and return owned snapshots.
//! Operations that talk to the service require the session to be connected.

use std::time::Duration;

use interact_core::{
    ControlId, GroupId, InteractiveError, InteractiveResult, PacketId, ParticipantId,
    PropertyType, SceneId, SessionState, TransactionId,
};
use interact_state::{copy_str, Control, Participant, PropertyValue};
use interact_transport::{HttpRequest, HttpResponse};
use interact_wire::params::{self, ThrottleKind};
use interact_wire::{methods, GroupRecord, ReplyPacket};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::engine::SessionCore;
use crate::rpc::ReplyHandler;
use crate::session::Session;

/// Hook that turns an error reply into an error event
fn report_reply_errors() -> ReplyHandler {
    ReplyHandler::Immediate(Box::new(|core: &SessionCore, reply: ReplyPacket| {
        if let Some(err) = reply.error {
            core.report(err.into());
        }
    }))
}

impl Session {
    // ---------------------------------------------------------------------
    // Scenes
    // ---------------------------------------------------------------------

    pub fn scene_ids(&self) -> Vec<SceneId> {
        self.core.cache.read().scene_ids().to_vec()
    }

    /// Groups currently showing `scene`
    pub fn scene_groups(&self, scene: &str) -> Vec<GroupId> {
        self.core.cache.read().scene_groups(scene)
    }

    /// Control ids of `scene` in service order
    pub fn scene_controls(&self, scene: &str) -> InteractiveResult<Vec<ControlId>> {
        let cache = self.core.cache.read();
        Ok(cache
            .scene_controls(scene)?
            .into_iter()
            .map(|c| c.id.clone())
            .collect())
    }

    // ---------------------------------------------------------------------
    // Groups
    // ---------------------------------------------------------------------

    pub fn group_ids(&self) -> Vec<GroupId> {
        self.core.cache.read().group_ids().to_vec()
    }

    pub fn group_scene(&self, group: &str) -> InteractiveResult<SceneId> {
        self.core
            .cache
            .read()
            .group(group)
            .map(|g| g.scene.clone())
            .ok_or_else(|| InteractiveError::ObjectNotFound(group.to_string()))
    }

    /// Participants in `group`, in join order
    pub fn group_participants(&self, group: &str) -> Vec<ParticipantId> {
        self.core.cache.read().group_members(group).to_vec()
    }

    /// Create a group showing `scene` (the default scene when `None`).
    ///
    /// The group is cached once the service accepts it.
    pub fn create_group(&self, group: &str, scene: Option<&str>) -> InteractiveResult<PacketId> {
        self.core.require_connected()?;
        if group.is_empty() {
            return Err(InteractiveError::InvalidArgument("group id is empty"));
        }
        let group = GroupId::from(group);
        let scene = scene.map(SceneId::from).unwrap_or_else(SceneId::default_scene);
        if self.core.cache.read().group(group.as_str()).is_some() {
            return Err(InteractiveError::DuplicateEntry(group.to_string()));
        }

        let params = params::groups([(&group, &scene)]);
        let hook = move |core: &SessionCore, reply: ReplyPacket| match reply.error {
            Some(err) => core.report(err.into()),
            None => core.cache.write().merge_groups(vec![GroupRecord {
                id: group,
                scene,
                properties: Map::new(),
            }]),
        };
        Ok(self.core.enqueue_method(
            methods::CREATE_GROUPS,
            params,
            Some(ReplyHandler::Immediate(Box::new(hook))),
        ))
    }

    /// Point `group` at `scene`. The cache changes now and is rolled back if
    /// the service rejects the update.
    pub fn set_group_scene(&self, group: &str, scene: &str) -> InteractiveResult<PacketId> {
        self.core.require_connected()?;
        let group = GroupId::from(group);
        let scene = SceneId::from(scene);
        let previous = {
            let mut cache = self.core.cache.write();
            if cache.scene(scene.as_str()).is_none() {
                return Err(InteractiveError::ObjectNotFound(scene.to_string()));
            }
            cache.set_group_scene(&group, &scene)?
        };

        let params = params::groups([(&group, &scene)]);
        let hook = move |core: &SessionCore, reply: ReplyPacket| {
            let Some(err) = reply.error else {
                return;
            };
            {
                let mut cache = core.cache.write();
                let unchanged = cache.group(group.as_str()).map(|g| g.scene == scene).unwrap_or(false);
                if unchanged {
                    debug!(group = %group, scene = %previous, "group scene rolled back");
                    let _ = cache.set_group_scene(&group, &previous);
                }
            }
            core.report(err.into());
        };
        Ok(self.core.enqueue_method(
            methods::UPDATE_GROUPS,
            params,
            Some(ReplyHandler::Immediate(Box::new(hook))),
        ))
    }

    // ---------------------------------------------------------------------
    // Controls
    // ---------------------------------------------------------------------

    /// Snapshot of a cached control
    pub fn control(&self, id: &str) -> InteractiveResult<Control> {
        self.core.cache.read().control(id).cloned()
    }

    pub fn control_kind(&self, id: &str) -> InteractiveResult<String> {
        Ok(self.core.cache.read().control(id)?.kind.clone())
    }

    pub fn control_property_count(&self, id: &str) -> InteractiveResult<usize> {
        Ok(self.core.cache.read().control(id)?.property_count())
    }

    /// Name and type of the property at `index`
    pub fn control_property_at(&self, id: &str, index: usize) -> InteractiveResult<(String, PropertyType)> {
        let cache = self.core.cache.read();
        let (name, ty) = cache.control(id)?.property_at(index)?;
        Ok((name.to_string(), ty))
    }

    pub fn control_property<T: PropertyValue>(&self, id: &str, key: &str) -> InteractiveResult<T> {
        self.core.cache.read().control(id)?.get(key)
    }

    pub fn control_meta_property_count(&self, id: &str) -> InteractiveResult<usize> {
        Ok(self.core.cache.read().control(id)?.meta_property_count())
    }

    pub fn control_meta_property_at(
        &self,
        id: &str,
        index: usize,
    ) -> InteractiveResult<(String, PropertyType)> {
        let cache = self.core.cache.read();
        let (name, ty) = cache.control(id)?.meta_property_at(index)?;
        Ok((name.to_string(), ty))
    }

    pub fn control_meta_property<T: PropertyValue>(&self, id: &str, key: &str) -> InteractiveResult<T> {
        self.core.cache.read().control(id)?.get_meta(key)
    }

    /// Copy a string property into `buf`, returning the bytes written
    pub fn copy_control_property_string(&self, id: &str, key: &str, buf: &mut [u8]) -> InteractiveResult<usize> {
        let value: String = self.control_property(id, key)?;
        copy_str(&value, buf)
    }

    /// Ask the service to change one property. The cache follows the
    /// service's `onControlUpdate`.
    pub fn set_control_property(
        &self,
        id: &str,
        key: &str,
        value: impl Into<Value>,
    ) -> InteractiveResult<PacketId> {
        self.core.require_connected()?;
        if key.is_empty() {
            return Err(InteractiveError::InvalidArgument("property key is empty"));
        }
        let (scene, control) = {
            let cache = self.core.cache.read();
            let control = cache.control(id)?;
            (control.scene.clone(), control.id.clone())
        };
        let params = params::set_control_property(&scene, &control, key, value.into());
        Ok(self
            .core
            .enqueue_method(methods::UPDATE_CONTROLS, params, Some(report_reply_errors())))
    }

    /// Put a control on cooldown for `duration`, measured on the server clock
    pub fn trigger_cooldown(&self, id: &str, duration: Duration) -> InteractiveResult<PacketId> {
        self.core.require_connected()?;
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        let deadline = self
            .core
            .server_clock
            .cooldown_deadline(self.core.clock.now_ms(), duration_ms);

        let (scene, control) = {
            let mut cache = self.core.cache.write();
            let control = cache.control_mut(id)?;
            control.set_cooldown(deadline);
            (control.scene.clone(), control.id.clone())
        };
        debug!(control = %control, deadline, "cooldown triggered");
        let params = params::cooldown(&scene, &control, deadline);
        Ok(self
            .core
            .enqueue_method(methods::UPDATE_CONTROLS, params, Some(report_reply_errors())))
    }

    /// Time left on a control's cooldown; zero when none is running
    pub fn remaining_cooldown(&self, id: &str) -> InteractiveResult<Duration> {
        let deadline = self.core.cache.read().control(id)?.cooldown();
        let remaining = deadline
            .map(|d| self.core.server_clock.remaining(self.core.clock.now_ms(), d))
            .unwrap_or(0);
        Ok(Duration::from_millis(remaining))
    }

    // ---------------------------------------------------------------------
    // Participants
    // ---------------------------------------------------------------------

    /// Participant ids, sorted
    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.core.cache.read().participant_ids()
    }

    /// Snapshot of a cached participant
    pub fn participant(&self, id: &str) -> InteractiveResult<Participant> {
        self.core.cache.read().participant(id).cloned()
    }

    pub fn copy_participant_username(&self, id: &str, buf: &mut [u8]) -> InteractiveResult<usize> {
        let cache = self.core.cache.read();
        copy_str(&cache.participant(id)?.username, buf)
    }

    /// Ask the service to move a participant to `group`
    pub fn set_participant_group(&self, participant: &str, group: &str) -> InteractiveResult<PacketId> {
        self.core.require_connected()?;
        let (participant, group) = {
            let cache = self.core.cache.read();
            let participant = cache.participant(participant)?.id.clone();
            let group = cache
                .group(group)
                .map(|g| g.id.clone())
                .ok_or_else(|| InteractiveError::ObjectNotFound(group.to_string()))?;
            (participant, group)
        };
        let params = params::participant_group(&participant, &group);
        Ok(self
            .core
            .enqueue_method(methods::UPDATE_PARTICIPANTS, params, Some(report_reply_errors())))
    }

    // ---------------------------------------------------------------------
    // Transactions and throttling
    // ---------------------------------------------------------------------

    /// Capture a spark transaction. The outcome arrives through the
    /// transaction-complete callback.
    pub fn capture_transaction(&self, transaction: &str) -> InteractiveResult<PacketId> {
        self.core.require_connected()?;
        if transaction.is_empty() {
            return Err(InteractiveError::InvalidArgument("transaction id is empty"));
        }
        let transaction = TransactionId::from(transaction);
        let params = params::capture(&transaction);
        let on_reply = move |session: &Session, result: InteractiveResult<Value>| {
            let (code, message) = match &result {
                Ok(_) => (0, String::new()),
                Err(err) => (err.reported_code(), err.reported_message()),
            };
            if let Some(callback) = session.callbacks().transaction_complete {
                callback(session, &transaction, code, &message);
            }
        };
        Ok(self.core.enqueue_method(
            methods::CAPTURE,
            params,
            Some(ReplyHandler::Deferred(Box::new(on_reply))),
        ))
    }

    /// Limit how fast the service sends one kind of traffic
    pub fn set_bandwidth_throttle(
        &self,
        kind: ThrottleKind,
        max_bytes: u32,
        bytes_per_second: u32,
    ) -> InteractiveResult<PacketId> {
        self.core.require_connected()?;
        let params = params::bandwidth_throttle(kind, max_bytes, bytes_per_second);
        Ok(self.core.enqueue_method(
            methods::SET_BANDWIDTH_THROTTLE,
            params,
            Some(report_reply_errors()),
        ))
    }

    // ---------------------------------------------------------------------
    // Raw methods and HTTP
    // ---------------------------------------------------------------------

    /// Queue a method; `on_reply` runs inside `run` when the reply arrives
    pub fn queue_method(
        &self,
        method: &str,
        params: Value,
        on_reply: impl FnOnce(&Session, InteractiveResult<Value>) + Send + 'static,
    ) -> InteractiveResult<PacketId> {
        self.core.require_connected()?;
        if method.is_empty() {
            return Err(InteractiveError::InvalidArgument("method is empty"));
        }
        Ok(self
            .core
            .enqueue_method(method, params, Some(ReplyHandler::Deferred(Box::new(on_reply)))))
    }

    /// Queue a method. Unless `discard`, collect the reply with `receive_reply`.
    pub fn send_method(&self, method: &str, params: Value, discard: bool) -> InteractiveResult<PacketId> {
        self.core.require_connected()?;
        if method.is_empty() {
            return Err(InteractiveError::InvalidArgument("method is empty"));
        }
        let handler = (!discard).then_some(ReplyHandler::Await);
        Ok(self.core.enqueue_method(method, params, handler))
    }

    /// Block until the reply to a `send_method` call arrives
    pub fn receive_reply(&self, id: PacketId, timeout: Duration) -> InteractiveResult<Value> {
        let core = &self.core;
        core.replies.wait(id, timeout, || core.is_shutdown())
    }

    /// Perform an HTTP request on the outgoing thread; `on_response` runs
    /// inside `run`. Failed requests are retried.
    pub fn queue_request(
        &self,
        request: HttpRequest,
        on_response: impl FnOnce(&Session, HttpResponse) + Send + 'static,
    ) -> InteractiveResult<PacketId> {
        if self.core.is_shutdown() {
            return Err(InteractiveError::Cancelled);
        }
        if request.uri.is_empty() {
            return Err(InteractiveError::InvalidArgument("request uri is empty"));
        }
        if self.state() == SessionState::Disconnected {
            warn!(uri = %request.uri, "request queued before connect");
        }
        Ok(self.core.enqueue_http(request, Some(Box::new(on_response))))
    }

    /// Current estimate of `local - server` clock offset in milliseconds
    pub fn server_time_offset(&self) -> i64 {
        self.core.server_clock.offset_ms()
    }
}

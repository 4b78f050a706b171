//! Public session handle

use std::sync::atomic::Ordering;
use std::sync::Arc;

use interact_core::{InteractiveError, InteractiveResult, SessionState};
use interact_time::{SystemClock, TimeSource};
use interact_transport::{HttpClient, WebSocket};
use tracing::info;

use crate::config::SessionConfig;
use crate::engine::{Credentials, SessionCore};
use crate::worker::spawn_workers;

/// One interactive session
///
/// Owns the worker threads; dropping the session closes it.
pub struct Session {
    pub(crate) core: Arc<SessionCore>,
}

impl Session {
    /// Create a disconnected session over the given transports
    pub fn new(
        config: SessionConfig,
        http: Arc<dyn HttpClient>,
        socket: Arc<dyn WebSocket>,
    ) -> InteractiveResult<Self> {
        Session::with_clock(config, http, socket, Arc::new(SystemClock))
    }

    /// Create a session reading local time from `clock`
    pub fn with_clock(
        config: SessionConfig,
        http: Arc<dyn HttpClient>,
        socket: Arc<dyn WebSocket>,
        clock: Arc<dyn TimeSource>,
    ) -> InteractiveResult<Self> {
        config.validate()?;
        Ok(Session {
            core: Arc::new(SessionCore::new(config, http, socket, clock)),
        })
    }

    /// Create a session over `ureq` and `tungstenite`
    #[cfg(feature = "native")]
    pub fn native(config: SessionConfig) -> InteractiveResult<Self> {
        Session::new(
            config,
            Arc::new(interact_transport::UreqHttpClient::default()),
            Arc::new(interact_transport::TungsteniteSocket::new()),
        )
    }

    pub fn config(&self) -> &SessionConfig {
        &self.core.config
    }

    pub fn state(&self) -> SessionState {
        self.core.state()
    }

    /// Start connecting in the background.
    ///
    /// Progress is reported through state-change events. With `set_ready`
    /// the session goes ready as soon as it is connected.
    pub fn connect(
        &self,
        auth: &str,
        version_id: &str,
        share_code: Option<&str>,
        set_ready: bool,
    ) -> InteractiveResult<()> {
        if auth.is_empty() {
            return Err(InteractiveError::InvalidArgument("auth is empty"));
        }
        if version_id.is_empty() {
            return Err(InteractiveError::InvalidArgument("version_id is empty"));
        }
        if self.core.is_shutdown() {
            return Err(InteractiveError::Cancelled);
        }

        self.core.begin_connecting()?;
        *self.core.credentials.lock() = Some(Credentials {
            auth: auth.to_string(),
            version_id: version_id.to_string(),
            share_code: share_code.map(str::to_string),
        });
        self.core.auto_ready.store(set_ready, Ordering::Release);
        info!(version_id, share_code = share_code.is_some(), "session connecting");

        if let Err(e) = spawn_workers(&self.core) {
            self.core.begin_shutdown();
            let _ = self.core.workers.join(self.core.config.close_timeout);
            self.core.force_disconnected();
            return Err(e);
        }
        Ok(())
    }

    /// Toggle whether participants may give input
    pub fn set_ready(&self, ready: bool) -> InteractiveResult<()> {
        self.core.set_ready(ready)
    }

    /// Dispatch up to `max_events` queued events on this thread.
    ///
    /// `0` means the configured `max_incoming_events`. Returns the number of
    /// events dispatched.
    pub fn run(&self, max_events: usize) -> InteractiveResult<usize> {
        if self.core.is_shutdown() {
            return Err(InteractiveError::Cancelled);
        }
        let limit = match max_events {
            0 => self.core.config.max_incoming_events,
            n => n,
        };

        let mut dispatched = 0;
        for event in self.core.take_incoming(limit) {
            if self.core.is_shutdown() {
                return Err(InteractiveError::Cancelled);
            }
            self.dispatch(event);
            dispatched += 1;
        }
        Ok(dispatched)
    }

    /// Close the socket and join the worker threads.
    ///
    /// No callback fires once this has been called. Closing twice is a no-op.
    pub fn close(&self) -> InteractiveResult<()> {
        if !self.core.begin_shutdown() {
            return Ok(());
        }
        info!("session closing");
        let joined = self.core.workers.join(self.core.config.close_timeout);
        self.core.force_disconnected();
        info!("session closed");
        joined
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use interact_core::{ControlChange, Input, ParticipantAction};
    use parking_lot::Mutex;
    use crate::queue::OutgoingItem;
    use interact_core::PacketId;
    use interact_wire::params::ThrottleKind;
    use interact_wire::{methods, MethodPacket};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn connected() -> Session {
        let session = testing::session();
        session.core.begin_connecting().unwrap();
        session.core.transition(SessionState::Connected);
        let scenes = serde_json::from_value(json!([
            {"sceneID": "default", "controls": [{"controlID": "fire", "kind": "button", "text": "Fire"}]}
        ]))
        .unwrap();
        session.core.cache.write().replace_scenes(scenes);
        session.run(0).unwrap();
        session
    }

    fn method_frame(method: &str, params: Value) -> String {
        json!({"type": "method", "id": 100, "method": method, "params": params, "discard": true}).to_string()
    }

    /// Methods queued for the outgoing thread, in order
    fn queued(session: &Session) -> Vec<MethodPacket> {
        session
            .core
            .take_outgoing()
            .0
            .into_iter()
            .filter_map(|item| match item {
                OutgoingItem::Method(method) => Some(method),
                OutgoingItem::Http { .. } => None,
            })
            .collect()
    }

    fn reply_ok(id: PacketId) -> String {
        json!({"type": "reply", "id": id.value(), "result": {}}).to_string()
    }

    fn reply_err(id: PacketId, code: i32) -> String {
        json!({"type": "reply", "id": id.value(), "error": {"code": code, "message": "rejected"}}).to_string()
    }

    /// Scenes `default` and `shop`, groups `default` and `red`
    fn with_groups(session: &Session) {
        let scenes = serde_json::from_value(json!([
            {"sceneID": "default", "controls": []},
            {"sceneID": "shop", "controls": []}
        ]))
        .unwrap();
        let groups = serde_json::from_value(json!([{"groupID": "red", "sceneID": "default"}])).unwrap();
        let mut cache = session.core.cache.write();
        cache.replace_scenes(scenes);
        cache.replace_groups(groups);
    }

    fn errors(session: &Session) -> Arc<Mutex<Vec<i32>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.on_error(move |_, code, _| sink.lock().push(code));
        seen
    }

    #[test]
    fn test_connect_validates_arguments() {
        let session = testing::session();
        assert_eq!(
            session.connect("", "1234", None, false),
            Err(InteractiveError::InvalidArgument("auth is empty"))
        );
        assert_eq!(
            session.connect("Bearer t", "", None, false),
            Err(InteractiveError::InvalidArgument("version_id is empty"))
        );
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_close_is_terminal() {
        let session = testing::session();
        assert_eq!(session.close(), Ok(()));
        assert_eq!(session.close(), Ok(()));
        assert_eq!(session.run(0), Err(InteractiveError::Cancelled));
        assert_eq!(
            session.connect("Bearer t", "1234", None, false),
            Err(InteractiveError::Cancelled)
        );
    }

    #[test]
    fn test_operations_require_connection() {
        let session = testing::session();
        assert_eq!(session.set_ready(true), Err(InteractiveError::NotConnected));
        assert_eq!(session.capture_transaction("tx"), Err(InteractiveError::NotConnected));
        assert_eq!(
            session.send_method("custom", json!({}), true),
            Err(InteractiveError::NotConnected)
        );
        assert_eq!(session.create_group("red", None), Err(InteractiveError::NotConnected));
    }

    #[test]
    fn test_connect_spawns_and_close_joins() {
        let session = testing::session();
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&changes);
        session.on_state_changed(move |_, previous, current| sink.lock().push((previous, current)));

        session.connect("Bearer t", "1234", Some("share"), false).unwrap();
        assert_eq!(session.state(), SessionState::Connecting);
        assert_eq!(
            session.connect("Bearer t", "1234", None, false),
            Err(InteractiveError::InvalidState("connect"))
        );

        session.run(0).unwrap();
        assert!(changes
            .lock()
            .contains(&(SessionState::Disconnected, SessionState::Connecting)));

        assert_eq!(session.close(), Ok(()));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_input_resolves_control_kind() {
        let session = connected();
        let inputs: Arc<Mutex<Vec<Input>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&inputs);
        session.on_input(move |_, input| sink.lock().push(input.clone()));

        session.core.handle_frame(&method_frame(
            "giveInput",
            json!({"participantID": "p1", "transactionID": "tx9", "input": {"controlID": "fire", "event": "mousedown"}}),
        ));
        assert_eq!(session.run(0), Ok(1));

        let inputs = inputs.lock();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].control_kind, "button");
        assert_eq!(inputs[0].participant.as_str(), "p1");
        assert_eq!(inputs[0].transaction.as_ref().map(|t| t.as_str()), Some("tx9"));
    }

    #[test]
    fn test_input_for_unknown_control_reports_error() {
        let session = connected();
        let errors = errors(&session);
        let called = Arc::new(Mutex::new(false));
        let sink = Arc::clone(&called);
        session.on_input(move |_, _| *sink.lock() = true);

        session.core.handle_frame(&method_frame(
            "giveInput",
            json!({"participantID": "p1", "input": {"controlID": "missing", "event": "mousedown"}}),
        ));
        session.run(0).unwrap();

        assert!(!*called.lock());
        assert_eq!(
            *errors.lock(),
            vec![InteractiveError::ObjectNotFound("missing".into()).reported_code()]
        );
    }

    #[test]
    fn test_participant_join_and_leave() {
        let session = connected();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.on_participants_changed(move |_, action, participant| {
            sink.lock().push((action, participant.username.clone()))
        });

        session.core.handle_frame(&method_frame(
            "onParticipantJoin",
            json!({"participants": [{"sessionID": "p1", "username": "ana"}]}),
        ));
        session.run(0).unwrap();
        assert_eq!(session.participant("p1").unwrap().username, "ana");

        session.core.handle_frame(&method_frame(
            "onParticipantLeave",
            json!({"participants": [{"sessionID": "p1"}]}),
        ));
        session.run(0).unwrap();
        assert!(session.participant("p1").is_err());
        assert_eq!(
            *seen.lock(),
            vec![
                (ParticipantAction::Join, "ana".to_string()),
                (ParticipantAction::Leave, "ana".to_string()),
            ]
        );
    }

    #[test]
    fn test_control_lifecycle_events() {
        let session = connected();
        let errors = errors(&session);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.on_control_changed(move |_, change, control| sink.lock().push((change, control.id.clone())));

        session.core.handle_frame(&method_frame(
            "onControlCreate",
            json!({"sceneID": "default", "controls": [{"controlID": "fire", "kind": "button"}]}),
        ));
        session.run(0).unwrap();
        assert_eq!(errors.lock().len(), 1);
        assert!(seen.lock().is_empty());

        session.core.handle_frame(&method_frame(
            "onControlUpdate",
            json!({"sceneID": "default", "controls": [{"controlID": "fire", "text": "Go"}]}),
        ));
        session.run(0).unwrap();
        assert_eq!(session.control_property::<String>("fire", "text").unwrap(), "Go");
        assert_eq!(session.control_kind("fire").unwrap(), "button");

        session.core.handle_frame(&method_frame(
            "onControlDelete",
            json!({"sceneID": "default", "controls": [{"controlID": "fire"}]}),
        ));
        session.run(0).unwrap();
        assert!(session.control("fire").is_err());

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, ControlChange::Updated);
        assert_eq!(seen[1].0, ControlChange::Deleted);
        assert_eq!(seen[1].1.as_str(), "fire");
    }

    #[test]
    fn test_ready_event_and_unhandled_method() {
        let session = connected();
        let unhandled = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&unhandled);
        session.on_unhandled_method(move |_, method| sink.lock().push(method.method.clone()));

        session.core.handle_frame(&method_frame("onReady", json!({"isReady": true})));
        session.core.handle_frame(&method_frame("onWeather", json!({"sunny": true})));
        assert_eq!(session.run(0), Ok(2));

        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(*unhandled.lock(), vec!["onWeather".to_string()]);
    }

    #[test]
    fn test_deferred_and_awaited_replies() {
        let session = connected();
        let result = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&result);
        let deferred = session
            .queue_method("custom", json!({}), move |_, reply| *sink.lock() = Some(reply))
            .unwrap();
        let awaited = session.send_method("other", json!({}), false).unwrap();

        session.core.handle_frame(
            &json!({"type": "reply", "id": deferred.value(), "result": {"ok": 1}}).to_string(),
        );
        session.core.handle_frame(
            &json!({"type": "reply", "id": awaited.value(), "result": {"ok": 2}}).to_string(),
        );

        assert_eq!(
            session.receive_reply(awaited, Duration::from_secs(1)),
            Ok(json!({"ok": 2}))
        );
        assert!(result.lock().is_none());
        session.run(0).unwrap();
        assert_eq!(*result.lock(), Some(Ok(json!({"ok": 1}))));
    }

    #[test]
    fn test_capture_outcome_reaches_callback() {
        let session = connected();
        let outcome = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&outcome);
        session.on_transaction_complete(move |_, tx, code, message| {
            sink.lock().push((tx.as_str().to_string(), code, message.to_string()))
        });

        let id = session.capture_transaction("tx1").unwrap();
        session.core.handle_frame(
            &json!({"type": "reply", "id": id.value(), "error": {"code": 4006, "message": "no sparks"}})
                .to_string(),
        );
        session.run(0).unwrap();

        let outcome = outcome.lock();
        assert_eq!(outcome.len(), 1);
        assert_eq!(outcome[0].0, "tx1");
        assert_ne!(outcome[0].1, 0);
        assert_eq!(outcome[0].2, "no sparks");
    }

    #[test]
    fn test_group_scene_rolled_back_on_error() {
        let session = connected();
        with_groups(&session);
        let seen = errors(&session);

        let rejected = session.set_group_scene("default", "shop").unwrap();
        assert_eq!(session.group_scene("default").unwrap().as_str(), "shop");
        let sent = queued(&session);
        assert_eq!(sent[0].method, methods::UPDATE_GROUPS);
        assert_eq!(sent[0].params["groups"][0]["groupID"], "default");
        assert_eq!(sent[0].params["groups"][0]["sceneID"], "shop");

        session.core.handle_frame(&reply_err(rejected, 4000));
        assert_eq!(session.group_scene("default").unwrap().as_str(), "default");
        session.run(0).unwrap();
        assert_eq!(*seen.lock(), vec![4000]);

        let accepted = session.set_group_scene("red", "shop").unwrap();
        session.core.handle_frame(&reply_ok(accepted));
        assert_eq!(session.group_scene("red").unwrap().as_str(), "shop");

        assert!(matches!(
            session.set_group_scene("red", "nowhere"),
            Err(InteractiveError::ObjectNotFound(_))
        ));
        assert_eq!(session.group_scene("red").unwrap().as_str(), "shop");
    }

    #[test]
    fn test_create_group_cached_on_success() {
        let session = connected();
        with_groups(&session);

        let created = session.create_group("blue", Some("shop")).unwrap();
        assert!(session.group_scene("blue").is_err());
        let sent = queued(&session);
        assert_eq!(sent[0].method, methods::CREATE_GROUPS);
        assert_eq!(sent[0].params["groups"][0]["groupID"], "blue");
        assert_eq!(sent[0].params["groups"][0]["sceneID"], "shop");

        session.core.handle_frame(&reply_ok(created));
        assert_eq!(session.group_scene("blue").unwrap().as_str(), "shop");
        assert_eq!(session.group_ids().last().map(|g| g.as_str()), Some("blue"));
        assert_eq!(
            session.create_group("blue", None),
            Err(InteractiveError::DuplicateEntry("blue".to_string()))
        );

        let refused = session.create_group("green", None).unwrap();
        session.core.handle_frame(&reply_err(refused, 4000));
        assert!(session.group_scene("green").is_err());
    }

    #[test]
    fn test_participant_group_params() {
        let session = connected();
        with_groups(&session);
        session.core.handle_frame(&method_frame(
            methods::ON_PARTICIPANT_JOIN,
            json!({"participants": [{"sessionID": "p1", "username": "ana"}]}),
        ));
        session.run(0).unwrap();

        session.set_participant_group("p1", "red").unwrap();
        let sent = queued(&session);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, methods::UPDATE_PARTICIPANTS);
        assert!(!sent[0].discard);
        assert_eq!(sent[0].params["participants"][0]["sessionID"], "p1");
        assert_eq!(sent[0].params["participants"][0]["groupID"], "red");

        assert!(matches!(
            session.set_participant_group("p1", "nowhere"),
            Err(InteractiveError::ObjectNotFound(_))
        ));
        assert!(matches!(
            session.set_participant_group("ghost", "red"),
            Err(InteractiveError::ObjectNotFound(_))
        ));
        assert!(queued(&session).is_empty());
    }

    #[test]
    fn test_bandwidth_throttle_params() {
        let session = connected();
        session
            .set_bandwidth_throttle(ThrottleKind::Input, 4096, 512)
            .unwrap();
        let sent = queued(&session);
        assert_eq!(sent[0].method, methods::SET_BANDWIDTH_THROTTLE);
        assert_eq!(sent[0].params["giveInput"]["capacity"], 4096);
        assert_eq!(sent[0].params["giveInput"]["drainRate"], 512);
        assert_eq!(sent[0].params.as_object().map(|p| p.len()), Some(1));
    }

    #[test]
    fn test_capture_in_flight_fails_on_socket_loss() {
        let session = connected();
        let outcome = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&outcome);
        session.on_transaction_complete(move |_, tx, code, _| sink.lock().push((tx.as_str().to_string(), code)));

        let id = session.capture_transaction("tx1").unwrap();
        for method in queued(&session) {
            session.core.replies.mark_sent(method.id);
        }
        session.core.on_socket_lost();
        session.run(0).unwrap();

        assert_eq!(
            *outcome.lock(),
            vec![("tx1".to_string(), InteractiveError::WsClosed.reported_code())]
        );
        assert_eq!(session.core.replies.pending(), 0);

        // a late reply from the dropped connection is ignored
        session.core.handle_frame(&reply_ok(id));
        session.run(0).unwrap();
        assert_eq!(outcome.lock().len(), 1);
    }
}

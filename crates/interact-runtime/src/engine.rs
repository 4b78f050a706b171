//! Shared session core
//!
//! Owned by the public `Session` and both worker threads. Everything here is
//! safe to call from any thread and never invokes application callbacks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use interact_core::{InteractiveError, InteractiveResult, PacketId, SessionState, StateChange};
use interact_state::SceneCache;
use interact_time::{ServerClock, TimeSource};
use interact_transport::{HttpClient, HttpRequest, WebSocket};
use interact_wire::methods::{self, headers};
use interact_wire::schema::decode;
use interact_wire::{
    params, GroupsPayload, MethodPacket, Packet, ReplyPacket, ScenesPayload, TimeReply,
};
use parking_lot::{Condvar, Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};

use crate::bootstrap::{Bootstrap, BootstrapStep};
use crate::callbacks::Callbacks;
use crate::config::SessionConfig;
use crate::queue::{drop_methods, HttpHandler, IncomingEvent, IncomingQueue, OutgoingItem, OutgoingQueue};
use crate::rpc::{PendingReplies, ReplyHandler, Routed};

/// What `connect` was called with
#[derive(Clone, Debug)]
pub(crate) struct Credentials {
    pub auth: String,
    pub version_id: String,
    pub share_code: Option<String>,
}

/// Worker thread bookkeeping for a bounded join
#[derive(Default)]
pub(crate) struct Workers {
    handles: Mutex<Vec<JoinHandle<()>>>,
    running: Mutex<usize>,
    finished: Condvar,
}

impl Workers {
    pub fn started(&self, handle: JoinHandle<()>) {
        self.handles.lock().push(handle);
    }

    pub fn enter(&self) {
        *self.running.lock() += 1;
    }

    pub fn exit(&self) {
        let mut running = self.running.lock();
        *running = running.saturating_sub(1);
        self.finished.notify_all();
    }

    /// Wait for every worker to exit, then join them.
    ///
    /// Threads still running at the deadline are detached.
    pub fn join(&self, timeout: Duration) -> InteractiveResult<()> {
        let deadline = Instant::now() + timeout;
        let stuck = {
            let mut running = self.running.lock();
            while *running > 0 {
                if self.finished.wait_until(&mut running, deadline).timed_out() {
                    break;
                }
            }
            *running
        };

        let handles = std::mem::take(&mut *self.handles.lock());
        if stuck > 0 {
            error!(stuck, "worker threads did not exit in time, detaching");
            return Err(InteractiveError::TimedOut);
        }
        for handle in handles {
            if handle.join().is_err() {
                error!("worker thread panicked");
            }
        }
        Ok(())
    }
}

/// Marks a worker as exited when dropped, including on panic
pub(crate) struct WorkerExit<'a>(pub &'a Workers);

impl Drop for WorkerExit<'_> {
    fn drop(&mut self) {
        self.0.exit();
    }
}

pub(crate) struct SessionCore {
    pub config: SessionConfig,
    pub http: Arc<dyn HttpClient>,
    pub socket: Arc<dyn WebSocket>,
    pub clock: Arc<dyn TimeSource>,
    pub server_clock: ServerClock,
    pub cache: RwLock<SceneCache>,
    pub callbacks: Mutex<Callbacks>,
    pub replies: PendingReplies,
    pub workers: Workers,
    pub credentials: Mutex<Option<Credentials>>,
    pub auto_ready: AtomicBool,

    state: Mutex<SessionState>,
    bootstrap: Mutex<Bootstrap>,
    next_id: AtomicU32,
    seq: Mutex<Option<u32>>,
    time_request_sent: AtomicU64,

    incoming: Mutex<IncomingQueue>,
    outgoing: Mutex<OutgoingQueue>,
    outgoing_ready: Condvar,
    purge_epoch: AtomicU64,

    socket_open: AtomicBool,
    shutdown: AtomicBool,
    sleep_lock: Mutex<()>,
    sleep_wake: Condvar,
}

impl SessionCore {
    pub fn new(
        config: SessionConfig,
        http: Arc<dyn HttpClient>,
        socket: Arc<dyn WebSocket>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        SessionCore {
            config,
            http,
            socket,
            clock,
            server_clock: ServerClock::new(),
            cache: RwLock::new(SceneCache::new()),
            callbacks: Mutex::new(Callbacks::default()),
            replies: PendingReplies::default(),
            workers: Workers::default(),
            credentials: Mutex::new(None),
            auto_ready: AtomicBool::new(false),
            state: Mutex::new(SessionState::Disconnected),
            bootstrap: Mutex::new(Bootstrap::new()),
            next_id: AtomicU32::new(0),
            seq: Mutex::new(None),
            time_request_sent: AtomicU64::new(0),
            incoming: Mutex::new(IncomingQueue::default()),
            outgoing: Mutex::new(OutgoingQueue::default()),
            outgoing_ready: Condvar::new(),
            purge_epoch: AtomicU64::new(0),
            socket_open: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            sleep_lock: Mutex::new(()),
            sleep_wake: Condvar::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Begin shutdown. Returns false if it had already begun.
    pub fn begin_shutdown(&self) -> bool {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.socket.close();
        {
            let _outgoing = self.outgoing.lock();
            self.outgoing_ready.notify_all();
        }
        {
            let _sleep = self.sleep_lock.lock();
            self.sleep_wake.notify_all();
        }
        self.replies.wake_all();
        true
    }

    /// Sleep for `duration` or until shutdown begins
    pub fn sleep(&self, duration: Duration) {
        let mut guard = self.sleep_lock.lock();
        if !self.is_shutdown() {
            self.sleep_wake.wait_for(&mut guard, duration);
        }
    }

    #[inline]
    pub fn is_socket_open(&self) -> bool {
        self.socket_open.load(Ordering::Acquire)
    }

    pub fn set_socket_open(&self, open: bool) {
        self.socket_open.store(open, Ordering::Release);
    }

    // ---------------------------------------------------------------------
    // State
    // ---------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Move to `to`, queueing a state-change event if it differs
    pub fn transition(&self, to: SessionState) -> bool {
        let mut state = self.state.lock();
        self.transition_locked(&mut state, to)
    }

    fn transition_locked(&self, state: &mut SessionState, to: SessionState) -> bool {
        let previous = *state;
        if previous == to {
            return false;
        }
        *state = to;
        info!(from = %previous, to = %to, "session state changed");
        self.push_incoming(IncomingEvent::StateChange(StateChange {
            previous,
            current: to,
        }));
        true
    }

    /// `connect` guard: Disconnected -> Connecting
    pub fn begin_connecting(&self) -> InteractiveResult<()> {
        let mut state = self.state.lock();
        if *state != SessionState::Disconnected {
            return Err(InteractiveError::InvalidState("connect"));
        }
        self.transition_locked(&mut state, SessionState::Connecting);
        Ok(())
    }

    /// Final state after `close`; no event, callbacks are already off
    pub fn force_disconnected(&self) {
        *self.state.lock() = SessionState::Disconnected;
        self.incoming.lock().clear();
    }

    pub fn require_connected(&self) -> InteractiveResult<()> {
        if self.state().is_connected() {
            Ok(())
        } else {
            Err(InteractiveError::NotConnected)
        }
    }

    /// Client ready toggle: transition optimistically, then tell the service
    pub fn set_ready(&self, ready: bool) -> InteractiveResult<()> {
        let target = if ready {
            SessionState::Ready
        } else {
            SessionState::Connected
        };
        {
            let mut state = self.state.lock();
            if !state.is_connected() {
                return Err(InteractiveError::NotConnected);
            }
            if !self.transition_locked(&mut state, target) {
                return Ok(());
            }
        }
        self.enqueue_method(methods::READY, params::ready(ready), None);
        Ok(())
    }

    /// Service ready toggle (`onReady`)
    pub fn apply_ready(&self, ready: bool) {
        let target = if ready {
            SessionState::Ready
        } else {
            SessionState::Connected
        };
        let mut state = self.state.lock();
        if state.is_connected() {
            self.transition_locked(&mut state, target);
        }
    }

    // ---------------------------------------------------------------------
    // Queues
    // ---------------------------------------------------------------------

    #[inline]
    pub fn next_packet_id(&self) -> PacketId {
        PacketId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn push_incoming(&self, event: IncomingEvent) {
        self.incoming.lock().push(event);
    }

    pub fn report(&self, err: InteractiveError) {
        warn!(code = err.reported_code(), error = %err, "session error");
        self.push_incoming(IncomingEvent::Error(err));
    }

    pub fn take_incoming(&self, max: usize) -> Vec<IncomingEvent> {
        self.incoming.lock().take(max)
    }

    /// Queue an RPC method. Methods without a handler are sent with `discard`.
    pub fn enqueue_method(&self, method: &str, params: Value, handler: Option<ReplyHandler>) -> PacketId {
        let id = self.next_packet_id();
        let discard = handler.is_none();
        if let Some(handler) = handler {
            self.replies.register(id, handler);
        }
        debug!(%id, method, discard, "method queued");
        self.push_outgoing(OutgoingItem::Method(MethodPacket::new(id, method, params, discard)));
        id
    }

    pub fn enqueue_http(&self, request: HttpRequest, handler: Option<HttpHandler>) -> PacketId {
        let id = self.next_packet_id();
        debug!(%id, uri = %request.uri, "http request queued");
        self.push_outgoing(OutgoingItem::Http { id, request, handler });
        id
    }

    fn push_outgoing(&self, item: OutgoingItem) {
        let mut outgoing = self.outgoing.lock();
        outgoing.push(item);
        self.outgoing_ready.notify_one();
    }

    /// Block until outgoing work exists or shutdown begins, then swap it out.
    /// Returns the batch and the purge epoch it belongs to.
    pub fn wait_outgoing(&self) -> Option<(VecDeque<OutgoingItem>, u64)> {
        let mut outgoing = self.outgoing.lock();
        while outgoing.is_empty() && !self.is_shutdown() {
            self.outgoing_ready.wait(&mut outgoing);
        }
        if self.is_shutdown() {
            return None;
        }
        Some((outgoing.take_all(), self.purge_epoch()))
    }

    /// Swap out whatever is queued, without blocking
    #[cfg(test)]
    pub fn take_outgoing(&self) -> (VecDeque<OutgoingItem>, u64) {
        let mut outgoing = self.outgoing.lock();
        (outgoing.take_all(), self.purge_epoch())
    }

    #[inline]
    pub fn purge_epoch(&self) -> u64 {
        self.purge_epoch.load(Ordering::Acquire)
    }

    /// Drop methods from a batch taken before the last purge
    pub fn discard_stale(&self, batch: &mut VecDeque<OutgoingItem>, epoch: &mut u64) {
        let current = self.purge_epoch();
        if *epoch == current {
            return;
        }
        *epoch = current;
        let dropped = drop_methods(batch);
        if !dropped.is_empty() {
            debug!(count = dropped.len(), "stale methods discarded");
            self.replies.forget(&dropped);
        }
    }

    /// Top up a held batch with newly queued work. Methods held from before
    /// the last purge are dropped, items queued after it are kept.
    pub fn refill(&self, batch: &mut VecDeque<OutgoingItem>, epoch: &mut u64) {
        let dropped = {
            let mut outgoing = self.outgoing.lock();
            let current = self.purge_epoch();
            let dropped = if *epoch == current {
                Vec::new()
            } else {
                *epoch = current;
                drop_methods(batch)
            };
            batch.extend(outgoing.take_all());
            dropped
        };
        if !dropped.is_empty() {
            debug!(count = dropped.len(), "stale methods discarded");
            self.replies.forget(&dropped);
        }
    }

    pub fn latest_seq(&self) -> Option<u32> {
        *self.seq.lock()
    }

    // ---------------------------------------------------------------------
    // Socket
    // ---------------------------------------------------------------------

    pub fn socket_headers(&self) -> Vec<(String, String)> {
        let mut list = vec![(
            headers::PROTOCOL_VERSION.to_string(),
            self.config.protocol_version.clone(),
        )];
        if let Some(credentials) = self.credentials.lock().as_ref() {
            list.push((headers::AUTHORIZATION.to_string(), credentials.auth.clone()));
            list.push((
                headers::INTERACTIVE_VERSION.to_string(),
                credentials.version_id.clone(),
            ));
            if let Some(code) = credentials.share_code.as_ref().filter(|c| !c.is_empty()) {
                list.push((headers::SHARE_CODE.to_string(), code.clone()));
            }
        }
        list
    }

    /// One text frame from the service
    pub fn handle_frame(&self, text: &str) {
        if self.is_shutdown() {
            return;
        }
        trace!(len = text.len(), "frame received");
        let packet = match Packet::parse(text) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(error = %e, "discarding malformed frame");
                return;
            }
        };

        if let Some(seq) = packet.seq() {
            *self.seq.lock() = Some(seq);
        }

        match packet {
            Packet::Method(method) if method.method == methods::HELLO => {
                info!("service hello received, bootstrapping");
                self.bootstrap.lock().reset();
                self.advance_bootstrap();
            }
            Packet::Method(method) => {
                trace!(method = %method.method, "method queued for dispatch");
                self.push_incoming(IncomingEvent::RpcMethod(method));
            }
            Packet::Reply(reply) => self.route_reply(reply),
        }
    }

    fn route_reply(&self, reply: ReplyPacket) {
        match self.replies.route(reply) {
            Routed::Immediate(hook, reply) => hook(self, reply),
            Routed::Deferred(handler, reply) => self.push_incoming(IncomingEvent::RpcReply {
                id: reply.id,
                result: reply.into_result(),
                handler,
            }),
            Routed::Parked => {}
            Routed::Unclaimed(reply) => match reply.error {
                Some(err) => self.report(err.into()),
                None => trace!(id = %reply.id, "reply without handler"),
            },
        }
    }

    /// The connection dropped after a successful open
    pub fn on_socket_lost(&self) {
        self.set_socket_open(false);
        if self.is_shutdown() {
            return;
        }
        self.report(InteractiveError::WsClosed);

        let purged = {
            let mut outgoing = self.outgoing.lock();
            let purged = outgoing.purge_methods();
            self.purge_epoch.fetch_add(1, Ordering::AcqRel);
            purged
        };
        self.replies.forget(&purged);
        if !purged.is_empty() {
            info!(count = purged.len(), "unsent methods purged");
        }

        // Replies never cross connections
        let failed = self.replies.fail_sent(&InteractiveError::WsClosed);
        if !failed.is_empty() {
            info!(count = failed.len(), "in-flight methods failed");
        }
        for (id, handler) in failed {
            self.push_incoming(IncomingEvent::RpcReply {
                id,
                result: Err(InteractiveError::WsClosed),
                handler,
            });
        }

        self.bootstrap.lock().reset();
        self.transition(SessionState::Connecting);
    }

    // ---------------------------------------------------------------------
    // Bootstrap
    // ---------------------------------------------------------------------

    /// Issue the next outstanding bootstrap request
    fn advance_bootstrap(&self) {
        let step = self.bootstrap.lock().next_step();
        match step {
            BootstrapStep::SyncTime => {
                self.time_request_sent
                    .store(self.clock.now_ms(), Ordering::Release);
                self.enqueue_method(
                    methods::GET_TIME,
                    params::empty(),
                    Some(ReplyHandler::Immediate(Box::new(|core: &SessionCore, reply: ReplyPacket| {
                        core.on_time_reply(reply)
                    }))),
                );
            }
            BootstrapStep::CacheScenes => {
                self.enqueue_method(
                    methods::GET_SCENES,
                    params::empty(),
                    Some(ReplyHandler::Immediate(Box::new(|core: &SessionCore, reply: ReplyPacket| {
                        core.on_scenes_reply(reply)
                    }))),
                );
            }
            BootstrapStep::CacheGroups => {
                self.enqueue_method(
                    methods::GET_GROUPS,
                    params::empty(),
                    Some(ReplyHandler::Immediate(Box::new(|core: &SessionCore, reply: ReplyPacket| {
                        core.on_groups_reply(reply)
                    }))),
                );
            }
            BootstrapStep::Complete => self.on_bootstrapped(),
        }
    }

    fn on_time_reply(&self, reply: ReplyPacket) {
        let received = self.clock.now_ms();
        match reply.into_result().and_then(decode::<TimeReply>) {
            Ok(time) => {
                let sent = self.time_request_sent.load(Ordering::Acquire);
                self.server_clock.record(sent, received, time.time);
                self.complete_step(BootstrapStep::SyncTime);
            }
            Err(e) => self.bootstrap_failed(e),
        }
    }

    fn on_scenes_reply(&self, reply: ReplyPacket) {
        match reply.into_result().and_then(decode::<ScenesPayload>) {
            Ok(payload) => {
                let dropped = self.cache.write().replace_scenes(payload.scenes);
                if !dropped.is_empty() {
                    warn!(count = dropped.len(), "duplicate control ids dropped from scenes");
                }
                self.complete_step(BootstrapStep::CacheScenes);
            }
            Err(e) => self.bootstrap_failed(e),
        }
    }

    fn on_groups_reply(&self, reply: ReplyPacket) {
        match reply.into_result().and_then(decode::<GroupsPayload>) {
            Ok(payload) => {
                self.cache.write().replace_groups(payload.groups);
                self.complete_step(BootstrapStep::CacheGroups);
            }
            Err(e) => self.bootstrap_failed(e),
        }
    }

    fn complete_step(&self, step: BootstrapStep) {
        debug!(?step, "bootstrap step complete");
        let done = self.bootstrap.lock().complete(step);
        if done {
            self.on_bootstrapped();
        } else {
            self.advance_bootstrap();
        }
    }

    fn on_bootstrapped(&self) {
        let connected = {
            let mut state = self.state.lock();
            *state == SessionState::Connecting
                && self.transition_locked(&mut state, SessionState::Connected)
        };
        if !connected {
            return;
        }
        info!("session connected");
        if self.auto_ready.load(Ordering::Acquire) {
            if let Err(e) = self.set_ready(true) {
                self.report(e);
            }
        }
    }

    /// A bootstrap reply was unusable: report it and reconnect
    fn bootstrap_failed(&self, err: InteractiveError) {
        error!(error = %err, "bootstrap failed, reconnecting");
        self.report(err);
        self.socket.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::testing;
    use interact_time::ManualClock;
    use serde_json::json;

    fn sent(core: &SessionCore) -> Vec<MethodPacket> {
        core.take_outgoing()
            .0
            .into_iter()
            .filter_map(|item| match item {
                OutgoingItem::Method(method) => Some(method),
                OutgoingItem::Http { .. } => None,
            })
            .collect()
    }

    fn reply(id: PacketId, result: Value) -> String {
        json!({"type": "reply", "id": id.value(), "result": result}).to_string()
    }

    fn states(core: &SessionCore) -> Vec<(SessionState, SessionState)> {
        core.take_incoming(100)
            .into_iter()
            .filter_map(|event| match event {
                IncomingEvent::StateChange(c) => Some((c.previous, c.current)),
                _ => None,
            })
            .collect()
    }

    const HELLO: &str = r#"{"type":"method","id":0,"method":"hello","params":{},"discard":true,"seq":4}"#;

    fn bootstrapped(auto_ready: bool) -> (SessionCore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(10_000));
        let core = testing::core(Arc::clone(&clock));
        core.auto_ready.store(auto_ready, Ordering::Release);
        core.begin_connecting().unwrap();
        core.set_socket_open(true);
        core.handle_frame(HELLO);

        let time = sent(&core);
        clock.advance(100);
        core.handle_frame(&reply(time[0].id, json!({"time": 4_000})));
        let scenes = sent(&core);
        core.handle_frame(&reply(
            scenes[0].id,
            json!({"scenes": [{"sceneID": "default", "controls": [{"controlID": "fire", "kind": "button"}]}]}),
        ));
        let groups = sent(&core);
        core.handle_frame(&reply(groups[0].id, json!({"groups": []})));
        (core, clock)
    }

    #[test]
    fn test_bootstrap_order_and_offset() {
        let clock = Arc::new(ManualClock::new(10_000));
        let core = testing::core(Arc::clone(&clock));
        core.begin_connecting().unwrap();
        core.handle_frame(HELLO);
        assert_eq!(core.latest_seq(), Some(4));

        let time = sent(&core);
        assert_eq!(time.len(), 1);
        assert_eq!(time[0].method, methods::GET_TIME);
        assert!(!time[0].discard);

        clock.advance(100);
        core.handle_frame(&reply(time[0].id, json!({"time": 4_000})));
        assert_eq!(core.server_clock.offset_ms(), 6_050);

        let scenes = sent(&core);
        assert_eq!(scenes[0].method, methods::GET_SCENES);
        core.handle_frame(&reply(
            scenes[0].id,
            json!({"scenes": [{"sceneID": "default", "controls": [{"controlID": "fire", "kind": "button"}]}]}),
        ));

        let groups = sent(&core);
        assert_eq!(groups[0].method, methods::GET_GROUPS);
        assert_eq!(core.state(), SessionState::Connecting);
        core.handle_frame(&reply(groups[0].id, json!({"groups": []})));

        assert_eq!(core.state(), SessionState::Connected);
        assert_eq!(
            states(&core),
            vec![
                (SessionState::Disconnected, SessionState::Connecting),
                (SessionState::Connecting, SessionState::Connected),
            ]
        );
        assert!(core.cache.read().control("fire").is_ok());
        assert!(sent(&core).is_empty());
    }

    #[test]
    fn test_auto_ready_after_bootstrap() {
        let (core, _clock) = bootstrapped(true);
        assert_eq!(core.state(), SessionState::Ready);
        let ready = sent(&core);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].method, methods::READY);
        assert_eq!(ready[0].params["isReady"], true);
        assert!(states(&core).contains(&(SessionState::Connected, SessionState::Ready)));
    }

    #[test]
    fn test_set_ready_is_idempotent() {
        let (core, _clock) = bootstrapped(false);
        core.take_incoming(100);

        core.set_ready(true).unwrap();
        core.set_ready(true).unwrap();
        let ready = sent(&core);
        assert_eq!(ready.len(), 1);
        assert!(ready[0].discard);
        assert_eq!(states(&core), vec![(SessionState::Connected, SessionState::Ready)]);

        core.apply_ready(true);
        assert!(states(&core).is_empty());
        core.apply_ready(false);
        assert_eq!(states(&core), vec![(SessionState::Ready, SessionState::Connected)]);
    }

    #[test]
    fn test_set_ready_requires_connection() {
        let core = testing::core(Arc::new(ManualClock::new(0)));
        assert_eq!(core.set_ready(true), Err(InteractiveError::NotConnected));
        core.begin_connecting().unwrap();
        assert_eq!(core.set_ready(true), Err(InteractiveError::NotConnected));
        assert_eq!(core.begin_connecting(), Err(InteractiveError::InvalidState("connect")));
    }

    #[test]
    fn test_socket_loss_purges_methods_only() {
        let (core, _clock) = bootstrapped(false);
        core.take_incoming(100);
        core.enqueue_method(methods::UPDATE_CONTROLS, json!({}), Some(ReplyHandler::Await));
        core.enqueue_http(HttpRequest::get("https://example.test/ping"), None);
        assert_eq!(core.replies.pending(), 1);

        core.on_socket_lost();
        assert_eq!(core.replies.pending(), 0);
        assert_eq!(core.state(), SessionState::Connecting);
        assert!(!core.is_socket_open());

        let (rest, epoch) = core.take_outgoing();
        assert_eq!(rest.len(), 1);
        assert!(matches!(rest[0], OutgoingItem::Http { .. }));
        assert_eq!(epoch, 1);

        let events = core.take_incoming(10);
        assert!(matches!(events[0], IncomingEvent::Error(InteractiveError::WsClosed)));
        assert!(matches!(events[1], IncomingEvent::StateChange(_)));
    }

    #[test]
    fn test_discard_stale_batch() {
        let core = testing::core(Arc::new(ManualClock::new(0)));
        core.enqueue_method(methods::UPDATE_CONTROLS, json!({}), None);
        core.enqueue_http(HttpRequest::get("https://example.test/ping"), None);
        let (mut batch, mut epoch) = core.take_outgoing();

        core.discard_stale(&mut batch, &mut epoch);
        assert_eq!(batch.len(), 2);

        core.on_socket_lost();
        core.discard_stale(&mut batch, &mut epoch);
        assert_eq!(batch.len(), 1);
        assert_eq!(epoch, core.purge_epoch());
    }

    #[test]
    fn test_refill_keeps_work_queued_after_purge() {
        let core = testing::core(Arc::new(ManualClock::new(0)));
        let stale = core.enqueue_method(methods::UPDATE_CONTROLS, json!({}), Some(ReplyHandler::Await));
        let (mut batch, mut epoch) = core.take_outgoing();

        core.on_socket_lost();
        let fresh = core.enqueue_method(methods::CAPTURE, json!({}), Some(ReplyHandler::Await));
        core.refill(&mut batch, &mut epoch);

        let ids: Vec<PacketId> = batch.iter().map(OutgoingItem::id).collect();
        assert_eq!(ids, vec![fresh]);
        assert_eq!(epoch, core.purge_epoch());
        assert!(core.replies.wait(stale, Duration::from_millis(10), || false).is_err());
        assert_eq!(core.replies.pending(), 1);

        // a second refill at the same epoch keeps the batch
        core.refill(&mut batch, &mut epoch);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_socket_loss_fails_in_flight_methods() {
        let (core, _clock) = bootstrapped(false);
        core.take_incoming(100);
        let capture = core.enqueue_method(
            methods::CAPTURE,
            json!({"transactionID": "tx1"}),
            Some(ReplyHandler::Deferred(Box::new(|_: &Session, _: InteractiveResult<Value>| {}))),
        );
        let awaited = core.enqueue_method("customMethod", json!({}), Some(ReplyHandler::Await));
        for method in sent(&core) {
            core.replies.mark_sent(method.id);
        }
        let unsent = core.enqueue_method(methods::UPDATE_CONTROLS, json!({}), Some(ReplyHandler::Await));

        core.on_socket_lost();
        assert_eq!(core.replies.pending(), 0);
        assert_eq!(
            core.replies.wait(awaited, Duration::from_millis(10), || false),
            Err(InteractiveError::WsClosed)
        );
        assert!(matches!(
            core.replies.wait(unsent, Duration::from_millis(10), || false),
            Err(InteractiveError::ObjectNotFound(_))
        ));

        let failed: Vec<PacketId> = core
            .take_incoming(10)
            .into_iter()
            .filter_map(|event| match event {
                IncomingEvent::RpcReply {
                    id,
                    result: Err(InteractiveError::WsClosed),
                    ..
                } => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(failed, vec![capture]);
    }

    #[test]
    fn test_bootstrap_error_reported() {
        let core = testing::core(Arc::new(ManualClock::new(0)));
        core.begin_connecting().unwrap();
        core.take_incoming(10);
        core.handle_frame(HELLO);
        let time = sent(&core);
        core.handle_frame(
            &json!({"type": "reply", "id": time[0].id.value(), "error": {"code": 4000, "message": "nope"}})
                .to_string(),
        );
        assert_eq!(core.state(), SessionState::Connecting);
        let events = core.take_incoming(10);
        assert!(matches!(
            events[0],
            IncomingEvent::Error(InteractiveError::Rpc { code: 4000, .. })
        ));
    }

    #[test]
    fn test_frames_routed() {
        let core = testing::core(Arc::new(ManualClock::new(0)));
        core.handle_frame("{not json");
        assert!(core.take_incoming(10).is_empty());

        core.handle_frame(r#"{"type":"method","id":9,"method":"onParticipantJoin","params":{"participants":[]},"seq":12}"#);
        let events = core.take_incoming(10);
        assert!(matches!(&events[0], IncomingEvent::RpcMethod(m) if m.method == "onParticipantJoin"));
        assert_eq!(core.latest_seq(), Some(12));

        core.handle_frame(r#"{"type":"reply","id":77,"error":{"code":4019,"message":"unknown"}}"#);
        let events = core.take_incoming(10);
        assert!(matches!(events[0], IncomingEvent::Error(InteractiveError::Rpc { code: 4019, .. })));
    }

    #[test]
    fn test_socket_headers() {
        let core = testing::core(Arc::new(ManualClock::new(0)));
        *core.credentials.lock() = Some(Credentials {
            auth: "Bearer abc".into(),
            version_id: "1234".into(),
            share_code: Some("xyz".into()),
        });
        let headers = core.socket_headers();
        assert!(headers.contains(&("X-Protocol-Version".into(), "2.0".into())));
        assert!(headers.contains(&("Authorization".into(), "Bearer abc".into())));
        assert!(headers.contains(&("X-Interactive-Version".into(), "1234".into())));
        assert!(headers.contains(&("X-Interactive-Sharecode".into(), "xyz".into())));
    }
}

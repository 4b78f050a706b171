//! Reply correlation
//!
//! Every tracked method registers one handler under its packet id. The
//! incoming thread removes the handler in the same locked step that looks it
//! up, so a reply is routed at most once. Awaited replies are parked under
//! that same lock, so `wait` always sees either the handler or the reply.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use interact_core::{InteractiveError, InteractiveResult, PacketId};
use interact_wire::ReplyPacket;
use parking_lot::{Condvar, Mutex};
use serde_json::Value;

use crate::engine::SessionCore;
use crate::session::Session;

/// Application reply handler, run inside `Session::run`
pub type ReplyCallback = Box<dyn FnOnce(&Session, InteractiveResult<Value>) + Send>;

/// Internal reply hook, run on the incoming thread. Must not call application code.
pub(crate) type ReplyHook = Box<dyn FnOnce(&SessionCore, ReplyPacket) + Send>;

pub(crate) enum ReplyHandler {
    Immediate(ReplyHook),
    Deferred(ReplyCallback),
    /// Reply is parked for `receive_reply`
    Await,
}

/// What to do with a reply once its handler is claimed
pub(crate) enum Routed {
    Immediate(ReplyHook, ReplyPacket),
    Deferred(ReplyCallback, ReplyPacket),
    Parked,
    Unclaimed(ReplyPacket),
}

struct Pending {
    handler: ReplyHandler,
    /// The method was handed to the socket
    sent: bool,
}

#[derive(Default)]
struct Slots {
    handlers: HashMap<PacketId, Pending>,
    parked: HashMap<PacketId, InteractiveResult<Value>>,
}

#[derive(Default)]
pub(crate) struct PendingReplies {
    slots: Mutex<Slots>,
    arrived: Condvar,
}

impl PendingReplies {
    pub fn register(&self, id: PacketId, handler: ReplyHandler) {
        self.slots
            .lock()
            .handlers
            .insert(id, Pending { handler, sent: false });
    }

    /// Claim the handler for `reply`. Awaited replies are parked before the
    /// lock is released.
    pub fn route(&self, reply: ReplyPacket) -> Routed {
        let mut slots = self.slots.lock();
        match slots.handlers.remove(&reply.id) {
            Some(Pending { handler: ReplyHandler::Immediate(hook), .. }) => Routed::Immediate(hook, reply),
            Some(Pending { handler: ReplyHandler::Deferred(callback), .. }) => {
                Routed::Deferred(callback, reply)
            }
            Some(Pending { handler: ReplyHandler::Await, .. }) => {
                slots.parked.insert(reply.id, reply.into_result());
                self.arrived.notify_all();
                Routed::Parked
            }
            None => Routed::Unclaimed(reply),
        }
    }

    /// Record that the method `id` is about to reach the socket
    pub fn mark_sent(&self, id: PacketId) {
        if let Some(pending) = self.slots.lock().handlers.get_mut(&id) {
            pending.sent = true;
        }
    }

    /// Drop the handlers of methods that will never be sent
    pub fn forget(&self, ids: &[PacketId]) {
        if ids.is_empty() {
            return;
        }
        let mut slots = self.slots.lock();
        for id in ids {
            slots.handlers.remove(id);
        }
    }

    /// Resolve every handler whose method was sent with `err`.
    ///
    /// Awaited replies are parked as failures, internal hooks are dropped and
    /// application callbacks are returned for the caller to queue.
    pub fn fail_sent(&self, err: &InteractiveError) -> Vec<(PacketId, ReplyCallback)> {
        let mut slots = self.slots.lock();
        let sent: Vec<PacketId> = slots
            .handlers
            .iter()
            .filter(|(_, pending)| pending.sent)
            .map(|(id, _)| *id)
            .collect();

        let mut callbacks = Vec::new();
        for id in sent {
            let Some(pending) = slots.handlers.remove(&id) else {
                continue;
            };
            match pending.handler {
                ReplyHandler::Immediate(_) => {}
                ReplyHandler::Deferred(callback) => callbacks.push((id, callback)),
                ReplyHandler::Await => {
                    slots.parked.insert(id, Err(err.clone()));
                }
            }
        }
        callbacks.sort_by_key(|(id, _)| *id);
        self.arrived.notify_all();
        callbacks
    }

    pub fn pending(&self) -> usize {
        self.slots.lock().handlers.len()
    }

    #[cfg(test)]
    fn parked(&self) -> usize {
        self.slots.lock().parked.len()
    }

    /// Block until the reply for `id` is parked, `timeout` passes, or
    /// `cancelled` turns true.
    pub fn wait(
        &self,
        id: PacketId,
        timeout: Duration,
        cancelled: impl Fn() -> bool,
    ) -> InteractiveResult<Value> {
        let deadline = Instant::now() + timeout;
        let mut slots = self.slots.lock();
        let awaited = matches!(
            slots.handlers.get(&id),
            Some(Pending { handler: ReplyHandler::Await, .. })
        );
        if !awaited && !slots.parked.contains_key(&id) {
            return Err(InteractiveError::ObjectNotFound(id.to_string()));
        }

        loop {
            if let Some(result) = slots.parked.remove(&id) {
                return result;
            }
            if cancelled() {
                return Err(InteractiveError::Cancelled);
            }
            if self.arrived.wait_until(&mut slots, deadline).timed_out() {
                if let Some(result) = slots.parked.remove(&id) {
                    return result;
                }
                slots.handlers.remove(&id);
                return Err(InteractiveError::TimedOut);
            }
        }
    }

    /// Wake every `wait` so it can observe cancellation
    pub fn wake_all(&self) {
        let _slots = self.slots.lock();
        self.arrived.notify_all();
    }
}

//! Incoming priority queue and outgoing FIFO
//!
//! Incoming events are drained by `Session::run` highest priority first:
//! errors, state changes, HTTP responses, RPC replies, then RPC methods.
//! Events of equal priority keep their arrival order.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use interact_core::{InteractiveError, InteractiveResult, PacketId, StateChange};
use interact_transport::{HttpRequest, HttpResponse};
use interact_wire::MethodPacket;
use serde_json::Value;

use crate::rpc::ReplyCallback;
use crate::session::Session;

/// Completion of a queued HTTP request, run inside `Session::run`
pub type HttpHandler = Box<dyn FnOnce(&Session, HttpResponse) + Send>;

/// Work for the application thread
pub(crate) enum IncomingEvent {
    Error(InteractiveError),
    StateChange(StateChange),
    HttpResponse {
        response: HttpResponse,
        handler: HttpHandler,
    },
    RpcReply {
        id: PacketId,
        result: InteractiveResult<Value>,
        handler: ReplyCallback,
    },
    RpcMethod(MethodPacket),
}

impl IncomingEvent {
    #[inline]
    fn priority(&self) -> u8 {
        match self {
            IncomingEvent::Error(_) => 4,
            IncomingEvent::StateChange(_) => 3,
            IncomingEvent::HttpResponse { .. } => 2,
            IncomingEvent::RpcReply { .. } => 1,
            IncomingEvent::RpcMethod(_) => 0,
        }
    }
}

struct Entry {
    priority: u8,
    seq: u64,
    event: IncomingEvent,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Max-heap: higher priority first, then lower arrival sequence
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
pub(crate) struct IncomingQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl IncomingQueue {
    pub fn push(&mut self, event: IncomingEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry {
            priority: event.priority(),
            seq,
            event,
        });
    }

    /// Remove up to `max` events in dispatch order
    pub fn take(&mut self, max: usize) -> Vec<IncomingEvent> {
        let count = max.min(self.heap.len());
        let mut events = Vec::with_capacity(count);
        while events.len() < count {
            match self.heap.pop() {
                Some(entry) => events.push(entry.event),
                None => break,
            }
        }
        events
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

/// Work for the outgoing thread
pub(crate) enum OutgoingItem {
    Method(MethodPacket),
    Http {
        id: PacketId,
        request: HttpRequest,
        handler: Option<HttpHandler>,
    },
}

impl OutgoingItem {
    pub fn id(&self) -> PacketId {
        match self {
            OutgoingItem::Method(method) => method.id,
            OutgoingItem::Http { id, .. } => *id,
        }
    }
}

/// Remove every RPC method from `items`, keeping HTTP requests in order.
/// Returns the ids of the removed methods.
pub(crate) fn drop_methods(items: &mut VecDeque<OutgoingItem>) -> Vec<PacketId> {
    let mut dropped = Vec::new();
    items.retain(|item| match item {
        OutgoingItem::Method(method) => {
            dropped.push(method.id);
            false
        }
        OutgoingItem::Http { .. } => true,
    });
    dropped
}

#[derive(Default)]
pub(crate) struct OutgoingQueue {
    items: VecDeque<OutgoingItem>,
}

impl OutgoingQueue {
    pub fn push(&mut self, item: OutgoingItem) {
        self.items.push_back(item);
    }

    /// Swap the whole queue out
    pub fn take_all(&mut self) -> VecDeque<OutgoingItem> {
        std::mem::take(&mut self.items)
    }

    /// Drop unsent RPC methods after a lost connection
    pub fn purge_methods(&mut self) -> Vec<PacketId> {
        drop_methods(&mut self.items)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

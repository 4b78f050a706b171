//! Incoming and outgoing worker threads

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use interact_core::{InteractiveError, InteractiveResult};
use interact_time::Backoff;
use interact_transport::{HttpRequest, SocketHandler};
use interact_wire::{parse_hosts, Packet};
use tracing::{debug, info, trace, warn};

use crate::engine::{SessionCore, WorkerExit};
use crate::queue::{IncomingEvent, OutgoingItem};

/// Start both worker threads
pub(crate) fn spawn_workers(core: &Arc<SessionCore>) -> InteractiveResult<()> {
    spawn(core, "interact-incoming", run_incoming)?;
    spawn(core, "interact-outgoing", run_outgoing)
}

fn spawn(core: &Arc<SessionCore>, name: &str, body: fn(&SessionCore)) -> InteractiveResult<()> {
    let worker = Arc::clone(core);
    core.workers.enter();
    let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
        let _exit = WorkerExit(&worker.workers);
        body(&worker);
        debug!("worker exiting");
    });

    match spawned {
        Ok(handle) => {
            core.workers.started(handle);
            Ok(())
        }
        Err(e) => {
            core.workers.exit();
            warn!(error = %e, name, "failed to spawn worker thread");
            Err(InteractiveError::InvalidState("spawning worker threads"))
        }
    }
}

// -------------------------------------------------------------------------
// Incoming
// -------------------------------------------------------------------------

/// Socket callbacks for one connection attempt
struct Connection<'a> {
    core: &'a SessionCore,
    host: &'a str,
    opened: AtomicBool,
}

impl SocketHandler for Connection<'_> {
    fn on_open(&self) {
        info!(host = self.host, "socket open, waiting for hello");
        self.opened.store(true, Ordering::Release);
        self.core.set_socket_open(true);
    }

    fn on_message(&self, text: &str) {
        self.core.handle_frame(text);
    }

    fn on_close(&self, code: u16, reason: &str) {
        info!(host = self.host, code, reason, "socket closed");
        self.core.set_socket_open(false);
    }
}

fn discover_hosts(core: &SessionCore) -> InteractiveResult<Vec<String>> {
    let request = HttpRequest::get(core.config.hosts_uri.clone());
    let response = core.http.make_request(&request)?;
    if !response.is_success() {
        return Err(InteractiveError::Http(format!(
            "host discovery returned {}",
            response.status
        )));
    }
    let hosts = parse_hosts(&response.body)?;
    if hosts.is_empty() {
        return Err(InteractiveError::NoHost);
    }
    Ok(hosts)
}

/// Own the socket: discover hosts, connect, pump frames, reconnect
fn run_incoming(core: &SessionCore) {
    let mut backoff = Backoff::new(core.config.initial_retry, core.config.max_retry);
    let mut hosts: Vec<String> = Vec::new();
    let mut next_host = 0;

    while !core.is_shutdown() {
        if hosts.is_empty() {
            match discover_hosts(core) {
                Ok(found) => {
                    debug!(count = found.len(), "hosts discovered");
                    hosts = found;
                    next_host = 0;
                }
                Err(e) => {
                    core.report(e);
                    core.sleep(backoff.next_delay());
                    continue;
                }
            }
        }

        let host = hosts[next_host].clone();
        let connection = Connection {
            core,
            host: &host,
            opened: AtomicBool::new(false),
        };
        info!(host = %host, "connecting");
        let result = core.socket.open(&host, &core.socket_headers(), &connection);
        if core.is_shutdown() {
            break;
        }

        if connection.opened.load(Ordering::Acquire) {
            core.on_socket_lost();
            backoff.reset();
        } else {
            let err = match result {
                Err(InteractiveError::WsConnectFailed(reason)) => InteractiveError::WsConnectFailed(reason),
                Err(other) => InteractiveError::WsConnectFailed(other.to_string()),
                Ok(()) => InteractiveError::WsConnectFailed(host.clone()),
            };
            core.report(err);
        }

        next_host += 1;
        if next_host >= hosts.len() {
            hosts.clear();
            core.sleep(backoff.next_delay());
        }
    }
    core.set_socket_open(false);
}

// -------------------------------------------------------------------------
// Outgoing
// -------------------------------------------------------------------------

/// Drain the outgoing FIFO; leftovers are retried after a pause
fn run_outgoing(core: &SessionCore) {
    let mut batch: VecDeque<OutgoingItem> = VecDeque::new();
    let mut epoch = core.purge_epoch();

    while !core.is_shutdown() {
        if batch.is_empty() {
            match core.wait_outgoing() {
                Some((items, items_epoch)) => {
                    batch = items;
                    epoch = items_epoch;
                }
                None => break,
            }
        } else {
            core.sleep(core.config.send_retry_pause);
            if core.is_shutdown() {
                break;
            }
            core.refill(&mut batch, &mut epoch);
        }
        send_batch(core, &mut batch, &mut epoch);
    }
}

/// Send items in order until one fails. The failed item stays at the front.
fn send_batch(core: &SessionCore, batch: &mut VecDeque<OutgoingItem>, epoch: &mut u64) {
    loop {
        if core.is_shutdown() {
            return;
        }
        core.discard_stale(batch, epoch);
        let Some(item) = batch.pop_front() else {
            return;
        };

        match item {
            OutgoingItem::Http { id, request, handler } => match core.http.make_request(&request) {
                Ok(response) => {
                    debug!(%id, status = response.status, "http request completed");
                    if let Some(handler) = handler {
                        core.push_incoming(IncomingEvent::HttpResponse { response, handler });
                    }
                }
                Err(e) => {
                    core.report(e);
                    batch.push_front(OutgoingItem::Http { id, request, handler });
                    return;
                }
            },
            OutgoingItem::Method(mut method) => {
                if !core.is_socket_open() {
                    trace!(id = %method.id, "socket not open, holding method");
                    batch.push_front(OutgoingItem::Method(method));
                    return;
                }
                method.seq = core.latest_seq();
                let id = method.id;
                core.replies.mark_sent(id);
                let packet = Packet::Method(method);
                let sent = packet.to_text().and_then(|text| core.socket.send(&text));
                if let Err(e) = sent {
                    core.report(match e {
                        InteractiveError::WsSendFailed(_) => e,
                        other => InteractiveError::WsSendFailed(other.to_string()),
                    });
                    if let Packet::Method(method) = packet {
                        batch.push_front(OutgoingItem::Method(method));
                    }
                    return;
                }
                trace!(%id, "method sent");
            }
        }
    }
}

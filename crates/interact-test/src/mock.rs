//! In-memory transports
//!
//! `MockSocket` behaves like a blocking WebSocket: `open` blocks on the
//! session's incoming thread and delivers queued frames until the test drops
//! the connection or the session closes it. `MockHttp` answers from a route
//! table and logs every request.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use interact_core::{InteractiveError, InteractiveResult};
use interact_transport::{HttpClient, HttpRequest, HttpResponse, SocketHandler, WebSocket};
use interact_wire::{MethodPacket, Packet};
use parking_lot::{Condvar, Mutex};
use serde_json::json;
use tracing::{debug, trace};

/// Called on the sending thread for every frame the session sends
pub type Responder = Arc<dyn Fn(&MockSocket, &str) + Send + Sync>;

enum Inbound {
    Frame(String),
    Drop,
}

#[derive(Default)]
struct SocketState {
    inbox: VecDeque<Inbound>,
    sent: Vec<String>,
    connected: bool,
    refuse: bool,
    fail_sends: bool,
    close_requested: bool,
    opens: usize,
    greeting: Option<String>,
    uri: Option<String>,
    headers: Vec<(String, String)>,
}

/// Scriptable WebSocket
#[derive(Default)]
pub struct MockSocket {
    state: Mutex<SocketState>,
    changed: Condvar,
    responder: Mutex<Option<Responder>>,
}

impl MockSocket {
    pub fn new() -> Self {
        MockSocket::default()
    }

    /// Frame delivered first on every new connection
    pub fn set_greeting(&self, frame: Option<String>) {
        self.state.lock().greeting = frame;
    }

    /// Answer sent frames with `responder`
    pub fn set_responder(&self, responder: Responder) {
        *self.responder.lock() = Some(responder);
    }

    /// Refuse new connections
    pub fn set_refuse(&self, refuse: bool) {
        self.state.lock().refuse = refuse;
    }

    /// Make `send` fail
    pub fn set_fail_sends(&self, fail: bool) {
        self.state.lock().fail_sends = fail;
    }

    /// Queue a frame for delivery on the current connection
    pub fn deliver(&self, frame: impl Into<String>) {
        let mut state = self.state.lock();
        state.inbox.push_back(Inbound::Frame(frame.into()));
        self.changed.notify_all();
    }

    /// End the current connection after the frames already queued
    pub fn drop_connection(&self) {
        let mut state = self.state.lock();
        state.inbox.push_back(Inbound::Drop);
        self.changed.notify_all();
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Successful opens so far
    pub fn opens(&self) -> usize {
        self.state.lock().opens
    }

    pub fn last_uri(&self) -> Option<String> {
        self.state.lock().uri.clone()
    }

    pub fn last_headers(&self) -> Vec<(String, String)> {
        self.state.lock().headers.clone()
    }

    /// Every frame sent, in order
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }

    /// Sent frames that parse as methods
    pub fn sent_methods(&self) -> Vec<MethodPacket> {
        self.sent()
            .iter()
            .filter_map(|text| match Packet::parse(text) {
                Ok(Packet::Method(method)) => Some(method),
                _ => None,
            })
            .collect()
    }

    /// Sent methods named `name`
    pub fn sent_named(&self, name: &str) -> Vec<MethodPacket> {
        self.sent_methods()
            .into_iter()
            .filter(|m| m.method == name)
            .collect()
    }

    fn next_inbound(&self) -> Option<Inbound> {
        let mut state = self.state.lock();
        loop {
            if state.close_requested {
                state.close_requested = false;
                state.connected = false;
                state.inbox.clear();
                return None;
            }
            if let Some(inbound) = state.inbox.pop_front() {
                if matches!(inbound, Inbound::Drop) {
                    state.connected = false;
                    state.inbox.clear();
                }
                return Some(inbound);
            }
            self.changed.wait(&mut state);
        }
    }
}

impl WebSocket for MockSocket {
    fn open(&self, uri: &str, headers: &[(String, String)], handler: &dyn SocketHandler) -> InteractiveResult<()> {
        {
            let mut state = self.state.lock();
            if state.close_requested {
                state.close_requested = false;
                return Err(InteractiveError::WsConnectFailed("closed before open".into()));
            }
            if state.refuse {
                return Err(InteractiveError::WsConnectFailed(format!("{uri} refused")));
            }
            state.connected = true;
            state.opens += 1;
            state.uri = Some(uri.to_string());
            state.headers = headers.to_vec();
            state.inbox.clear();
            if let Some(greeting) = state.greeting.clone() {
                state.inbox.push_back(Inbound::Frame(greeting));
            }
        }
        debug!(uri, "mock socket open");
        handler.on_open();

        loop {
            match self.next_inbound() {
                Some(Inbound::Frame(text)) => handler.on_message(&text),
                Some(Inbound::Drop) => {
                    handler.on_close(1006, "dropped");
                    return Ok(());
                }
                None => {
                    handler.on_close(1000, "closed");
                    return Ok(());
                }
            }
        }
    }

    fn send(&self, text: &str) -> InteractiveResult<()> {
        {
            let mut state = self.state.lock();
            if !state.connected {
                return Err(InteractiveError::WsSendFailed("not connected".into()));
            }
            if state.fail_sends {
                return Err(InteractiveError::WsSendFailed("send refused".into()));
            }
            state.sent.push(text.to_string());
        }
        trace!(len = text.len(), "mock socket sent frame");
        let responder = self.responder.lock().clone();
        if let Some(responder) = responder {
            responder(self, text);
        }
        Ok(())
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.close_requested = true;
        self.changed.notify_all();
    }
}

// -------------------------------------------------------------------------
// HTTP
// -------------------------------------------------------------------------

#[derive(Default)]
struct HttpState {
    routes: HashMap<String, HttpResponse>,
    failures: HashMap<String, usize>,
    requests: Vec<HttpRequest>,
}

/// HTTP client answering from a route table
///
/// Unknown uris get a 404.
#[derive(Default)]
pub struct MockHttp {
    state: Mutex<HttpState>,
}

impl MockHttp {
    pub fn new() -> Self {
        MockHttp::default()
    }

    /// Serve `body` with `status` for `uri`
    pub fn route(&self, uri: &str, status: u16, body: impl Into<String>) {
        self.state.lock().routes.insert(
            uri.to_string(),
            HttpResponse {
                status,
                body: body.into(),
            },
        );
    }

    /// Answer host discovery at `uri` with `hosts`
    pub fn route_hosts(&self, uri: &str, hosts: &[&str]) {
        let body: Vec<_> = hosts.iter().map(|h| json!({ "address": h })).collect();
        self.route(uri, 200, serde_json::Value::Array(body).to_string());
    }

    /// Fail the next `times` requests to `uri` at the transport level
    pub fn fail(&self, uri: &str, times: usize) {
        self.state.lock().failures.insert(uri.to_string(), times);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().requests.clone()
    }

    pub fn request_count(&self, uri: &str) -> usize {
        self.state.lock().requests.iter().filter(|r| r.uri == uri).count()
    }
}

impl HttpClient for MockHttp {
    fn make_request(&self, request: &HttpRequest) -> InteractiveResult<HttpResponse> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        if let Some(left) = state.failures.get_mut(&request.uri) {
            if *left > 0 {
                *left -= 1;
                return Err(InteractiveError::Http(format!("{} unreachable", request.uri)));
            }
        }
        Ok(state.routes.get(&request.uri).cloned().unwrap_or(HttpResponse {
            status: 404,
            body: String::new(),
        }))
    }
}

//! Native transport implementations
//!
//! - `UreqHttpClient`: blocking HTTP via `ureq`
//! - `TungsteniteSocket`: blocking WebSocket via `tungstenite`, polled with a
//!   short read timeout so `send` and `close` can interleave with reads

use std::io;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use interact_core::{InteractiveError, InteractiveResult};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};
use tungstenite::client::IntoClientRequest;
use tungstenite::http::{HeaderName, HeaderValue};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::Message;

use crate::{HttpClient, HttpRequest, HttpResponse, SocketHandler, WebSocket};

/// Default connect/read timeout for HTTP requests
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a socket read blocks before re-checking for close
pub const SOCKET_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// HTTP client backed by a shared `ureq::Agent`
pub struct UreqHttpClient {
    agent: ureq::Agent,
}

impl UreqHttpClient {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .build();
        UreqHttpClient { agent }
    }
}

impl Default for UreqHttpClient {
    fn default() -> Self {
        UreqHttpClient::new(HTTP_TIMEOUT)
    }
}

impl HttpClient for UreqHttpClient {
    fn make_request(&self, request: &HttpRequest) -> InteractiveResult<HttpResponse> {
        let mut req = self.agent.request(request.method.as_str(), &request.uri);
        for (name, value) in &request.headers {
            req = req.set(name, value);
        }

        let result = match &request.body {
            Some(body) => req.send_string(body),
            None => req.call(),
        };

        let response = match result {
            Ok(response) => response,
            // Non-2xx still carries a body the caller may want
            Err(ureq::Error::Status(_, response)) => response,
            Err(e) => return Err(InteractiveError::Http(e.to_string())),
        };

        let status = response.status();
        let body = response
            .into_string()
            .map_err(|e| InteractiveError::Http(e.to_string()))?;
        debug!(uri = %request.uri, status, "http request completed");
        Ok(HttpResponse { status, body })
    }
}

type Socket = tungstenite::WebSocket<MaybeTlsStream<TcpStream>>;

/// WebSocket client backed by `tungstenite`
#[derive(Default)]
pub struct TungsteniteSocket {
    socket: Mutex<Option<Socket>>,
    closing: AtomicBool,
}

impl TungsteniteSocket {
    pub fn new() -> Self {
        TungsteniteSocket::default()
    }

    fn set_read_timeout(socket: &Socket, timeout: Duration) -> io::Result<()> {
        match socket.get_ref() {
            MaybeTlsStream::Plain(s) => s.set_read_timeout(Some(timeout)),
            MaybeTlsStream::Rustls(s) => s.get_ref().set_read_timeout(Some(timeout)),
            _ => Ok(()),
        }
    }

    fn is_timeout(e: &tungstenite::Error) -> bool {
        matches!(
            e,
            tungstenite::Error::Io(io) if matches!(io.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
        )
    }

    fn pump(&self, handler: &dyn SocketHandler) {
        loop {
            if self.closing.swap(false, Ordering::AcqRel) {
                if let Some(socket) = self.socket.lock().as_mut() {
                    let _ = socket.close(None);
                    let _ = socket.flush();
                }
                handler.on_close(1000, "closed by client");
                return;
            }

            let read = {
                let mut guard = self.socket.lock();
                match guard.as_mut() {
                    Some(socket) => socket.read(),
                    None => {
                        handler.on_close(1006, "socket gone");
                        return;
                    }
                }
            };

            match read {
                Ok(Message::Text(text)) => {
                    trace!(len = text.len(), "socket frame received");
                    handler.on_message(&text);
                }
                Ok(Message::Close(frame)) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    handler.on_close(code, &reason);
                    return;
                }
                Ok(_) => {}
                Err(e) if Self::is_timeout(&e) => {}
                Err(e) => {
                    warn!(error = %e, "socket read failed");
                    handler.on_close(1006, &e.to_string());
                    return;
                }
            }
        }
    }
}

impl WebSocket for TungsteniteSocket {
    fn open(
        &self,
        uri: &str,
        headers: &[(String, String)],
        handler: &dyn SocketHandler,
    ) -> InteractiveResult<()> {
        if self.closing.swap(false, Ordering::AcqRel) {
            return Err(InteractiveError::WsConnectFailed("closed before open".into()));
        }

        let mut request = uri
            .into_client_request()
            .map_err(|e| InteractiveError::WsConnectFailed(e.to_string()))?;
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| InteractiveError::WsConnectFailed(e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| InteractiveError::WsConnectFailed(e.to_string()))?;
            request.headers_mut().insert(name, value);
        }

        let (socket, _response) = tungstenite::connect(request)
            .map_err(|e| InteractiveError::WsConnectFailed(e.to_string()))?;
        Self::set_read_timeout(&socket, SOCKET_POLL_INTERVAL)
            .map_err(|e| InteractiveError::WsConnectFailed(e.to_string()))?;
        *self.socket.lock() = Some(socket);

        debug!(uri, "socket open");
        handler.on_open();
        self.pump(handler);
        *self.socket.lock() = None;
        Ok(())
    }

    fn send(&self, text: &str) -> InteractiveResult<()> {
        let mut guard = self.socket.lock();
        let socket = guard.as_mut().ok_or(InteractiveError::WsClosed)?;
        socket
            .send(Message::Text(text.to_string()))
            .map_err(|e| InteractiveError::WsSendFailed(e.to_string()))
    }

    fn close(&self) {
        self.closing.store(true, Ordering::Release);
    }
}

//! Offline transports for unit tests

use std::sync::Arc;
use std::time::Duration;

use interact_core::{InteractiveError, InteractiveResult};
use interact_time::ManualClock;
use interact_transport::{HttpClient, HttpRequest, HttpResponse, SocketHandler, WebSocket};

use crate::config::SessionConfig;
use crate::engine::SessionCore;
use crate::session::Session;

pub(crate) struct NullHttp;

impl HttpClient for NullHttp {
    fn make_request(&self, _request: &HttpRequest) -> InteractiveResult<HttpResponse> {
        Err(InteractiveError::Http("offline".into()))
    }
}

pub(crate) struct NullSocket;

impl WebSocket for NullSocket {
    fn open(&self, _uri: &str, _headers: &[(String, String)], _handler: &dyn SocketHandler) -> InteractiveResult<()> {
        Err(InteractiveError::WsConnectFailed("offline".into()))
    }

    fn send(&self, _text: &str) -> InteractiveResult<()> {
        Ok(())
    }

    fn close(&self) {}
}

pub(crate) fn fast_config() -> SessionConfig {
    SessionConfig {
        initial_retry: Duration::from_millis(10),
        max_retry: Duration::from_millis(40),
        send_retry_pause: Duration::from_millis(10),
        close_timeout: Duration::from_secs(5),
        ..SessionConfig::default()
    }
}

pub(crate) fn core(clock: Arc<ManualClock>) -> SessionCore {
    SessionCore::new(fast_config(), Arc::new(NullHttp), Arc::new(NullSocket), clock)
}

pub(crate) fn session() -> Session {
    Session::new(fast_config(), Arc::new(NullHttp), Arc::new(NullSocket)).unwrap()
}

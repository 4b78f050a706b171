//! WebSocket capability
//!
//! A session owns exactly one socket. `open` runs on the session's incoming
//! thread and blocks for the lifetime of the connection; `send` and `close`
//! are called from other threads while `open` is blocked.

use interact_core::InteractiveResult;

/// Callbacks for one socket connection, invoked on the thread blocked in `open`
pub trait SocketHandler: Send + Sync {
    /// Handshake completed
    fn on_open(&self);

    /// One text frame arrived
    fn on_message(&self, text: &str);

    /// Connection ended, after `on_open`
    fn on_close(&self, code: u16, reason: &str);
}

/// Blocking WebSocket client
pub trait WebSocket: Send + Sync {
    /// Connect and pump frames into `handler` until the connection ends.
    ///
    /// Returns `Err(WsConnectFailed)` when the handshake fails. Once
    /// `on_open` has fired, returns after `on_close`.
    fn open(
        &self,
        uri: &str,
        headers: &[(String, String)],
        handler: &dyn SocketHandler,
    ) -> InteractiveResult<()>;

    /// Send one text frame
    fn send(&self, text: &str) -> InteractiveResult<()>;

    /// Close the connection; a blocked `open` must return promptly.
    ///
    /// A close with no connection open makes the next `open` fail
    /// immediately, so a close racing a reconnect is never lost.
    fn close(&self);
}

//! Interact Runtime - The interactive session engine
//!
//! A session owns one socket to the interactive service and two worker threads:
//! 1. Incoming: host discovery, socket open/read loop, reconnect with backoff
//! 2. Outgoing: drains the FIFO of RPC methods and HTTP requests
//!
//! Server traffic lands in a priority queue that the application drains with
//! `Session::run`, so every application callback runs on the caller's thread.
//! Bootstrap replies (time sync, scenes, groups) are applied on the incoming
//! thread by internal hooks that never call application code.

pub mod config;
pub mod logging;
pub mod bootstrap;
pub mod callbacks;
pub mod batch;
mod queue;
mod rpc;
mod engine;
mod worker;
mod session;
mod dispatch;
mod api;

#[cfg(test)]
mod testing;

pub use config::*;
pub use logging::DebugLevel;
pub use bootstrap::{Bootstrap, BootstrapStep};
pub use callbacks::*;
pub use batch::{Batch, BatchEntry};
pub use session::Session;
pub use rpc::ReplyCallback;
pub use queue::HttpHandler;

pub use interact_core::*;
pub use interact_state::{Control, Group, Participant, PropertyValue};
pub use interact_transport::{HttpClient, HttpMethod, HttpRequest, HttpResponse, SocketHandler, WebSocket};
pub use interact_wire::params::ThrottleKind;
pub use interact_wire::MethodPacket;

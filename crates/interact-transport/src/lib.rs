//! Interact Transport - Network capabilities used by the session engine
//!
//! This crate provides:
//! - The `HttpClient` capability (host discovery, queued HTTP requests)
//! - The `WebSocket` capability (the single RPC socket of a session)
//! - Native implementations on top of `ureq` and `tungstenite` (feature `native`)

pub mod http;
pub mod socket;
#[cfg(feature = "native")]
pub mod native;

pub use http::*;
pub use socket::*;
#[cfg(feature = "native")]
pub use native::{TungsteniteSocket, UreqHttpClient};

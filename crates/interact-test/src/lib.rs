//! Interact Test Harness - In-process service and transports
//!
//! This crate provides:
//! - A scriptable in-memory WebSocket and HTTP client
//! - A scripted interactive service answering the bootstrap methods
//! - Frame builders for service-originated events
//! - A harness wiring a session to all of the above

pub mod mock;
pub mod service;
pub mod frames;
pub mod harness;

pub use mock::*;
pub use service::*;
pub use frames::*;
pub use harness::*;

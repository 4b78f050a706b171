//! Interact Time - Clock handling for the session engine
//!
//! This crate implements:
//! - Local clock sources (system and manual)
//! - Server clock offset estimation from a `getTime` round trip
//! - Exponential reconnect backoff
//! - Cooldown deadline arithmetic in server time

pub mod clock;
pub mod offset;
pub mod backoff;

pub use clock::*;
pub use offset::*;
pub use backoff::*;

//! Interact Wire - JSON RPC format spoken over the interactive socket
//!
//! This crate implements the wire format for interactive packets:
//! - Method / reply envelope with packet id and sequence echo
//! - Method and parameter name vocabulary
//! - Typed schemas for scenes, controls, groups, participants and input
//! - Parameter builders for every method the client sends
//! - Host discovery response parsing

pub mod packet;
pub mod methods;
pub mod schema;
pub mod input;
pub mod params;

pub use packet::*;
pub use schema::*;
pub use input::*;

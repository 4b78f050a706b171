//! Interact Core - Fundamental types shared by every layer of the SDK
//!
//! This crate defines:
//! - Identifiers (SceneId, GroupId, ControlId, ParticipantId, PacketId)
//! - The session connection state
//! - Application-facing event payloads (input, participant and control changes)
//! - Property type tags and the error taxonomy

pub mod id;
pub mod state;
pub mod event;
pub mod property;
pub mod error;

pub use id::*;
pub use state::*;
pub use event::*;
pub use property::*;
pub use error::*;

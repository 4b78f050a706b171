//! Interact State - The session's mirror of server-side state
//!
//! This crate implements:
//! - A generational arena with stable handles
//! - Scenes and controls stored in arenas, indexed by id
//! - Groups, participants and the group membership index
//! - Typed property access on controls, including meta properties
//!
//! The whole cache is guarded by one reader/writer lock owned by the session.

pub mod arena;
pub mod entity;
pub mod cache;

pub use arena::*;
pub use entity::*;
pub use cache::*;

//! Application-facing event payloads
//!
//! These are the values handed to the callbacks registered on a session.

use serde_json::Value;

use crate::{ControlId, ParticipantId, SessionState, TransactionId};

/// Press or release of a button-like control
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ButtonAction {
    Up,
    Down,
}

/// Decoded form of an input event
#[derive(Clone, Debug, PartialEq)]
pub enum InputKind {
    /// `mousedown` / `mouseup`, with optional pointer coordinates
    Click {
        action: ButtonAction,
        x: Option<f32>,
        y: Option<f32>,
    },
    /// `keydown` / `keyup`
    Key { action: ButtonAction },
    /// Joystick `move`
    Move { x: f32, y: f32 },
    /// Any other event name; inspect `Input::raw`
    Custom { event: String },
}

/// Participant input on a control
#[derive(Clone, Debug, PartialEq)]
pub struct Input {
    pub participant: ParticipantId,
    pub control: ControlId,
    /// Kind of the control as cached (`button`, `joystick`, ...)
    pub control_kind: String,
    pub transaction: Option<TransactionId>,
    pub kind: InputKind,
    /// The `input` object exactly as received
    pub raw: Value,
}

impl Input {
    /// True if the input carries a spendable transaction
    #[inline]
    pub fn has_transaction(&self) -> bool {
        self.transaction.is_some()
    }
}

/// What happened to a participant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParticipantAction {
    Join,
    Leave,
    Update,
}

/// What happened to a control
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlChange {
    Created,
    Updated,
    Deleted,
}

/// Connection state transition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StateChange {
    pub previous: SessionState,
    pub current: SessionState,
}

//! Application callbacks
//!
//! Callbacks may be registered at any time and are only ever invoked from
//! `Session::run` on the calling thread. They may call back into the session.

use std::sync::Arc;

use interact_core::{ControlChange, Input, ParticipantAction, SessionState, TransactionId};
use interact_state::{Control, Participant};
use interact_wire::MethodPacket;

use crate::session::Session;

/// `(session, code, message)`
pub type ErrorCallback = Arc<dyn Fn(&Session, i32, &str) + Send + Sync>;
/// `(session, previous, current)`
pub type StateChangedCallback = Arc<dyn Fn(&Session, SessionState, SessionState) + Send + Sync>;
pub type InputCallback = Arc<dyn Fn(&Session, &Input) + Send + Sync>;
pub type ParticipantsChangedCallback = Arc<dyn Fn(&Session, ParticipantAction, &Participant) + Send + Sync>;
/// `(session, transaction, code, message)`; code 0 means captured
pub type TransactionCompleteCallback = Arc<dyn Fn(&Session, &TransactionId, i32, &str) + Send + Sync>;
/// For `Deleted` the control is the last cached copy
pub type ControlChangedCallback = Arc<dyn Fn(&Session, ControlChange, &Control) + Send + Sync>;
pub type UnhandledMethodCallback = Arc<dyn Fn(&Session, &MethodPacket) + Send + Sync>;

#[derive(Default, Clone)]
pub(crate) struct Callbacks {
    pub error: Option<ErrorCallback>,
    pub state_changed: Option<StateChangedCallback>,
    pub input: Option<InputCallback>,
    pub participants_changed: Option<ParticipantsChangedCallback>,
    pub transaction_complete: Option<TransactionCompleteCallback>,
    pub control_changed: Option<ControlChangedCallback>,
    pub unhandled_method: Option<UnhandledMethodCallback>,
}

impl Session {
    pub fn on_error(&self, f: impl Fn(&Session, i32, &str) + Send + Sync + 'static) {
        self.core.callbacks.lock().error = Some(Arc::new(f));
    }

    pub fn on_state_changed(&self, f: impl Fn(&Session, SessionState, SessionState) + Send + Sync + 'static) {
        self.core.callbacks.lock().state_changed = Some(Arc::new(f));
    }

    pub fn on_input(&self, f: impl Fn(&Session, &Input) + Send + Sync + 'static) {
        self.core.callbacks.lock().input = Some(Arc::new(f));
    }

    pub fn on_participants_changed(
        &self,
        f: impl Fn(&Session, ParticipantAction, &Participant) + Send + Sync + 'static,
    ) {
        self.core.callbacks.lock().participants_changed = Some(Arc::new(f));
    }

    pub fn on_transaction_complete(
        &self,
        f: impl Fn(&Session, &TransactionId, i32, &str) + Send + Sync + 'static,
    ) {
        self.core.callbacks.lock().transaction_complete = Some(Arc::new(f));
    }

    pub fn on_control_changed(&self, f: impl Fn(&Session, ControlChange, &Control) + Send + Sync + 'static) {
        self.core.callbacks.lock().control_changed = Some(Arc::new(f));
    }

    /// Server methods the session does not handle itself
    pub fn on_unhandled_method(&self, f: impl Fn(&Session, &MethodPacket) + Send + Sync + 'static) {
        self.core.callbacks.lock().unhandled_method = Some(Arc::new(f));
    }

    /// Snapshot of the registered callbacks, taken so none is invoked under the lock
    pub(crate) fn callbacks(&self) -> Callbacks {
        self.core.callbacks.lock().clone()
    }
}

//! Per-session state machine and the once-only result delivery

use parking_lot::Mutex;
use tracing::trace;

use super::{ScanCallback, ScanOutcome};
use crate::error::ScanError;

/// Where a scan session is in its lifecycle.
///
/// `Idle -> Acquiring -> (Decoding -> Acquiring)* -> Found | Failed -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Acquiring,
    Decoding,
    Found,
    Failed,
}

impl SessionState {
    /// Whether `self -> next` is an edge of the lifecycle
    pub fn can_transition(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Acquiring)
                | (Idle, Failed)
                | (Acquiring, Decoding)
                | (Acquiring, Failed)
                | (Decoding, Acquiring)
                | (Decoding, Found)
                | (Decoding, Failed)
                | (Found, Idle)
                | (Failed, Idle)
        ) || (self != Idle && next == Idle)
    }

    /// Found and Failed end a session
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Found | SessionState::Failed)
    }

    /// Acquiring or Decoding
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Acquiring | SessionState::Decoding)
    }
}

#[derive(Default)]
struct Delivery {
    callback: Option<ScanCallback>,
    reported: bool,
    cancelled: bool,
}

/// One scan session: lifecycle state plus the result callback.
///
/// The callback is taken out under the lock before it runs, so it fires at
/// most once however many results race for it. Once the session is
/// cancelled nothing more is delivered through it.
pub struct ScanSession {
    id: u64,
    state: Mutex<SessionState>,
    delivery: Mutex<Delivery>,
}

impl ScanSession {
    pub fn new(id: u64, callback: ScanCallback) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState::Idle),
            delivery: Mutex::new(Delivery {
                callback: Some(callback),
                ..Delivery::default()
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Move to `next` if the lifecycle allows it; terminal states stick
    pub fn advance(&self, next: SessionState) -> bool {
        let mut state = self.state.lock();
        if !state.can_transition(next) {
            trace!(session = self.id, from = ?*state, to = ?next, "transition refused");
            return false;
        }
        trace!(session = self.id, from = ?*state, to = ?next, "transition");
        *state = next;
        true
    }

    /// Whether an outcome has already gone to the callback
    pub fn reported(&self) -> bool {
        self.delivery.lock().reported
    }

    pub fn is_cancelled(&self) -> bool {
        self.delivery.lock().cancelled
    }

    /// Hand `outcome` to the callback. Returns `false` (dropping the
    /// outcome) when the session was cancelled or already reported.
    pub fn deliver(&self, outcome: ScanOutcome) -> bool {
        let callback = {
            let mut delivery = self.delivery.lock();
            if delivery.cancelled || delivery.reported {
                return false;
            }
            delivery.reported = true;
            delivery.callback.take()
        };
        match callback {
            Some(callback) => {
                callback(outcome);
                true
            }
            None => false,
        }
    }

    /// Stop delivering through this session and return the callback if it
    /// has not fired yet
    pub fn cancel(&self) -> Option<ScanCallback> {
        let mut delivery = self.delivery.lock();
        delivery.cancelled = true;
        if delivery.reported {
            return None;
        }
        delivery.callback.take()
    }

    /// Cancel and tell a still-waiting consumer
    pub fn cancel_and_notify(&self) {
        if let Some(callback) = self.cancel() {
            callback(Err(ScanError::Cancelled));
        }
    }
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

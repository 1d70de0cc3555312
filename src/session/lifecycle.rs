use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::{Result, SessionError};

use super::events::{CallTicket, SessionFailure};

/// Coarse room-session phase.
///
/// Forward path is `NotJoined -> Previewing -> InMeeting` (preview may be
/// skipped). `Ended` is reachable from anywhere and never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    NotJoined,
    Previewing,
    InMeeting,
    Ended,
}

impl SessionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::NotJoined => "not_joined",
            SessionPhase::Previewing => "previewing",
            SessionPhase::InMeeting => "in_meeting",
            SessionPhase::Ended => "ended",
        }
    }

    pub fn is_pre_meeting(self) -> bool {
        matches!(self, SessionPhase::NotJoined | SessionPhase::Previewing)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PendingCall {
    StartStreaming,
}

/// A phase change produced by a lifecycle call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PhaseChange {
    pub from: SessionPhase,
    pub to: SessionPhase,
}

/// Phase machine plus the parallel flags that must not move the phase.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    phase: SessionPhase,
    session_id: String,
    skip_preview: bool,
    reconnecting: bool,
    blocking_error: Option<SessionFailure>,
    pending: HashMap<u64, PendingCall>,
    next_call_id: u64,
    streaming_starts_in_flight: u32,
    streaming_running: bool,
}

impl Lifecycle {
    pub fn new(session_id: impl Into<String>, skip_preview: bool) -> Self {
        Self {
            phase: SessionPhase::NotJoined,
            session_id: session_id.into(),
            skip_preview,
            reconnecting: false,
            blocking_error: None,
            pending: HashMap::new(),
            next_call_id: 0,
            streaming_starts_in_flight: 0,
            streaming_running: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn start_preview(&mut self) -> Result<PhaseChange> {
        match self.phase {
            SessionPhase::NotJoined => Ok(self.move_to(SessionPhase::Previewing)),
            SessionPhase::Ended => Err(SessionError::SessionEnded),
            from => Err(SessionError::InvalidTransition {
                from,
                action: "start preview",
            }),
        }
    }

    /// Validate a join request. The phase only moves once the backend confirms.
    pub fn request_join(&self) -> Result<()> {
        match self.phase {
            SessionPhase::Previewing => Ok(()),
            SessionPhase::NotJoined if self.skip_preview => Ok(()),
            SessionPhase::Ended => Err(SessionError::SessionEnded),
            from => Err(SessionError::InvalidTransition {
                from,
                action: "join",
            }),
        }
    }

    /// Backend confirmed the join. Returns `None` for duplicates, post-teardown
    /// confirmations and while a blocking failure awaits acknowledgement.
    pub fn join_confirmed(&mut self) -> Option<PhaseChange> {
        if self.phase.is_pre_meeting() && self.blocking_error.is_none() {
            Some(self.move_to(SessionPhase::InMeeting))
        } else {
            None
        }
    }

    /// Move to `Ended`, cancelling every in-flight call.
    pub fn end(&mut self) -> Option<PhaseChange> {
        if self.phase == SessionPhase::Ended {
            return None;
        }
        self.pending.clear();
        self.streaming_starts_in_flight = 0;
        self.reconnecting = false;
        Some(self.move_to(SessionPhase::Ended))
    }

    pub fn is_ended(&self) -> bool {
        self.phase == SessionPhase::Ended
    }

    /// Returns `true` when the flag changed. Ignored once ended.
    pub fn set_reconnecting(&mut self, value: bool) -> bool {
        if self.is_ended() || self.reconnecting == value {
            return false;
        }
        self.reconnecting = value;
        true
    }

    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting
    }

    pub fn set_blocking_error(&mut self, failure: SessionFailure) {
        self.blocking_error = Some(failure);
    }

    pub fn blocking_error(&self) -> Option<&SessionFailure> {
        self.blocking_error.as_ref()
    }

    pub fn take_blocking_error(&mut self) -> Option<SessionFailure> {
        self.blocking_error.take()
    }

    pub fn begin_streaming_start(&mut self) -> CallTicket {
        self.streaming_starts_in_flight = self.streaming_starts_in_flight.saturating_add(1);
        self.begin_call(PendingCall::StartStreaming)
    }

    /// Resolve a completion. `None` means it is stale and must be ignored.
    pub fn complete(&mut self, ticket: &CallTicket) -> Option<PendingCall> {
        if self.is_ended() || ticket.session_id != self.session_id {
            return None;
        }
        let call = self.pending.remove(&ticket.call_id)?;
        match call {
            PendingCall::StartStreaming => {
                self.streaming_starts_in_flight = self.streaming_starts_in_flight.saturating_sub(1);
            }
        }
        Some(call)
    }

    pub fn streaming_starting(&self) -> bool {
        self.streaming_starts_in_flight > 0
    }

    pub fn streaming_running(&self) -> bool {
        self.streaming_running
    }

    pub fn set_streaming_running(&mut self, running: bool) {
        self.streaming_running = running;
    }

    fn begin_call(&mut self, call: PendingCall) -> CallTicket {
        let call_id = self.next_call_id;
        self.next_call_id = self.next_call_id.wrapping_add(1);
        self.pending.insert(call_id, call);
        CallTicket {
            session_id: self.session_id.clone(),
            call_id,
        }
    }

    fn move_to(&mut self, to: SessionPhase) -> PhaseChange {
        let from = self.phase;
        self.phase = to;
        PhaseChange { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_then_join() {
        let mut lifecycle = Lifecycle::new("s1", false);
        assert!(lifecycle.request_join().is_err());
        lifecycle.start_preview().unwrap();
        assert_eq!(lifecycle.phase(), SessionPhase::Previewing);
        lifecycle.request_join().unwrap();

        let change = lifecycle.join_confirmed().unwrap();
        assert_eq!(change.from, SessionPhase::Previewing);
        assert_eq!(change.to, SessionPhase::InMeeting);
        assert!(lifecycle.join_confirmed().is_none());
    }

    #[test]
    fn join_confirmed_from_not_joined_skips_preview() {
        let mut lifecycle = Lifecycle::new("s1", true);
        lifecycle.request_join().unwrap();
        lifecycle.join_confirmed().unwrap();
        assert_eq!(lifecycle.phase(), SessionPhase::InMeeting);
    }

    #[test]
    fn ended_is_terminal() {
        for setup in [0, 1, 2] {
            let mut lifecycle = Lifecycle::new("s1", true);
            if setup >= 1 {
                lifecycle.start_preview().unwrap();
            }
            if setup >= 2 {
                lifecycle.join_confirmed().unwrap();
            }
            assert!(lifecycle.end().is_some());
            assert_eq!(lifecycle.phase(), SessionPhase::Ended);

            assert!(lifecycle.end().is_none());
            assert!(lifecycle.join_confirmed().is_none());
            assert!(matches!(
                lifecycle.start_preview(),
                Err(SessionError::SessionEnded)
            ));
            assert!(lifecycle.request_join().is_err());
            assert!(!lifecycle.set_reconnecting(true));
            assert_eq!(lifecycle.phase(), SessionPhase::Ended);
        }
    }

    #[test]
    fn start_preview_twice_is_rejected() {
        let mut lifecycle = Lifecycle::new("s1", false);
        lifecycle.start_preview().unwrap();
        let err = lifecycle.start_preview().unwrap_err();
        assert_eq!(err.to_string(), "cannot start preview while previewing");
    }

    #[test]
    fn completion_after_end_is_stale() {
        let mut lifecycle = Lifecycle::new("s1", true);
        lifecycle.join_confirmed();
        let ticket = lifecycle.begin_streaming_start();
        assert!(lifecycle.streaming_starting());

        lifecycle.end();
        assert!(!lifecycle.streaming_starting());
        assert!(lifecycle.complete(&ticket).is_none());
    }

    #[test]
    fn completion_checks_session_and_call() {
        let mut lifecycle = Lifecycle::new("s1", true);
        lifecycle.join_confirmed();
        let ticket = lifecycle.begin_streaming_start();

        let foreign = CallTicket {
            session_id: "s2".into(),
            call_id: ticket.call_id,
        };
        assert!(lifecycle.complete(&foreign).is_none());
        assert!(lifecycle.streaming_starting());

        assert_eq!(lifecycle.complete(&ticket), Some(PendingCall::StartStreaming));
        assert!(!lifecycle.streaming_starting());
        assert!(lifecycle.complete(&ticket).is_none());
    }

    #[test]
    fn blocking_error_holds_off_join_confirmation() {
        let mut lifecycle = Lifecycle::new("s1", false);
        lifecycle.start_preview().unwrap();
        lifecycle.set_blocking_error(SessionFailure {
            code: 401,
            message: "token expired".into(),
        });

        assert!(lifecycle.join_confirmed().is_none());
        assert_eq!(lifecycle.phase(), SessionPhase::Previewing);
        assert!(lifecycle.blocking_error().is_some());
    }

    #[test]
    fn reconnecting_does_not_move_phase() {
        let mut lifecycle = Lifecycle::new("s1", true);
        lifecycle.join_confirmed();
        assert!(lifecycle.set_reconnecting(true));
        assert!(!lifecycle.set_reconnecting(true));
        assert_eq!(lifecycle.phase(), SessionPhase::InMeeting);
        assert!(lifecycle.set_reconnecting(false));
    }
}

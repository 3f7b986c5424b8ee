//! Recording session state machine

use std::fmt;
use thiserror::Error;

/// Recording session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Negotiating,
    Streaming,
    Draining,
    Stopped,
}

impl SessionState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Negotiating => "negotiating",
            Self::Streaming => "streaming",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }

    /// Encoding used to publish the state through an atomic
    pub const fn as_u8(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Negotiating => 1,
            Self::Streaming => 2,
            Self::Draining => 3,
            Self::Stopped => 4,
        }
    }

    /// Inverse of [`SessionState::as_u8`]; unknown values read as idle
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Negotiating,
            2 => Self::Streaming,
            3 => Self::Draining,
            4 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: SessionState,
    pub action: String,
}

/// Recording session entity.
/// Guards the lifecycle of one capture.
///
/// State machine:
///   IDLE -> NEGOTIATING (begin_negotiation)
///   NEGOTIATING -> STREAMING (start_streaming)
///   NEGOTIATING -> IDLE (abort_start)
///   STREAMING -> DRAINING (begin_draining)
///   DRAINING -> STOPPED (finish_draining)
///   STOPPED -> IDLE (reset)
#[derive(Debug, Default)]
pub struct RecordingSession {
    state: SessionState,
}

impl RecordingSession {
    /// Create a new session in idle state
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    /// Get the current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if currently idle
    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    /// Check if a capture stream is live
    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }

    fn transition(
        &mut self,
        from: SessionState,
        to: SessionState,
        action: &str,
    ) -> Result<(), InvalidStateTransition> {
        if self.state != from {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: action.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }

    /// Transition from IDLE to NEGOTIATING
    pub fn begin_negotiation(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(SessionState::Idle, SessionState::Negotiating, "start recording")
    }

    /// Transition from NEGOTIATING to STREAMING
    pub fn start_streaming(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(
            SessionState::Negotiating,
            SessionState::Streaming,
            "start streaming",
        )
    }

    /// Transition from NEGOTIATING back to IDLE after a failed start
    pub fn abort_start(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(SessionState::Negotiating, SessionState::Idle, "abort start")
    }

    /// Transition from STREAMING to DRAINING
    pub fn begin_draining(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(SessionState::Streaming, SessionState::Draining, "stop recording")
    }

    /// Transition from DRAINING to STOPPED
    pub fn finish_draining(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(SessionState::Draining, SessionState::Stopped, "finish draining")
    }

    /// Transition from STOPPED to IDLE
    pub fn reset(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(SessionState::Stopped, SessionState::Idle, "reset")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_idle() {
        let session = RecordingSession::new();
        assert!(session.is_idle());
        assert!(!session.is_streaming());
    }

    #[test]
    fn full_cycle() {
        let mut session = RecordingSession::new();
        session.begin_negotiation().unwrap();
        assert_eq!(session.state(), SessionState::Negotiating);

        session.start_streaming().unwrap();
        assert!(session.is_streaming());

        session.begin_draining().unwrap();
        assert_eq!(session.state(), SessionState::Draining);

        session.finish_draining().unwrap();
        assert_eq!(session.state(), SessionState::Stopped);

        session.reset().unwrap();
        assert!(session.is_idle());

        // Can start another cycle
        session.begin_negotiation().unwrap();
        assert_eq!(session.state(), SessionState::Negotiating);
    }

    #[test]
    fn failed_negotiation_returns_to_idle() {
        let mut session = RecordingSession::new();
        session.begin_negotiation().unwrap();
        session.abort_start().unwrap();
        assert!(session.is_idle());
    }

    #[test]
    fn start_while_streaming_fails() {
        let mut session = RecordingSession::new();
        session.begin_negotiation().unwrap();
        session.start_streaming().unwrap();

        let err = session.begin_negotiation().unwrap_err();
        assert_eq!(err.current_state, SessionState::Streaming);
        assert!(err.action.contains("start recording"));
        assert!(session.is_streaming());
    }

    #[test]
    fn stop_from_idle_fails() {
        let mut session = RecordingSession::new();
        let err = session.begin_draining().unwrap_err();
        assert_eq!(err.current_state, SessionState::Idle);
        assert!(session.is_idle());
    }

    #[test]
    fn stream_cannot_skip_negotiation() {
        let mut session = RecordingSession::new();
        assert!(session.start_streaming().is_err());
    }

    #[test]
    fn reset_requires_stopped() {
        let mut session = RecordingSession::new();
        session.begin_negotiation().unwrap();
        session.start_streaming().unwrap();
        let err = session.reset().unwrap_err();
        assert_eq!(err.current_state, SessionState::Streaming);
    }

    #[test]
    fn atomic_encoding_round_trips() {
        for state in [
            SessionState::Idle,
            SessionState::Negotiating,
            SessionState::Streaming,
            SessionState::Draining,
            SessionState::Stopped,
        ] {
            assert_eq!(SessionState::from_u8(state.as_u8()), state);
        }
    }

    #[test]
    fn state_display() {
        assert_eq!(SessionState::Idle.to_string(), "idle");
        assert_eq!(SessionState::Streaming.to_string(), "streaming");
        assert_eq!(SessionState::Draining.to_string(), "draining");
    }

    #[test]
    fn error_display() {
        let err = InvalidStateTransition {
            current_state: SessionState::Draining,
            action: "start recording".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("start recording"));
        assert!(msg.contains("draining"));
    }
}

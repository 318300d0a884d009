//! Per-card session state
//!
//! A [`Session`] wraps the transport for the duration of one card
//! presentation. It tracks the protocol state and records every exchange as
//! a structured [`TraceEvent`]. It is created when the card is seen and
//! dropped when the outcome is known; nothing in it survives the card.

use std::fmt;
use std::time::Duration;

use tracing::{debug, trace};

use crate::apdu::status_word;
use crate::transport::{Transport, TransportError};

/// Protocol state of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    #[default]
    Idle,
    PpseSelected,
    AidEnumerated,
    AidSelected,
    PdolResolved,
    GpoSent,
    RecordsRead,
    Extracted,
    Done,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Done | SessionState::Aborted)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::PpseSelected => "PPSE selected",
            SessionState::AidEnumerated => "AIDs enumerated",
            SessionState::AidSelected => "AID selected",
            SessionState::PdolResolved => "PDOL resolved",
            SessionState::GpoSent => "GPO sent",
            SessionState::RecordsRead => "reading records",
            SessionState::Extracted => "card data extracted",
            SessionState::Done => "done",
            SessionState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// One command/response exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    /// State the session was in when the command was sent
    pub state: SessionState,
    pub command: Vec<u8>,
    /// Raw response, or the transport failure message
    pub response: Result<Vec<u8>, String>,
}

impl TraceEvent {
    /// Status word of the response, if one arrived
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().ok().and_then(|r| status_word(r))
    }
}

type StateHook<'a> = Box<dyn FnMut(SessionState) + 'a>;

/// Transport wrapper holding the session state and trace
pub struct Session<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    state: SessionState,
    trace: Vec<TraceEvent>,
    gpo_attempts: usize,
    on_state: Option<StateHook<'a>>,
}

impl<T: Transport + ?Sized> fmt::Debug for Session<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("trace", &self.trace.len())
            .field("gpo_attempts", &self.gpo_attempts)
            .finish()
    }
}

impl<'a, T: Transport + ?Sized> Session<'a, T> {
    pub fn new(transport: &'a mut T) -> Self {
        Self {
            transport,
            state: SessionState::Idle,
            trace: Vec::new(),
            gpo_attempts: 0,
            on_state: None,
        }
    }

    /// Observe every state change
    pub fn with_state_hook(mut self, hook: impl FnMut(SessionState) + 'a) -> Self {
        self.on_state = Some(Box::new(hook));
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn trace(&self) -> &[TraceEvent] {
        &self.trace
    }

    pub fn into_trace(self) -> Vec<TraceEvent> {
        self.trace
    }

    pub fn gpo_attempts(&self) -> usize {
        self.gpo_attempts
    }

    pub(crate) fn record_gpo_attempt(&mut self) {
        self.gpo_attempts += 1;
    }

    pub(crate) fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        debug!(from = %self.state, to = %next, "Session state change");
        self.state = next;
        if let Some(hook) = self.on_state.as_mut() {
            hook(next);
        }
    }
}

impl<T: Transport + ?Sized> Transport for Session<'_, T> {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.transport.connect()
    }

    fn transceive(&mut self, command: &[u8]) -> Result<Vec<u8>, TransportError> {
        trace!(state = %self.state, command = %hex::encode_upper(command), ">>");
        let result = self.transport.transceive(command);

        match &result {
            Ok(response) => trace!(response = %hex::encode_upper(response), "<<"),
            Err(e) => debug!(error = %e, "Exchange failed"),
        }

        self.trace.push(TraceEvent {
            state: self.state,
            command: command.to_vec(),
            response: result
                .as_ref()
                .map(Clone::clone)
                .map_err(ToString::to_string),
        });

        result
    }

    fn close(&mut self) {
        self.transport.close()
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.transport.set_timeout(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Echo;

    impl Transport for Echo {
        fn connect(&mut self) -> Result<(), TransportError> {
            Ok(())
        }

        fn transceive(&mut self, command: &[u8]) -> Result<Vec<u8>, TransportError> {
            if command.is_empty() {
                return Err(TransportError::Timeout);
            }
            Ok([command, &[0x90, 0x00]].concat())
        }

        fn close(&mut self) {}

        fn set_timeout(&mut self, _timeout: Duration) {}
    }

    #[test]
    fn test_trace_records_state_and_outcome() {
        let mut echo = Echo;
        let mut session = Session::new(&mut echo);

        session.transition(SessionState::PpseSelected);
        session.transceive(&[0x01]).unwrap();
        assert!(session.transceive(&[]).is_err());

        let trace = session.trace();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].state, SessionState::PpseSelected);
        assert_eq!(trace[0].status(), Some(0x9000));
        assert_eq!(trace[1].response, Err("card did not respond in time".to_string()));
        assert_eq!(trace[1].status(), None);
    }

    #[test]
    fn test_state_hook_sees_changes_once() {
        let seen = RefCell::new(Vec::new());
        let mut echo = Echo;
        let mut session =
            Session::new(&mut echo).with_state_hook(|state| seen.borrow_mut().push(state));

        session.transition(SessionState::PpseSelected);
        session.transition(SessionState::PpseSelected);
        session.transition(SessionState::Aborted);
        drop(session);

        assert_eq!(
            seen.into_inner(),
            vec![SessionState::PpseSelected, SessionState::Aborted]
        );
        assert!(SessionState::Aborted.is_terminal());
    }
}

//! Armed state and session exclusivity
//!
//! The manager is the only entry point for "card discovered" notifications.
//! It runs at most one session at a time; a notification arriving while a
//! session is active is dropped before any byte reaches its transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::config::ReaderConfig;
use crate::error::ReadError;
use crate::protocol::{CardRecord, EmvCard};
use crate::session::{SessionState, TraceEvent};
use crate::transport::Transport;

/// What one session produced
#[derive(Debug)]
pub struct SessionOutcome {
    pub result: Result<CardRecord, ReadError>,
    /// Every exchange of the session, in order
    pub trace: Vec<TraceEvent>,
}

/// Owns the listening state and the active-session flag
#[derive(Debug, Default)]
pub struct SessionManager {
    armed: AtomicBool,
    active: AtomicBool,
    state: Mutex<SessionState>,
    config: ReaderConfig,
}

/// Clears the active flag however the session ends
struct ActiveGuard<'a>(&'a AtomicBool);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionManager {
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Start listening for a card; returns `false` if already armed
    pub fn arm(&self) -> bool {
        let newly = !self.armed.swap(true, Ordering::AcqRel);
        if newly {
            info!("Reader armed, waiting for card");
        }
        newly
    }

    /// Stop listening; an active session still runs to completion
    pub fn disarm(&self) {
        if self.armed.swap(false, Ordering::AcqRel) {
            debug!("Reader disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// State of the current or most recent session
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: SessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Handle a card appearing on the reader
    ///
    /// Returns [`ReadError::NotArmed`] or [`ReadError::SessionBusy`] without
    /// touching `transport` when the notification must be dropped. Otherwise
    /// the whole session runs, the transport is closed and the reader is
    /// disarmed.
    pub fn on_card_discovered<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
    ) -> Result<SessionOutcome, ReadError> {
        if !self.is_armed() {
            debug!("Card discovered while not armed, ignoring");
            return Err(ReadError::NotArmed);
        }

        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(state = %self.state(), "Card discovered mid-session, ignoring");
            return Err(ReadError::SessionBusy);
        }
        let _active = ActiveGuard(&self.active);

        self.set_state(SessionState::Idle);
        transport.set_timeout(self.config.timeout);

        let outcome = match transport.connect() {
            Ok(()) => {
                let mut card = EmvCard::new(&mut *transport, self.config.clone())
                    .with_state_hook(|state| self.set_state(state));
                let result = card.read_card();
                let trace = card.into_trace();
                SessionOutcome { result, trace }
            }
            Err(e) => {
                warn!(error = %e, "Could not connect to card");
                self.set_state(SessionState::Aborted);
                SessionOutcome {
                    result: Err(ReadError::Transport(e)),
                    trace: Vec::new(),
                }
            }
        };

        transport.close();
        self.disarm();
        Ok(outcome)
    }
}

//! PC/SC card reader management

use std::ffi::{CStr, CString};
use std::fmt;
use std::time::{Duration, Instant};

use pcsc::{
    Card, Context, Disposition, Protocols, ReaderState, Scope, ShareMode, State, MAX_BUFFER_SIZE,
};
use tracing::{debug, warn};

use crate::transport::{Transport, TransportError};

/// Card reader wrapper for managing PC/SC connections
pub struct CardReader {
    context: Context,
}

impl CardReader {
    /// Create a new CardReader by establishing a PC/SC context
    pub fn new() -> Result<Self, pcsc::Error> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context })
    }

    /// List all available card readers
    pub fn list_readers(&self) -> Result<Vec<CString>, pcsc::Error> {
        let mut readers_buf = [0; 2048];
        let readers = self.context.list_readers(&mut readers_buf)?;
        Ok(readers.map(CStr::to_owned).collect())
    }

    /// Pick a reader: the one named, or the first attached
    pub fn find_reader(&self, name: Option<&str>) -> Result<CString, pcsc::Error> {
        let readers = self.list_readers()?;

        let found = match name {
            Some(wanted) => readers
                .into_iter()
                .find(|r| r.to_string_lossy().contains(wanted)),
            None => readers.into_iter().next(),
        };

        found.ok_or(pcsc::Error::NoReadersAvailable)
    }

    /// Block until a card is on the reader
    ///
    /// Returns `false` when `timeout` elapses first.
    pub fn wait_for_card(&self, reader: &CStr, timeout: Option<Duration>) -> Result<bool, pcsc::Error> {
        self.wait_for(reader, true, timeout)
    }

    /// Block until the reader is empty
    pub fn wait_for_removal(&self, reader: &CStr, timeout: Option<Duration>) -> Result<bool, pcsc::Error> {
        self.wait_for(reader, false, timeout)
    }

    fn wait_for(&self, reader: &CStr, present: bool, timeout: Option<Duration>) -> Result<bool, pcsc::Error> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut states = [ReaderState::new(reader, State::UNAWARE)];

        loop {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            match self.context.get_status_change(remaining, &mut states) {
                Ok(()) => {}
                Err(pcsc::Error::Timeout) => return Ok(false),
                Err(e) => return Err(e),
            }

            let event = states[0].event_state();
            let has_card = event.contains(State::PRESENT) && !event.contains(State::EMPTY);
            if has_card == present {
                return Ok(true);
            }
            states[0].sync_current_state();
        }
    }

    /// Transport bound to one reader; not connected until [`Transport::connect`]
    pub fn transport(&self, reader: &CStr) -> PcscTransport {
        PcscTransport::new(self.context.clone(), reader.to_owned())
    }
}

/// [`Transport`] over a PC/SC reader
pub struct PcscTransport {
    context: Context,
    reader: CString,
    card: Option<Card>,
    timeout: Duration,
}

impl fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTransport")
            .field("reader", &self.reader)
            .field("connected", &self.card.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PcscTransport {
    fn new(context: Context, reader: CString) -> Self {
        Self {
            context,
            reader,
            card: None,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn reader_name(&self) -> String {
        self.reader.to_string_lossy().into_owned()
    }
}

fn map_pcsc(e: pcsc::Error) -> TransportError {
    match e {
        pcsc::Error::RemovedCard | pcsc::Error::NoSmartcard | pcsc::Error::ResetCard => {
            TransportError::CardRemoved
        }
        pcsc::Error::Timeout => TransportError::Timeout,
        other => TransportError::Pcsc(other),
    }
}

impl Transport for PcscTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.card.is_some() {
            return Ok(());
        }
        let card = self
            .context
            .connect(&self.reader, ShareMode::Shared, Protocols::ANY)
            .map_err(map_pcsc)?;
        debug!(reader = %self.reader_name(), "Connected to card");
        self.card = Some(card);
        Ok(())
    }

    /// PC/SC offers no per-transmit deadline, so a response arriving after
    /// the timeout is discarded and reported as [`TransportError::Timeout`].
    fn transceive(&mut self, command: &[u8]) -> Result<Vec<u8>, TransportError> {
        let card = self.card.as_ref().ok_or(TransportError::NotConnected)?;

        let mut rapdu_buf = [0; MAX_BUFFER_SIZE];
        let started = Instant::now();
        let rapdu = card.transmit(command, &mut rapdu_buf).map_err(map_pcsc)?;

        let elapsed = started.elapsed();
        if elapsed > self.timeout {
            warn!(?elapsed, timeout = ?self.timeout, "Card answered after the timeout");
            return Err(TransportError::Timeout);
        }

        Ok(rapdu.to_vec())
    }

    fn close(&mut self) {
        if let Some(card) = self.card.take() {
            if let Err((_, e)) = card.disconnect(Disposition::LeaveCard) {
                debug!(error = %e, "Disconnect failed");
            }
        }
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        self.close();
    }
}

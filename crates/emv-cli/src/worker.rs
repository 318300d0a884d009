//! Background reader loop for the `watch` command
//!
//! The worker owns the PC/SC context and the session manager. It re-arms the
//! manager for every card and waits for the card to leave before arming
//! again, so each presentation produces exactly one session.

use std::ffi::CString;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use emv_reader::{CardReader, CardRecord, SessionManager};
use tracing::{debug, info, warn};

use crate::commands::SessionArgs;

const POLL: Duration = Duration::from_millis(250);
const READER_RETRY: Duration = Duration::from_secs(2);

/// Messages sent from the card worker to the front end
#[derive(Debug, Clone)]
pub enum CardEvent {
    /// Reader became available
    ReaderAvailable { reader_name: String },
    /// Reader is unavailable
    ReaderUnavailable { error: String },
    /// Waiting for a card
    Armed,
    /// Card was detected
    CardDetected,
    /// Card data was successfully read
    DataReady { record: CardRecord, exchanges: usize },
    /// The session ended without card data
    Error { code: &'static str, message: String },
    /// Card was removed
    CardRemoved,
}

/// Commands sent from the front end to the card worker
#[derive(Debug)]
pub enum CardCommand {
    /// Stop the worker thread
    Stop,
}

/// Background worker for card operations
pub struct CardWorker {
    event_tx: Sender<CardEvent>,
    command_rx: Receiver<CardCommand>,
    reader_filter: Option<String>,
    manager: SessionManager,
}

impl CardWorker {
    /// Spawn a new card worker thread
    pub fn spawn(args: &SessionArgs) -> (Receiver<CardEvent>, Sender<CardCommand>) {
        let (event_tx, event_rx) = mpsc::channel();
        let (command_tx, command_rx) = mpsc::channel();

        let worker = CardWorker {
            event_tx,
            command_rx,
            reader_filter: args.reader.clone(),
            manager: SessionManager::new(args.config()),
        };
        thread::spawn(move || worker.run());

        (event_rx, command_tx)
    }

    fn emit(&self, event: CardEvent) {
        let _ = self.event_tx.send(event);
    }

    fn should_stop(&self) -> bool {
        matches!(
            self.command_rx.try_recv(),
            Ok(CardCommand::Stop) | Err(TryRecvError::Disconnected)
        )
    }

    fn open_reader(&self) -> Option<(CardReader, CString)> {
        let opened = CardReader::new().and_then(|reader| {
            let name = reader.find_reader(self.reader_filter.as_deref())?;
            Ok((reader, name))
        });

        match opened {
            Ok((reader, name)) => {
                let reader_name = name.to_string_lossy().into_owned();
                info!(reader = %reader_name, "Card reader initialized");
                self.emit(CardEvent::ReaderAvailable { reader_name });
                Some((reader, name))
            }
            Err(e) => {
                debug!("Card reader unavailable: {}", e);
                self.emit(CardEvent::ReaderUnavailable {
                    error: e.to_string(),
                });
                None
            }
        }
    }

    fn run(self) {
        info!("Card worker thread started");

        let mut reader: Option<(CardReader, CString)> = None;
        let mut last_reader_check: Option<Instant> = None;

        loop {
            if self.should_stop() {
                info!("Card worker stopping");
                break;
            }

            if reader.is_none() {
                if last_reader_check.map_or(true, |t| t.elapsed() > READER_RETRY) {
                    reader = self.open_reader();
                    last_reader_check = Some(Instant::now());
                }
                if reader.is_none() {
                    thread::sleep(POLL);
                    continue;
                }
            }

            let Some((card_reader, name)) = reader.as_ref() else {
                continue;
            };

            if self.manager.arm() {
                self.emit(CardEvent::Armed);
            }

            match card_reader.wait_for_card(name, Some(POLL)) {
                Ok(true) => {
                    self.read_one(card_reader, name);
                    if !self.wait_for_removal(card_reader, name) {
                        break;
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "Lost the reader");
                    self.emit(CardEvent::ReaderUnavailable {
                        error: e.to_string(),
                    });
                    reader = None;
                }
            }
        }

        self.manager.disarm();
        info!("Card worker thread stopped");
    }

    fn read_one(&self, card_reader: &CardReader, name: &CString) {
        info!(reader = %name.to_string_lossy(), "Card detected");
        self.emit(CardEvent::CardDetected);

        let mut transport = card_reader.transport(name);
        match self.manager.on_card_discovered(&mut transport) {
            Ok(outcome) => {
                let exchanges = outcome.trace.len();
                match outcome.result {
                    Ok(record) => self.emit(CardEvent::DataReady { record, exchanges }),
                    Err(e) => self.emit(CardEvent::Error {
                        code: e.code(),
                        message: e.to_string(),
                    }),
                }
            }
            Err(e) => debug!(error = %e, "Card notification dropped"),
        }
    }

    /// Returns `false` if asked to stop while the card was still present
    fn wait_for_removal(&self, card_reader: &CardReader, name: &CString) -> bool {
        loop {
            if self.should_stop() {
                return false;
            }
            match card_reader.wait_for_removal(name, Some(POLL)) {
                Ok(true) | Err(_) => break,
                Ok(false) => {}
            }
        }

        info!("Card removed");
        self.emit(CardEvent::CardRemoved);
        true
    }
}

//! EMV Reader - Contactless EMV transaction initiation
//!
//! This crate drives a payment card far enough through an EMV contactless
//! transaction to read its PAN, expiry and brand: PPSE selection, AID
//! enumeration, GET PROCESSING OPTIONS and AFL record reads. All card I/O
//! goes through the [`Transport`] trait; [`reader::PcscTransport`] provides
//! one over PC/SC.

pub mod afl;
pub mod apdu;
pub mod config;
pub mod error;
pub mod gpo;
pub mod manager;
pub mod protocol;
pub mod reader;
pub mod response;
pub mod session;
pub mod track2;
pub mod transport;

pub use config::{ReaderConfig, RecordPolicy, TerminalConfig, GPO_ATTEMPT_CEILING};
pub use error::{ReadError, StepError};
pub use manager::{SessionManager, SessionOutcome};
pub use protocol::{Brand, CardRecord, EmvCard};
pub use reader::{CardReader, PcscTransport};
pub use session::{SessionState, TraceEvent};
pub use transport::{Transport, TransportError};

/// Re-export commonly used types
pub use pcsc::Error as PcscError;

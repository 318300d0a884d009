//! Transport abstraction
//!
//! The protocol engine never touches hardware. Every command goes through a
//! [`Transport`], which owns connection handling and the per-exchange timeout.

use std::time::Duration;

use thiserror::Error;

/// Failures talking to the card
#[derive(Debug, Error)]
pub enum TransportError {
    /// Exchange attempted without a live connection
    #[error("card is not connected")]
    NotConnected,
    /// The card did not answer within the configured timeout
    #[error("card did not respond in time")]
    Timeout,
    /// The card left the field mid-session
    #[error("card was removed")]
    CardRemoved,
    /// PC/SC layer failure
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),
    /// Any other I/O failure reported by a transport implementation
    #[error("transport I/O error: {0}")]
    Io(String),
}

/// Raw command/response exchange with a present card
pub trait Transport {
    /// Open the connection to the card
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Send a command APDU and return the raw response, status word included
    fn transceive(&mut self, command: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Release the connection; safe to call when not connected
    fn close(&mut self);

    /// Bound the wait for each exchange
    fn set_timeout(&mut self, timeout: Duration);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn connect(&mut self) -> Result<(), TransportError> {
        (**self).connect()
    }

    fn transceive(&mut self, command: &[u8]) -> Result<Vec<u8>, TransportError> {
        (**self).transceive(command)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn set_timeout(&mut self, timeout: Duration) {
        (**self).set_timeout(timeout)
    }
}

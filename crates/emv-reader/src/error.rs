//! Session outcomes and step failures

use emv_common::TlvError;
use thiserror::Error;

use crate::gpo::GpoError;
use crate::transport::TransportError;

/// Terminal failure of a card session
#[derive(Debug, Error)]
pub enum ReadError {
    /// Could not talk to the card at all
    #[error("communication with card failed: {0}")]
    Transport(#[from] TransportError),
    /// The card rejected SELECT of the proximity payment environment
    #[error("PPSE selection failed with status {status:04X}")]
    PpseUnavailable { status: u16 },
    /// The PPSE answer could not be decoded
    #[error("PPSE response is malformed: {0}")]
    MalformedPpse(#[source] TlvError),
    /// The PPSE answer lists no application identifiers
    #[error("card lists no payment applications")]
    NoApplications,
    /// Every candidate application was tried without yielding PAN and expiry
    #[error("could not obtain complete card data after trying {tried} application(s)")]
    IncompleteCardData { tried: usize },
    /// Another session holds the card
    #[error("a card session is already in progress")]
    SessionBusy,
    /// The reader was not listening for a card
    #[error("reader is not armed")]
    NotArmed,
}

impl ReadError {
    /// Stable code for callers that branch on the failure kind
    pub fn code(&self) -> &'static str {
        match self {
            ReadError::Transport(_) => "COMMUNICATION_ERROR",
            ReadError::PpseUnavailable { .. }
            | ReadError::MalformedPpse(_)
            | ReadError::NoApplications => "CARD_DATA_ERROR",
            ReadError::IncompleteCardData { .. } => "INCOMPLETE_CARD_DATA",
            ReadError::SessionBusy => "ALREADY_READING",
            ReadError::NotArmed => "NOT_ARMED",
        }
    }
}

/// Failure confined to one candidate application
///
/// These are logged and the next AID is tried.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("card answered {0:04X}")]
    Status(u16),
    #[error("response too short to carry a status word")]
    ShortResponse,
    #[error("malformed TLV: {0}")]
    Malformed(#[from] TlvError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Gpo(#[from] GpoError),
    #[error("GPO response matches no known template")]
    UnrecognisedGpoResponse,
    #[error("GPO budget for this session is exhausted")]
    GpoBudgetExhausted,
    #[error("application yielded no usable PAN and expiry")]
    NoCardData,
}

impl StepError {
    /// Classify a raw response that did not end in 9000
    pub(crate) fn from_raw(raw: &[u8]) -> Self {
        match crate::apdu::status_word(raw) {
            Some(sw) => StepError::Status(sw),
            None => StepError::ShortResponse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_distinguish_transport_from_card_data() {
        assert_eq!(
            ReadError::Transport(TransportError::Timeout).code(),
            "COMMUNICATION_ERROR"
        );
        assert_eq!(
            ReadError::IncompleteCardData { tried: 2 }.code(),
            "INCOMPLETE_CARD_DATA"
        );
        assert_eq!(ReadError::NoApplications.code(), "CARD_DATA_ERROR");
        assert_eq!(ReadError::SessionBusy.code(), "ALREADY_READING");
    }

    #[test]
    fn test_step_error_from_raw() {
        assert!(matches!(StepError::from_raw(&[0x6A, 0x82]), StepError::Status(0x6A82)));
        assert!(matches!(StepError::from_raw(&[0x6A]), StepError::ShortResponse));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ReadError::PpseUnavailable { status: 0x6A82 }.to_string(),
            "PPSE selection failed with status 6A82"
        );
        assert_eq!(StepError::Status(0x6985).to_string(), "card answered 6985");
    }
}

//! EMV protocol implementation
//!
//! One card presentation runs:
//! PPSE select, AID enumeration, then per AID: SELECT, PDOL lookup, GPO,
//! and either direct track 2 extraction or AFL record reads. The first AID
//! yielding both PAN and expiry ends the session.

use std::fmt;

use emv_common::{dol_table::TTQ_TAG, tags, tlv, DataObjectList, TtqVariant};
use tracing::{debug, info, warn};

use crate::afl::AflReader;
use crate::apdu::{check_status, commands, status_word};
use crate::config::ReaderConfig;
use crate::error::{ReadError, StepError};
use crate::gpo::GpoBuilder;
use crate::response::GpoResponse;
use crate::session::{Session, SessionState, TraceEvent};
use crate::track2::parse_track2;
use crate::transport::{Transport, TransportError};

/// Known EMV Application Identifiers (AIDs)
pub mod aids {
    /// PPSE (Proximity Payment System Environment)
    pub const PPSE: &[u8] = b"2PAY.SYS.DDF01";

    /// Visa credit/debit
    pub const VISA: &[u8] = &[0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10];

    /// Visa Electron
    pub const VISA_ELECTRON: &[u8] = &[0xA0, 0x00, 0x00, 0x00, 0x03, 0x20, 0x10];

    /// Mastercard
    pub const MASTERCARD: &[u8] = &[0xA0, 0x00, 0x00, 0x00, 0x04, 0x10, 0x10];

    /// Maestro
    pub const MAESTRO: &[u8] = &[0xA0, 0x00, 0x00, 0x00, 0x04, 0x30, 0x60];
}

/// Card brand inferred from the AID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Brand {
    Visa,
    VisaElectron,
    Mastercard,
    Maestro,
    Unknown,
}

const BRAND_PREFIXES: &[(&[u8], Brand)] = &[
    (aids::MASTERCARD, Brand::Mastercard),
    (aids::VISA, Brand::Visa),
    (aids::VISA_ELECTRON, Brand::VisaElectron),
    (aids::MAESTRO, Brand::Maestro),
];

impl Brand {
    /// Match the AID against the vendor prefix table
    pub fn from_aid(aid: &[u8]) -> Self {
        BRAND_PREFIXES
            .iter()
            .find(|(prefix, _)| aid.starts_with(prefix))
            .map_or(Brand::Unknown, |(_, brand)| *brand)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Brand::Visa => "Visa",
            Brand::VisaElectron => "Visa Electron",
            Brand::Mastercard => "Mastercard",
            Brand::Maestro => "Maestro",
            Brand::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Card data emitted at the end of a successful session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord {
    /// Decimal PAN, filler stripped
    pub pan: String,
    pub brand: Brand,
    /// `MM/YY`
    pub expiry: String,
    pub ready: bool,
    /// Application the data was read from
    pub aid: Vec<u8>,
}

impl CardRecord {
    fn new(pan: String, expiry: String, aid: &[u8]) -> Self {
        Self {
            pan,
            brand: Brand::from_aid(aid),
            expiry,
            ready: true,
            aid: aid.to_vec(),
        }
    }
}

/// EMV card interface
pub struct EmvCard<'a, T: Transport + ?Sized> {
    session: Session<'a, T>,
    config: ReaderConfig,
}

impl<T: Transport + ?Sized> fmt::Debug for EmvCard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmvCard")
            .field("session", &self.session)
            .field("config", &self.config)
            .finish()
    }
}

impl<'a, T: Transport + ?Sized> EmvCard<'a, T> {
    /// Create a new EMV card interface over a connected transport
    pub fn new(transport: &'a mut T, config: ReaderConfig) -> Self {
        Self {
            session: Session::new(transport),
            config,
        }
    }

    /// Observe protocol state changes
    pub fn with_state_hook(mut self, hook: impl FnMut(SessionState) + 'a) -> Self {
        self.session = self.session.with_state_hook(hook);
        self
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn trace(&self) -> &[TraceEvent] {
        self.session.trace()
    }

    pub fn into_trace(self) -> Vec<TraceEvent> {
        self.session.into_trace()
    }

    /// GPO commands sent so far in this session
    pub fn gpo_attempts(&self) -> usize {
        self.session.gpo_attempts()
    }

    /// Run the whole session and produce exactly one outcome
    pub fn read_card(&mut self) -> Result<CardRecord, ReadError> {
        let outcome = self.run();

        match &outcome {
            Ok(record) => {
                info!(brand = %record.brand, aid = %hex::encode_upper(&record.aid), "Card read");
                self.session.transition(SessionState::Done);
            }
            Err(e) => {
                warn!(code = e.code(), error = %e, "Card session aborted");
                self.session.transition(SessionState::Aborted);
            }
        }

        outcome
    }

    fn run(&mut self) -> Result<CardRecord, ReadError> {
        let candidates = self.select_ppse()?;
        let mut transport_failure: Option<TransportError> = None;

        for (index, aid) in candidates.iter().enumerate() {
            info!(
                aid = %hex::encode_upper(aid),
                candidate = index + 1,
                of = candidates.len(),
                "Trying application"
            );

            match self.try_application(aid) {
                Ok(record) => {
                    self.session.transition(SessionState::Extracted);
                    return Ok(record);
                }
                Err(StepError::Transport(e)) => {
                    warn!(aid = %hex::encode_upper(aid), error = %e, "Transport failure, trying next application");
                    transport_failure = Some(e);
                }
                Err(e) => {
                    warn!(aid = %hex::encode_upper(aid), error = %e, "Application failed, trying next");
                }
            }
        }

        match transport_failure {
            Some(e) => Err(ReadError::Transport(e)),
            None => Err(ReadError::IncompleteCardData {
                tried: candidates.len(),
            }),
        }
    }

    /// Select the PPSE and list its AIDs in order
    fn select_ppse(&mut self) -> Result<Vec<Vec<u8>>, ReadError> {
        let raw = commands::select(aids::PPSE).send(&mut self.session)?;
        let payload = check_status(&raw).ok_or(ReadError::PpseUnavailable {
            status: status_word(&raw).unwrap_or_default(),
        })?;
        self.session.transition(SessionState::PpseSelected);

        let candidates: Vec<Vec<u8>> =
            tlv::search_all(payload, tags::APPLICATION_IDENTIFIER.bytes())
                .map_err(ReadError::MalformedPpse)?
                .into_iter()
                .map(<[u8]>::to_vec)
                .collect();

        if candidates.is_empty() {
            return Err(ReadError::NoApplications);
        }

        debug!(count = candidates.len(), "Applications found in PPSE");
        self.session.transition(SessionState::AidEnumerated);
        Ok(candidates)
    }

    fn try_application(&mut self, aid: &[u8]) -> Result<CardRecord, StepError> {
        self.session.transition(SessionState::AidEnumerated);

        let raw = commands::select(aid).send(&mut self.session)?;
        let fci = check_status(&raw).ok_or_else(|| StepError::from_raw(&raw))?;
        self.session.transition(SessionState::AidSelected);

        // Some vendors (Mastercard in particular) advertise no PDOL
        let pdol = match tlv::search(fci, tags::PDOL.bytes())? {
            Some(value) => DataObjectList::decode(value)?,
            None => {
                debug!("No PDOL in SELECT response, sending empty PDOL");
                DataObjectList::empty()
            }
        };
        self.session.transition(SessionState::PdolResolved);

        match self.get_processing_options(&pdol)? {
            GpoResponse::Track2 { track2 } => {
                let data = parse_track2(&track2);
                if data.fallback {
                    warn!("No separator in track 2 data, PAN is a best-effort guess");
                }
                match data.expiry {
                    Some(expiry) if !data.pan.is_empty() => {
                        Ok(CardRecord::new(data.pan, expiry, aid))
                    }
                    _ => Err(StepError::NoCardData),
                }
            }
            response => {
                let afl = response.afl().unwrap_or_default();
                self.session.transition(SessionState::RecordsRead);

                let report = AflReader::new(self.config.record_policy).read(&mut self.session, afl)?;
                debug!(
                    read = report.records_read,
                    failed = report.records_failed,
                    "AFL records processed"
                );

                match (report.fields.pan, report.fields.expiry) {
                    (Some(pan), Some(expiry)) => Ok(CardRecord::new(pan, expiry, aid)),
                    _ => Err(StepError::NoCardData),
                }
            }
        }
    }

    /// Send GET PROCESSING OPTIONS, retrying over the configured TTQ variants
    ///
    /// Only a rejected GPO (non-9000) is retried, and only when the card asked
    /// for TTQ. Each attempt counts against the session budget; once it is
    /// spent no further GPO is sent.
    fn get_processing_options(&mut self, pdol: &DataObjectList) -> Result<GpoResponse, StepError> {
        let variants: Vec<TtqVariant> = if pdol.contains(TTQ_TAG) {
            self.config.ttq_variants().to_vec()
        } else {
            vec![TtqVariant::STANDARD]
        };

        let builder = GpoBuilder::new(self.config.terminal);
        let mut rng = rand::rng();
        let mut last_error = StepError::GpoBudgetExhausted;

        for variant in variants {
            if self.session.gpo_attempts() >= self.config.max_gpo_attempts() {
                warn!(
                    attempts = self.session.gpo_attempts(),
                    "GPO budget exhausted, not sending another"
                );
                return Err(StepError::GpoBudgetExhausted);
            }

            let gpo = builder.build(pdol, Some(variant), &mut rng)?;
            debug!(
                ttq = %variant,
                pdol_data = %hex::encode_upper(&gpo.pdol_data),
                "Sending GET PROCESSING OPTIONS"
            );

            self.session.record_gpo_attempt();
            let raw = self.session.transceive(&gpo.command)?;

            match check_status(&raw) {
                Some(payload) => {
                    self.session.transition(SessionState::GpoSent);
                    let response =
                        GpoResponse::classify(payload)?.ok_or(StepError::UnrecognisedGpoResponse)?;
                    debug!(shape = response.shape_name(), "GPO response classified");
                    return Ok(response);
                }
                None => {
                    last_error = StepError::from_raw(&raw);
                    info!(ttq = %variant, error = %last_error, "GPO rejected");
                }
            }
        }

        Err(last_error)
    }
}

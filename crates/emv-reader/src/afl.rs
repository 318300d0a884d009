//! Application File Locator handling
//!
//! AFL layout: groups of 4 bytes
//! - Byte 1: SFI (upper 5 bits), low 3 bits zero
//! - Byte 2: First record number
//! - Byte 3: Last record number
//! - Byte 4: Number of records involved in offline data authentication

use std::ops::RangeInclusive;

use emv_common::{tags, tlv, TlvError};
use tracing::{debug, warn};

use crate::apdu::{check_status, commands, status_word};
use crate::config::RecordPolicy;
use crate::track2::{expiry_from_record, pan_from_record};
use crate::transport::{Transport, TransportError};

/// One 4-byte AFL entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AflEntry {
    pub sfi: u8,
    pub first_record: u8,
    pub last_record: u8,
    pub offline_auth_records: u8,
}

impl AflEntry {
    fn from_chunk(chunk: &[u8]) -> Self {
        Self {
            sfi: chunk[0] >> 3,
            first_record: chunk[1],
            last_record: chunk[2],
            offline_auth_records: chunk[3],
        }
    }

    /// Record numbers to read, ascending
    ///
    /// Record 0 addresses "current record" in ISO 7816-4 and is never read.
    pub fn records(&self) -> RangeInclusive<u8> {
        self.first_record.max(1)..=self.last_record
    }

    /// READ RECORD P2: SFI in the upper five bits, `100` below
    pub fn reference_control(&self) -> u8 {
        (self.sfi << 3) | 0x04
    }
}

/// Split an AFL into entries
///
/// Input whose length is not a multiple of 4 yields an empty plan.
pub fn partition(afl: &[u8]) -> Vec<AflEntry> {
    if afl.len() % 4 != 0 {
        return Vec::new();
    }
    afl.chunks_exact(4).map(AflEntry::from_chunk).collect()
}

/// PAN and expiry collected from records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFields {
    pub pan: Option<String>,
    pub expiry: Option<String>,
}

impl RecordFields {
    pub fn is_complete(&self) -> bool {
        self.pan.is_some() && self.expiry.is_some()
    }

    /// Take 5A and 5F24 from a record payload; fields already found are kept
    pub fn absorb(&mut self, record: &[u8]) -> Result<(), TlvError> {
        if self.pan.is_none() {
            if let Some(value) = tlv::search(record, tags::APPLICATION_PAN.bytes())? {
                self.pan = pan_from_record(value);
            }
        }
        if self.expiry.is_none() {
            if let Some(value) = tlv::search(record, tags::APPLICATION_EXPIRATION_DATE.bytes())? {
                self.expiry = expiry_from_record(value);
            }
        }
        Ok(())
    }
}

/// Result of walking an AFL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AflReport {
    pub fields: RecordFields,
    pub records_read: usize,
    pub records_failed: usize,
}

/// Issues READ RECORD for every record an AFL names
#[derive(Debug, Clone, Copy, Default)]
pub struct AflReader {
    policy: RecordPolicy,
}

impl AflReader {
    pub fn new(policy: RecordPolicy) -> Self {
        Self { policy }
    }

    /// Read the records named by `afl` in order
    ///
    /// Records answered with a non-9000 status or holding malformed TLV are
    /// skipped. A transport failure stops the walk and is returned.
    pub fn read<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        afl: &[u8],
    ) -> Result<AflReport, TransportError> {
        let mut report = AflReport::default();
        let entries = partition(afl);

        if entries.is_empty() {
            warn!(afl = %hex::encode_upper(afl), "AFL is empty or not a multiple of 4 bytes");
            return Ok(report);
        }

        for entry in entries {
            for record in entry.records() {
                if self.policy == RecordPolicy::StopWhenComplete && report.fields.is_complete() {
                    return Ok(report);
                }

                debug!(sfi = entry.sfi, record, p2 = entry.reference_control(), "READ RECORD");
                let raw = commands::read_record(record, entry.sfi).send(transport)?;
                let Some(payload) = check_status(&raw) else {
                    debug!(
                        sfi = entry.sfi,
                        record,
                        status = ?status_word(&raw).map(|sw| format!("{sw:04X}")),
                        "READ RECORD rejected"
                    );
                    report.records_failed += 1;
                    continue;
                };

                report.records_read += 1;
                if let Err(e) = report.fields.absorb(payload) {
                    warn!(sfi = entry.sfi, record, error = %e, "Malformed record");
                }
            }
        }

        Ok(report)
    }
}

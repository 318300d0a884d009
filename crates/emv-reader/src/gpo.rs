//! GET PROCESSING OPTIONS command construction
//!
//! The card's PDOL lists the terminal data it wants. We fill each entry in
//! order, at exactly the declared width, and wrap the result in the command
//! template (tag 83).
//!
//! Hazard: every successful GPO increments the card's Application
//! Transaction Counter. Building a command is free, sending it is not; the
//! orchestrator caps how many are sent (see [`crate::config::GPO_ATTEMPT_CEILING`]).

use emv_common::{tags, DataObjectList, DefaultValueTable, TtqVariant};
use rand::RngCore;
use thiserror::Error;

use crate::apdu::commands;
use crate::config::TerminalConfig;

/// Largest filled PDOL that still fits a short-form `83` length
pub const MAX_PDOL_DATA: usize = 0x7F;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GpoError {
    #[error("PDOL requests {length} bytes, more than a GPO command can carry")]
    PdolTooLong { length: usize },
}

/// A built GPO command plus the filled PDOL values it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpoCommand {
    /// Full command APDU
    pub command: Vec<u8>,
    /// Concatenated PDOL values, without the `83` template
    pub pdol_data: Vec<u8>,
}

/// Resolves PDOL entries into terminal values
#[derive(Debug, Clone, Copy)]
pub struct GpoBuilder {
    table: DefaultValueTable,
    terminal: TerminalConfig,
}

impl GpoBuilder {
    pub fn new(terminal: TerminalConfig) -> Self {
        Self {
            table: DefaultValueTable::standard(),
            terminal,
        }
    }

    /// Fill every DOL entry in order
    ///
    /// The result is exactly `dol.total_length()` bytes long.
    pub fn fill<R: RngCore + ?Sized>(
        &self,
        dol: &DataObjectList,
        ttq: Option<TtqVariant>,
        rng: &mut R,
    ) -> Vec<u8> {
        let mut data = Vec::with_capacity(dol.total_length());

        for entry in dol.entries() {
            let tag = entry.tag.as_slice();
            let length = entry.length;

            let value = if tag == tags::TERMINAL_TRANSACTION_QUALIFIERS.bytes() {
                self.table.resolve(tag, length, ttq)
            } else if tag == tags::TERMINAL_COUNTRY_CODE.bytes() {
                fixed_or_zero(&self.terminal.country_code, length)
            } else if tag == tags::TRANSACTION_CURRENCY_CODE.bytes() {
                fixed_or_zero(&self.terminal.currency_code, length)
            } else if tag == tags::UNPREDICTABLE_NUMBER.bytes() {
                let mut random = vec![0x00; length];
                rng.fill_bytes(&mut random);
                random
            } else {
                // amounts included: no real transaction takes place
                vec![0x00; length]
            };

            data.extend(value);
        }

        data
    }

    /// Build the full command: `80 A8 00 00 Lc 83 len data 00`
    pub fn build<R: RngCore + ?Sized>(
        &self,
        dol: &DataObjectList,
        ttq: Option<TtqVariant>,
        rng: &mut R,
    ) -> Result<GpoCommand, GpoError> {
        let length = dol.total_length();
        if length > MAX_PDOL_DATA {
            return Err(GpoError::PdolTooLong { length });
        }

        let pdol_data = self.fill(dol, ttq, rng);

        let mut template = Vec::with_capacity(pdol_data.len() + 2);
        template.push(tags::COMMAND_TEMPLATE.bytes()[0]);
        template.push(pdol_data.len() as u8);
        template.extend_from_slice(&pdol_data);

        Ok(GpoCommand {
            command: commands::get_processing_options(template).build(),
            pdol_data,
        })
    }
}

fn fixed_or_zero(value: &[u8; 2], length: usize) -> Vec<u8> {
    if length == value.len() {
        value.to_vec()
    } else {
        vec![0x00; length]
    }
}

//! EMV Common - Shared data structures and utilities for EMV processing

pub mod dol;
pub mod dol_table;
pub mod tlv;

pub use dol::{DataObjectList, DolKind, TagAndLength};
pub use dol_table::{DefaultValueTable, TtqVariant};
pub use tlv::{Tlv, TlvError};

/// Lenient tag lookup
///
/// Searches `data` and any constructed templates inside it for `tag` and
/// returns the first value found. Malformed data yields `None`; callers that
/// must tell "absent" from "malformed" apart should use [`tlv::search`].
pub fn find_tag<'a>(data: &'a [u8], tag: &[u8]) -> Option<&'a [u8]> {
    tlv::search(data, tag).ok().flatten()
}

/// EMV Tag identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmvTag(pub &'static [u8]);

impl EmvTag {
    pub fn bytes(&self) -> &'static [u8] {
        self.0
    }

    pub fn name(&self) -> &'static str {
        get_tag_name(self.0)
    }
}

/// Common EMV tags used in contactless card reading
pub mod tags {
    use super::EmvTag;

    // Application selection
    pub const APPLICATION_IDENTIFIER: EmvTag = EmvTag(&[0x4F]);
    pub const APPLICATION_LABEL: EmvTag = EmvTag(&[0x50]);
    pub const DEDICATED_FILE_NAME: EmvTag = EmvTag(&[0x84]);
    pub const APPLICATION_PRIORITY_INDICATOR: EmvTag = EmvTag(&[0x87]);
    pub const APPLICATION_PREFERRED_NAME: EmvTag = EmvTag(&[0x9F, 0x12]);

    // Cardholder data
    pub const APPLICATION_PAN: EmvTag = EmvTag(&[0x5A]);
    pub const APPLICATION_EXPIRATION_DATE: EmvTag = EmvTag(&[0x5F, 0x24]);
    pub const APPLICATION_EFFECTIVE_DATE: EmvTag = EmvTag(&[0x5F, 0x25]);
    pub const APPLICATION_PAN_SEQUENCE_NUMBER: EmvTag = EmvTag(&[0x5F, 0x34]);
    pub const CARDHOLDER_NAME: EmvTag = EmvTag(&[0x5F, 0x20]);
    pub const TRACK_2_EQUIVALENT_DATA: EmvTag = EmvTag(&[0x57]);
    pub const TRACK_2_DATA: EmvTag = EmvTag(&[0x9F, 0x6B]);

    // Processing
    pub const PDOL: EmvTag = EmvTag(&[0x9F, 0x38]);
    pub const COMMAND_TEMPLATE: EmvTag = EmvTag(&[0x83]);
    pub const AIP: EmvTag = EmvTag(&[0x82]);
    pub const AFL: EmvTag = EmvTag(&[0x94]);
    pub const TERMINAL_TRANSACTION_QUALIFIERS: EmvTag = EmvTag(&[0x9F, 0x66]);
    pub const AMOUNT_AUTHORISED: EmvTag = EmvTag(&[0x9F, 0x02]);
    pub const AMOUNT_OTHER: EmvTag = EmvTag(&[0x9F, 0x03]);
    pub const TERMINAL_COUNTRY_CODE: EmvTag = EmvTag(&[0x9F, 0x1A]);
    pub const TRANSACTION_CURRENCY_CODE: EmvTag = EmvTag(&[0x5F, 0x2A]);
    pub const UNPREDICTABLE_NUMBER: EmvTag = EmvTag(&[0x9F, 0x37]);

    // Response templates
    pub const FCI_TEMPLATE: EmvTag = EmvTag(&[0x6F]);
    pub const FCI_PROPRIETARY_TEMPLATE: EmvTag = EmvTag(&[0xA5]);
    pub const FCI_ISSUER_DISCRETIONARY_DATA: EmvTag = EmvTag(&[0xBF, 0x0C]);
    pub const APPLICATION_TEMPLATE: EmvTag = EmvTag(&[0x61]);
    pub const RESPONSE_MESSAGE_TEMPLATE_FORMAT_1: EmvTag = EmvTag(&[0x80]);
    pub const RESPONSE_MESSAGE_TEMPLATE_FORMAT_2: EmvTag = EmvTag(&[0x77]);
    pub const RECORD_TEMPLATE: EmvTag = EmvTag(&[0x70]);
}

/// Get a human-readable name for an EMV tag
pub fn get_tag_name(tag: &[u8]) -> &'static str {
    match tag {
        [0x4F] => "Application Identifier (AID)",
        [0x50] => "Application Label",
        [0x56] => "Track 1 Data",
        [0x57] => "Track 2 Equivalent Data",
        [0x5A] => "Application PAN",
        [0x5F, 0x20] => "Cardholder Name",
        [0x5F, 0x24] => "Application Expiration Date",
        [0x5F, 0x25] => "Application Effective Date",
        [0x5F, 0x28] => "Issuer Country Code",
        [0x5F, 0x2A] => "Transaction Currency Code",
        [0x5F, 0x2D] => "Language Preference",
        [0x5F, 0x34] => "Application PAN Sequence Number",
        [0x61] => "Application Template",
        [0x6F] => "FCI Template",
        [0x70] => "Record Template",
        [0x77] => "Response Message Template Format 2",
        [0x80] => "Response Message Template Format 1",
        [0x82] => "Application Interchange Profile",
        [0x83] => "Command Template",
        [0x84] => "Dedicated File (DF) Name",
        [0x87] => "Application Priority Indicator",
        [0x8C] => "CDOL1",
        [0x8D] => "CDOL2",
        [0x8F] => "CA Public Key Index",
        [0x90] => "Issuer Public Key Certificate",
        [0x92] => "Issuer Public Key Remainder",
        [0x94] => "Application File Locator",
        [0x95] => "Terminal Verification Results",
        [0x9A] => "Transaction Date",
        [0x9C] => "Transaction Type",
        [0xA5] => "FCI Proprietary Template",
        [0xBF, 0x0C] => "FCI Issuer Discretionary Data",
        [0x9F, 0x02] => "Amount, Authorised (Numeric)",
        [0x9F, 0x03] => "Amount, Other (Numeric)",
        [0x9F, 0x07] => "Application Usage Control",
        [0x9F, 0x08] => "Application Version Number (Card)",
        [0x9F, 0x10] => "Issuer Application Data",
        [0x9F, 0x12] => "Application Preferred Name",
        [0x9F, 0x1A] => "Terminal Country Code",
        [0x9F, 0x26] => "Application Cryptogram",
        [0x9F, 0x27] => "Cryptogram Information Data",
        [0x9F, 0x36] => "Application Transaction Counter (ATC)",
        [0x9F, 0x37] => "Unpredictable Number",
        [0x9F, 0x38] => "Processing Options Data Object List (PDOL)",
        [0x9F, 0x42] => "Application Currency Code",
        [0x9F, 0x4A] => "Static Data Authentication Tag List",
        [0x9F, 0x66] => "Terminal Transaction Qualifiers",
        [0x9F, 0x6B] => "Track 2 Data",
        [0x9F, 0x6C] => "Card Transaction Qualifiers",
        _ => "Unknown Tag",
    }
}

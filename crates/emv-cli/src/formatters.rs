//! Field formatters for human-readable output

use clap::ValueEnum;
use emv_reader::CardRecord;

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatMode {
    /// Raw hex output
    Raw,
    /// Human-readable formatted output
    Human,
}

impl FormatMode {
    pub fn description(&self) -> &'static str {
        match self {
            FormatMode::Raw => "Raw",
            FormatMode::Human => "Human-Readable",
        }
    }
}

/// Format the session result
pub fn format_record(record: &CardRecord, mode: FormatMode) -> String {
    let aid = hex::encode_upper(&record.aid);

    if mode == FormatMode::Raw {
        return format!(
            "pan={} brand={} expiry={} ready={} aid={}",
            record.pan, record.brand, record.expiry, record.ready, aid
        );
    }

    let grouped: Vec<String> = record
        .pan
        .as_bytes()
        .chunks(4)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();

    format!(
        "  Brand:  {}\n  PAN:    {}\n  Expiry: {}\n  AID:    {}",
        record.brand,
        grouped.join(" "),
        record.expiry,
        aid
    )
}

/// Format a field value based on its tag type
pub fn format_value(tag: &[u8], value: &[u8], mode: FormatMode) -> String {
    if mode == FormatMode::Raw {
        return hex::encode_upper(value);
    }

    match tag {
        // Application Label, Preferred Name, DF Name of the PPSE (ASCII text)
        [0x50] | [0x9F, 0x12] => ascii_or_hex(value),
        [0x84] if value.iter().all(|b| b.is_ascii_graphic()) => ascii_or_hex(value),

        // Application PAN, filler stripped
        [0x5A] => hex::encode_upper(value).trim_end_matches('F').to_string(),

        // Application Expiration / Effective Date (YYMMDD)
        [0x5F, 0x24] | [0x5F, 0x25] => {
            if value.len() == 3 {
                format!(
                    "20{:02X}/{:02X}/{:02X} (YY/MM/DD)",
                    value[0], value[1], value[2]
                )
            } else {
                hex::encode_upper(value)
            }
        }

        // Country codes (ISO 3166-1 numeric, BCD)
        [0x5F, 0x28] | [0x9F, 0x1A] => match bcd_number(value) {
            Some(code) => match get_country_name(code) {
                Some(country) => format!("{} ({})", code, country),
                None => format!("{}", code),
            },
            None => hex::encode_upper(value),
        },

        // Currency codes (ISO 4217 numeric, BCD)
        [0x5F, 0x2A] | [0x9F, 0x42] => match bcd_number(value) {
            Some(code) => match get_currency_name(code) {
                Some(currency) => currency.to_string(),
                None => format!("Currency Code {}", code),
            },
            None => hex::encode_upper(value),
        },

        // Application Priority Indicator
        [0x87] if value.len() == 1 => format!("{}", value[0] & 0x0F),

        // Application File Locator
        [0x94] => value
            .chunks(4)
            .map(|entry| match entry {
                [sfi, first, last, oda] => {
                    format!("SFI {} records {}-{} ({} for ODA)", sfi >> 3, first, last, oda)
                }
                partial => hex::encode_upper(partial),
            })
            .collect::<Vec<_>>()
            .join("; "),

        // Terminal Transaction Qualifiers
        [0x9F, 0x66] if value.len() == 4 => {
            let mut flags = Vec::new();
            if value[0] & 0x20 != 0 {
                flags.push("EMV mode");
            }
            if value[0] & 0x80 != 0 {
                flags.push("magstripe mode");
            }
            if value[0] & 0x08 != 0 {
                flags.push("offline only");
            }
            if value[1] & 0x40 != 0 {
                flags.push("CVM required");
            }
            format!("{} [{}]", hex::encode_upper(value), flags.join(", "))
        }

        // Track 2 Data
        [0x57] | [0x9F, 0x6B] => {
            let hex_str = hex::encode_upper(value);
            hex_str.replace('D', " | ")
        }

        // Default: hex for everything else
        _ => hex::encode_upper(value),
    }
}

fn ascii_or_hex(value: &[u8]) -> String {
    String::from_utf8(value.to_vec())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| hex::encode_upper(value))
}

/// Read packed BCD digits as a number
fn bcd_number(value: &[u8]) -> Option<u16> {
    hex::encode(value).parse().ok()
}

/// ISO 3166-1 numeric country codes (subset)
fn get_country_name(code: u16) -> Option<&'static str> {
    match code {
        76 => Some("Brazil"),
        124 => Some("Canada"),
        840 => Some("United States"),
        826 => Some("United Kingdom"),
        276 => Some("Germany"),
        250 => Some("France"),
        380 => Some("Italy"),
        724 => Some("Spain"),
        528 => Some("Netherlands"),
        156 => Some("China"),
        392 => Some("Japan"),
        _ => None,
    }
}

/// ISO 4217 numeric currency codes (subset)
fn get_currency_name(code: u16) -> Option<&'static str> {
    match code {
        124 => Some("CAD (Canadian Dollar)"),
        840 => Some("USD (US Dollar)"),
        978 => Some("EUR (Euro)"),
        826 => Some("GBP (Pound Sterling)"),
        986 => Some("BRL (Brazilian Real)"),
        392 => Some("JPY (Japanese Yen)"),
        156 => Some("CNY (Chinese Yuan)"),
        _ => None,
    }
}

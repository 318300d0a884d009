//! PAN and expiry extraction
//!
//! Track 2 equivalent data (tag 57) is BCD: `PAN || D || YYMM || service code
//! || discretionary data`, padded with a trailing `F` nibble to a whole byte.
//! Record data carries the same fields discretely in 5A (PAN, BCD with `F`
//! filler) and 5F24 (expiry, YYMMDD).

/// Primary field separator nibble in BCD track 2
const SEPARATOR: char = 'D';
/// A PAN is at most 19 digits, so the separator sits no further than this
const SEPARATOR_SEARCH_LIMIT: usize = 20;
/// PAN width used when no separator is found
const FALLBACK_PAN_DIGITS: usize = 16;

/// Fields pulled out of track 2 equivalent data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track2Data {
    pub pan: String,
    /// `MM/YY`, when a well-formed date follows the separator
    pub expiry: Option<String>,
    /// Set when no separator was found and the PAN is a best-effort guess
    pub fallback: bool,
}

/// Extract PAN and expiry from track 2 equivalent data
///
/// Known approximation: when no separator appears within the first
/// 20 digits the first 16 hex digits are returned as PAN, `expiry` is `None`
/// and `fallback` is set. This mirrors how the data has been read in the
/// field and has not been checked against cards that hit it.
pub fn parse_track2(track2: &[u8]) -> Track2Data {
    let digits = hex::encode_upper(track2);

    match find_separator(&digits) {
        Some(pos) => Track2Data {
            pan: strip_filler(&digits[..pos]).to_string(),
            expiry: digits
                .get(pos + 1..pos + 5)
                .and_then(format_expiry),
            fallback: false,
        },
        None => Track2Data {
            pan: digits.chars().take(FALLBACK_PAN_DIGITS).collect(),
            expiry: None,
            fallback: true,
        },
    }
}

fn find_separator(digits: &str) -> Option<usize> {
    digits
        .char_indices()
        .take(SEPARATOR_SEARCH_LIMIT)
        .find(|(_, c)| *c == SEPARATOR)
        .map(|(pos, _)| pos)
        .filter(|pos| *pos > 0)
}

/// PAN from tag 5A, filler nibbles removed
pub fn pan_from_record(value: &[u8]) -> Option<String> {
    let pan = strip_filler(&hex::encode_upper(value)).to_string();
    (!pan.is_empty()).then_some(pan)
}

/// Expiry from tag 5F24 as `MM/YY`
pub fn expiry_from_record(value: &[u8]) -> Option<String> {
    format_expiry(&hex::encode_upper(value))
}

/// Reformat `YYMM` or `YYMMDD` as `MM/YY`
pub fn format_expiry(date: &str) -> Option<String> {
    if !matches!(date.len(), 4 | 6) || !date.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}/{}", &date[2..4], &date[0..2]))
}

/// Drop trailing `F` filler nibbles
pub fn strip_filler(digits: &str) -> &str {
    digits.trim_end_matches(['F', 'f'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_track2() {
        let track2 = hex::decode("474110012345D25121010000000000000F").unwrap();
        let data = parse_track2(&track2);

        assert_eq!(data.pan, "474110012345");
        assert_eq!(data.expiry.as_deref(), Some("12/25"));
        assert!(!data.fallback);
    }

    #[test]
    fn test_parse_track2_odd_length_pan() {
        // 15 digit PAN padded with F before the separator
        let track2 = hex::decode("374245455400126FD2704201").unwrap();
        let data = parse_track2(&track2);

        assert_eq!(data.pan, "374245455400126");
        assert_eq!(data.expiry.as_deref(), Some("04/27"));
    }

    #[test]
    fn test_parse_track2_truncated_after_separator() {
        let track2 = hex::decode("4761739001010010D251").unwrap();
        let data = parse_track2(&track2);

        assert_eq!(data.pan, "4761739001010010");
        assert_eq!(data.expiry, None);
        assert!(!data.fallback);
    }

    #[test]
    fn test_parse_track2_fallback_without_separator() {
        let track2 = hex::decode("47617390010100102512201000").unwrap();
        let data = parse_track2(&track2);

        assert_eq!(data.pan, "4761739001010010");
        assert_eq!(data.expiry, None);
        assert!(data.fallback);
    }

    #[test]
    fn test_parse_track2_separator_too_far_uses_fallback() {
        // 22 digits before the separator: not a PAN
        let track2 = hex::decode("4761739001010010123456D25121").unwrap();
        let data = parse_track2(&track2);

        assert!(data.fallback);
        assert_eq!(data.pan.len(), 16);
    }

    #[test]
    fn test_record_fields() {
        assert_eq!(
            pan_from_record(&hex::decode("5413330089020011").unwrap()).as_deref(),
            Some("5413330089020011")
        );
        assert_eq!(
            pan_from_record(&hex::decode("541333008902001FFF").unwrap()).as_deref(),
            Some("541333008902001")
        );
        assert_eq!(pan_from_record(&[0xFF]), None);

        assert_eq!(expiry_from_record(&[0x27, 0x08, 0x31]).as_deref(), Some("08/27"));
        assert_eq!(expiry_from_record(&[0x27, 0x08]).as_deref(), Some("08/27"));
        assert_eq!(expiry_from_record(&[0x27]), None);
    }

    #[test]
    fn test_format_expiry_rejects_non_digits() {
        assert_eq!(format_expiry("25A2"), None);
        assert_eq!(format_expiry("2512"), Some("12/25".to_string()));
    }
}

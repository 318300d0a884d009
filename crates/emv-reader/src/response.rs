//! GET PROCESSING OPTIONS response classification
//!
//! A card answers GPO in one of three shapes:
//! - track 2 equivalent data (57) handed over directly,
//! - Response Message Template Format 1 (80): `AIP (2 bytes) || AFL`,
//! - Response Message Template Format 2 (77): a template holding AIP (82)
//!   and AFL (94) as separate objects.

use emv_common::{tags, tlv, TlvError};

/// The recognised GPO response shapes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpoResponse {
    /// Track 2 equivalent data is present; no records need to be read
    Track2 { track2: Vec<u8> },
    /// Format 1 primitive template
    Format1 { aip: Vec<u8>, afl: Vec<u8> },
    /// Format 2 constructed template
    Format2 { aip: Option<Vec<u8>>, afl: Vec<u8> },
}

impl GpoResponse {
    /// Classify a GPO payload (status word already stripped)
    ///
    /// Track 2 data wins when present at any depth, since contactless
    /// kernels usually nest it inside the 77 template. `Ok(None)` means no
    /// shape matched.
    pub fn classify(payload: &[u8]) -> Result<Option<Self>, TlvError> {
        if let Some(track2) = tlv::search(payload, tags::TRACK_2_EQUIVALENT_DATA.bytes())? {
            return Ok(Some(Self::Track2 {
                track2: track2.to_vec(),
            }));
        }

        for object in tlv::decode(payload)? {
            if object.tag == tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_1.bytes() {
                if object.value.len() < 2 {
                    return Ok(None);
                }
                let (aip, afl) = object.value.split_at(2);
                return Ok(Some(Self::Format1 {
                    aip: aip.to_vec(),
                    afl: afl.to_vec(),
                }));
            }

            if object.tag == tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_2.bytes() {
                let Some(afl) = tlv::search(object.value, tags::AFL.bytes())? else {
                    return Ok(None);
                };
                let aip = tlv::search(object.value, tags::AIP.bytes())?;
                return Ok(Some(Self::Format2 {
                    aip: aip.map(<[u8]>::to_vec),
                    afl: afl.to_vec(),
                }));
            }
        }

        Ok(None)
    }

    /// AFL bytes for the record-reading shapes
    pub fn afl(&self) -> Option<&[u8]> {
        match self {
            Self::Track2 { .. } => None,
            Self::Format1 { afl, .. } | Self::Format2 { afl, .. } => Some(afl),
        }
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::Track2 { .. } => "track 2 equivalent data",
            Self::Format1 { .. } => "response message template format 1",
            Self::Format2 { .. } => "response message template format 2",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emv_common::tlv::encode;

    #[test]
    fn test_classify_track2_inside_format2() {
        let track2 = hex::decode("4761739001010010D25122010000000000000F").unwrap();
        let payload = encode(
            &[0x77],
            &[encode(&[0x82], &[0x00, 0x80]), encode(&[0x57], &track2)].concat(),
        );

        assert_eq!(
            GpoResponse::classify(&payload).unwrap(),
            Some(GpoResponse::Track2 { track2 })
        );
    }

    #[test]
    fn test_classify_format1() {
        let payload = hex::decode("800E1980080101001001010118010200").unwrap();
        let response = GpoResponse::classify(&payload).unwrap().unwrap();

        assert_eq!(
            response,
            GpoResponse::Format1 {
                aip: vec![0x19, 0x80],
                afl: hex::decode("080101001001010118010200").unwrap(),
            }
        );
        assert_eq!(response.afl().map(<[u8]>::len), Some(12));
    }

    #[test]
    fn test_classify_format2() {
        let payload = encode(
            &[0x77],
            &[
                encode(&[0x82], &[0x19, 0x80]),
                encode(&[0x94], &[0x08, 0x01, 0x01, 0x00]),
            ]
            .concat(),
        );

        assert_eq!(
            GpoResponse::classify(&payload).unwrap(),
            Some(GpoResponse::Format2 {
                aip: Some(vec![0x19, 0x80]),
                afl: vec![0x08, 0x01, 0x01, 0x00],
            })
        );
    }

    #[test]
    fn test_classify_format2_without_afl() {
        let payload = encode(&[0x77], &encode(&[0x82], &[0x19, 0x80]));
        assert_eq!(GpoResponse::classify(&payload).unwrap(), None);
    }

    #[test]
    fn test_classify_unknown_shape() {
        let payload = encode(&[0x6F], &[0x01]);
        assert_eq!(GpoResponse::classify(&payload).unwrap(), None);
        assert_eq!(GpoResponse::classify(&[]).unwrap(), None);
    }

    #[test]
    fn test_classify_malformed() {
        assert!(GpoResponse::classify(&[0x77, 0x10, 0x94]).is_err());
    }
}

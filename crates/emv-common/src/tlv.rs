//! BER-TLV codec
//!
//! EMV data objects are encoded as tag, length, value triples. Tags use the
//! ISO/IEC 8825 numbering rules: when the low five bits of the first byte are
//! all set the tag continues into the following byte(s), and every subsequent
//! byte with bit 8 set is followed by another one. Lengths are either short
//! form (a single byte below 0x80) or long form (0x81..=0x84 followed by that
//! many big-endian length bytes).

use thiserror::Error;

/// Longest long-form length we accept (0x84 => four length bytes)
const MAX_LENGTH_BYTES: usize = 4;

/// Errors raised while decoding malformed TLV data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TlvError {
    /// A declared length runs past the end of the buffer
    #[error("TLV value at offset {offset} runs past the end of the buffer")]
    Truncated { offset: usize },
    /// A multi-byte tag is missing its continuation byte
    #[error("tag at offset {offset} is missing a continuation byte")]
    MissingTagByte { offset: usize },
    /// Indefinite length or a length-of-length we do not support
    #[error("invalid length encoding at offset {offset}")]
    InvalidLength { offset: usize },
}

/// A single decoded data object borrowing from the source buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    /// Raw tag bytes (one or more)
    pub tag: &'a [u8],
    /// Declared value length
    pub length: usize,
    /// Value bytes
    pub value: &'a [u8],
    /// Offset of the first tag byte in the decoded buffer
    pub offset: usize,
}

impl Tlv<'_> {
    /// Whether the tag marks a constructed object (bit 6 of the first byte)
    pub fn is_constructed(&self) -> bool {
        is_constructed(self.tag)
    }
}

/// Whether a tag denotes a constructed (template) data object
pub fn is_constructed(tag: &[u8]) -> bool {
    tag.first().is_some_and(|b| b & 0x20 != 0)
}

/// Read a tag starting at `pos`, returning the tag slice
pub(crate) fn read_tag(data: &[u8], pos: usize) -> Result<&[u8], TlvError> {
    let first = *data.get(pos).ok_or(TlvError::Truncated { offset: pos })?;
    let mut end = pos + 1;

    if first & 0x1F == 0x1F {
        loop {
            let next = *data
                .get(end)
                .ok_or(TlvError::MissingTagByte { offset: pos })?;
            end += 1;
            if next & 0x80 == 0 {
                break;
            }
        }
    }

    Ok(&data[pos..end])
}

/// Read a length field starting at `pos`, returning (length, bytes consumed)
pub(crate) fn read_length(data: &[u8], pos: usize) -> Result<(usize, usize), TlvError> {
    let first = *data.get(pos).ok_or(TlvError::Truncated { offset: pos })?;

    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }

    let num_len_bytes = (first & 0x7F) as usize;
    if num_len_bytes == 0 || num_len_bytes > MAX_LENGTH_BYTES {
        return Err(TlvError::InvalidLength { offset: pos });
    }
    if pos + 1 + num_len_bytes > data.len() {
        return Err(TlvError::Truncated { offset: pos });
    }

    let length = data[pos + 1..pos + 1 + num_len_bytes]
        .iter()
        .fold(0usize, |acc, b| (acc << 8) | *b as usize);

    Ok((length, 1 + num_len_bytes))
}

/// Decode every top-level data object in `data`
///
/// Padding bytes (`00`) between objects are skipped, as EMV permits them
/// before, between and after data objects.
pub fn decode(data: &[u8]) -> Result<Vec<Tlv<'_>>, TlvError> {
    let mut objects = Vec::new();
    let mut i = 0;

    while i < data.len() {
        if data[i] == 0x00 {
            i += 1;
            continue;
        }

        let offset = i;
        let tag = read_tag(data, i)?;
        i += tag.len();

        let (length, consumed) = read_length(data, i)?;
        i += consumed;

        if i + length > data.len() {
            return Err(TlvError::Truncated { offset });
        }

        objects.push(Tlv {
            tag,
            length,
            value: &data[i..i + length],
            offset,
        });
        i += length;
    }

    Ok(objects)
}

/// Depth-first search for the first object carrying `tag`, descending into
/// constructed templates
pub fn search<'a>(data: &'a [u8], tag: &[u8]) -> Result<Option<&'a [u8]>, TlvError> {
    for object in decode(data)? {
        if object.tag == tag {
            return Ok(Some(object.value));
        }
        if object.is_constructed() {
            if let Some(value) = search(object.value, tag)? {
                return Ok(Some(value));
            }
        }
    }
    Ok(None)
}

/// Collect every object carrying `tag` at any depth, in document order
pub fn search_all<'a>(data: &'a [u8], tag: &[u8]) -> Result<Vec<&'a [u8]>, TlvError> {
    let mut found = Vec::new();
    collect(data, tag, &mut found)?;
    Ok(found)
}

fn collect<'a>(data: &'a [u8], tag: &[u8], found: &mut Vec<&'a [u8]>) -> Result<(), TlvError> {
    for object in decode(data)? {
        if object.tag == tag {
            found.push(object.value);
        } else if object.is_constructed() {
            collect(object.value, tag, found)?;
        }
    }
    Ok(())
}

/// Encode a length field in the shortest BER form
pub fn encode_length(length: usize) -> Vec<u8> {
    if length < 0x80 {
        return vec![length as u8];
    }

    let bytes: Vec<u8> = length
        .to_be_bytes()
        .into_iter()
        .skip_while(|b| *b == 0)
        .collect();

    let mut out = Vec::with_capacity(bytes.len() + 1);
    out.push(0x80 | bytes.len() as u8);
    out.extend_from_slice(&bytes);
    out
}

/// Encode a single data object
pub fn encode(tag: &[u8], value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(tag.len() + value.len() + 3);
    out.extend_from_slice(tag);
    out.extend(encode_length(value.len()));
    out.extend_from_slice(value);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_and_two_byte_tags() {
        let data = hex::decode("8F01059F4602ABCD").unwrap();
        let objects = decode(&data).unwrap();

        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].tag, &[0x8F]);
        assert_eq!(objects[0].value, &[0x05]);
        assert_eq!(objects[0].offset, 0);
        assert_eq!(objects[1].tag, &[0x9F, 0x46]);
        assert_eq!(objects[1].length, 2);
        assert_eq!(objects[1].value, &[0xAB, 0xCD]);
        assert_eq!(objects[1].offset, 3);
    }

    #[test]
    fn test_decode_long_form_length() {
        let mut data = vec![0x90, 0x81, 0x90];
        data.extend(std::iter::repeat(0x11).take(0x90));
        let objects = decode(&data).unwrap();

        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].length, 0x90);
        assert_eq!(objects[0].value.len(), 0x90);
    }

    #[test]
    fn test_decode_truncated_value() {
        let data = [0x5A, 0x08, 0x47, 0x61];
        assert_eq!(decode(&data), Err(TlvError::Truncated { offset: 0 }));
    }

    #[test]
    fn test_decode_missing_continuation_byte() {
        let data = [0x8F, 0x01, 0x05, 0x9F];
        assert_eq!(decode(&data), Err(TlvError::MissingTagByte { offset: 3 }));
    }

    #[test]
    fn test_decode_rejects_indefinite_length() {
        let data = [0x70, 0x80, 0x00, 0x00];
        assert_eq!(decode(&data), Err(TlvError::InvalidLength { offset: 1 }));
    }

    #[test]
    fn test_decode_skips_padding() {
        let data = [0x00, 0x00, 0x8F, 0x01, 0x05, 0x00];
        let objects = decode(&data).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].offset, 2);
    }

    #[test]
    fn test_round_trip() {
        let long_value = vec![0xA5; 300];
        let set: Vec<(&[u8], &[u8])> = vec![
            (&[0x4F], &[0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10]),
            (&[0x9F, 0x38], &[0x9F, 0x66, 0x04]),
            (&[0x5F, 0x24], &[0x25, 0x12, 0x31]),
            (&[0x90], &long_value),
            (&[0x50], &[]),
        ];

        let mut buffer = Vec::new();
        for (tag, value) in &set {
            buffer.extend(encode(tag, value));
        }

        let decoded: Vec<(&[u8], &[u8])> = decode(&buffer)
            .unwrap()
            .into_iter()
            .map(|o| (o.tag, o.value))
            .collect();
        assert_eq!(decoded, set);
    }

    #[test]
    fn test_encode_length_forms() {
        assert_eq!(encode_length(0x7F), vec![0x7F]);
        assert_eq!(encode_length(0x80), vec![0x81, 0x80]);
        assert_eq!(encode_length(0x0100), vec![0x82, 0x01, 0x00]);
    }

    #[test]
    fn test_search_nested_templates() {
        // 6F { 84 .., A5 { BF0C { 61 { 4F .. } 61 { 4F .. } } } }
        let app1 = encode(&[0x61], &encode(&[0x4F], &hex::decode("A0000000041010").unwrap()));
        let app2 = encode(&[0x61], &encode(&[0x4F], &hex::decode("A0000000031010").unwrap()));
        let dir = encode(&[0xBF, 0x0C], &[app1, app2].concat());
        let fci = encode(
            &[0x6F],
            &[encode(&[0x84], b"2PAY.SYS.DDF01"), encode(&[0xA5], &dir)].concat(),
        );

        let aids = search_all(&fci, &[0x4F]).unwrap();
        assert_eq!(aids.len(), 2);
        assert_eq!(aids[0], hex::decode("A0000000041010").unwrap().as_slice());
        assert_eq!(aids[1], hex::decode("A0000000031010").unwrap().as_slice());

        let name = search(&fci, &[0x84]).unwrap();
        assert_eq!(name, Some(&b"2PAY.SYS.DDF01"[..]));
        assert_eq!(search(&fci, &[0x9F, 0x38]).unwrap(), None);
    }

    #[test]
    fn test_search_does_not_descend_into_primitive() {
        // 80 is primitive; its value happens to look like a 5A object
        let data = encode(&[0x80], &[0x5A, 0x01, 0x99]);
        assert_eq!(search(&data, &[0x5A]).unwrap(), None);
    }
}

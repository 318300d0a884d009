//! Data Object Lists
//!
//! A DOL is a run of tag/length pairs with no values. The card uses it to
//! tell the terminal which data it wants, in which order and at which width.

use std::fmt;

use crate::tlv::{read_length, read_tag, TlvError};

/// The different lists a card may advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DolKind {
    Pdol,
    Cdol1,
    Cdol2,
    Tdol,
    Ddol,
}

impl DolKind {
    pub fn description(&self) -> &'static str {
        match self {
            DolKind::Pdol => "Processing Options Data Object List",
            DolKind::Cdol1 => "Card Risk Management Data Object List 1",
            DolKind::Cdol2 => "Card Risk Management Data Object List 2",
            DolKind::Tdol => "Transaction Certificate Data Object List",
            DolKind::Ddol => "Dynamic Data Authentication Data Object List",
        }
    }

    /// Tag under which the card publishes this list
    pub fn tag(&self) -> &'static [u8] {
        match self {
            DolKind::Pdol => &[0x9F, 0x38],
            DolKind::Cdol1 => &[0x8C],
            DolKind::Cdol2 => &[0x8D],
            DolKind::Tdol => &[0x97],
            DolKind::Ddol => &[0x9F, 0x49],
        }
    }
}

impl fmt::Display for DolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A tag paired with the value width the card expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAndLength {
    pub tag: Vec<u8>,
    pub length: usize,
}

impl TagAndLength {
    pub fn new(tag: &[u8], length: usize) -> Self {
        Self {
            tag: tag.to_vec(),
            length,
        }
    }
}

/// Ordered list of requested data objects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataObjectList {
    entries: Vec<TagAndLength>,
}

impl DataObjectList {
    /// An empty list, used when the card advertises no PDOL
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode alternating tag/length pairs until the buffer is exhausted
    pub fn decode(data: &[u8]) -> Result<Self, TlvError> {
        let mut entries = Vec::new();
        let mut i = 0;

        while i < data.len() {
            let tag = read_tag(data, i)?;
            i += tag.len();

            let (length, consumed) = read_length(data, i)?;
            i += consumed;

            entries.push(TagAndLength::new(tag, length));
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[TagAndLength] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Sum of all declared lengths, i.e. the size of the filled data field
    pub fn total_length(&self) -> usize {
        self.entries.iter().map(|e| e.length).sum()
    }

    /// Whether the list requests `tag`
    pub fn contains(&self, tag: &[u8]) -> bool {
        self.entries.iter().any(|e| e.tag == tag)
    }

    /// Render the list the way the card requested it, one line per entry
    pub fn dump(&self, kind: DolKind, indent: usize) -> String {
        let mut out = format!("{}{}\n", " ".repeat(indent), kind.description());
        let entry_indent = " ".repeat(indent + 2);

        for entry in &self.entries {
            out.push_str(&format!(
                "{}{} {} ({} {})\n",
                entry_indent,
                hex::encode_upper(&entry.tag),
                crate::get_tag_name(&entry.tag),
                entry.length,
                if entry.length == 1 { "byte" } else { "bytes" }
            ));
        }

        out
    }
}

impl FromIterator<TagAndLength> for DataObjectList {
    fn from_iter<I: IntoIterator<Item = TagAndLength>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

//! Terminal default values for DOL-requested data objects
//!
//! The table is a static literal: it is built at compile time and never
//! mutated. Terminal Transaction Qualifiers (9F66) carry four alternates,
//! stored under the three-byte keys `9F6600`..`9F6603`.

use std::fmt;

/// Terminal Transaction Qualifiers
pub const TTQ_TAG: &[u8] = &[0x9F, 0x66];

/// Name returned for tags missing from the table
pub const TAG_NOT_FOUND: &str = "Tag not found";

/// Selects one of the alternate TTQ values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TtqVariant(u8);

impl TtqVariant {
    /// `27 00 00 00`, identical to the plain 9F66 default
    pub const STANDARD: Self = Self(0x00);

    /// Every selector present in the table, in retry order
    pub const ALL: [Self; 4] = [Self(0x00), Self(0x01), Self(0x02), Self(0x03)];

    pub fn new(selector: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.0 == selector)
    }

    pub fn selector(&self) -> u8 {
        self.0
    }

    fn key(&self) -> [u8; 3] {
        [TTQ_TAG[0], TTQ_TAG[1], self.0]
    }
}

impl Default for TtqVariant {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl fmt::Display for TtqVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

/// One row of the default value table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DolDefault {
    pub tag: &'static [u8],
    pub name: &'static str,
    pub value: &'static [u8],
}

const fn row(tag: &'static [u8], name: &'static str, value: &'static [u8]) -> DolDefault {
    DolDefault { tag, name, value }
}

static STANDARD_DEFAULTS: &[DolDefault] = &[
    // PDOL
    row(&[0x9F, 0x66], "Terminal Transaction Qualifiers", &[0x27, 0x00, 0x00, 0x00]),
    row(&[0x9F, 0x66, 0x00], "Terminal Transaction Qualifiers", &[0x27, 0x00, 0x00, 0x00]),
    // rejected by some Visa issuers
    row(&[0x9F, 0x66, 0x01], "Terminal Transaction Qualifiers", &[0xB7, 0x60, 0x40, 0x00]),
    // widely accepted, but some cards answer with a shortened AFL
    row(&[0x9F, 0x66, 0x02], "Terminal Transaction Qualifiers", &[0xA0, 0x00, 0x00, 0x00]),
    row(&[0x9F, 0x66, 0x03], "Terminal Transaction Qualifiers", &[0xF0, 0x20, 0x40, 0x00]),
    row(&[0x9F, 0x02], "Transaction Amount", &[0x00, 0x00, 0x00, 0x00, 0x10, 0x00]),
    row(&[0x9F, 0x03], "Amount, Other (Numeric)", &[0x00; 6]),
    row(&[0x9F, 0x1A], "Terminal Country Code", &[0x09, 0x78]),
    row(&[0x95], "Terminal Verification Results", &[0x00; 5]),
    row(&[0x5F, 0x2A], "Transaction Currency Code", &[0x09, 0x78]),
    row(&[0x9A], "Transaction Date", &[0x23, 0x03, 0x01]),
    row(&[0x9C], "Transaction Type", &[0x00]),
    row(&[0x9F, 0x37], "Unpredictable Number", &[0x38, 0x39, 0x30, 0x31]),
    // CDOL1
    row(&[0x9F, 0x35], "Terminal Type", &[0x22]),
    row(&[0x9F, 0x45], "Data Authentication Code", &[0x00, 0x00]),
    row(&[0x9F, 0x4C], "ICC Dynamic Number", &[0x00; 8]),
    row(&[0x9F, 0x34], "CVM Results", &[0x00, 0x00, 0x00]),
    row(&[0x9F, 0x21], "Transaction Time (HHMMSS)", &[0x11, 0x10, 0x09]),
    row(&[0x9F, 0x7C], "Merchant Custom Data", &[0x00; 14]),
];

/// Read-only mapping from tag to terminal default value
#[derive(Debug, Clone, Copy)]
pub struct DefaultValueTable {
    rows: &'static [DolDefault],
}

impl DefaultValueTable {
    /// The built-in table
    pub const fn standard() -> Self {
        Self {
            rows: STANDARD_DEFAULTS,
        }
    }

    pub fn rows(&self) -> &'static [DolDefault] {
        self.rows
    }

    fn find(&self, key: &[u8]) -> Option<&'static DolDefault> {
        self.rows.iter().find(|row| row.tag == key)
    }

    /// Default value for `tag`
    ///
    /// When `tag` is 9F66 and a TTQ variant is supplied, the variant's value
    /// replaces the plain default wholesale.
    pub fn lookup(&self, tag: &[u8], ttq: Option<TtqVariant>) -> Option<&'static [u8]> {
        match ttq {
            Some(variant) if tag == TTQ_TAG => self.find(&variant.key()),
            _ => self.find(tag),
        }
        .map(|row| row.value)
    }

    /// Description of `tag`, or [`TAG_NOT_FOUND`]
    pub fn lookup_name(&self, tag: &[u8]) -> &'static str {
        self.find(tag).map_or(TAG_NOT_FOUND, |row| row.name)
    }

    /// Value of exactly `length` bytes for `tag`
    ///
    /// Unknown tags and tags whose table value width differs from `length`
    /// resolve to zeros, so a DOL field width is always honoured.
    pub fn resolve(&self, tag: &[u8], length: usize, ttq: Option<TtqVariant>) -> Vec<u8> {
        match self.lookup(tag, ttq) {
            Some(value) if value.len() == length => value.to_vec(),
            _ => vec![0x00; length],
        }
    }

    /// Fixed-width listing of every row
    pub fn dump(&self) -> String {
        self.to_string()
    }
}

impl Default for DefaultValueTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Display for DefaultValueTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<8} {:<32} VALUE", "TAG", "DESCRIPTION")?;
        writeln!(f, "{}", "-".repeat(60))?;
        for row in self.rows {
            writeln!(
                f,
                "{:<8} {:<32} {}",
                hex::encode_upper(row.tag),
                row.name,
                hex::encode_upper(row.value)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_plain_default() {
        let table = DefaultValueTable::standard();
        assert_eq!(table.lookup(&[0x9C], None), Some(&[0x00][..]));
        assert_eq!(
            table.lookup(TTQ_TAG, None),
            Some(&[0x27, 0x00, 0x00, 0x00][..])
        );
        assert_eq!(table.lookup(&[0xDF, 0x01], None), None);
    }

    #[test]
    fn test_lookup_ttq_variant_replaces_default() {
        let table = DefaultValueTable::standard();
        let variant = TtqVariant::new(0x01).unwrap();

        assert_eq!(
            table.lookup(TTQ_TAG, Some(variant)),
            Some(&[0xB7, 0x60, 0x40, 0x00][..])
        );
        assert_eq!(
            table.lookup(TTQ_TAG, TtqVariant::new(0x03)),
            Some(&[0xF0, 0x20, 0x40, 0x00][..])
        );
        // selector only applies to 9F66
        assert_eq!(table.lookup(&[0x9C], Some(variant)), Some(&[0x00][..]));
    }

    #[test]
    fn test_every_variant_is_present() {
        let table = DefaultValueTable::standard();
        for variant in TtqVariant::ALL {
            assert_eq!(table.lookup(TTQ_TAG, Some(variant)).map(<[u8]>::len), Some(4));
        }
        assert_eq!(TtqVariant::new(0x04), None);
    }

    #[test]
    fn test_lookup_name() {
        let table = DefaultValueTable::standard();
        assert_eq!(table.lookup_name(&[0x9F, 0x37]), "Unpredictable Number");
        assert_eq!(table.lookup_name(&[0xDF, 0x01]), TAG_NOT_FOUND);
    }

    #[test]
    fn test_resolve_honours_requested_length() {
        let table = DefaultValueTable::standard();

        assert_eq!(table.resolve(TTQ_TAG, 4, None), vec![0x27, 0x00, 0x00, 0x00]);
        // width mismatch zero-fills instead of copying the literal
        assert_eq!(table.resolve(TTQ_TAG, 2, None), vec![0x00, 0x00]);
        assert_eq!(table.resolve(&[0xDF, 0x01], 3, None), vec![0x00; 3]);
        assert!(table.resolve(&[0xDF, 0x01], 0, None).is_empty());
    }

    #[test]
    fn test_dump_lists_every_row() {
        let table = DefaultValueTable::standard();
        let dump = table.dump();

        assert_eq!(dump.lines().count(), table.rows().len() + 2);
        assert!(dump.contains("9F6601"));
        assert!(dump.contains("B7604000"));
    }
}

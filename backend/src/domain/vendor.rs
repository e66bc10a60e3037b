//! Network interface vendor records and the manufacturer resolver.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::addressing::{MacAddress, MacMask};

/// Vendor record keyed by a (MAC prefix, mask) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorRecord {
    pub mac: MacAddress,
    pub mask: MacMask,
    pub manufacturer: Option<String>,
    /// Free-text comment; a non-blank comment is displayed instead of the
    /// manufacturer name.
    pub comment: Option<String>,
}

impl VendorRecord {
    /// Name shown for devices matching this record.
    pub fn display_name(&self) -> Option<&str> {
        non_blank(self.comment.as_deref()).or_else(|| non_blank(self.manufacturer.as_deref()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

/// Immutable vendor table with exact-key lookup.
///
/// # Examples
/// ```
/// use wifi_advisor::domain::{MacMask, VendorRecord, VendorTable};
///
/// let mac = "00:1A:2B:00:00:00".parse().expect("mac");
/// let table = VendorTable::new(vec![VendorRecord {
///     mac,
///     mask: MacMask::DEFAULT_DEVICE,
///     manufacturer: Some("Acme".to_owned()),
///     comment: Some("Acme Networks Ltd".to_owned()),
/// }]);
/// assert_eq!(table.resolve(mac, MacMask::DEFAULT_DEVICE), Some("Acme Networks Ltd"));
/// ```
#[derive(Debug, Default)]
pub struct VendorTable {
    records: HashMap<(MacAddress, MacMask), VendorRecord>,
}

impl VendorTable {
    /// Build the table; later duplicates of a key replace earlier ones.
    pub fn new(records: Vec<VendorRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| ((record.mac, record.mask), record))
                .collect(),
        }
    }

    /// Vendor name for the exact `(mac, mask)` key, or `None` when the key
    /// is unknown or the record carries no name.
    pub fn resolve(&self, mac: MacAddress, mask: MacMask) -> Option<&str> {
        let name = self
            .records
            .get(&(mac, mask))
            .and_then(VendorRecord::display_name);
        if name.is_none() {
            debug!(%mac, %mask, "no vendor record for device");
        }
        name
    }

    /// Number of vendor records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    //! Exact-match and display precedence coverage.

    use rstest::{fixture, rstest};

    use super::*;

    fn mac(raw: &str) -> MacAddress {
        raw.parse().expect("valid mac")
    }

    fn mask(bits: i64) -> MacMask {
        MacMask::new(bits).expect("valid mask")
    }

    #[fixture]
    fn table() -> VendorTable {
        VendorTable::new(vec![
            VendorRecord {
                mac: mac("00:1A:2B:00:00:00"),
                mask: mask(24),
                manufacturer: Some("AcmeNet".to_owned()),
                comment: None,
            },
            VendorRecord {
                mac: mac("00:1A:2B:30:00:00"),
                mask: mask(28),
                manufacturer: Some("AcmeNet".to_owned()),
                comment: Some("Acme Industrial Sensors".to_owned()),
            },
            VendorRecord {
                mac: mac("F0:00:00:00:00:00"),
                mask: mask(24),
                manufacturer: Some("Blanko".to_owned()),
                comment: Some("   ".to_owned()),
            },
        ])
    }

    #[rstest]
    fn returns_manufacturer_without_comment(table: VendorTable) {
        assert_eq!(table.resolve(mac("00:1A:2B:00:00:00"), mask(24)), Some("AcmeNet"));
    }

    #[rstest]
    fn comment_overrides_manufacturer(table: VendorTable) {
        assert_eq!(
            table.resolve(mac("00:1A:2B:30:00:00"), mask(28)),
            Some("Acme Industrial Sensors")
        );
    }

    #[rstest]
    fn blank_comment_falls_back_to_manufacturer(table: VendorTable) {
        assert_eq!(table.resolve(mac("F0:00:00:00:00:00"), mask(24)), Some("Blanko"));
    }

    #[rstest]
    #[case("00:1A:2B:00:00:00", 28)]
    #[case("00:1A:2B:00:00:01", 24)]
    #[case("AA:BB:CC:DD:EE:FF", 24)]
    fn mask_and_mac_must_both_match(table: VendorTable, #[case] raw: &str, #[case] bits: i64) {
        assert_eq!(table.resolve(mac(raw), mask(bits)), None);
    }

    #[rstest]
    fn later_duplicates_replace_earlier_records() {
        let key = mac("11:22:33:00:00:00");
        let table = VendorTable::new(vec![
            VendorRecord {
                mac: key,
                mask: mask(24),
                manufacturer: Some("Old".to_owned()),
                comment: None,
            },
            VendorRecord {
                mac: key,
                mask: mask(24),
                manufacturer: Some("New".to_owned()),
                comment: None,
            },
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve(key, mask(24)), Some("New"));
    }
}

//! Read-only enrichment tables shared by every request.
//!
//! Built once at start-up and handed to services behind an `Arc`; nothing
//! mutates them afterwards so lookups need no locking.

use std::net::IpAddr;

use tracing::info;

use super::addressing::{MacAddress, MacMask};
use super::asn::{Asn, AsnId, AsnTable, NetworkBlock};
use super::percentile::{PercentileScorer, PercentileScores};
use super::vendor::{VendorRecord, VendorTable};

/// ASN, vendor and percentile lookups behind one handle.
#[derive(Debug, Default)]
pub struct EnrichmentTables {
    asns: AsnTable,
    vendors: VendorTable,
    scorer: PercentileScorer,
}

impl EnrichmentTables {
    /// Freeze the loaded records into lookup tables.
    pub fn new(
        asns: Vec<Asn>,
        blocks: Vec<NetworkBlock>,
        vendors: Vec<VendorRecord>,
        scorer: PercentileScorer,
    ) -> Self {
        let tables = Self {
            asns: AsnTable::new(asns, blocks),
            vendors: VendorTable::new(vendors),
            scorer,
        };
        info!(
            asns = tables.asns.asn_count(),
            blocks = tables.asns.block_count(),
            vendors = tables.vendors.len(),
            gate = ?tables.scorer.gate(),
            "enrichment tables loaded"
        );
        tables
    }

    /// AS number owning `ip`.
    pub fn resolve_asn(&self, ip: IpAddr) -> Option<AsnId> {
        self.asns.resolve(ip)
    }

    /// AS record, with organisation, owning `ip`.
    pub fn lookup_asn(&self, ip: IpAddr) -> Option<Asn> {
        self.asns.lookup(ip)
    }

    /// Display vendor for a `(mac, mask)` key.
    pub fn resolve_vendor(&self, mac: MacAddress, mask: MacMask) -> Option<String> {
        self.vendors.resolve(mac, mask).map(str::to_owned)
    }

    /// Decile buckets for an NDT sample.
    pub fn score_sample(&self, download: f64, upload: f64, rtt: Option<f64>) -> PercentileScores {
        self.scorer.score_sample(download, upload, rtt)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::percentile::SaturationGate;
    use crate::domain::reference_tables::ReferenceTables;

    #[rstest]
    fn empty_tables_miss_without_failing() {
        let tables = EnrichmentTables::default();
        let mac = MacAddress::from_octets([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

        assert_eq!(tables.resolve_asn("203.0.113.9".parse().expect("ip")), None);
        assert_eq!(tables.resolve_vendor(mac, MacMask::DEFAULT_DEVICE), None);
    }

    #[rstest]
    fn scoring_uses_configured_gate() {
        let tables = EnrichmentTables::new(
            vec![],
            vec![],
            vec![],
            PercentileScorer::new(ReferenceTables::standard(), SaturationGate::PerMetric),
        );
        let scores = tables.score_sample(1.0, 500.0, None);
        assert_eq!(scores.p_download.value(), 10);
    }
}

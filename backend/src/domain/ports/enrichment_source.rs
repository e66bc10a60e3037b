//! Driven port for reading the static enrichment tables.
//!
//! Tables are populated by an external ingestion process. The engine reads
//! them once at start-up and never writes them.

use async_trait::async_trait;

use crate::domain::{Asn, NetworkBlock, VendorRecord};

use super::define_port_error;

define_port_error! {
    /// Errors raised while loading enrichment tables.
    pub enum EnrichmentSourceError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "enrichment source connection failed: {message}",
        /// Read failed or returned rows that could not be decoded.
        Query { message: String } =>
            "enrichment source query failed: {message}",
    }
}

/// Port for loading AS records, network blocks and vendor records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrichmentSource: Send + Sync {
    /// All known AS records.
    async fn load_asns(&self) -> Result<Vec<Asn>, EnrichmentSourceError>;

    /// All announced network blocks.
    async fn load_network_blocks(&self) -> Result<Vec<NetworkBlock>, EnrichmentSourceError>;

    /// All vendor records.
    async fn load_vendor_records(&self) -> Result<Vec<VendorRecord>, EnrichmentSourceError>;
}

/// Fixture source with empty tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureEnrichmentSource;

#[async_trait]
impl EnrichmentSource for FixtureEnrichmentSource {
    async fn load_asns(&self) -> Result<Vec<Asn>, EnrichmentSourceError> {
        Ok(Vec::new())
    }

    async fn load_network_blocks(&self) -> Result<Vec<NetworkBlock>, EnrichmentSourceError> {
        Ok(Vec::new())
    }

    async fn load_vendor_records(&self) -> Result<Vec<VendorRecord>, EnrichmentSourceError> {
        Ok(Vec::new())
    }
}

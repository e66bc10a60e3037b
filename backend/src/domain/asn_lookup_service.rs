//! AS lookup service backed by the in-memory enrichment tables.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{AsnLookupQuery, AsnLookupRequest, AsnLookupResponse};
use crate::domain::{EnrichmentTables, Error};

/// Service implementing [`AsnLookupQuery`].
#[derive(Clone)]
pub struct AsnLookupService {
    tables: Arc<EnrichmentTables>,
}

impl AsnLookupService {
    /// Create the service over the shared enrichment tables.
    pub fn new(tables: Arc<EnrichmentTables>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl AsnLookupQuery for AsnLookupService {
    async fn lookup(&self, request: AsnLookupRequest) -> Result<AsnLookupResponse, Error> {
        Ok(AsnLookupResponse {
            client_host: request.client_ip,
            asn: self.tables.lookup_asn(request.client_ip),
        })
    }
}

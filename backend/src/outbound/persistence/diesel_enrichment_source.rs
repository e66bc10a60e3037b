//! PostgreSQL-backed loader for the AS and vendor reference tables.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::ports::{EnrichmentSource, EnrichmentSourceError};
use crate::domain::{Asn, NetworkBlock, VendorRecord};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{AsnNetworkRow, AsnRow, MacManufRow};
use super::pool::{DbPool, PoolError};
use super::row_mapping::{asn_from_row, network_block_from_row, vendor_record_from_row};
use super::schema::{asn_networks, asns, macs_manuf};

/// Diesel-backed implementation of [`EnrichmentSource`].
#[derive(Clone)]
pub struct DieselEnrichmentSource {
    pool: DbPool,
}

impl DieselEnrichmentSource {
    /// Create a new source with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> EnrichmentSourceError {
    map_basic_pool_error(error, EnrichmentSourceError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> EnrichmentSourceError {
    map_basic_diesel_error(
        error,
        EnrichmentSourceError::query,
        EnrichmentSourceError::connection,
    )
}

#[async_trait]
impl EnrichmentSource for DieselEnrichmentSource {
    async fn load_asns(&self) -> Result<Vec<Asn>, EnrichmentSourceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<AsnRow> = asns::table
            .select(AsnRow::as_select())
            .order_by(asns::id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        debug!(rows = rows.len(), "loaded asns");
        Ok(rows.into_iter().map(asn_from_row).collect())
    }

    async fn load_network_blocks(&self) -> Result<Vec<NetworkBlock>, EnrichmentSourceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<AsnNetworkRow> = asn_networks::table
            .select(AsnNetworkRow::as_select())
            .order_by(asn_networks::id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        debug!(rows = rows.len(), "loaded asn networks");
        Ok(rows.into_iter().map(network_block_from_row).collect())
    }

    async fn load_vendor_records(&self) -> Result<Vec<VendorRecord>, EnrichmentSourceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MacManufRow> = macs_manuf::table
            .select(MacManufRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        debug!(rows = rows.len(), "loaded vendor records");
        rows.into_iter()
            .map(|row| {
                vendor_record_from_row(row)
                    .map_err(|err| EnrichmentSourceError::query(err.to_string()))
            })
            .collect()
    }
}

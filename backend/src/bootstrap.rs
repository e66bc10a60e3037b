//! Start-up wiring: load the enrichment tables once and build the driving
//! ports over shared, read-only state.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::info;

use crate::config::{EngineSettings, SettingsError};
use crate::domain::ports::{
    AsnLookupQuery, EnrichmentSource, EnrichmentSourceError, HistoryQuery, HistoryRepository,
    MeasurementRepository, SubmissionCommand,
};
use crate::domain::{
    AsnLookupService, EnrichmentTables, HistoryConfig, HistoryService, PercentileScorer,
    ReferenceTables, SaturationGate, SubmissionService,
};
use crate::outbound::persistence::{
    DbPool, DieselEnrichmentSource, DieselHistoryRepository, DieselMeasurementRepository,
    PoolError,
};

/// Failures while bringing the engine up.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Enrichment(#[from] EnrichmentSourceError),
}

/// Read every reference table through `source` and freeze them.
///
/// # Errors
///
/// Propagates the first load failure.
pub async fn load_enrichment_tables<S>(
    source: &S,
    gate: SaturationGate,
) -> Result<EnrichmentTables, EnrichmentSourceError>
where
    S: EnrichmentSource + ?Sized,
{
    let asns = source.load_asns().await?;
    let blocks = source.load_network_blocks().await?;
    let vendors = source.load_vendor_records().await?;
    Ok(EnrichmentTables::new(
        asns,
        blocks,
        vendors,
        PercentileScorer::new(ReferenceTables::standard(), gate),
    ))
}

/// Driving ports of a running engine.
#[derive(Clone)]
pub struct Engine {
    pub submissions: Arc<dyn SubmissionCommand>,
    pub history: Arc<dyn HistoryQuery>,
    pub asn_lookup: Arc<dyn AsnLookupQuery>,
    pub tables: Arc<EnrichmentTables>,
}

impl Engine {
    /// Build the services over the given repositories.
    pub fn new<M, H>(
        measurements: Arc<M>,
        history: Arc<H>,
        tables: Arc<EnrichmentTables>,
        history_config: HistoryConfig,
        clock: Arc<dyn Clock>,
    ) -> Self
    where
        M: MeasurementRepository + 'static,
        H: HistoryRepository + 'static,
    {
        Self {
            submissions: Arc::new(SubmissionService::new(
                measurements,
                Arc::clone(&tables),
                clock,
            )),
            history: Arc::new(HistoryService::new(
                history,
                Arc::clone(&tables),
                history_config,
            )),
            asn_lookup: Arc::new(AsnLookupService::new(Arc::clone(&tables))),
            tables,
        }
    }

    /// Connect to PostgreSQL, load the tables and build the services.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError`] for invalid settings, an unreachable
    /// database or unreadable reference tables.
    pub async fn connect(settings: &EngineSettings) -> Result<Self, BootstrapError> {
        let gate = settings.saturation_gate()?;
        let history_config = settings.history_config()?;
        let pool = DbPool::new(settings.pool_config()?).await?;

        let source = DieselEnrichmentSource::new(pool.clone());
        let tables = Arc::new(load_enrichment_tables(&source, gate).await?);
        info!(
            max_history_per_category = history_config.max_history_per_category.get(),
            "engine ready"
        );

        Ok(Self::new(
            Arc::new(DieselMeasurementRepository::new(pool.clone())),
            Arc::new(DieselHistoryRepository::new(pool)),
            tables,
            history_config,
            Arc::new(DefaultClock),
        ))
    }
}

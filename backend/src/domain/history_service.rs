//! History domain service.
//!
//! Fans out to the history repository once per category, then joins device
//! entries with their vendor, NDT tests with their decile buckets and web
//! tests with their TCP-connect entries.

use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{
    DeviceHistoryItem, HistoryEntry, HistoryQuery, HistoryRepository, HistoryRepositoryError,
    HistoryRequest, HistoryView, NdtHistoryItem, SessionRecords, StoredRecord, WebHistoryItem,
};
use crate::domain::{EnrichmentTables, Error};

/// Entries returned per category when nothing else is configured.
pub const DEFAULT_MAX_HISTORY_PER_CATEGORY: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(value) => value,
    None => NonZeroUsize::MIN,
};

/// History aggregation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    pub max_history_per_category: NonZeroUsize,
}

impl HistoryConfig {
    /// Configuration returning at most `max_history_per_category` entries
    /// per category.
    pub const fn new(max_history_per_category: NonZeroUsize) -> Self {
        Self {
            max_history_per_category,
        }
    }

    fn limit(self) -> usize {
        self.max_history_per_category.get()
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY_PER_CATEGORY)
    }
}

fn map_repository_error(error: HistoryRepositoryError) -> Error {
    match error {
        HistoryRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("history repository unavailable: {message}"))
        }
        HistoryRepositoryError::Query { message } => {
            Error::internal(format!("history repository error: {message}"))
        }
    }
}

// Newest session first; ties on the timestamp go to the higher session id.
fn newest_first<T>(mut entries: Vec<HistoryEntry<T>>, limit: usize) -> Vec<HistoryEntry<T>> {
    entries.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.session_id.cmp(&a.session_id))
    });
    entries.truncate(limit);
    entries
}

fn grouped<T, U>(
    groups: Vec<SessionRecords<T>>,
    mut join: impl FnMut(T) -> U,
) -> Vec<HistoryEntry<Vec<U>>> {
    groups
        .into_iter()
        .map(|group| HistoryEntry {
            session_id: group.session_id,
            timestamp: group.recorded_at,
            record: group.records.into_iter().map(&mut join).collect(),
        })
        .collect()
}

fn single<T, U>(rows: Vec<StoredRecord<T>>, mut join: impl FnMut(T) -> U) -> Vec<HistoryEntry<U>> {
    rows.into_iter()
        .map(|row| HistoryEntry {
            session_id: row.session_id,
            timestamp: row.recorded_at,
            record: join(row.record),
        })
        .collect()
}

/// Service implementing [`HistoryQuery`].
#[derive(Clone)]
pub struct HistoryService<R> {
    history_repo: Arc<R>,
    tables: Arc<EnrichmentTables>,
    config: HistoryConfig,
}

impl<R> HistoryService<R> {
    /// Create the service over a repository and the shared enrichment
    /// tables.
    pub fn new(history_repo: Arc<R>, tables: Arc<EnrichmentTables>, config: HistoryConfig) -> Self {
        Self {
            history_repo,
            tables,
            config,
        }
    }
}

impl<R> HistoryService<R>
where
    R: HistoryRepository,
{
    async fn web_entries(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<HistoryEntry<WebHistoryItem>>, HistoryRepositoryError> {
        let rows = self.history_repo.recent_web_tests(client_ip, limit).await?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let tcp_connect = self.history_repo.tcp_connects_for(row.id).await?;
            entries.push(HistoryEntry {
                session_id: row.session_id,
                timestamp: row.recorded_at,
                record: WebHistoryItem {
                    test: row.record,
                    tcp_connect,
                },
            });
        }
        Ok(entries)
    }

    async fn collect(&self, client_ip: IpAddr) -> Result<HistoryView, HistoryRepositoryError> {
        let limit = self.config.limit();
        let repo = &self.history_repo;

        let protocols = repo.recent_protocol_sessions(client_ip, limit).await?;
        let devices = repo.recent_device_sessions(client_ip, limit).await?;
        let dns = repo.recent_dns_tests(client_ip, limit).await?;
        let ndt = repo.recent_ndt_tests(client_ip, limit).await?;
        let web = self.web_entries(client_ip, limit).await?;

        let devices = grouped(devices, |device| DeviceHistoryItem {
            manufacturer: self.tables.resolve_vendor(device.mac, device.mask),
            device,
        });
        let ndt = single(ndt, |test| NdtHistoryItem {
            scores: self
                .tables
                .score_sample(test.download, test.upload, test.avg_rtt),
            test,
        });

        Ok(HistoryView {
            protocols_test: newest_first(grouped(protocols, |test| test), limit),
            devices_test: newest_first(devices, limit),
            dns_tests: newest_first(single(dns, |test| test), limit),
            ndt_tests_ooni: newest_first(ndt, limit),
            web_tests_ooni: newest_first(web, limit),
        })
    }
}

#[async_trait]
impl<R> HistoryQuery for HistoryService<R>
where
    R: HistoryRepository,
{
    async fn history(&self, request: HistoryRequest) -> Result<HistoryView, Error> {
        let view = self
            .collect(request.client_ip)
            .await
            .map_err(map_repository_error)?;
        debug!(
            client_ip = %request.client_ip,
            protocols = view.protocols_test.len(),
            devices = view.devices_test.len(),
            dns = view.dns_tests.len(),
            ndt = view.ndt_tests_ooni.len(),
            web = view.web_tests_ooni.len(),
            "history assembled"
        );
        Ok(view)
    }
}

#[cfg(test)]
#[path = "history_service_tests.rs"]
mod tests;

//! Process-local store implementing the measurement, history and
//! enrichment ports.
//!
//! Rows live behind one mutex. A submission writes every row under a single
//! lock acquisition, so readers observe either all of its rows or none.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::ports::{
    EnrichmentSource, EnrichmentSourceError, HistoryRepository, HistoryRepositoryError,
    MeasurementRepository, MeasurementRepositoryError, SessionRecords, StoredRecord,
};
use crate::domain::{
    Asn, DeviceEntry, DnsTest, NdtTest, NetworkBlock, NewSubmission, ProtocolTest,
    RecordedSubmission, SessionId, SubTest, SubTestId, SubTestOwner, SubmissionBody, TcpConnect,
    TestSession, VendorRecord, WebTest,
};

#[derive(Debug, Clone)]
struct Row<T> {
    id: SubTestId,
    owner: i64,
    record: T,
}

#[derive(Debug, Clone)]
struct Table<T> {
    next_id: i64,
    rows: Vec<Row<T>>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: Vec::new(),
        }
    }
}

impl<T> Table<T> {
    fn insert(&mut self, owner: i64, record: T) -> SubTestId {
        let id = SubTestId::new(self.next_id);
        self.next_id += 1;
        self.rows.push(Row { id, owner, record });
        id
    }

    fn contains(&self, id: SubTestId) -> bool {
        self.rows.iter().any(|row| row.id == id)
    }

    fn owned_by(&self, owner: i64) -> impl Iterator<Item = &Row<T>> {
        self.rows.iter().filter(move |row| row.owner == owner)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    next_session: i64,
    latest_recorded_at: Option<DateTime<Utc>>,
    sessions: HashMap<SessionId, TestSession>,
    protocol: Table<ProtocolTest>,
    devices: Table<DeviceEntry>,
    dns: Table<DnsTest>,
    ndt: Table<NdtTest>,
    web: Table<WebTest>,
    tcp_connects: Table<TcpConnect>,
}

impl StoreState {
    /// Session timestamps never go backwards in insertion order.
    fn open_session(&mut self, submission: &NewSubmission) -> SessionId {
        self.next_session += 1;
        let id = SessionId::new(self.next_session);
        let recorded_at = self
            .latest_recorded_at
            .map_or(submission.recorded_at, |latest| latest.max(submission.recorded_at));
        self.latest_recorded_at = Some(recorded_at);
        self.sessions.insert(
            id,
            TestSession {
                id,
                client_ip: submission.client_ip,
                recorded_at,
                asn: submission.asn,
                context: submission.submission.context.clone(),
            },
        );
        id
    }

    /// Sessions of `client_ip`, newest first.
    fn sessions_of(&self, client_ip: IpAddr) -> Vec<&TestSession> {
        let mut sessions: Vec<&TestSession> = self
            .sessions
            .values()
            .filter(|session| session.client_ip == client_ip)
            .collect();
        sessions.sort_by(|a, b| (b.recorded_at, b.id).cmp(&(a.recorded_at, a.id)));
        sessions
    }

    fn append(&mut self, owner: SubTestOwner, sub_test: &SubTest) -> Option<SubTestId> {
        match (owner, sub_test) {
            (SubTestOwner::WebTest(web_id), SubTest::TcpConnect(entry)) => self
                .web
                .contains(web_id)
                .then(|| self.tcp_connects.insert(web_id.get(), entry.clone())),
            (SubTestOwner::Session(session_id), sub_test) => {
                if !self.sessions.contains_key(&session_id) {
                    return None;
                }
                let owner = session_id.get();
                match sub_test {
                    SubTest::Protocol(test) => Some(self.protocol.insert(owner, test.clone())),
                    SubTest::Device(device) => Some(self.devices.insert(owner, *device)),
                    SubTest::Dns(test) => Some(self.dns.insert(owner, test.clone())),
                    SubTest::Ndt(test) => Some(self.ndt.insert(owner, test.clone())),
                    SubTest::Web(test) => Some(self.web.insert(owner, test.clone())),
                    SubTest::TcpConnect(_) => None,
                }
            }
            (SubTestOwner::WebTest(_), _) => None,
        }
    }
}

fn grouped<T: Clone>(
    sessions: &[&TestSession],
    table: &Table<T>,
    limit: usize,
) -> Vec<SessionRecords<T>> {
    sessions
        .iter()
        .filter_map(|session| {
            let records: Vec<T> = table
                .owned_by(session.id.get())
                .map(|row| row.record.clone())
                .collect();
            (!records.is_empty()).then(|| SessionRecords {
                session_id: session.id,
                recorded_at: session.recorded_at,
                records,
            })
        })
        .take(limit)
        .collect()
}

fn per_record<T: Clone>(
    sessions: &[&TestSession],
    table: &Table<T>,
    limit: usize,
) -> Vec<StoredRecord<T>> {
    let mut records: Vec<(DateTime<Utc>, SessionId, &Row<T>)> = sessions
        .iter()
        .flat_map(|session| {
            table
                .owned_by(session.id.get())
                .map(move |row| (session.recorded_at, session.id, row))
        })
        .collect();
    records.sort_by(|a, b| (b.0, b.1, b.2.id).cmp(&(a.0, a.1, a.2.id)));
    records
        .into_iter()
        .take(limit)
        .map(|(recorded_at, session_id, row)| StoredRecord {
            id: row.id,
            session_id,
            recorded_at,
            record: row.record.clone(),
        })
        .collect()
}

/// Reference rows served through [`EnrichmentSource`].
#[derive(Debug, Clone, Default)]
struct ReferenceData {
    asns: Vec<Asn>,
    blocks: Vec<NetworkBlock>,
    vendors: Vec<VendorRecord>,
}

/// In-memory measurement store.
///
/// # Examples
///
/// ```
/// use wifi_advisor::outbound::memory::InMemoryStore;
///
/// let store = InMemoryStore::default();
/// assert_eq!(store.session_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    reference: ReferenceData,
}

impl InMemoryStore {
    /// Store serving the given reference rows to the enrichment loader.
    pub fn with_reference_data(
        asns: Vec<Asn>,
        blocks: Vec<NetworkBlock>,
        vendors: Vec<VendorRecord>,
    ) -> Self {
        Self {
            state: Mutex::default(),
            reference: ReferenceData {
                asns,
                blocks,
                vendors,
            },
        }
    }

    /// Number of stored sessions; zero if the lock is poisoned.
    pub fn session_count(&self) -> usize {
        self.state.lock().map(|state| state.sessions.len()).unwrap_or(0)
    }

    /// Stored session with the given identity.
    pub fn session(&self, id: SessionId) -> Option<TestSession> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.sessions.get(&id).cloned())
    }

    fn lock<E>(
        &self,
        poisoned: impl FnOnce(&'static str) -> E,
    ) -> Result<MutexGuard<'_, StoreState>, E> {
        self.state.lock().map_err(|_| poisoned("store lock poisoned"))
    }
}

#[async_trait]
impl MeasurementRepository for InMemoryStore {
    async fn record_submission(
        &self,
        submission: &NewSubmission,
    ) -> Result<RecordedSubmission, MeasurementRepositoryError> {
        let body = submission.submission.body.clone();
        let mut state = self.lock(MeasurementRepositoryError::query)?;
        let session_id = state.open_session(submission);
        let owner = session_id.get();

        let mut tcp_connect_ids = Vec::new();
        let sub_test_ids: Vec<SubTestId> = match body {
            SubmissionBody::Protocol { tests } => tests
                .into_iter()
                .map(|test| state.protocol.insert(owner, test))
                .collect(),
            SubmissionBody::Devices { devices } => devices
                .into_iter()
                .map(|device| state.devices.insert(owner, device))
                .collect(),
            SubmissionBody::Dns { test } => vec![state.dns.insert(owner, test)],
            SubmissionBody::Ndt { test } => vec![state.ndt.insert(owner, test)],
            SubmissionBody::Web { test, tcp_connects } => {
                let web_id = state.web.insert(owner, test);
                tcp_connect_ids = tcp_connects
                    .into_iter()
                    .map(|entry| state.tcp_connects.insert(web_id.get(), entry))
                    .collect();
                vec![web_id]
            }
        };
        debug!(%session_id, sub_tests = sub_test_ids.len(), "stored submission in memory");

        Ok(RecordedSubmission {
            session_id,
            sub_test_ids,
            tcp_connect_ids,
        })
    }

    async fn record_sub_test(
        &self,
        owner: SubTestOwner,
        sub_test: &SubTest,
    ) -> Result<SubTestId, MeasurementRepositoryError> {
        let mut state = self.lock(MeasurementRepositoryError::query)?;
        state
            .append(owner, sub_test)
            .ok_or_else(|| MeasurementRepositoryError::owner_not_found(owner.to_string()))
    }
}

#[async_trait]
impl HistoryRepository for InMemoryStore {
    async fn recent_protocol_sessions(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<SessionRecords<ProtocolTest>>, HistoryRepositoryError> {
        let state = self.lock(HistoryRepositoryError::query)?;
        Ok(grouped(&state.sessions_of(client_ip), &state.protocol, limit))
    }

    async fn recent_device_sessions(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<SessionRecords<DeviceEntry>>, HistoryRepositoryError> {
        let state = self.lock(HistoryRepositoryError::query)?;
        Ok(grouped(&state.sessions_of(client_ip), &state.devices, limit))
    }

    async fn recent_dns_tests(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<StoredRecord<DnsTest>>, HistoryRepositoryError> {
        let state = self.lock(HistoryRepositoryError::query)?;
        Ok(per_record(&state.sessions_of(client_ip), &state.dns, limit))
    }

    async fn recent_ndt_tests(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<StoredRecord<NdtTest>>, HistoryRepositoryError> {
        let state = self.lock(HistoryRepositoryError::query)?;
        Ok(per_record(&state.sessions_of(client_ip), &state.ndt, limit))
    }

    async fn recent_web_tests(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<StoredRecord<WebTest>>, HistoryRepositoryError> {
        let state = self.lock(HistoryRepositoryError::query)?;
        Ok(per_record(&state.sessions_of(client_ip), &state.web, limit))
    }

    async fn tcp_connects_for(
        &self,
        web_test: SubTestId,
    ) -> Result<Vec<TcpConnect>, HistoryRepositoryError> {
        let state = self.lock(HistoryRepositoryError::query)?;
        Ok(state
            .tcp_connects
            .owned_by(web_test.get())
            .map(|row| row.record.clone())
            .collect())
    }
}

#[async_trait]
impl EnrichmentSource for InMemoryStore {
    async fn load_asns(&self) -> Result<Vec<Asn>, EnrichmentSourceError> {
        Ok(self.reference.asns.clone())
    }

    async fn load_network_blocks(&self) -> Result<Vec<NetworkBlock>, EnrichmentSourceError> {
        Ok(self.reference.blocks.clone())
    }

    async fn load_vendor_records(&self) -> Result<Vec<VendorRecord>, EnrichmentSourceError> {
        Ok(self.reference.vendors.clone())
    }
}

//! Driven port for reading a client's most recent measurements.
//!
//! Every method returns rows ordered by session timestamp descending, ties
//! broken by descending identity, and never more than `limit` entries.

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    DeviceEntry, DnsTest, NdtTest, ProtocolTest, SessionId, SubTestId, TcpConnect, WebTest,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by history repository adapters.
    pub enum HistoryRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "history repository connection failed: {message}",
        /// Read failed or returned rows that could not be decoded.
        Query { message: String } =>
            "history repository query failed: {message}",
    }
}

/// Sub-tests of one session, for categories submitted as batches.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecords<T> {
    pub session_id: SessionId,
    pub recorded_at: DateTime<Utc>,
    pub records: Vec<T>,
}

/// One stored sub-test with its owning session's timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord<T> {
    pub id: SubTestId,
    pub session_id: SessionId,
    pub recorded_at: DateTime<Utc>,
    pub record: T,
}

/// Port for top-N history reads filtered by client address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Latest sessions carrying protocol tests.
    async fn recent_protocol_sessions(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<SessionRecords<ProtocolTest>>, HistoryRepositoryError>;

    /// Latest sessions carrying device entries.
    async fn recent_device_sessions(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<SessionRecords<DeviceEntry>>, HistoryRepositoryError>;

    /// Latest DNS tests.
    async fn recent_dns_tests(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<StoredRecord<DnsTest>>, HistoryRepositoryError>;

    /// Latest NDT tests.
    async fn recent_ndt_tests(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<StoredRecord<NdtTest>>, HistoryRepositoryError>;

    /// Latest web connectivity tests.
    async fn recent_web_tests(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<StoredRecord<WebTest>>, HistoryRepositoryError>;

    /// Every TCP-connect entry owned by a web test, in insertion order.
    async fn tcp_connects_for(
        &self,
        web_test: SubTestId,
    ) -> Result<Vec<TcpConnect>, HistoryRepositoryError>;
}

/// Fixture repository with no history.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureHistoryRepository;

#[async_trait]
impl HistoryRepository for FixtureHistoryRepository {
    async fn recent_protocol_sessions(
        &self,
        _client_ip: IpAddr,
        _limit: usize,
    ) -> Result<Vec<SessionRecords<ProtocolTest>>, HistoryRepositoryError> {
        Ok(Vec::new())
    }

    async fn recent_device_sessions(
        &self,
        _client_ip: IpAddr,
        _limit: usize,
    ) -> Result<Vec<SessionRecords<DeviceEntry>>, HistoryRepositoryError> {
        Ok(Vec::new())
    }

    async fn recent_dns_tests(
        &self,
        _client_ip: IpAddr,
        _limit: usize,
    ) -> Result<Vec<StoredRecord<DnsTest>>, HistoryRepositoryError> {
        Ok(Vec::new())
    }

    async fn recent_ndt_tests(
        &self,
        _client_ip: IpAddr,
        _limit: usize,
    ) -> Result<Vec<StoredRecord<NdtTest>>, HistoryRepositoryError> {
        Ok(Vec::new())
    }

    async fn recent_web_tests(
        &self,
        _client_ip: IpAddr,
        _limit: usize,
    ) -> Result<Vec<StoredRecord<WebTest>>, HistoryRepositoryError> {
        Ok(Vec::new())
    }

    async fn tcp_connects_for(
        &self,
        _web_test: SubTestId,
    ) -> Result<Vec<TcpConnect>, HistoryRepositoryError> {
        Ok(Vec::new())
    }
}

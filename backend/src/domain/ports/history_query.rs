//! Driving port for a client's recent measurement history.

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    DeviceEntry, DnsTest, Error, NdtTest, PercentileScores, ProtocolTest, SessionId, TcpConnect,
    WebTest,
};

/// Request for the history of one client address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub client_ip: IpAddr,
}

/// One history entry paired with its session's timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry<T> {
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
    pub record: T,
}

/// Device entry joined with its vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHistoryItem {
    #[serde(flatten)]
    pub device: DeviceEntry,
    /// `null` when no vendor record matched.
    pub manufacturer: Option<String>,
}

/// NDT test joined with its decile buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdtHistoryItem {
    #[serde(flatten)]
    pub test: NdtTest,
    #[serde(flatten)]
    pub scores: PercentileScores,
}

/// Web test joined with all of its TCP-connect entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebHistoryItem {
    #[serde(flatten)]
    pub test: WebTest,
    pub tcp_connect: Vec<TcpConnect>,
}

/// History grouped by test category, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryView {
    pub protocols_test: Vec<HistoryEntry<Vec<ProtocolTest>>>,
    pub devices_test: Vec<HistoryEntry<Vec<DeviceHistoryItem>>>,
    pub dns_tests: Vec<HistoryEntry<DnsTest>>,
    pub ndt_tests_ooni: Vec<HistoryEntry<NdtHistoryItem>>,
    pub web_tests_ooni: Vec<HistoryEntry<WebHistoryItem>>,
}

/// Driving port for history reads.
///
/// # Examples
///
/// ```rust,no_run
/// # async fn example() -> Result<(), wifi_advisor::domain::Error> {
/// use wifi_advisor::domain::ports::{FixtureHistoryQuery, HistoryQuery, HistoryRequest};
///
/// let view = FixtureHistoryQuery
///     .history(HistoryRequest { client_ip: "198.51.100.7".parse().expect("ip") })
///     .await?;
/// assert!(view.dns_tests.is_empty());
/// # Ok(())
/// # }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryQuery: Send + Sync {
    /// Most recent entries per category for `request.client_ip`.
    async fn history(&self, request: HistoryRequest) -> Result<HistoryView, Error>;
}

/// Fixture query returning an empty view.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureHistoryQuery;

#[async_trait]
impl HistoryQuery for FixtureHistoryQuery {
    async fn history(&self, _request: HistoryRequest) -> Result<HistoryView, Error> {
        Ok(HistoryView::default())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn empty_view_serialises_every_category() {
        let wire = serde_json::to_value(HistoryView::default()).expect("serialises");
        for key in [
            "protocols_test",
            "devices_test",
            "dns_tests",
            "ndt_tests_ooni",
            "web_tests_ooni",
        ] {
            assert!(wire.get(key).is_some(), "missing {key}");
        }
    }
}

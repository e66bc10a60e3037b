//! Test sessions and the sub-test records they own.
//!
//! A client submission produces one [`TestSession`] plus one or more
//! sub-test records. Sessions and sub-tests are immutable once stored.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::addressing::{MacAddress, MacMask};
use super::asn::AsnId;

mod payloads;

pub use payloads::{
    Blocking, DeviceEntry, DnsConsistency, DnsTest, NdtTest, OarcRating, ProtocolTest, TcpConnect,
    WebTest,
};

/// Storage identity of a test session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(i64);

impl SessionId {
    /// Wrap a storage identity.
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw identity.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage identity of a sub-test record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubTestId(i64);

impl SubTestId {
    /// Wrap a storage identity.
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw identity.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SubTestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optional client-supplied context attached to every session.
///
/// `mac` and `mask` are either both present or both absent; the submission
/// rules reject anything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionContext {
    pub device_android: Option<String>,
    pub mac: Option<MacAddress>,
    pub mask: Option<MacMask>,
    pub place: Option<String>,
    pub username: Option<String>,
}

/// Stored test session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSession {
    pub id: SessionId,
    pub client_ip: IpAddr,
    pub recorded_at: DateTime<Utc>,
    pub asn: Option<AsnId>,
    pub context: SessionContext,
}

/// Test category a submission belongs to; also the grouping key of the
/// history view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCategory {
    Protocol,
    Devices,
    Dns,
    Ndt,
    Web,
}

impl TestCategory {
    /// Every category in history order.
    pub const ALL: [Self; 5] = [Self::Protocol, Self::Devices, Self::Dns, Self::Ndt, Self::Web];

    /// Stable lowercase label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Protocol => "protocol",
            Self::Devices => "devices",
            Self::Dns => "dns",
            Self::Ndt => "ndt",
            Self::Web => "web",
        }
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-tests carried by one top-level submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionBody {
    Protocol { tests: Vec<ProtocolTest> },
    Devices { devices: Vec<DeviceEntry> },
    Dns { test: DnsTest },
    Ndt { test: NdtTest },
    Web {
        test: WebTest,
        #[serde(default)]
        tcp_connects: Vec<TcpConnect>,
    },
}

impl SubmissionBody {
    /// Category of the submission.
    pub const fn category(&self) -> TestCategory {
        match self {
            Self::Protocol { .. } => TestCategory::Protocol,
            Self::Devices { .. } => TestCategory::Devices,
            Self::Dns { .. } => TestCategory::Dns,
            Self::Ndt { .. } => TestCategory::Ndt,
            Self::Web { .. } => TestCategory::Web,
        }
    }
}

/// Validated top-level submission: session context plus its sub-tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub context: SessionContext,
    pub body: SubmissionBody,
}

/// Everything a repository needs to store one submission atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub client_ip: IpAddr,
    pub recorded_at: DateTime<Utc>,
    pub asn: Option<AsnId>,
    pub submission: Submission,
}

/// Identities assigned to a stored submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedSubmission {
    pub session_id: SessionId,
    /// Identities of the top-level sub-tests in submission order.
    pub sub_test_ids: Vec<SubTestId>,
    /// Identities of TCP-connect entries of a web submission.
    pub tcp_connect_ids: Vec<SubTestId>,
}

/// A single sub-test appended after its owner already exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum SubTest {
    Protocol(ProtocolTest),
    Device(DeviceEntry),
    Dns(DnsTest),
    Ndt(NdtTest),
    Web(WebTest),
    TcpConnect(TcpConnect),
}

impl SubTest {
    /// Short label used in logs and rejection messages.
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Protocol(_) => "protocol",
            Self::Device(_) => "device",
            Self::Dns(_) => "dns",
            Self::Ndt(_) => "ndt",
            Self::Web(_) => "web",
            Self::TcpConnect(_) => "tcp_connect",
        }
    }
}

/// Owner of an appended sub-test: sessions own every kind except TCP-connect
/// entries, which belong to a web test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubTestOwner {
    Session(SessionId),
    WebTest(SubTestId),
}

impl fmt::Display for SubTestOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(id) => write!(f, "session {id}"),
            Self::WebTest(id) => write!(f, "web test {id}"),
        }
    }
}

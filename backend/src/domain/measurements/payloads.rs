//! Sub-test payloads as submitted by clients.
//!
//! Field names follow the snake_case wire contract of the mobile clients.

use std::net::IpAddr;
use std::num::NonZeroU16;

use serde::{Deserialize, Serialize};

use crate::domain::addressing::{MacAddress, MacMask, PrivateIpv4};

/// Wi-Fi security protocol observed on the client's network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolTest {
    pub protocol_name: String,
    #[serde(default)]
    pub key_management: Option<String>,
    #[serde(default)]
    pub cipher: Option<String>,
}

/// Device discovered on the client's local network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub mac: MacAddress,
    #[serde(default)]
    pub mask: MacMask,
    #[serde(default)]
    pub router: bool,
    pub private_ip: PrivateIpv4,
}

/// Quality rating reported by the OARC resolver randomness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OarcRating {
    Great,
    Good,
    Poor,
}

impl OarcRating {
    /// Stored label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Great => "GREAT",
            Self::Good => "GOOD",
            Self::Poor => "POOR",
        }
    }

    /// Parse a stored label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "GREAT" => Some(Self::Great),
            "GOOD" => Some(Self::Good),
            "POOR" => Some(Self::Poor),
            _ => None,
        }
    }
}

/// DNS resolver diagnostics: resolver addresses, DNSSEC indicators and the
/// OARC source-port/transaction-id randomness ratings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsTest {
    pub dns1_android: Option<IpAddr>,
    pub dns2_android: Option<IpAddr>,
    pub ns_akamai: Option<IpAddr>,
    pub ecs_akamai: Option<IpAddr>,
    pub ip_akamai: Option<IpAddr>,
    pub do_flag: Option<bool>,
    pub ad_flag: Option<bool>,
    pub rrsig: Option<bool>,
    pub resolver_ip_oarc: Option<IpAddr>,
    pub rating_source_port: Option<OarcRating>,
    pub rating_transaction_id: Option<OarcRating>,
    pub std_source_port: Option<u32>,
    pub std_transaction_id: Option<u32>,
    pub bits_of_entropy_source_port: Option<f64>,
    pub bits_of_entropy_transaction_id: Option<f64>,
}

/// OONI NDT throughput and latency measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdtTest {
    pub report_id: String,
    /// Download throughput in Mbit/s.
    pub download: f64,
    /// Upload throughput in Mbit/s.
    pub upload: f64,
    /// Mean round-trip time in milliseconds; used for RTT scoring.
    #[serde(default)]
    pub avg_rtt: Option<f64>,
    #[serde(default)]
    pub mss: Option<i32>,
    #[serde(default)]
    pub max_rtt: Option<f64>,
    #[serde(default)]
    pub min_rtt: Option<f64>,
    #[serde(default)]
    pub ping: Option<f64>,
    #[serde(default)]
    pub retransmit_rate: Option<f64>,
}

/// DNS consistency verdict of an OONI web connectivity test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnsConsistency {
    Consistent,
    ReverseMatch,
    Inconsistent,
}

impl DnsConsistency {
    /// Stored label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Consistent => "consistent",
            Self::ReverseMatch => "reverse_match",
            Self::Inconsistent => "inconsistent",
        }
    }

    /// Parse a stored label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "consistent" => Some(Self::Consistent),
            "reverse_match" => Some(Self::ReverseMatch),
            "inconsistent" => Some(Self::Inconsistent),
            _ => None,
        }
    }
}

/// Blocking verdict of an OONI web connectivity test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Blocking {
    #[serde(rename = "tcp_ip")]
    TcpIp,
    #[serde(rename = "dns")]
    Dns,
    #[serde(rename = "http-diff")]
    HttpDiff,
    #[serde(rename = "http-failure")]
    HttpFailure,
    #[serde(rename = "not_blocking")]
    NotBlocking,
}

impl Blocking {
    /// Stored label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TcpIp => "tcp_ip",
            Self::Dns => "dns",
            Self::HttpDiff => "http-diff",
            Self::HttpFailure => "http-failure",
            Self::NotBlocking => "not_blocking",
        }
    }

    /// Parse a stored label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "tcp_ip" => Some(Self::TcpIp),
            "dns" => Some(Self::Dns),
            "http-diff" => Some(Self::HttpDiff),
            "http-failure" => Some(Self::HttpFailure),
            "not_blocking" => Some(Self::NotBlocking),
            _ => None,
        }
    }
}

/// OONI web connectivity result for a single URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebTest {
    pub report_id: String,
    pub url: String,
    pub resolver_asn: String,
    pub resolver_ip: IpAddr,
    pub resolver_network_name: String,
    pub client_resolver: IpAddr,
    #[serde(default)]
    pub dns_experiment_failure: Option<String>,
    #[serde(default)]
    pub control_failure: Option<String>,
    #[serde(default)]
    pub http_experiment_failure: Option<String>,
    #[serde(default)]
    pub dns_consistency: Option<DnsConsistency>,
    #[serde(default)]
    pub body_length_match: Option<bool>,
    #[serde(default)]
    pub headers_match: Option<bool>,
    #[serde(default)]
    pub status_code_match: Option<bool>,
    #[serde(default)]
    pub title_match: Option<bool>,
    #[serde(default)]
    pub accessible: Option<bool>,
    #[serde(default)]
    pub blocking: Option<Blocking>,
}

/// TCP connect attempt made during a web connectivity test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpConnect {
    #[serde(default)]
    pub ip: Option<IpAddr>,
    #[serde(default)]
    pub port: Option<NonZeroU16>,
    #[serde(default)]
    pub status_blocked: Option<bool>,
    #[serde(default)]
    pub status_failure_string: Option<String>,
    pub status_success: bool,
}

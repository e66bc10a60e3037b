//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use ipnet::IpNet;

use super::schema::{
    asn_networks, asns, devices_tests, dns_tests, macs_manuf, ndt_tests_ooni, protocol_tests,
    tcp_connect_web_tests_ooni, tests, web_tests_ooni,
};

// ---------------------------------------------------------------------------
// Enrichment tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = asns)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AsnRow {
    pub id: i64,
    pub asn_organization: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = asn_networks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AsnNetworkRow {
    pub id: i32,
    pub asn: i64,
    pub network: IpNet,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = macs_manuf)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MacManufRow {
    pub mac: [u8; 6],
    pub mask: i32,
    pub manuf: Option<String>,
    pub comment: Option<String>,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tests)]
pub(crate) struct NewTestRow<'a> {
    pub public_ip: IpNet,
    pub timestamp: DateTime<Utc>,
    pub asn_id: Option<i64>,
    pub device_android: Option<&'a str>,
    pub mac: Option<[u8; 6]>,
    pub mask: Option<i32>,
    pub place: Option<&'a str>,
    pub username: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// Sub-tests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = protocol_tests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ProtocolTestRow {
    pub id: i32,
    pub test_id: i32,
    pub protocol_name: String,
    pub key_management: Option<String>,
    pub cipher: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = protocol_tests)]
pub(crate) struct NewProtocolTestRow<'a> {
    pub test_id: i32,
    pub protocol_name: &'a str,
    pub key_management: Option<&'a str>,
    pub cipher: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = devices_tests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DevicesTestRow {
    pub id: i32,
    pub test_id: i32,
    pub mac: [u8; 6],
    pub mask: i32,
    pub router: bool,
    pub private_ip: IpNet,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = devices_tests)]
pub(crate) struct NewDevicesTestRow {
    pub test_id: i32,
    pub mac: [u8; 6],
    pub mask: i32,
    pub router: bool,
    pub private_ip: IpNet,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = dns_tests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DnsTestRow {
    pub id: i32,
    pub test_id: i32,
    pub dns1_android: Option<IpNet>,
    pub dns2_android: Option<IpNet>,
    pub ns_akamai: Option<IpNet>,
    pub ecs_akamai: Option<IpNet>,
    pub ip_akamai: Option<IpNet>,
    pub do_flag: Option<bool>,
    pub ad_flag: Option<bool>,
    pub rrsig: Option<bool>,
    pub resolver_ip_oarc: Option<IpNet>,
    pub rating_source_port: Option<String>,
    pub rating_transaction_id: Option<String>,
    pub std_source_port: Option<i64>,
    pub std_transaction_id: Option<i64>,
    pub bits_of_entropy_source_port: Option<f64>,
    pub bits_of_entropy_transaction_id: Option<f64>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = dns_tests)]
pub(crate) struct NewDnsTestRow {
    pub test_id: i32,
    pub dns1_android: Option<IpNet>,
    pub dns2_android: Option<IpNet>,
    pub ns_akamai: Option<IpNet>,
    pub ecs_akamai: Option<IpNet>,
    pub ip_akamai: Option<IpNet>,
    pub do_flag: Option<bool>,
    pub ad_flag: Option<bool>,
    pub rrsig: Option<bool>,
    pub resolver_ip_oarc: Option<IpNet>,
    pub rating_source_port: Option<&'static str>,
    pub rating_transaction_id: Option<&'static str>,
    pub std_source_port: Option<i64>,
    pub std_transaction_id: Option<i64>,
    pub bits_of_entropy_source_port: Option<f64>,
    pub bits_of_entropy_transaction_id: Option<f64>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = ndt_tests_ooni)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct NdtTestRow {
    pub id: i32,
    pub test_id: i32,
    pub report_id: String,
    pub avg_rtt: Option<f64>,
    pub download: f64,
    pub mss: Option<i32>,
    pub max_rtt: Option<f64>,
    pub min_rtt: Option<f64>,
    pub ping: Option<f64>,
    pub retransmit_rate: Option<f64>,
    pub upload: f64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = ndt_tests_ooni)]
pub(crate) struct NewNdtTestRow<'a> {
    pub test_id: i32,
    pub report_id: &'a str,
    pub avg_rtt: Option<f64>,
    pub download: f64,
    pub mss: Option<i32>,
    pub max_rtt: Option<f64>,
    pub min_rtt: Option<f64>,
    pub ping: Option<f64>,
    pub retransmit_rate: Option<f64>,
    pub upload: f64,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = web_tests_ooni)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct WebTestRow {
    pub id: i32,
    pub test_id: i32,
    pub report_id: String,
    pub url: String,
    pub resolver_asn: String,
    pub resolver_ip: IpNet,
    pub resolver_network_name: String,
    pub client_resolver: IpNet,
    pub dns_experiment_failure: Option<String>,
    pub control_failure: Option<String>,
    pub http_experiment_failure: Option<String>,
    pub dns_consistency: Option<String>,
    pub body_length_match: Option<bool>,
    pub headers_match: Option<bool>,
    pub status_code_match: Option<bool>,
    pub title_match: Option<bool>,
    pub accessible: Option<bool>,
    pub blocking: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = web_tests_ooni)]
pub(crate) struct NewWebTestRow<'a> {
    pub test_id: i32,
    pub report_id: &'a str,
    pub url: &'a str,
    pub resolver_asn: &'a str,
    pub resolver_ip: IpNet,
    pub resolver_network_name: &'a str,
    pub client_resolver: IpNet,
    pub dns_experiment_failure: Option<&'a str>,
    pub control_failure: Option<&'a str>,
    pub http_experiment_failure: Option<&'a str>,
    pub dns_consistency: Option<&'static str>,
    pub body_length_match: Option<bool>,
    pub headers_match: Option<bool>,
    pub status_code_match: Option<bool>,
    pub title_match: Option<bool>,
    pub accessible: Option<bool>,
    pub blocking: Option<&'static str>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tcp_connect_web_tests_ooni)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TcpConnectRow {
    #[expect(dead_code, reason = "selected for ordering; not exposed to the domain")]
    pub id: i32,
    #[expect(dead_code, reason = "owner is implied by the query filter")]
    pub test_id: i32,
    pub ip: Option<IpNet>,
    pub port: Option<i32>,
    pub status_blocked: Option<bool>,
    pub status_failure_string: Option<String>,
    pub status_success: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tcp_connect_web_tests_ooni)]
pub(crate) struct NewTcpConnectRow<'a> {
    pub test_id: i32,
    pub ip: Option<IpNet>,
    pub port: Option<i32>,
    pub status_blocked: Option<bool>,
    pub status_failure_string: Option<&'a str>,
    pub status_success: bool,
}

//! Conversions between Diesel rows and domain records.

use std::net::IpAddr;
use std::num::NonZeroU16;

use ipnet::IpNet;

use crate::domain::{
    Asn, AsnId, Blocking, DeviceEntry, DnsConsistency, DnsTest, MacAddress, MacMask, NdtTest,
    NetworkBlock, OarcRating, PrivateIpv4, ProtocolTest, SessionContext, TcpConnect,
    VendorRecord, WebTest,
};

use super::models::{
    AsnNetworkRow, AsnRow, DevicesTestRow, DnsTestRow, MacManufRow, NdtTestRow,
    NewDevicesTestRow, NewDnsTestRow, NewNdtTestRow, NewProtocolTestRow, NewTcpConnectRow,
    NewWebTestRow, ProtocolTestRow, TcpConnectRow, WebTestRow,
};

/// A stored value could not be turned back into a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{column}: {reason}")]
pub struct RowDecodeError {
    column: &'static str,
    reason: String,
}

impl RowDecodeError {
    fn new(column: &'static str, reason: impl ToString) -> Self {
        Self {
            column,
            reason: reason.to_string(),
        }
    }
}

fn host(ip: IpAddr) -> IpNet {
    IpNet::from(ip)
}

fn decode_label<T>(
    column: &'static str,
    label: Option<String>,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, RowDecodeError> {
    label
        .map(|raw| {
            parse(&raw)
                .ok_or_else(|| RowDecodeError::new(column, format!("unknown label {raw:?}")))
        })
        .transpose()
}

fn decode_mask(column: &'static str, mask: i32) -> Result<MacMask, RowDecodeError> {
    MacMask::new(i64::from(mask)).map_err(|err| RowDecodeError::new(column, err))
}

fn decode_u32(column: &'static str, value: Option<i64>) -> Result<Option<u32>, RowDecodeError> {
    value
        .map(|raw| u32::try_from(raw).map_err(|err| RowDecodeError::new(column, err)))
        .transpose()
}

fn encode_mask(mask: MacMask) -> i32 {
    i32::from(mask.bits())
}

// ---------------------------------------------------------------------------
// Enrichment tables
// ---------------------------------------------------------------------------

pub fn asn_from_row(row: AsnRow) -> Asn {
    Asn {
        id: AsnId::new(row.id),
        organization: row.asn_organization,
    }
}

pub fn network_block_from_row(row: AsnNetworkRow) -> NetworkBlock {
    NetworkBlock {
        id: i64::from(row.id),
        network: row.network,
        asn: AsnId::new(row.asn),
    }
}

pub fn vendor_record_from_row(row: MacManufRow) -> Result<VendorRecord, RowDecodeError> {
    Ok(VendorRecord {
        mac: MacAddress::from_octets(row.mac),
        mask: decode_mask("macs_manuf.mask", row.mask)?,
        manufacturer: row.manuf,
        comment: row.comment,
    })
}

// ---------------------------------------------------------------------------
// Sessions and sub-tests: domain to row
// ---------------------------------------------------------------------------

/// Columns of the `tests` row derived from the session context.
pub struct ContextColumns<'a> {
    pub device_android: Option<&'a str>,
    pub mac: Option<[u8; 6]>,
    pub mask: Option<i32>,
    pub place: Option<&'a str>,
    pub username: Option<&'a str>,
}

pub fn context_columns(context: &SessionContext) -> ContextColumns<'_> {
    ContextColumns {
        device_android: context.device_android.as_deref(),
        mac: context.mac.map(|mac| mac.octets()),
        mask: context.mask.map(encode_mask),
        place: context.place.as_deref(),
        username: context.username.as_deref(),
    }
}

pub fn new_protocol_row(test_id: i32, test: &ProtocolTest) -> NewProtocolTestRow<'_> {
    NewProtocolTestRow {
        test_id,
        protocol_name: &test.protocol_name,
        key_management: test.key_management.as_deref(),
        cipher: test.cipher.as_deref(),
    }
}

pub fn new_device_row(test_id: i32, device: &DeviceEntry) -> NewDevicesTestRow {
    NewDevicesTestRow {
        test_id,
        mac: device.mac.octets(),
        mask: encode_mask(device.mask),
        router: device.router,
        private_ip: host(device.private_ip.into()),
    }
}

pub fn new_dns_row(test_id: i32, test: &DnsTest) -> NewDnsTestRow {
    NewDnsTestRow {
        test_id,
        dns1_android: test.dns1_android.map(host),
        dns2_android: test.dns2_android.map(host),
        ns_akamai: test.ns_akamai.map(host),
        ecs_akamai: test.ecs_akamai.map(host),
        ip_akamai: test.ip_akamai.map(host),
        do_flag: test.do_flag,
        ad_flag: test.ad_flag,
        rrsig: test.rrsig,
        resolver_ip_oarc: test.resolver_ip_oarc.map(host),
        rating_source_port: test.rating_source_port.map(OarcRating::as_str),
        rating_transaction_id: test.rating_transaction_id.map(OarcRating::as_str),
        std_source_port: test.std_source_port.map(i64::from),
        std_transaction_id: test.std_transaction_id.map(i64::from),
        bits_of_entropy_source_port: test.bits_of_entropy_source_port,
        bits_of_entropy_transaction_id: test.bits_of_entropy_transaction_id,
    }
}

pub fn new_ndt_row(test_id: i32, test: &NdtTest) -> NewNdtTestRow<'_> {
    NewNdtTestRow {
        test_id,
        report_id: &test.report_id,
        avg_rtt: test.avg_rtt,
        download: test.download,
        mss: test.mss,
        max_rtt: test.max_rtt,
        min_rtt: test.min_rtt,
        ping: test.ping,
        retransmit_rate: test.retransmit_rate,
        upload: test.upload,
    }
}

pub fn new_web_row(test_id: i32, test: &WebTest) -> NewWebTestRow<'_> {
    NewWebTestRow {
        test_id,
        report_id: &test.report_id,
        url: &test.url,
        resolver_asn: &test.resolver_asn,
        resolver_ip: host(test.resolver_ip),
        resolver_network_name: &test.resolver_network_name,
        client_resolver: host(test.client_resolver),
        dns_experiment_failure: test.dns_experiment_failure.as_deref(),
        control_failure: test.control_failure.as_deref(),
        http_experiment_failure: test.http_experiment_failure.as_deref(),
        dns_consistency: test.dns_consistency.map(DnsConsistency::as_str),
        body_length_match: test.body_length_match,
        headers_match: test.headers_match,
        status_code_match: test.status_code_match,
        title_match: test.title_match,
        accessible: test.accessible,
        blocking: test.blocking.map(Blocking::as_str),
    }
}

pub fn new_tcp_connect_row(web_test_id: i32, entry: &TcpConnect) -> NewTcpConnectRow<'_> {
    NewTcpConnectRow {
        test_id: web_test_id,
        ip: entry.ip.map(host),
        port: entry.port.map(|port| i32::from(port.get())),
        status_blocked: entry.status_blocked,
        status_failure_string: entry.status_failure_string.as_deref(),
        status_success: entry.status_success,
    }
}

// ---------------------------------------------------------------------------
// Sub-tests: row to domain
// ---------------------------------------------------------------------------

pub fn protocol_from_row(row: ProtocolTestRow) -> ProtocolTest {
    ProtocolTest {
        protocol_name: row.protocol_name,
        key_management: row.key_management,
        cipher: row.cipher,
    }
}

pub fn device_from_row(row: DevicesTestRow) -> Result<DeviceEntry, RowDecodeError> {
    let private_ip = match row.private_ip.addr() {
        IpAddr::V4(v4) => PrivateIpv4::new(v4)
            .map_err(|err| RowDecodeError::new("devices_tests.private_ip", err))?,
        IpAddr::V6(v6) => {
            return Err(RowDecodeError::new(
                "devices_tests.private_ip",
                format!("{v6} is not IPv4"),
            ));
        }
    };
    Ok(DeviceEntry {
        mac: MacAddress::from_octets(row.mac),
        mask: decode_mask("devices_tests.mask", row.mask)?,
        router: row.router,
        private_ip,
    })
}

pub fn dns_from_row(row: DnsTestRow) -> Result<DnsTest, RowDecodeError> {
    Ok(DnsTest {
        dns1_android: row.dns1_android.map(|net| net.addr()),
        dns2_android: row.dns2_android.map(|net| net.addr()),
        ns_akamai: row.ns_akamai.map(|net| net.addr()),
        ecs_akamai: row.ecs_akamai.map(|net| net.addr()),
        ip_akamai: row.ip_akamai.map(|net| net.addr()),
        do_flag: row.do_flag,
        ad_flag: row.ad_flag,
        rrsig: row.rrsig,
        resolver_ip_oarc: row.resolver_ip_oarc.map(|net| net.addr()),
        rating_source_port: decode_label(
            "dns_tests.rating_source_port",
            row.rating_source_port,
            OarcRating::from_label,
        )?,
        rating_transaction_id: decode_label(
            "dns_tests.rating_transaction_id",
            row.rating_transaction_id,
            OarcRating::from_label,
        )?,
        std_source_port: decode_u32("dns_tests.std_source_port", row.std_source_port)?,
        std_transaction_id: decode_u32("dns_tests.std_transaction_id", row.std_transaction_id)?,
        bits_of_entropy_source_port: row.bits_of_entropy_source_port,
        bits_of_entropy_transaction_id: row.bits_of_entropy_transaction_id,
    })
}

pub fn ndt_from_row(row: NdtTestRow) -> NdtTest {
    NdtTest {
        report_id: row.report_id,
        download: row.download,
        upload: row.upload,
        avg_rtt: row.avg_rtt,
        mss: row.mss,
        max_rtt: row.max_rtt,
        min_rtt: row.min_rtt,
        ping: row.ping,
        retransmit_rate: row.retransmit_rate,
    }
}

pub fn web_from_row(row: WebTestRow) -> Result<WebTest, RowDecodeError> {
    Ok(WebTest {
        report_id: row.report_id,
        url: row.url,
        resolver_asn: row.resolver_asn,
        resolver_ip: row.resolver_ip.addr(),
        resolver_network_name: row.resolver_network_name,
        client_resolver: row.client_resolver.addr(),
        dns_experiment_failure: row.dns_experiment_failure,
        control_failure: row.control_failure,
        http_experiment_failure: row.http_experiment_failure,
        dns_consistency: decode_label(
            "web_tests_ooni.dns_consistency",
            row.dns_consistency,
            DnsConsistency::from_label,
        )?,
        body_length_match: row.body_length_match,
        headers_match: row.headers_match,
        status_code_match: row.status_code_match,
        title_match: row.title_match,
        accessible: row.accessible,
        blocking: decode_label("web_tests_ooni.blocking", row.blocking, Blocking::from_label)?,
    })
}

pub fn tcp_connect_from_row(row: TcpConnectRow) -> Result<TcpConnect, RowDecodeError> {
    let port = row
        .port
        .map(|raw| {
            u16::try_from(raw)
                .ok()
                .and_then(NonZeroU16::new)
                .ok_or_else(|| {
                    RowDecodeError::new(
                        "tcp_connect_web_tests_ooni.port",
                        format!("{raw} is not a port"),
                    )
                })
        })
        .transpose()?;
    Ok(TcpConnect {
        ip: row.ip.map(|net| net.addr()),
        port,
        status_blocked: row.status_blocked,
        status_failure_string: row.status_failure_string,
        status_success: row.status_success,
    })
}

//! Tests for the submission service.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use mockable::Clock;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::MockMeasurementRepository;
use crate::domain::{
    Asn, AsnId, DeviceEntry, DnsTest, ErrorCode, MacMask, NetworkBlock, PercentileScorer,
    RecordedSubmission, SessionContext, SessionId, SubTest, SubTestId, SubTestOwner, Submission,
    TcpConnect, VendorRecord,
};

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

fn fixture_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-04T05:06:07Z")
        .expect("RFC3339 fixture timestamp")
        .with_timezone(&Utc)
}

fn client_ip() -> IpAddr {
    "198.51.100.23".parse().expect("client ip")
}

#[fixture]
fn tables() -> Arc<EnrichmentTables> {
    Arc::new(EnrichmentTables::new(
        vec![Asn {
            id: AsnId::new(64_500),
            organization: Some("Example Transit".to_owned()),
        }],
        vec![NetworkBlock {
            id: 1,
            network: "198.51.100.0/24".parse().expect("cidr"),
            asn: AsnId::new(64_500),
        }],
        vec![VendorRecord {
            mac: "00:1A:2B:00:00:00".parse().expect("mac"),
            mask: MacMask::DEFAULT_DEVICE,
            manufacturer: Some("AcmeNet".to_owned()),
            comment: None,
        }],
        PercentileScorer::default(),
    ))
}

fn make_service(
    repo: MockMeasurementRepository,
    tables: Arc<EnrichmentTables>,
) -> SubmissionService<MockMeasurementRepository> {
    SubmissionService::new(
        Arc::new(repo),
        tables,
        Arc::new(FixtureClock {
            utc_now: fixture_timestamp(),
        }),
    )
}

fn device(mac: &str) -> DeviceEntry {
    DeviceEntry {
        mac: mac.parse().expect("mac"),
        mask: MacMask::DEFAULT_DEVICE,
        router: false,
        private_ip: "192.168.1.20".parse().expect("private ip"),
    }
}

fn devices_request() -> SubmitRequest {
    SubmitRequest {
        client_ip: client_ip(),
        submission: Submission {
            context: SessionContext::default(),
            body: SubmissionBody::Devices {
                devices: vec![device("00:1A:2B:00:00:00"), device("AA:BB:CC:DD:EE:FF")],
            },
        },
    }
}

fn recorded(session: i64) -> RecordedSubmission {
    RecordedSubmission {
        session_id: SessionId::new(session),
        sub_test_ids: vec![SubTestId::new(1), SubTestId::new(2)],
        tcp_connect_ids: Vec::new(),
    }
}

#[rstest]
#[tokio::test]
async fn submit_tags_asn_timestamp_and_vendors(tables: Arc<EnrichmentTables>) {
    let mut repo = MockMeasurementRepository::new();
    repo.expect_record_submission()
        .times(1)
        .withf(|new| {
            new.asn == Some(AsnId::new(64_500))
                && new.recorded_at == fixture_timestamp()
                && new.client_ip == client_ip()
        })
        .return_once(|_| Ok(recorded(9)));

    let response = make_service(repo, tables)
        .submit(devices_request())
        .await
        .expect("submission succeeds");

    assert_eq!(response.session_id, SessionId::new(9));
    assert_eq!(response.asn, Some(AsnId::new(64_500)));
    let vendors: Vec<_> = response
        .devices
        .iter()
        .map(|d| d.manufacturer.as_deref())
        .collect();
    assert_eq!(vendors, vec![Some("AcmeNet"), None]);
}

#[rstest]
#[tokio::test]
async fn submit_from_unannounced_address_stores_no_asn(tables: Arc<EnrichmentTables>) {
    let mut repo = MockMeasurementRepository::new();
    repo.expect_record_submission()
        .times(1)
        .withf(|new| new.asn.is_none())
        .return_once(|_| Ok(recorded(1)));

    let mut request = devices_request();
    request.client_ip = "203.0.113.1".parse().expect("ip");
    let response = make_service(repo, tables)
        .submit(request)
        .await
        .expect("submission succeeds");
    assert_eq!(response.asn, None);
}

#[rstest]
#[tokio::test]
async fn rejected_submission_never_reaches_repository(tables: Arc<EnrichmentTables>) {
    let mut repo = MockMeasurementRepository::new();
    repo.expect_record_submission().times(0);

    let request = SubmitRequest {
        client_ip: client_ip(),
        submission: Submission {
            context: SessionContext::default(),
            body: SubmissionBody::Dns {
                test: DnsTest {
                    dns1_android: Some("192.0.2.1".parse().expect("ip")),
                    do_flag: Some(true),
                    ..DnsTest::default()
                },
            },
        },
    };
    let error = make_service(repo, tables)
        .submit(request)
        .await
        .expect_err("dnssec rule fails");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(error.message(), "some dnssec values are missing");
}

#[rstest]
#[case(MeasurementRepositoryError::connection("pool exhausted"), ErrorCode::ServiceUnavailable)]
#[case(MeasurementRepositoryError::query("constraint violated"), ErrorCode::InternalError)]
#[tokio::test]
async fn submit_surfaces_repository_failures(
    tables: Arc<EnrichmentTables>,
    #[case] failure: MeasurementRepositoryError,
    #[case] expected: ErrorCode,
) {
    let mut repo = MockMeasurementRepository::new();
    repo.expect_record_submission()
        .times(1)
        .return_once(move |_| Err(failure));

    let error = make_service(repo, tables)
        .submit(devices_request())
        .await
        .expect_err("repository failure");
    assert_eq!(error.code(), expected);
}

#[rstest]
#[tokio::test]
async fn record_sub_test_maps_missing_owner_to_not_found(tables: Arc<EnrichmentTables>) {
    let owner = SubTestOwner::WebTest(SubTestId::new(77));
    let mut repo = MockMeasurementRepository::new();
    repo.expect_record_sub_test()
        .times(1)
        .return_once(move |owner, _| {
            Err(MeasurementRepositoryError::owner_not_found(owner.to_string()))
        });

    let error = make_service(repo, tables)
        .record_sub_test(RecordSubTestRequest {
            owner,
            sub_test: SubTest::TcpConnect(TcpConnect {
                ip: None,
                port: None,
                status_blocked: None,
                status_failure_string: Some("connection_refused".to_owned()),
                status_success: false,
            }),
        })
        .await
        .expect_err("owner missing");

    assert_eq!(error.code(), ErrorCode::NotFound);
    assert!(error.message().contains("web test 77"));
}

#[rstest]
#[tokio::test]
async fn record_sub_test_returns_assigned_identity(tables: Arc<EnrichmentTables>) {
    let mut repo = MockMeasurementRepository::new();
    repo.expect_record_sub_test()
        .times(1)
        .withf(|owner, sub_test| {
            *owner == SubTestOwner::Session(SessionId::new(3))
                && matches!(sub_test, SubTest::Device(_))
        })
        .return_once(|_, _| Ok(SubTestId::new(41)));

    let response = make_service(repo, tables)
        .record_sub_test(RecordSubTestRequest {
            owner: SubTestOwner::Session(SessionId::new(3)),
            sub_test: SubTest::Device(device("AA:BB:CC:DD:EE:FF")),
        })
        .await
        .expect("append succeeds");
    assert_eq!(response.sub_test_id, SubTestId::new(41));
}

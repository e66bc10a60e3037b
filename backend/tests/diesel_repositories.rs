//! Integration tests for the Diesel adapters against embedded PostgreSQL.
//!
//! Each test clones a fresh database from the schema template. Set
//! `SKIP_TEST_CLUSTER=1` where the embedded cluster cannot start.

use std::net::IpAddr;
use std::num::NonZeroU16;

use chrono::{DateTime, TimeZone, Utc};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

use wifi_advisor::domain::ports::{
    EnrichmentSource, HistoryRepository, MeasurementRepository, MeasurementRepositoryError,
};
use wifi_advisor::domain::{
    AsnId, DeviceEntry, DnsTest, MacMask, NewSubmission, ProtocolTest, SessionContext, SubTest,
    SubTestId, SubTestOwner, Submission, SubmissionBody, TcpConnect, WebTest,
};
use wifi_advisor::outbound::persistence::{
    DbPool, DieselEnrichmentSource, DieselHistoryRepository, DieselMeasurementRepository,
    PoolConfig,
};

mod support;

use support::embedded_postgres::{count_rows, execute, provision_database, shared_cluster};
use support::handle_cluster_setup_failure;

const REFERENCE_ROWS: &str = concat!(
    "INSERT INTO asns (id, asn_organization) VALUES (64496, 'Example Networks');",
    "INSERT INTO asn_networks (asn, network) VALUES (64496, '203.0.113.0/24');",
    "INSERT INTO macs_manuf (mac, mask, manuf, comment) ",
    "VALUES ('00:1a:2b:00:00:00', 24, 'Acme Radios', NULL);",
);

struct TestContext {
    runtime: Runtime,
    measurements: DieselMeasurementRepository,
    history: DieselHistoryRepository,
    enrichment: DieselEnrichmentSource,
    database_url: String,
    _database: TemporaryDatabase,
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = shared_cluster()?;
    let database = provision_database(cluster)?;
    let database_url = database.url().to_string();
    execute(database_url.as_str(), REFERENCE_ROWS)?;

    let config = PoolConfig::new(database_url.as_str())
        .with_max_size(2)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        measurements: DieselMeasurementRepository::new(pool.clone()),
        history: DieselHistoryRepository::new(pool.clone()),
        enrichment: DieselEnrichmentSource::new(pool),
        database_url,
        _database: database,
    })
}

#[fixture]
fn repo_context() -> Option<TestContext> {
    match setup_context() {
        Ok(context) => Some(context),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn client() -> IpAddr {
    "203.0.113.7".parse().expect("valid ip")
}

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_772_366_400 + seconds, 0)
        .single()
        .expect("valid timestamp")
}

fn submission(recorded_at: DateTime<Utc>, body: SubmissionBody) -> NewSubmission {
    NewSubmission {
        client_ip: client(),
        recorded_at,
        asn: Some(AsnId::new(64496)),
        submission: Submission {
            context: SessionContext::default(),
            body,
        },
    }
}

fn protocol(name: &str) -> ProtocolTest {
    ProtocolTest {
        protocol_name: name.to_owned(),
        key_management: Some("PSK".to_owned()),
        cipher: None,
    }
}

fn dns() -> SubmissionBody {
    SubmissionBody::Dns {
        test: DnsTest {
            dns1_android: Some("192.0.2.53".parse().expect("valid ip")),
            ..DnsTest::default()
        },
    }
}

fn web_test() -> WebTest {
    WebTest {
        report_id: "20260301T120000Z_web".to_owned(),
        url: "https://example.org/".to_owned(),
        resolver_asn: "AS64496".to_owned(),
        resolver_ip: "192.0.2.53".parse().expect("valid ip"),
        resolver_network_name: "Example Networks".to_owned(),
        client_resolver: "203.0.113.1".parse().expect("valid ip"),
        dns_experiment_failure: None,
        control_failure: None,
        http_experiment_failure: None,
        dns_consistency: None,
        body_length_match: Some(true),
        headers_match: Some(true),
        status_code_match: Some(true),
        title_match: Some(true),
        accessible: Some(true),
        blocking: None,
    }
}

fn tcp(port: u16) -> TcpConnect {
    TcpConnect {
        ip: Some("93.184.216.34".parse().expect("valid ip")),
        port: NonZeroU16::new(port),
        status_blocked: Some(false),
        status_failure_string: None,
        status_success: true,
    }
}

fn web(tcp_connects: Vec<TcpConnect>) -> SubmissionBody {
    SubmissionBody::Web {
        test: web_test(),
        tcp_connects,
    }
}

#[rstest]
fn reference_tables_load_from_their_rows(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: reference_tables_load_from_their_rows skipped");
        return;
    };

    let (asns, blocks, vendors) = context.runtime.block_on(async {
        (
            context.enrichment.load_asns().await.expect("asns load"),
            context.enrichment.load_network_blocks().await.expect("blocks load"),
            context.enrichment.load_vendor_records().await.expect("vendors load"),
        )
    });

    assert_eq!(asns.len(), 1);
    assert_eq!(asns[0].organization.as_deref(), Some("Example Networks"));
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].asn, AsnId::new(64496));
    assert_eq!(
        blocks[0].network,
        "203.0.113.0/24".parse::<ipnet::IpNet>().expect("valid network")
    );
    assert_eq!(vendors.len(), 1);
    assert_eq!(vendors[0].mask, MacMask::DEFAULT_DEVICE);
    assert_eq!(vendors[0].manufacturer.as_deref(), Some("Acme Radios"));
}

#[rstest]
fn web_submission_stores_every_row(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: web_submission_stores_every_row skipped");
        return;
    };

    let recorded = context
        .runtime
        .block_on(
            context
                .measurements
                .record_submission(&submission(at(0), web(vec![tcp(80), tcp(443)]))),
        )
        .expect("submission stored");

    let url = context.database_url.as_str();
    assert_eq!(count_rows(url, "tests"), Ok(1));
    assert_eq!(count_rows(url, "web_tests_ooni"), Ok(1));
    assert_eq!(count_rows(url, "tcp_connect_web_tests_ooni"), Ok(2));
    assert_eq!(recorded.tcp_connect_ids.len(), 2);

    let (web_tests, tcp_connects) = context.runtime.block_on(async {
        (
            context
                .history
                .recent_web_tests(client(), 5)
                .await
                .expect("web history"),
            context
                .history
                .tcp_connects_for(recorded.sub_test_ids[0])
                .await
                .expect("tcp connects"),
        )
    });
    assert_eq!(web_tests.len(), 1);
    assert_eq!(web_tests[0].id, recorded.sub_test_ids[0]);
    assert_eq!(web_tests[0].session_id, recorded.session_id);
    assert_eq!(web_tests[0].record, web_test());
    assert_eq!(tcp_connects, vec![tcp(80), tcp(443)]);
}

#[rstest]
fn failure_mid_batch_leaves_no_session_row(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: failure_mid_batch_leaves_no_session_row skipped");
        return;
    };
    let url = context.database_url.as_str();
    execute(url, "DROP TABLE tcp_connect_web_tests_ooni").expect("drop table");

    let err = context
        .runtime
        .block_on(
            context
                .measurements
                .record_submission(&submission(at(0), web(vec![tcp(80)]))),
        )
        .expect_err("tcp connect insert fails");

    assert!(
        matches!(err, MeasurementRepositoryError::Query { .. }),
        "expected query error, got {err:?}"
    );
    assert_eq!(count_rows(url, "tests"), Ok(0));
    assert_eq!(count_rows(url, "web_tests_ooni"), Ok(0));
}

#[rstest]
fn appending_to_a_missing_web_test_is_owner_not_found(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!(
            "SKIP-TEST-CLUSTER: appending_to_a_missing_web_test_is_owner_not_found skipped"
        );
        return;
    };

    let err = context
        .runtime
        .block_on(context.measurements.record_sub_test(
            SubTestOwner::WebTest(SubTestId::new(9_999)),
            &SubTest::TcpConnect(tcp(443)),
        ))
        .expect_err("no such web test");

    assert_eq!(
        err,
        MeasurementRepositoryError::owner_not_found("web test 9999")
    );
    assert_eq!(
        count_rows(context.database_url.as_str(), "tcp_connect_web_tests_ooni"),
        Ok(0)
    );
}

#[rstest]
fn appending_to_an_existing_session_is_visible_in_history(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!(
            "SKIP-TEST-CLUSTER: appending_to_an_existing_session_is_visible_in_history skipped"
        );
        return;
    };

    let sessions = context.runtime.block_on(async {
        let recorded = context
            .measurements
            .record_submission(&submission(at(0), SubmissionBody::Protocol {
                tests: vec![protocol("WPA2")],
            }))
            .await
            .expect("submission stored");
        context
            .measurements
            .record_sub_test(
                SubTestOwner::Session(recorded.session_id),
                &SubTest::Protocol(protocol("WPA3")),
            )
            .await
            .expect("appended");
        context
            .history
            .recent_protocol_sessions(client(), 5)
            .await
            .expect("protocol history")
    });

    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].records, vec![protocol("WPA2"), protocol("WPA3")]);
}

#[rstest]
fn grouped_history_takes_the_newest_sessions_owning_rows(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!(
            "SKIP-TEST-CLUSTER: grouped_history_takes_the_newest_sessions_owning_rows skipped"
        );
        return;
    };

    let sessions = context.runtime.block_on(async {
        for (offset, name) in [(10, "WEP"), (20, "WPA2"), (30, "WPA3")] {
            context
                .measurements
                .record_submission(&submission(at(offset), SubmissionBody::Protocol {
                    tests: vec![protocol(name), protocol("OPEN")],
                }))
                .await
                .expect("protocol stored");
        }
        context
            .measurements
            .record_submission(&submission(at(40), dns()))
            .await
            .expect("dns stored");
        context
            .history
            .recent_protocol_sessions(client(), 2)
            .await
            .expect("protocol history")
    });

    let times: Vec<DateTime<Utc>> = sessions.iter().map(|group| group.recorded_at).collect();
    assert_eq!(times, vec![at(30), at(20)]);
    assert_eq!(sessions[0].records, vec![protocol("WPA3"), protocol("OPEN")]);
    assert_eq!(sessions[1].records, vec![protocol("WPA2"), protocol("OPEN")]);
}

#[rstest]
fn device_rows_keep_their_addresses(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: device_rows_keep_their_addresses skipped");
        return;
    };
    let device = DeviceEntry {
        mac: "00:1A:2B:3C:4D:5E".parse().expect("valid mac"),
        mask: MacMask::DEFAULT_DEVICE,
        router: true,
        private_ip: "192.168.1.1".parse().expect("private ip"),
    };

    let sessions = context.runtime.block_on(async {
        context
            .measurements
            .record_submission(&submission(at(0), SubmissionBody::Devices {
                devices: vec![device],
            }))
            .await
            .expect("devices stored");
        context
            .history
            .recent_device_sessions(client(), 5)
            .await
            .expect("device history")
    });

    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].records, vec![device]);
}

#[rstest]
fn equal_timestamps_order_by_descending_session(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: equal_timestamps_order_by_descending_session skipped");
        return;
    };

    let (first, second, records, other) = context.runtime.block_on(async {
        let first = context
            .measurements
            .record_submission(&submission(at(0), dns()))
            .await
            .expect("first stored");
        let second = context
            .measurements
            .record_submission(&submission(at(0), dns()))
            .await
            .expect("second stored");
        let records = context
            .history
            .recent_dns_tests(client(), 5)
            .await
            .expect("dns history");
        let other = context
            .history
            .recent_dns_tests("198.51.100.1".parse().expect("valid ip"), 5)
            .await
            .expect("dns history");
        (first, second, records, other)
    });

    let sessions: Vec<_> = records.iter().map(|record| record.session_id).collect();
    assert_eq!(sessions, vec![second.session_id, first.session_id]);
    assert!(other.is_empty());
}

#[rstest]
fn session_time_never_precedes_an_earlier_insert(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: session_time_never_precedes_an_earlier_insert skipped");
        return;
    };

    let records = context.runtime.block_on(async {
        for offset in [120, 60] {
            context
                .measurements
                .record_submission(&submission(at(offset), dns()))
                .await
                .expect("dns stored");
        }
        context
            .history
            .recent_dns_tests(client(), 5)
            .await
            .expect("dns history")
    });

    let times: Vec<DateTime<Utc>> = records.iter().map(|record| record.recorded_at).collect();
    assert_eq!(times, vec![at(120), at(120)]);
    assert!(records[0].session_id > records[1].session_id);
}

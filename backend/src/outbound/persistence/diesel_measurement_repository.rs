//! PostgreSQL-backed writer for test sessions and their sub-tests.
//!
//! A submission is stored in one transaction: the `tests` row first, then
//! its sub-test rows, then any TCP-connect rows under the new web test.
//! Session inserts are serialised on the `tests` table so a later id never
//! carries an earlier timestamp.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::AsyncConnection as _;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use ipnet::IpNet;
use tracing::debug;

use crate::domain::ports::{MeasurementRepository, MeasurementRepositoryError};
use crate::domain::{
    NewSubmission, RecordedSubmission, SessionId, SubTest, SubTestId, SubTestOwner,
    SubmissionBody, TcpConnect,
};

use super::diesel_basic_error_mapping::{
    is_foreign_key_violation, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::NewTestRow;
use super::pool::{DbPool, PoolError};
use super::row_mapping::{
    context_columns, new_device_row, new_dns_row, new_ndt_row, new_protocol_row,
    new_tcp_connect_row, new_web_row,
};
use super::schema::{
    devices_tests, dns_tests, ndt_tests_ooni, protocol_tests, tcp_connect_web_tests_ooni,
    tests as sessions, web_tests_ooni,
};

/// Diesel-backed implementation of [`MeasurementRepository`].
#[derive(Clone)]
pub struct DieselMeasurementRepository {
    pool: DbPool,
}

impl DieselMeasurementRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> MeasurementRepositoryError {
    map_basic_pool_error(error, MeasurementRepositoryError::connection)
}

fn map_diesel_error(error: DieselError) -> MeasurementRepositoryError {
    map_basic_diesel_error(
        error,
        MeasurementRepositoryError::query,
        MeasurementRepositoryError::connection,
    )
}

fn map_append_error(error: DieselError, owner: SubTestOwner) -> MeasurementRepositoryError {
    if is_foreign_key_violation(&error) {
        MeasurementRepositoryError::owner_not_found(owner.to_string())
    } else {
        map_diesel_error(error)
    }
}

const LOCK_SESSIONS: &str = "LOCK TABLE tests IN SHARE ROW EXCLUSIVE MODE";

/// `candidate`, raised to `latest` when the clock reads earlier.
fn not_before(latest: Option<DateTime<Utc>>, candidate: DateTime<Utc>) -> DateTime<Utc> {
    latest.map_or(candidate, |latest| latest.max(candidate))
}

fn to_ids(ids: Vec<i32>) -> Vec<SubTestId> {
    ids.into_iter().map(|id| SubTestId::new(i64::from(id))).collect()
}

/// Row identities created by one submission body.
struct InsertedBody {
    sub_tests: Vec<i32>,
    tcp_connects: Vec<i32>,
}

async fn insert_tcp_connects(
    conn: &mut AsyncPgConnection,
    web_test_id: i32,
    entries: &[TcpConnect],
) -> QueryResult<Vec<i32>> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<_> = entries
        .iter()
        .map(|entry| new_tcp_connect_row(web_test_id, entry))
        .collect();
    diesel::insert_into(tcp_connect_web_tests_ooni::table)
        .values(&rows)
        .returning(tcp_connect_web_tests_ooni::id)
        .get_results(conn)
        .await
}

async fn insert_body(
    conn: &mut AsyncPgConnection,
    test_id: i32,
    body: &SubmissionBody,
) -> QueryResult<InsertedBody> {
    let sub_tests = match body {
        SubmissionBody::Protocol { tests } => {
            let rows: Vec<_> = tests.iter().map(|test| new_protocol_row(test_id, test)).collect();
            diesel::insert_into(protocol_tests::table)
                .values(&rows)
                .returning(protocol_tests::id)
                .get_results(conn)
                .await?
        }
        SubmissionBody::Devices { devices } => {
            let rows: Vec<_> = devices
                .iter()
                .map(|device| new_device_row(test_id, device))
                .collect();
            diesel::insert_into(devices_tests::table)
                .values(&rows)
                .returning(devices_tests::id)
                .get_results(conn)
                .await?
        }
        SubmissionBody::Dns { test } => {
            let id = diesel::insert_into(dns_tests::table)
                .values(&new_dns_row(test_id, test))
                .returning(dns_tests::id)
                .get_result(conn)
                .await?;
            vec![id]
        }
        SubmissionBody::Ndt { test } => {
            let id = diesel::insert_into(ndt_tests_ooni::table)
                .values(&new_ndt_row(test_id, test))
                .returning(ndt_tests_ooni::id)
                .get_result(conn)
                .await?;
            vec![id]
        }
        SubmissionBody::Web { test, tcp_connects } => {
            let web_id: i32 = diesel::insert_into(web_tests_ooni::table)
                .values(&new_web_row(test_id, test))
                .returning(web_tests_ooni::id)
                .get_result(conn)
                .await?;
            let tcp_ids = insert_tcp_connects(conn, web_id, tcp_connects).await?;
            return Ok(InsertedBody {
                sub_tests: vec![web_id],
                tcp_connects: tcp_ids,
            });
        }
    };
    Ok(InsertedBody {
        sub_tests,
        tcp_connects: Vec::new(),
    })
}

async fn insert_sub_test(
    conn: &mut AsyncPgConnection,
    owner_id: i32,
    sub_test: &SubTest,
) -> QueryResult<i32> {
    match sub_test {
        SubTest::Protocol(test) => {
            diesel::insert_into(protocol_tests::table)
                .values(&new_protocol_row(owner_id, test))
                .returning(protocol_tests::id)
                .get_result(conn)
                .await
        }
        SubTest::Device(device) => {
            diesel::insert_into(devices_tests::table)
                .values(&new_device_row(owner_id, device))
                .returning(devices_tests::id)
                .get_result(conn)
                .await
        }
        SubTest::Dns(test) => {
            diesel::insert_into(dns_tests::table)
                .values(&new_dns_row(owner_id, test))
                .returning(dns_tests::id)
                .get_result(conn)
                .await
        }
        SubTest::Ndt(test) => {
            diesel::insert_into(ndt_tests_ooni::table)
                .values(&new_ndt_row(owner_id, test))
                .returning(ndt_tests_ooni::id)
                .get_result(conn)
                .await
        }
        SubTest::Web(test) => {
            diesel::insert_into(web_tests_ooni::table)
                .values(&new_web_row(owner_id, test))
                .returning(web_tests_ooni::id)
                .get_result(conn)
                .await
        }
        SubTest::TcpConnect(entry) => {
            diesel::insert_into(tcp_connect_web_tests_ooni::table)
                .values(&new_tcp_connect_row(owner_id, entry))
                .returning(tcp_connect_web_tests_ooni::id)
                .get_result(conn)
                .await
        }
    }
}

/// Storage identity of the owner row, or `None` when it cannot exist.
fn owner_row_id(owner: SubTestOwner, sub_test: &SubTest) -> Option<i32> {
    let raw = match (owner, sub_test) {
        (SubTestOwner::WebTest(id), SubTest::TcpConnect(_)) => id.get(),
        (SubTestOwner::Session(id), sub_test) if !matches!(sub_test, SubTest::TcpConnect(_)) => {
            id.get()
        }
        _ => return None,
    };
    i32::try_from(raw).ok()
}

#[async_trait]
impl MeasurementRepository for DieselMeasurementRepository {
    async fn record_submission(
        &self,
        submission: &NewSubmission,
    ) -> Result<RecordedSubmission, MeasurementRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let context = context_columns(&submission.submission.context);
        let mut session_row = NewTestRow {
            public_ip: IpNet::from(submission.client_ip),
            timestamp: submission.recorded_at,
            asn_id: submission.asn.map(|asn| asn.get()),
            device_android: context.device_android,
            mac: context.mac,
            mask: context.mask,
            place: context.place,
            username: context.username,
        };
        let body = &submission.submission.body;

        let (session_id, inserted) = conn
            .transaction(|conn| {
                async move {
                    diesel::sql_query(LOCK_SESSIONS).execute(conn).await?;
                    let latest: Option<DateTime<Utc>> = sessions::table
                        .select(diesel::dsl::max(sessions::timestamp))
                        .get_result(conn)
                        .await?;
                    session_row.timestamp = not_before(latest, session_row.timestamp);
                    let session_id: i32 = diesel::insert_into(sessions::table)
                        .values(&session_row)
                        .returning(sessions::id)
                        .get_result(conn)
                        .await?;
                    let inserted = insert_body(conn, session_id, body).await?;
                    Ok::<_, DieselError>((session_id, inserted))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        debug!(
            session_id,
            category = %body.category(),
            sub_tests = inserted.sub_tests.len(),
            "stored submission"
        );
        Ok(RecordedSubmission {
            session_id: SessionId::new(i64::from(session_id)),
            sub_test_ids: to_ids(inserted.sub_tests),
            tcp_connect_ids: to_ids(inserted.tcp_connects),
        })
    }

    async fn record_sub_test(
        &self,
        owner: SubTestOwner,
        sub_test: &SubTest,
    ) -> Result<SubTestId, MeasurementRepositoryError> {
        let owner_id = owner_row_id(owner, sub_test)
            .ok_or_else(|| MeasurementRepositoryError::owner_not_found(owner.to_string()))?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let id = insert_sub_test(&mut conn, owner_id, sub_test)
            .await
            .map_err(|err| map_append_error(err, owner))?;
        Ok(SubTestId::new(i64::from(id)))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::{NdtTest, ProtocolTest};

    fn protocol() -> SubTest {
        SubTest::Protocol(ProtocolTest {
            protocol_name: "WPA2".to_owned(),
            key_management: None,
            cipher: None,
        })
    }

    fn tcp_connect() -> SubTest {
        SubTest::TcpConnect(TcpConnect {
            ip: None,
            port: None,
            status_blocked: None,
            status_failure_string: None,
            status_success: true,
        })
    }

    #[rstest]
    fn session_owner_accepts_session_level_sub_tests() {
        let owner = SubTestOwner::Session(SessionId::new(12));
        assert_eq!(owner_row_id(owner, &protocol()), Some(12));
    }

    #[rstest]
    fn web_test_owner_accepts_tcp_connects_only() {
        let owner = SubTestOwner::WebTest(SubTestId::new(4));
        assert_eq!(owner_row_id(owner, &tcp_connect()), Some(4));
        assert_eq!(owner_row_id(owner, &protocol()), None);
    }

    #[rstest]
    fn session_owner_rejects_tcp_connects() {
        let owner = SubTestOwner::Session(SessionId::new(4));
        assert_eq!(owner_row_id(owner, &tcp_connect()), None);
    }

    #[rstest]
    fn identities_beyond_the_column_range_cannot_exist() {
        let owner = SubTestOwner::Session(SessionId::new(i64::from(i32::MAX) + 1));
        let ndt = SubTest::Ndt(NdtTest {
            report_id: "r".to_owned(),
            download: 1.0,
            upload: 1.0,
            avg_rtt: None,
            mss: None,
            max_rtt: None,
            min_rtt: None,
            ping: None,
            retransmit_rate: None,
        });
        assert_eq!(owner_row_id(owner, &ndt), None);
    }

    #[rstest]
    #[case(None, 60, 60)]
    #[case(Some(30), 60, 60)]
    #[case(Some(120), 60, 120)]
    fn session_time_is_raised_to_the_latest_stored(
        #[case] latest: Option<i64>,
        #[case] candidate: i64,
        #[case] expected: i64,
    ) {
        let at = |seconds: i64| {
            DateTime::<Utc>::from_timestamp(seconds, 0).expect("valid timestamp")
        };
        assert_eq!(not_before(latest.map(at), at(candidate)), at(expected));
    }

    #[rstest]
    fn foreign_key_failures_name_the_owner() {
        let err = map_append_error(
            DieselError::DatabaseError(
                diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                Box::new(String::from("violates foreign key constraint")),
            ),
            SubTestOwner::WebTest(SubTestId::new(9)),
        );
        assert_eq!(err, MeasurementRepositoryError::owner_not_found("web test 9"));
    }
}

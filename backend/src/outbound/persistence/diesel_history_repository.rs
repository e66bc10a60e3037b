//! PostgreSQL-backed reads of a client's recent measurements.
//!
//! Protocol and device tests are limited per session: the newest sessions
//! for the client address that own at least one such row are selected
//! first, then their rows are loaded. DNS, NDT and web tests are limited per
//! row. Every query orders by session timestamp, then identity, descending.

use std::collections::HashMap;
use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::AsyncConnection as _;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::RunQueryDsl;
use ipnet::IpNet;

use crate::domain::ports::{
    HistoryRepository, HistoryRepositoryError, SessionRecords, StoredRecord,
};
use crate::domain::{
    DeviceEntry, DnsTest, NdtTest, ProtocolTest, SessionId, SubTestId, TcpConnect, WebTest,
};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{
    DevicesTestRow, DnsTestRow, NdtTestRow, ProtocolTestRow, TcpConnectRow, WebTestRow,
};
use super::pool::{DbPool, PoolError};
use super::row_mapping::{
    RowDecodeError, device_from_row, dns_from_row, ndt_from_row, protocol_from_row,
    tcp_connect_from_row, web_from_row,
};
use super::schema::{
    devices_tests, dns_tests, ndt_tests_ooni, protocol_tests, tcp_connect_web_tests_ooni,
    tests as sessions, web_tests_ooni,
};

/// Diesel-backed implementation of [`HistoryRepository`].
#[derive(Clone)]
pub struct DieselHistoryRepository {
    pool: DbPool,
}

impl DieselHistoryRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> HistoryRepositoryError {
    map_basic_pool_error(error, HistoryRepositoryError::connection)
}

fn map_diesel_error(error: DieselError) -> HistoryRepositoryError {
    map_basic_diesel_error(
        error,
        HistoryRepositoryError::query,
        HistoryRepositoryError::connection,
    )
}

fn map_decode_error(error: RowDecodeError) -> HistoryRepositoryError {
    HistoryRepositoryError::query(error.to_string())
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn session_id(raw: i32) -> SessionId {
    SessionId::new(i64::from(raw))
}

/// Attach rows to their sessions, keeping the session order and the row
/// order within each session.
fn group_by_session<R, T>(
    sessions: Vec<(i32, DateTime<Utc>)>,
    rows: Vec<R>,
    owner: impl Fn(&R) -> i32,
    convert: impl Fn(R) -> Result<T, RowDecodeError>,
) -> Result<Vec<SessionRecords<T>>, RowDecodeError> {
    let mut by_session: HashMap<i32, Vec<T>> = HashMap::new();
    for row in rows {
        let key = owner(&row);
        by_session.entry(key).or_default().push(convert(row)?);
    }
    Ok(sessions
        .into_iter()
        .map(|(id, recorded_at)| SessionRecords {
            session_id: session_id(id),
            recorded_at,
            records: by_session.remove(&id).unwrap_or_default(),
        })
        .collect())
}

fn stored<R, T>(
    rows: Vec<(R, DateTime<Utc>)>,
    ids: impl Fn(&R) -> (i32, i32),
    convert: impl Fn(R) -> Result<T, RowDecodeError>,
) -> Result<Vec<StoredRecord<T>>, RowDecodeError> {
    rows.into_iter()
        .map(|(row, recorded_at)| {
            let (id, test_id) = ids(&row);
            Ok(StoredRecord {
                id: SubTestId::new(i64::from(id)),
                session_id: session_id(test_id),
                recorded_at,
                record: convert(row)?,
            })
        })
        .collect()
}

/// Newest sessions of `$client` owning rows in `$table`, then those rows.
macro_rules! recent_sessions {
    ($self:ident, $client:expr, $limit:expr, $table:ident, $row:ty, $convert:expr) => {{
        let public_ip = IpNet::from($client);
        let limit = sql_limit($limit);
        let mut conn = $self.pool.get().await.map_err(map_pool_error)?;
        let (newest, rows) = conn
            .transaction(|conn| {
                async move {
                    let newest: Vec<(i32, DateTime<Utc>)> = sessions::table
                        .filter(sessions::public_ip.eq(public_ip))
                        .filter(exists($table::table.filter($table::test_id.eq(sessions::id))))
                        .select((sessions::id, sessions::timestamp))
                        .order_by((sessions::timestamp.desc(), sessions::id.desc()))
                        .limit(limit)
                        .load(conn)
                        .await?;
                    let ids: Vec<i32> = newest.iter().map(|(id, _)| *id).collect();
                    let rows: Vec<$row> = $table::table
                        .filter($table::test_id.eq_any(ids))
                        .select(<$row>::as_select())
                        .order_by($table::id)
                        .load(conn)
                        .await?;
                    Ok::<_, DieselError>((newest, rows))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        group_by_session(newest, rows, |row: &$row| row.test_id, $convert)
            .map_err(map_decode_error)
    }};
}

/// Newest rows of `$table` owned by sessions of `$client`.
macro_rules! recent_records {
    ($self:ident, $client:expr, $limit:expr, $table:ident, $row:ty, $convert:expr) => {{
        let public_ip = IpNet::from($client);
        let mut conn = $self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<($row, DateTime<Utc>)> = $table::table
            .inner_join(sessions::table)
            .filter(sessions::public_ip.eq(public_ip))
            .order_by((
                sessions::timestamp.desc(),
                sessions::id.desc(),
                $table::id.desc(),
            ))
            .select((<$row>::as_select(), sessions::timestamp))
            .limit(sql_limit($limit))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        stored(rows, |row: &$row| (row.id, row.test_id), $convert).map_err(map_decode_error)
    }};
}

#[async_trait]
impl HistoryRepository for DieselHistoryRepository {
    async fn recent_protocol_sessions(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<SessionRecords<ProtocolTest>>, HistoryRepositoryError> {
        recent_sessions!(self, client_ip, limit, protocol_tests, ProtocolTestRow, |row| Ok(
            protocol_from_row(row)
        ))
    }

    async fn recent_device_sessions(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<SessionRecords<DeviceEntry>>, HistoryRepositoryError> {
        recent_sessions!(self, client_ip, limit, devices_tests, DevicesTestRow, device_from_row)
    }

    async fn recent_dns_tests(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<StoredRecord<DnsTest>>, HistoryRepositoryError> {
        recent_records!(self, client_ip, limit, dns_tests, DnsTestRow, dns_from_row)
    }

    async fn recent_ndt_tests(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<StoredRecord<NdtTest>>, HistoryRepositoryError> {
        recent_records!(self, client_ip, limit, ndt_tests_ooni, NdtTestRow, |row| Ok(
            ndt_from_row(row)
        ))
    }

    async fn recent_web_tests(
        &self,
        client_ip: IpAddr,
        limit: usize,
    ) -> Result<Vec<StoredRecord<WebTest>>, HistoryRepositoryError> {
        recent_records!(self, client_ip, limit, web_tests_ooni, WebTestRow, web_from_row)
    }

    async fn tcp_connects_for(
        &self,
        web_test: SubTestId,
    ) -> Result<Vec<TcpConnect>, HistoryRepositoryError> {
        let Ok(web_test_id) = i32::try_from(web_test.get()) else {
            return Ok(Vec::new());
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<TcpConnectRow> = tcp_connect_web_tests_ooni::table
            .filter(tcp_connect_web_tests_ooni::test_id.eq(web_test_id))
            .select(TcpConnectRow::as_select())
            .order_by(tcp_connect_web_tests_ooni::id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(tcp_connect_from_row)
            .collect::<Result<_, _>>()
            .map_err(map_decode_error)
    }
}

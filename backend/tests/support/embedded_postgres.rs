//! Embedded PostgreSQL databases carrying the measurement schema.
//!
//! The schema is applied once to a template database named after a hash of
//! `fixtures/schema.sql`; each test clones its own database from that
//! template.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use postgres::{Client, NoTls};

use super::format_postgres_error;

const SCHEMA_SQL: &str = include_str!("../fixtures/schema.sql");
const TEMPLATE_NAME_PREFIX: &str = "wifi_advisor_template";
const PROVISION_RETRIES: usize = 5;
const PROVISION_RETRY_DELAY: Duration = Duration::from_millis(500);

static TEMPLATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
static DATABASE_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn template_database_name() -> String {
    let mut hasher = DefaultHasher::new();
    SCHEMA_SQL.hash(&mut hasher);
    format!("{TEMPLATE_NAME_PREFIX}_{:016x}", hasher.finish())
}

fn new_database_name() -> String {
    let sequence = DATABASE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("wifi_advisor_test_{}_{sequence}", std::process::id())
}

/// Process-wide embedded cluster.
pub fn shared_cluster() -> Result<&'static ClusterHandle, String> {
    pg_embedded_setup_unpriv::test_support::shared_cluster_handle()
        .map_err(|err| err.to_string())
}

fn connect(url: &str) -> Result<Client, String> {
    Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))
}

/// Run `sql` as one batch against `url`.
pub fn execute(url: &str, sql: &str) -> Result<(), String> {
    connect(url)?
        .batch_execute(sql)
        .map_err(|err| format_postgres_error(&err))
}

/// Number of rows currently in `table`.
pub fn count_rows(url: &str, table: &str) -> Result<i64, String> {
    let escaped = table.replace('"', "\"\"");
    let row = connect(url)?
        .query_one(format!(r#"SELECT count(*) FROM "{escaped}""#).as_str(), &[])
        .map_err(|err| format_postgres_error(&err))?;
    Ok(row.get(0))
}

fn ensure_template_database(cluster: &ClusterHandle) -> Result<String, String> {
    let template_name = template_database_name();
    let _lock = TEMPLATE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());

    let exists = cluster
        .database_exists(template_name.as_str())
        .map_err(|err| format!("template check: {err:?}"))?;
    if !exists {
        cluster
            .create_database(template_name.as_str())
            .map_err(|err| format!("create template: {err:?}"))?;
        let url = cluster.connection().database_url(&template_name);
        execute(url.as_str(), SCHEMA_SQL)?;
    }
    Ok(template_name)
}

/// Clone a fresh database from the schema template.
pub fn provision_database(cluster: &ClusterHandle) -> Result<TemporaryDatabase, String> {
    let mut last_error = String::from("create database from template: no attempt made");
    for attempt in 1..=PROVISION_RETRIES {
        let provisioned = ensure_template_database(cluster).and_then(|template_name| {
            cluster
                .temporary_database_from_template(
                    new_database_name().as_str(),
                    template_name.as_str(),
                )
                .map_err(|err| format!("create database from template: {err:?}"))
        });
        match provisioned {
            Ok(database) => return Ok(database),
            Err(error) => last_error = format!("attempt {attempt}/{PROVISION_RETRIES}: {error}"),
        }
        if attempt < PROVISION_RETRIES {
            std::thread::sleep(PROVISION_RETRY_DELAY);
        }
    }
    Err(last_error)
}

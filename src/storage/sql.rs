//! SQLite-backed certificate record store.
//!
//! Each [`CertRecordStoreConnection`] owns one pooled connection; closing it
//! hands the connection back to the pool.

use super::{CertRecordStore, CertRecordStoreConnection, DbPool};
use crate::domain::X509CertRecord;
use crate::errors::{InstanceError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{FromRow, Sqlite, SqliteConnection};
use tracing::instrument;

/// Parse a timestamp string that may be in RFC 3339 format (from application)
/// or SQLite datetime format (from manual edits or `datetime('now')`).
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    Err(InstanceError::validation(format!("Invalid timestamp format: {}", s)))
}

#[derive(Debug, Clone, FromRow)]
struct CertRecordRow {
    provider: String,
    instance_id: String,
    service: String,
    current_serial: String,
    current_issued_at: String,
    current_ip: String,
    prev_serial: String,
    prev_issued_at: String,
    prev_ip: String,
    client_cert: bool,
    expiry_time: Option<String>,
    hostname: Option<String>,
}

impl TryFrom<CertRecordRow> for X509CertRecord {
    type Error = InstanceError;

    fn try_from(row: CertRecordRow) -> Result<Self> {
        Ok(X509CertRecord {
            current_time: parse_timestamp(&row.current_issued_at)?,
            prev_time: parse_timestamp(&row.prev_issued_at)?,
            expiry_time: row.expiry_time.as_deref().map(parse_timestamp).transpose()?,
            provider: row.provider,
            instance_id: row.instance_id,
            service: row.service,
            current_serial: row.current_serial,
            current_ip: row.current_ip,
            prev_serial: row.prev_serial,
            prev_ip: row.prev_ip,
            client_cert: row.client_cert,
            hostname: row.hostname,
        })
    }
}

/// SQL record store over a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqlCertRecordStore {
    pool: DbPool,
}

impl SqlCertRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl CertRecordStore for SqlCertRecordStore {
    async fn get_connection(&self) -> Result<Option<Box<dyn CertRecordStoreConnection>>> {
        match self.pool.acquire().await {
            Ok(conn) => Ok(Some(Box::new(SqlCertRecordConnection { conn: Some(conn) }))),
            Err(e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed)) => {
                tracing::warn!(error = %e, "No database connection available for certificate records");
                Ok(None)
            }
            Err(e) => Err(InstanceError::database(e, "Failed to acquire database connection")),
        }
    }

    fn store_type(&self) -> &'static str {
        "sql"
    }
}

struct SqlCertRecordConnection {
    conn: Option<PoolConnection<Sqlite>>,
}

impl SqlCertRecordConnection {
    fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| InstanceError::store("Database connection already closed"))
    }
}

#[async_trait]
impl CertRecordStoreConnection for SqlCertRecordConnection {
    #[instrument(skip(self), name = "db_get_cert_record")]
    async fn get_x509_cert_record(
        &mut self,
        provider: &str,
        instance_id: &str,
    ) -> Result<Option<X509CertRecord>> {
        let row = sqlx::query_as::<_, CertRecordRow>(
            "SELECT * FROM certificates WHERE provider = ? AND instance_id = ?",
        )
        .bind(provider)
        .bind(instance_id)
        .fetch_optional(self.conn()?)
        .await
        .map_err(|e| {
            InstanceError::database(
                e,
                format!("Failed to fetch certificate record: {}/{}", provider, instance_id),
            )
        })?;

        row.map(X509CertRecord::try_from).transpose()
    }

    #[instrument(skip(self, record), fields(provider = %record.provider, instance_id = %record.instance_id), name = "db_insert_cert_record")]
    async fn insert_x509_cert_record(&mut self, record: &X509CertRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO certificates (
                provider, instance_id, service,
                current_serial, current_issued_at, current_ip,
                prev_serial, prev_issued_at, prev_ip,
                client_cert, expiry_time, hostname
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.provider)
        .bind(&record.instance_id)
        .bind(&record.service)
        .bind(&record.current_serial)
        .bind(record.current_time.to_rfc3339())
        .bind(&record.current_ip)
        .bind(&record.prev_serial)
        .bind(record.prev_time.to_rfc3339())
        .bind(&record.prev_ip)
        .bind(record.client_cert)
        .bind(record.expiry_time.map(|t| t.to_rfc3339()))
        .bind(&record.hostname)
        .execute(self.conn()?)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() == 1),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                tracing::debug!("Certificate record already exists");
                Ok(false)
            }
            Err(e) => Err(InstanceError::database(
                e,
                format!(
                    "Failed to insert certificate record: {}/{}",
                    record.provider, record.instance_id
                ),
            )),
        }
    }

    #[instrument(skip(self, record), fields(provider = %record.provider, instance_id = %record.instance_id), name = "db_update_cert_record")]
    async fn update_x509_cert_record(&mut self, record: &X509CertRecord) -> Result<bool> {
        let done = sqlx::query(
            r#"
            UPDATE certificates SET
                service = ?,
                current_serial = ?, current_issued_at = ?, current_ip = ?,
                prev_serial = ?, prev_issued_at = ?, prev_ip = ?,
                client_cert = ?, expiry_time = ?, hostname = ?
            WHERE provider = ? AND instance_id = ?
            "#,
        )
        .bind(&record.service)
        .bind(&record.current_serial)
        .bind(record.current_time.to_rfc3339())
        .bind(&record.current_ip)
        .bind(&record.prev_serial)
        .bind(record.prev_time.to_rfc3339())
        .bind(&record.prev_ip)
        .bind(record.client_cert)
        .bind(record.expiry_time.map(|t| t.to_rfc3339()))
        .bind(&record.hostname)
        .bind(&record.provider)
        .bind(&record.instance_id)
        .execute(self.conn()?)
        .await
        .map_err(|e| {
            InstanceError::database(
                e,
                format!(
                    "Failed to update certificate record: {}/{}",
                    record.provider, record.instance_id
                ),
            )
        })?;

        Ok(done.rows_affected() > 0)
    }

    #[instrument(skip(self), name = "db_delete_cert_record")]
    async fn delete_x509_cert_record(
        &mut self,
        provider: &str,
        instance_id: &str,
    ) -> Result<bool> {
        let done = sqlx::query("DELETE FROM certificates WHERE provider = ? AND instance_id = ?")
            .bind(provider)
            .bind(instance_id)
            .execute(self.conn()?)
            .await
            .map_err(|e| {
                InstanceError::database(
                    e,
                    format!("Failed to delete certificate record: {}/{}", provider, instance_id),
                )
            })?;

        Ok(done.rows_affected() > 0)
    }

    fn close(&mut self) {
        self.conn.take();
    }
}

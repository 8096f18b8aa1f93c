// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed persistence implementation.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use uuid::Uuid;

use crate::error::{Result, ServiceError};
use crate::migrations;
use crate::model::{Drd, DrdChanges, DrdFilter, NewDrd};

use super::DrdStore;

const DRD_COLUMNS: &str = "id, name, status, kind, leviathan_uuid, leviathan_url, old_status, \
     size, location, location_detail, destroyed_status, repair_history_url, created_at, updated_at";

/// Row shape as stored; identifiers are kept as text so hand-written
/// initializer scripts can insert rows.
#[derive(Debug, sqlx::FromRow)]
struct DrdRow {
    id: String,
    name: String,
    status: Option<String>,
    kind: Option<String>,
    leviathan_uuid: Option<String>,
    leviathan_url: Option<String>,
    old_status: Option<String>,
    size: Option<String>,
    location: Option<String>,
    location_detail: Option<String>,
    destroyed_status: bool,
    repair_history_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DrdRow> for Drd {
    type Error = ServiceError;

    fn try_from(row: DrdRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id).map_err(|e| ServiceError::Database {
            operation: "decode".to_string(),
            details: format!("invalid id {:?}: {}", row.id, e),
        })?;
        // Tolerate junk in the linkage column rather than failing the whole read.
        let leviathan_uuid = row
            .leviathan_uuid
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw).ok());

        Ok(Drd {
            id,
            name: row.name,
            status: row.status,
            kind: row.kind,
            leviathan_uuid,
            leviathan_url: row.leviathan_url,
            old_status: row.old_status,
            size: row.size,
            location: row.location,
            location_detail: row.location_detail,
            destroyed_status: row.destroyed_status,
            repair_history_url: row.repair_history_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// SQLite-backed DRD store.
#[derive(Clone)]
pub struct SqliteDrdStore {
    pool: SqlitePool,
}

impl SqliteDrdStore {
    /// Create a new store from an existing, migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url`, creating the database file if it doesn't
    /// exist, and run all migrations.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = SqliteDrdStore::connect("sqlite:.data/drds.db").await?;
    /// ```
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| ServiceError::Database {
                operation: "connect".to_string(),
                details: format!("Invalid SQLite URL {:?}: {}", database_url, e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| ServiceError::Database {
                operation: "connect".to_string(),
                details: format!("Failed to connect to SQLite at {:?}: {}", database_url, e),
            })?;

        migrations::run_sqlite(&pool).await?;

        Ok(Self { pool })
    }

    /// Private in-memory database, used by tests and throwaway runs.
    ///
    /// Limited to one connection: every SQLite memory connection is its own
    /// database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        migrations::run_sqlite(&pool).await?;

        Ok(Self { pool })
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl DrdStore for SqliteDrdStore {
    async fn list(&self, filter: &DrdFilter) -> Result<Vec<Drd>> {
        let rows = match filter.status.as_deref() {
            Some(status) => {
                sqlx::query_as::<_, DrdRow>(&format!(
                    "SELECT {DRD_COLUMNS} FROM drds WHERE status = ? ORDER BY created_at, id"
                ))
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DrdRow>(&format!(
                    "SELECT {DRD_COLUMNS} FROM drds ORDER BY created_at, id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(Drd::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Drd>> {
        let row = sqlx::query_as::<_, DrdRow>(&format!(
            "SELECT {DRD_COLUMNS} FROM drds WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Drd::try_from).transpose()
    }

    async fn create(&self, new: &NewDrd) -> Result<Drd> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, DrdRow>(&format!(
            r#"
            INSERT INTO drds (id, name, status, kind, leviathan_uuid, leviathan_url,
                              destroyed_status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
            RETURNING {DRD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&new.name)
        .bind(&new.status)
        .bind(&new.kind)
        .bind(new.leviathan_uuid.map(|u| u.to_string()))
        .bind(&new.leviathan_url)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Drd::try_from(row)
    }

    async fn update(&self, id: Uuid, changes: &DrdChanges) -> Result<Option<Drd>> {
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE drds SET updated_at = ");
        query.push_bind(Utc::now());
        if let Some(name) = &changes.name {
            query.push(", name = ").push_bind(name.clone());
        }
        set_column(&mut query, "status", &changes.status);
        set_column(&mut query, "kind", &changes.kind);
        set_column(
            &mut query,
            "leviathan_uuid",
            &changes.leviathan_uuid.map(|uuid| uuid.map(|u| u.to_string())),
        );
        set_column(&mut query, "leviathan_url", &changes.leviathan_url);
        set_column(&mut query, "old_status", &changes.old_status);
        set_column(&mut query, "size", &changes.size);
        set_column(&mut query, "location", &changes.location);
        set_column(&mut query, "location_detail", &changes.location_detail);
        if let Some(destroyed) = changes.destroyed_status {
            query.push(", destroyed_status = ").push_bind(destroyed);
        }
        set_column(&mut query, "repair_history_url", &changes.repair_history_url);
        query.push(" WHERE id = ").push_bind(id.to_string());
        query.push(format!(" RETURNING {DRD_COLUMNS}"));

        let row = query
            .build_query_as::<DrdRow>()
            .fetch_optional(&self.pool)
            .await?;

        row.map(Drd::try_from).transpose()
    }

    async fn set_status(&self, id: Uuid, status: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE drds
            SET status = ?1, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(status)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM drds WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM drds").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<bool> {
        let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(row.0 == 1)
    }
}

/// Append `, column = ?` for a supplied change. `Some(None)` binds NULL.
fn set_column(query: &mut QueryBuilder<'_, Sqlite>, column: &str, value: &Option<Option<String>>) {
    if let Some(value) = value {
        query.push(", ").push(column).push(" = ").push_bind(value.clone());
    }
}

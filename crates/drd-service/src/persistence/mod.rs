// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Persistence interfaces and backends for drd-service.
//!
//! Handlers only see [`DrdStore`]; every method is a single statement so a
//! failed call leaves stored state untouched.

pub mod sqlite;

pub use self::sqlite::SqliteDrdStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{Drd, DrdChanges, DrdFilter, NewDrd};

/// Datastore interface used by the resource handlers.
#[async_trait]
pub trait DrdStore: Send + Sync {
    /// All DRDs matching `filter`, oldest first.
    async fn list(&self, filter: &DrdFilter) -> Result<Vec<Drd>>;

    async fn get(&self, id: Uuid) -> Result<Option<Drd>>;

    /// Insert a DRD with a fresh identifier and timestamps.
    async fn create(&self, new: &NewDrd) -> Result<Drd>;

    /// Apply `changes`; `None` when no DRD has this id.
    async fn update(&self, id: Uuid, changes: &DrdChanges) -> Result<Option<Drd>>;

    /// Overwrite only `status`. Returns false when no DRD has this id.
    async fn set_status(&self, id: Uuid, status: &str) -> Result<bool>;

    /// Remove a DRD. Returns false when no DRD has this id.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Remove every DRD, returning how many were removed.
    async fn delete_all(&self) -> Result<u64>;

    async fn health_check(&self) -> Result<bool>;
}

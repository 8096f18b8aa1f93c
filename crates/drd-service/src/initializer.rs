// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Startup SQL scripts from `INITIALIZER_DIRECTORY`.
//!
//! Every `*.sql` file is executed once per startup, in lexical file-name
//! order, as a single raw batch. Scripts run after migrations, so they can
//! rely on the `drds` table existing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Execute every script in `dir`, returning how many ran.
pub async fn run_directory(pool: &SqlitePool, dir: &Path) -> Result<usize> {
    let scripts = list_scripts(dir).await?;

    for script in &scripts {
        let sql = tokio::fs::read_to_string(script)
            .await
            .with_context(|| format!("failed to read initializer {}", script.display()))?;
        sqlx::raw_sql(&sql)
            .execute(pool)
            .await
            .with_context(|| format!("initializer {} failed", script.display()))?;
        debug!(script = %script.display(), "Initializer executed");
    }

    info!(dir = %dir.display(), count = scripts.len(), "Initializers complete");
    Ok(scripts.len())
}

async fn list_scripts(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("initializer directory {} is not readable", dir.display()))?;

    let mut scripts = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "sql") && entry.file_type().await?.is_file() {
            scripts.push(path);
        }
    }
    scripts.sort();
    Ok(scripts)
}

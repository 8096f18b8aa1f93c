// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fixed seed data written by `drd-service reseed`.

use tracing::info;

use crate::error::Result;
use crate::model::{Drd, NewDrd, STATUS_ACTIVATED, STATUS_DEACTIVATED};
use crate::persistence::DrdStore;

/// `(name, status, kind)` of every seeded DRD.
const SEED_DRDS: &[(&str, &str, &str)] = &[
    ("Pike", STATUS_ACTIVATED, "standard"),
    ("Nautilus", STATUS_ACTIVATED, "sentinel"),
    ("Stingray", STATUS_DEACTIVATED, "standard"),
    ("Kraken", STATUS_DEACTIVATED, "sentinel"),
];

/// The DRDs a reseeded datastore contains.
pub fn seed_drds() -> Vec<NewDrd> {
    SEED_DRDS
        .iter()
        .map(|(name, status, kind)| NewDrd {
            status: Some(status.to_string()),
            kind: Some(kind.to_string()),
            ..NewDrd::named(*name)
        })
        .collect()
}

/// Remove every DRD and insert the seed set.
pub async fn reseed(store: &dyn DrdStore) -> Result<Vec<Drd>> {
    let removed = store.delete_all().await?;

    let mut created = Vec::with_capacity(SEED_DRDS.len());
    for new in seed_drds() {
        created.push(store.create(&new).await?);
    }

    info!(removed, seeded = created.len(), "Datastore reseeded");
    Ok(created)
}

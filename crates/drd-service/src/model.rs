// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! DRD entity and the payloads that create or change it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{Result, ServiceError};

/// Status written by the activate transition.
pub const STATUS_ACTIVATED: &str = "activated";
/// Status written by the deactivate transition.
pub const STATUS_DEACTIVATED: &str = "deactivated";

/// A persisted DRD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drd {
    /// Server-assigned identifier, immutable after creation.
    pub id: Uuid,
    pub name: String,
    /// Free-form; `activated`/`deactivated` drive hypermedia state.
    pub status: Option<String>,
    pub kind: Option<String>,
    pub leviathan_uuid: Option<Uuid>,
    pub leviathan_url: Option<String>,
    pub old_status: Option<String>,
    pub size: Option<String>,
    pub location: Option<String>,
    pub location_detail: Option<String>,
    pub destroyed_status: bool,
    pub repair_history_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller may supply when creating a DRD.
///
/// Anything else in the `drd` object is dropped during deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrdAttributes {
    pub name: Option<String>,
    pub status: Option<String>,
    pub kind: Option<String>,
    pub leviathan_uuid: Option<String>,
    pub leviathan_url: Option<String>,
}

/// Fields a caller may change on an existing DRD.
///
/// The outer `Option` is whether the field was sent at all; absent fields
/// are left alone and an explicit `null` clears the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrdChangeRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub kind: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub leviathan_uuid: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub leviathan_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub old_status: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub size: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub location_detail: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub destroyed_status: Option<Option<bool>>,
    #[serde(default, deserialize_with = "nullable")]
    pub repair_history_url: Option<Option<String>>,
}

/// Keep `null` apart from a missing key: only called when the key is present.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Validated input for inserting a DRD.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDrd {
    pub name: String,
    pub status: Option<String>,
    pub kind: Option<String>,
    pub leviathan_uuid: Option<Uuid>,
    pub leviathan_url: Option<String>,
}

/// Validated partial update. `None` leaves a column alone, `Some(None)`
/// writes NULL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrdChanges {
    pub name: Option<String>,
    pub status: Option<Option<String>>,
    pub kind: Option<Option<String>>,
    pub leviathan_uuid: Option<Option<Uuid>>,
    pub leviathan_url: Option<Option<String>>,
    pub old_status: Option<Option<String>>,
    pub size: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub location_detail: Option<Option<String>>,
    pub destroyed_status: Option<bool>,
    pub repair_history_url: Option<Option<String>>,
}

/// Filter for listing DRDs.
#[derive(Debug, Clone, Default)]
pub struct DrdFilter {
    /// Exact status match.
    pub status: Option<String>,
}

impl NewDrd {
    /// Create a minimal DRD input with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: None,
            kind: None,
            leviathan_uuid: None,
            leviathan_url: None,
        }
    }
}

impl TryFrom<DrdAttributes> for NewDrd {
    type Error = ServiceError;

    fn try_from(attrs: DrdAttributes) -> Result<Self> {
        let name = match attrs.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(ServiceError::validation("name", "can't be blank")),
        };

        Ok(Self {
            name,
            status: attrs.status,
            kind: attrs.kind,
            leviathan_uuid: attrs
                .leviathan_uuid
                .map(|raw| parse_uuid("leviathan_uuid", &raw))
                .transpose()?
                .flatten(),
            leviathan_url: attrs
                .leviathan_url
                .map(|raw| check_url("leviathan_url", raw))
                .transpose()?,
        })
    }
}

impl TryFrom<DrdChangeRequest> for DrdChanges {
    type Error = ServiceError;

    fn try_from(req: DrdChangeRequest) -> Result<Self> {
        let name = match req.name {
            None => None,
            Some(Some(name)) if !name.trim().is_empty() => Some(name),
            Some(_) => return Err(ServiceError::validation("name", "can't be blank")),
        };
        let destroyed_status = match req.destroyed_status {
            None => None,
            Some(Some(flag)) => Some(flag),
            Some(None) => {
                return Err(ServiceError::validation("destroyed_status", "can't be null"));
            }
        };

        Ok(Self {
            name,
            status: req.status,
            kind: req.kind,
            leviathan_uuid: map_present(req.leviathan_uuid, |raw| {
                parse_uuid("leviathan_uuid", &raw)
            })?
            .map(Option::flatten),
            leviathan_url: map_present(req.leviathan_url, |raw| check_url("leviathan_url", raw))?,
            old_status: req.old_status,
            size: req.size,
            location: req.location,
            location_detail: req.location_detail,
            destroyed_status,
            repair_history_url: map_present(req.repair_history_url, |raw| {
                check_url("repair_history_url", raw)
            })?,
        })
    }
}

/// Parse a caller-supplied identifier. Unparseable identifiers cannot name
/// an existing DRD, so they surface as NotFound.
pub fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ServiceError::not_found(raw))
}

/// Validate a sent, non-null value; absent and null pass through.
fn map_present<T, U>(
    value: Option<Option<T>>,
    check: impl FnOnce(T) -> Result<U>,
) -> Result<Option<Option<U>>> {
    match value {
        Some(Some(inner)) => check(inner).map(|checked| Some(Some(checked))),
        Some(None) => Ok(Some(None)),
        None => Ok(None),
    }
}

/// A blank UUID has no typed value to store, so it reads as NULL.
fn parse_uuid(field: &str, raw: &str) -> Result<Option<Uuid>> {
    match raw.trim() {
        "" => Ok(None),
        value => Uuid::parse_str(value)
            .map(Some)
            .map_err(|_| ServiceError::validation(field, "is not a valid UUID")),
    }
}

/// Blank URLs are stored as sent, like any other blank string.
fn check_url(field: &str, raw: String) -> Result<String> {
    if raw.trim().is_empty() {
        return Ok(raw);
    }
    url::Url::parse(raw.trim())
        .map(|_| raw.trim().to_string())
        .map_err(|_| ServiceError::validation(field, "is not an absolute URL"))
}

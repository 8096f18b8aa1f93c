// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Hypermedia states and the transitions advertised from each.
//!
//! A gated transition is advertised when the caller's condition set contains
//! at least one of its conditions. Visibility depends on nothing else.

use std::collections::BTreeSet;

use crate::model::{Drd, STATUS_ACTIVATED, STATUS_DEACTIVATED};

/// Unlocks every gated transition.
pub const CAN_DO_ANYTHING: &str = "can_do_anything";

/// Hypermedia state of a rendered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Collection,
    Activated,
    Deactivated,
    /// Item whose status is neither activated nor deactivated.
    Unknown,
}

const ITEM_STATES: &[ResourceState] = &[
    ResourceState::Activated,
    ResourceState::Deactivated,
    ResourceState::Unknown,
];

impl ResourceState {
    /// State derived from a DRD's status.
    pub fn of(drd: &Drd) -> Self {
        match drd.status.as_deref() {
            Some(STATUS_ACTIVATED) => Self::Activated,
            Some(STATUS_DEACTIVATED) => Self::Deactivated,
            _ => Self::Unknown,
        }
    }

    /// Parse an explicit item state override.
    pub fn parse_item(raw: &str) -> Option<Self> {
        match raw.trim() {
            "activated" => Some(Self::Activated),
            "deactivated" => Some(Self::Deactivated),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Activated => "activated",
            Self::Deactivated => "deactivated",
            Self::Unknown => "unknown",
        }
    }
}

/// HTTP method of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// Where a transition points, relative to the deployment base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// `/drds`
    Collection,
    /// `/drds{?status}`
    Search,
    /// `/drds/{id}`
    Item,
    /// `/drds/{id}/{action}`
    ItemAction(&'static str),
}

/// Input field descriptor advertised on `create`/`update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    /// HALE input type (`text`, `url`, `boolean`).
    pub input: &'static str,
    pub required: bool,
}

const fn text(name: &'static str) -> Field {
    Field {
        name,
        input: "text",
        required: false,
    }
}

const fn url(name: &'static str) -> Field {
    Field {
        name,
        input: "url",
        required: false,
    }
}

const CREATE_FIELDS: &[Field] = &[
    Field {
        name: "name",
        input: "text",
        required: true,
    },
    text("status"),
    text("kind"),
    text("leviathan_uuid"),
    url("leviathan_url"),
];

const UPDATE_FIELDS: &[Field] = &[
    text("name"),
    text("status"),
    text("kind"),
    text("leviathan_uuid"),
    url("leviathan_url"),
    text("old_status"),
    text("size"),
    text("location"),
    text("location_detail"),
    Field {
        name: "destroyed_status",
        input: "boolean",
        required: false,
    },
    url("repair_history_url"),
];

/// A link relation a resource may advertise.
#[derive(Debug)]
pub struct Transition {
    pub rel: &'static str,
    pub method: Method,
    pub target: Target,
    /// Any one of these unlocks the transition; empty means always shown.
    pub conditions: &'static [&'static str],
    pub states: &'static [ResourceState],
    pub fields: &'static [Field],
}

impl Transition {
    pub fn is_available(&self, conditions: &BTreeSet<String>) -> bool {
        self.conditions.is_empty() || self.conditions.iter().any(|c| conditions.contains(*c))
    }
}

/// Every transition of the DRD resource.
pub static TRANSITIONS: &[Transition] = &[
    Transition {
        rel: "self",
        method: Method::Get,
        target: Target::Collection,
        conditions: &[],
        states: &[ResourceState::Collection],
        fields: &[],
    },
    Transition {
        rel: "search",
        method: Method::Get,
        target: Target::Search,
        conditions: &[],
        states: &[ResourceState::Collection],
        fields: &[],
    },
    Transition {
        rel: "create",
        method: Method::Post,
        target: Target::Collection,
        conditions: &["can_create", CAN_DO_ANYTHING],
        states: &[ResourceState::Collection],
        fields: CREATE_FIELDS,
    },
    Transition {
        rel: "self",
        method: Method::Get,
        target: Target::Item,
        conditions: &[],
        states: ITEM_STATES,
        fields: &[],
    },
    Transition {
        rel: "activate",
        method: Method::Put,
        target: Target::ItemAction("activate"),
        conditions: &["can_activate", CAN_DO_ANYTHING],
        states: &[ResourceState::Deactivated, ResourceState::Unknown],
        fields: &[],
    },
    Transition {
        rel: "deactivate",
        method: Method::Put,
        target: Target::ItemAction("deactivate"),
        conditions: &["can_deactivate", CAN_DO_ANYTHING],
        states: &[ResourceState::Activated, ResourceState::Unknown],
        fields: &[],
    },
    Transition {
        rel: "update",
        method: Method::Put,
        target: Target::Item,
        conditions: &["can_update", CAN_DO_ANYTHING],
        states: ITEM_STATES,
        fields: UPDATE_FIELDS,
    },
    Transition {
        rel: "delete",
        method: Method::Delete,
        target: Target::Item,
        conditions: &["can_delete", CAN_DO_ANYTHING],
        states: ITEM_STATES,
        fields: &[],
    },
];

/// Transitions advertised from `state` under `conditions`, in table order.
pub fn available(
    state: ResourceState,
    conditions: &BTreeSet<String>,
) -> impl Iterator<Item = &'static Transition> + '_ {
    TRANSITIONS
        .iter()
        .filter(move |t| t.states.contains(&state) && t.is_available(conditions))
}

// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HALE JSON rendering of DRD resources.
//!
//! # Documents
//!
//! | Document | Properties | Links |
//! |----------|------------|-------|
//! | Entry point | none | `self`, `drds`, `profile` |
//! | Collection | `count` | `self`, `search`, `create`, `profile`, `items` |
//! | Item | every DRD field | `self`, state transitions, `profile`, `collection`, `leviathan`, `repair-history` |
//!
//! Gated transitions appear only when the caller's conditions unlock them
//! (see [`transitions`]). Options that reshape a document are described on
//! [`RenderOptions`].

pub mod options;
pub mod transitions;

pub use self::options::{EmbedMode, QueryPairs, RenderOptions};
pub use self::transitions::{CAN_DO_ANYTHING, ResourceState};

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::LinkConfig;
use crate::model::Drd;

use self::transitions::{Target, Transition};

/// Media type of every representation the service returns.
pub const MEDIA_TYPE: &str = "application/vnd.hale+json";

/// ALPS profile name of the DRD resource.
pub const PROFILE: &str = "DRDs";

const ITEMS_REL: &str = "items";

/// Builds HALE documents against a fixed set of link bases.
#[derive(Debug, Clone)]
pub struct HaleRenderer {
    links: LinkConfig,
}

impl HaleRenderer {
    pub fn new(links: LinkConfig) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &LinkConfig {
        &self.links
    }

    /// Entry point served at `/`.
    pub fn entry_point(&self) -> Value {
        let discovery = &self.links.discovery_base_uri;
        json!({
            "_links": {
                "self": { "href": format!("{}/", discovery) },
                "drds": { "href": format!("{}/drds", discovery) },
                "profile": { "href": self.profile_href() },
            }
        })
    }

    /// Render a single DRD, including the top-level link overrides.
    pub fn render_drd(&self, drd: &Drd, options: &RenderOptions) -> Value {
        let mut document = self.item_document(drd, options);
        if let Some(links) = document.get_mut("_links").and_then(Value::as_object_mut) {
            apply_link_options(links, options);
        }
        Value::Object(document)
    }

    /// Render a list of DRDs as a collection document.
    pub fn render_collection(&self, drds: &[Drd], options: &RenderOptions) -> Value {
        let mut links = Map::new();
        for transition in transitions::available(ResourceState::Collection, &options.conditions) {
            links.insert(transition.rel.to_string(), self.link(transition, None));
        }
        links.insert("profile".to_string(), json!({ "href": self.profile_href() }));
        links.insert(
            ITEMS_REL.to_string(),
            Value::Array(
                drds.iter()
                    .map(|drd| json!({ "href": self.item_href(drd) }))
                    .collect(),
            ),
        );
        apply_link_options(&mut links, options);

        let mut document = Map::new();
        document.insert("count".to_string(), json!(drds.len()));
        document.insert("_links".to_string(), Value::Object(links));

        if embed_mode(ITEMS_REL, options) == EmbedMode::Embed {
            let items: Vec<Value> = drds
                .iter()
                .map(|drd| Value::Object(self.item_document(drd, options)))
                .collect();
            document.insert("_embedded".to_string(), json!({ "items": items }));
        }

        Value::Object(document)
    }

    fn item_document(&self, drd: &Drd, options: &RenderOptions) -> Map<String, Value> {
        let state = item_state(drd, options);

        let mut links = Map::new();
        for transition in transitions::available(state, &options.conditions) {
            links.insert(transition.rel.to_string(), self.link(transition, Some(drd)));
        }
        links.insert("profile".to_string(), json!({ "href": self.profile_href() }));
        links.insert(
            "collection".to_string(),
            json!({ "href": self.collection_href() }),
        );
        if let Some(url) = non_blank(drd.leviathan_url.as_deref()) {
            links.insert("leviathan".to_string(), json!({ "href": self.external(url) }));
        }
        if let Some(url) = non_blank(drd.repair_history_url.as_deref()) {
            links.insert(
                "repair-history".to_string(),
                json!({ "href": self.external(url) }),
            );
        }

        let mut document = select_properties(properties(drd), options);
        document.insert("_links".to_string(), Value::Object(links));
        document
    }

    fn link(&self, transition: &Transition, drd: Option<&Drd>) -> Value {
        let mut link = Map::new();
        let href = match (transition.target, drd) {
            (Target::Collection, _) | (Target::Item, None) | (Target::ItemAction(_), None) => {
                self.collection_href()
            }
            (Target::Search, _) => {
                link.insert("templated".to_string(), Value::Bool(true));
                format!("{}{{?status}}", self.collection_href())
            }
            (Target::Item, Some(drd)) => self.item_href(drd),
            (Target::ItemAction(action), Some(drd)) => {
                format!("{}/{}", self.item_href(drd), action)
            }
        };
        link.insert("href".to_string(), Value::String(href));

        if transition.method != transitions::Method::Get {
            link.insert(
                "method".to_string(),
                Value::String(transition.method.as_str().to_string()),
            );
        }
        if !transition.fields.is_empty() {
            let data: Map<String, Value> = transition
                .fields
                .iter()
                .map(|field| {
                    let mut descriptor = json!({ "type": field.input });
                    if field.required {
                        descriptor["required"] = Value::Bool(true);
                    }
                    (field.name.to_string(), descriptor)
                })
                .collect();
            link.insert("data".to_string(), Value::Object(data));
        }

        Value::Object(link)
    }

    fn collection_href(&self) -> String {
        format!("{}/drds", self.links.deployment_base_uri)
    }

    /// Canonical href of a DRD.
    pub fn item_href(&self, drd: &Drd) -> String {
        format!("{}/drds/{}", self.links.deployment_base_uri, drd.id)
    }

    fn profile_href(&self) -> String {
        format!("{}/{}", self.links.alps_base_uri, PROFILE)
    }

    /// Route an external link through the hypermedia proxy when one is set.
    fn external(&self, url: &str) -> String {
        match &self.links.proxy_base_uri {
            Some(proxy) => {
                let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
                format!("{}?url={}", proxy, encoded)
            }
            None => url.to_string(),
        }
    }
}

fn item_state(drd: &Drd, options: &RenderOptions) -> ResourceState {
    match options.state.as_deref() {
        Some(raw) => ResourceState::parse_item(raw).unwrap_or_else(|| {
            debug!(state = raw, "Ignoring unknown state override");
            ResourceState::of(drd)
        }),
        None => ResourceState::of(drd),
    }
}

fn embed_mode(rel: &str, options: &RenderOptions) -> EmbedMode {
    if options.exclude.iter().any(|r| r == rel) {
        EmbedMode::Link
    } else if options.include.iter().any(|r| r == rel) {
        EmbedMode::Embed
    } else {
        options
            .embed_optional
            .get(rel)
            .copied()
            .unwrap_or(EmbedMode::Embed)
    }
}

/// External URLs that are stored blank produce no link.
fn non_blank(url: Option<&str>) -> Option<&str> {
    url.filter(|url| !url.trim().is_empty())
}

fn properties(drd: &Drd) -> Map<String, Value> {
    let value = json!({
        "id": drd.id,
        "name": drd.name,
        "status": drd.status,
        "kind": drd.kind,
        "leviathan_uuid": drd.leviathan_uuid,
        "leviathan_url": drd.leviathan_url,
        "old_status": drd.old_status,
        "size": drd.size,
        "location": drd.location,
        "location_detail": drd.location_detail,
        "destroyed_status": drd.destroyed_status,
        "repair_history_url": drd.repair_history_url,
        "created_at": drd.created_at,
        "updated_at": drd.updated_at,
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// `only` takes precedence over `except`.
fn select_properties(mut properties: Map<String, Value>, options: &RenderOptions) -> Map<String, Value> {
    if !options.only.is_empty() {
        properties.retain(|key, _| options.only.iter().any(|k| k == key));
    } else if !options.except.is_empty() {
        properties.retain(|key, _| !options.except.iter().any(|k| k == key));
    }
    properties
}

fn apply_link_options(links: &mut Map<String, Value>, options: &RenderOptions) {
    for (rel, href) in &options.additional_links {
        links
            .entry(rel.clone())
            .or_insert_with(|| json!({ "href": href }));
    }
    for (rel, href) in &options.override_links {
        links.insert(rel.clone(), json!({ "href": href }));
    }
}

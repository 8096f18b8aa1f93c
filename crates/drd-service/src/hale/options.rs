// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Caller-supplied rendering options.
//!
//! Options arrive either in the query string (`conditions[]=can_create`,
//! `override_links[self]=...`) or as top-level keys of a JSON body. They are
//! handed to the renderer untouched; whether they are honored at all is
//! decided by [`RenderOptionsPolicy`](crate::config::RenderOptionsPolicy).

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

/// Whether a related resource is embedded or only linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedMode {
    Embed,
    Link,
}

impl EmbedMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "embed" | "true" => Some(Self::Embed),
            "link" | "false" => Some(Self::Link),
            _ => None,
        }
    }
}

/// Rendering options bag.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Business conditions that unlock gated transitions.
    pub conditions: BTreeSet<String>,
    /// Properties to drop.
    pub except: Vec<String>,
    /// Properties to keep (everything else is dropped).
    pub only: Vec<String>,
    /// Relations to embed.
    pub include: Vec<String>,
    /// Relations never to embed.
    pub exclude: Vec<String>,
    /// Per-relation embed/link choice.
    pub embed_optional: BTreeMap<String, EmbedMode>,
    /// Links added when the relation is not already present.
    pub additional_links: BTreeMap<String, String>,
    /// Links that replace whatever the renderer produced.
    pub override_links: BTreeMap<String, String>,
    /// Explicit hypermedia state for item documents.
    pub state: Option<String>,
}

impl RenderOptions {
    /// Options carrying only a condition set.
    pub fn with_conditions<I, S>(conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            conditions: conditions.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Build options from decoded query pairs.
    pub fn from_query(query: &QueryPairs) -> Self {
        Self {
            conditions: query.list("conditions").into_iter().collect(),
            except: query.list("except"),
            only: query.list("only"),
            include: query.list("include"),
            exclude: query.list("exclude"),
            embed_optional: query
                .map("embed_optional")
                .into_iter()
                .filter_map(|(rel, mode)| EmbedMode::parse(&mode).map(|m| (rel, m)))
                .collect(),
            additional_links: query.map("additional_links"),
            override_links: query.map("override_links"),
            state: query.first("state").map(str::to_string),
        }
    }

    /// Combine with options from another source; `other` wins on conflicts.
    pub fn merge(mut self, other: RenderOptions) -> Self {
        self.conditions.extend(other.conditions);
        self.except.extend(other.except);
        self.only.extend(other.only);
        self.include.extend(other.include);
        self.exclude.extend(other.exclude);
        self.embed_optional.extend(other.embed_optional);
        self.additional_links.extend(other.additional_links);
        self.override_links.extend(other.override_links);
        self.state = other.state.or(self.state);
        self
    }
}

/// Decoded `application/x-www-form-urlencoded` query with bracket-style
/// list and map keys.
#[derive(Debug, Clone, Default)]
pub struct QueryPairs {
    pairs: Vec<(String, String)>,
}

impl QueryPairs {
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes())
            .into_owned()
            .collect();
        Self { pairs }
    }

    /// First non-empty value for exactly `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    /// Values for `key`, `key[]` and `key[<index>]`, in order.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, v)| {
                !v.is_empty()
                    && (k == key
                        || bracket_suffix(k, key)
                            .is_some_and(|inner| inner.chars().all(|c| c.is_ascii_digit())))
            })
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Entries of the form `key[name]=value`.
    pub fn map(&self, key: &str) -> BTreeMap<String, String> {
        self.pairs
            .iter()
            .filter_map(|(k, v)| {
                let inner = bracket_suffix(k, key)?;
                if inner.is_empty() || inner.chars().all(|c| c.is_ascii_digit()) || v.is_empty() {
                    return None;
                }
                Some((inner.to_string(), v.clone()))
            })
            .collect()
    }
}

/// For `key[inner]` return `inner`.
fn bracket_suffix<'a>(candidate: &'a str, key: &str) -> Option<&'a str> {
    candidate
        .strip_prefix(key)?
        .strip_prefix('[')?
        .strip_suffix(']')
}

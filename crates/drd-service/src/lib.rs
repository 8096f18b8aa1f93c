// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! DRD Service - Hypermedia CRUD over HTTP
//!
//! This crate serves the DRD resource as HALE JSON. Each representation
//! carries the links a client may follow next, and which links appear depends
//! on the resource state and the caller's conditions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │   HTTP clients / tests   │
//! └──────────────────────────┘
//!              │  GET/POST/PUT/PATCH/DELETE  (.hale_json / .json accepted)
//!              ▼
//! ┌──────────────────────────┐      ┌──────────────────────────┐
//! │   server + handlers      │─────►│   hale::HaleRenderer     │
//! │   (axum router)          │      │   (links, conditions)    │
//! └──────────────────────────┘      └──────────────────────────┘
//!              │
//!              ▼
//! ┌──────────────────────────┐
//! │   persistence::DrdStore  │
//! │   (SQLite via sqlx)      │
//! └──────────────────────────┘
//! ```
//!
//! # HTTP Surface
//!
//! | Method | Path | Success | Errors |
//! |--------|------|---------|--------|
//! | GET | `/` | 200 entry point | |
//! | GET | `/drds` | 200 collection | |
//! | POST | `/drds` | 201 item | 400, 422 |
//! | GET | `/drds/{id}` | 200 item | 404 |
//! | PUT, PATCH | `/drds/{id}` | 200 item | 400, 404, 422 |
//! | PUT | `/drds/{id}/activate` | 204 | 404 |
//! | PUT | `/drds/{id}/deactivate` | 204 | 404 |
//! | DELETE | `/drds/{id}` | 204, empty body | 404 |
//!
//! Activate and deactivate are idempotent and touch only `status`.
//!
//! # Commands
//!
//! | Command | Effect |
//! |---------|--------|
//! | `drd-service serve [--port N]` | migrate, run initializers, serve |
//! | `drd-service reseed` | migrate, replace all DRDs with the seed set |
//! | `drd-service migrate` | migrate only |
//!
//! Configuration is read from the environment; see [`config::Config::from_env`].

pub mod config;
pub mod error;
pub mod hale;
pub mod handlers;
pub mod initializer;
pub mod migrations;
pub mod model;
pub mod persistence;
pub mod runtime;
pub mod seed;
pub mod server;

pub use error::{Result, ServiceError};
pub use model::Drd;

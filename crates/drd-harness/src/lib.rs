// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! DRD Harness - boots `drd-service` for integration tests
//!
//! Starting a service:
//!
//! 1. derive the environment from the port (link bases, initializer directory)
//! 2. run `drd-service reseed` and wait for it
//! 3. spawn `drd-service serve --port <port>`
//! 4. probe `GET /` until it answers: 30 attempts, one second apart by default
//!
//! The caller owns the returned [`ServiceHandle`] and stops it explicitly or
//! by dropping it.
//!
//! # Example
//!
//! ```rust,ignore
//! use drd_harness::Bootstrapper;
//!
//! let service = Bootstrapper::new(env!("CARGO_BIN_EXE_drd-service"))
//!     .port(3100)
//!     .start()?;
//!
//! let body = reqwest::blocking::get(format!("{}/drds", service.base_url()))?.text()?;
//!
//! service.stop()?;
//! ```

pub mod bootstrap;
pub mod env;
pub mod error;
pub mod probe;

pub use bootstrap::{Bootstrapper, ServiceHandle};
pub use error::{BootstrapError, Result};
pub use probe::{FixedInterval, ProbePolicy, wait_for_response};

// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for drd-harness.

use std::process::ExitStatus;

use thiserror::Error;

/// Result type using BootstrapError
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// Errors raised while starting, probing or stopping a service process.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The liveness probe never got a response.
    #[error("{url} did not respond after {attempts} attempts: {source}")]
    Unreachable {
        url: String,
        attempts: u32,
        /// Error from the last attempt.
        #[source]
        source: reqwest::Error,
    },

    /// The reseed step exited unsuccessfully.
    #[error("reseed step failed with {status}")]
    Seed { status: ExitStatus },

    /// The service program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The probe's HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Waiting on or signalling the child process failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BootstrapError {
    /// Number of probe attempts made, for [`Unreachable`](Self::Unreachable).
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Unreachable { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

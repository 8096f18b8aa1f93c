// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Liveness probe with a fixed-interval, bounded retry policy.

use std::time::Duration;

use backoff::backoff::Backoff;
use tracing::{debug, info};

use crate::error::{BootstrapError, Result};

/// Pause between failed attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
/// Attempts made before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
/// Per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// How hard to try before declaring a service unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub request_timeout: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ProbePolicy {
    pub fn backoff(&self) -> FixedInterval {
        FixedInterval::new(self.interval, self.max_attempts)
    }
}

/// Constant delay, at most `max_attempts - 1` times.
///
/// The first attempt needs no delay, so `max_attempts` attempts are separated
/// by `max_attempts - 1` waits.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    interval: Duration,
    max_attempts: u32,
    remaining: u32,
}

impl FixedInterval {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            remaining: max_attempts.saturating_sub(1),
        }
    }
}

impl Backoff for FixedInterval {
    fn reset(&mut self) {
        self.remaining = self.max_attempts.saturating_sub(1);
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.interval)
    }
}

/// Block until `GET {base_url}/` gets any HTTP response.
///
/// Connection failures and timeouts are retried per `policy`; any other
/// client error ends the wait immediately.
pub fn wait_for_response(base_url: &str, policy: &ProbePolicy) -> Result<()> {
    let url = format!("{}/", base_url.trim_end_matches('/'));
    let client = reqwest::blocking::Client::builder()
        .timeout(policy.request_timeout)
        .build()
        .map_err(BootstrapError::Client)?;

    let mut attempts = 0u32;
    let outcome = backoff::retry_notify(
        policy.backoff(),
        || {
            attempts += 1;
            match client.get(&url).send() {
                Ok(_) => Ok(()),
                Err(e) if e.is_connect() || e.is_timeout() => Err(backoff::Error::transient(e)),
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        },
        |err: reqwest::Error, wait: Duration| {
            debug!(url = %url, error = %err, wait_ms = wait.as_millis() as u64, "Service not ready");
        },
    );

    match outcome {
        Ok(()) => {
            info!(url = %url, attempts, "Service responded");
            Ok(())
        }
        Err(backoff::Error::Permanent(source)) | Err(backoff::Error::Transient { err: source, .. }) => {
            Err(BootstrapError::Unreachable {
                url,
                attempts,
                source,
            })
        }
    }
}

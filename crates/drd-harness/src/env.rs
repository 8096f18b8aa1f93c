// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Environment handed to a spawned service.

use std::collections::BTreeMap;
use std::path::Path;

/// Environment for a service listening on `localhost:{port}`.
///
/// Link bases all point back at the service itself; the hypermedia proxy is
/// mounted under `/crichton`. Request-supplied rendering options are enabled
/// so tests can drive conditions.
pub fn service_env(port: u16, initializer_directory: Option<&Path>) -> BTreeMap<&'static str, String> {
    let localhost = format!("http://localhost:{}", port);

    let mut env = BTreeMap::new();
    env.insert("ALPS_BASE_URI", format!("{}/alps", localhost));
    env.insert("DEPLOYMENT_BASE_URI", localhost.clone());
    env.insert("DISCOVERY_BASE_URI", localhost.clone());
    env.insert("HYPERMEDIA_PROXY_BASE_URI", format!("{}/crichton", localhost));
    env.insert("DRD_RENDER_OPTIONS", "request".to_string());
    if let Some(dir) = initializer_directory {
        env.insert("INITIALIZER_DIRECTORY", dir.display().to_string());
    }
    env
}

// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Default HTTP port, matching the port the harness assumes when none is given.
pub const DEFAULT_PORT: u16 = 3000;

/// Whether request-supplied rendering options are honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderOptionsPolicy {
    /// Ignore rendering options sent by callers; use server defaults.
    #[default]
    Ignore,
    /// Pass rendering options from the request through to the renderer.
    /// Test and debug deployments only.
    Request,
}

impl std::str::FromStr for RenderOptionsPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" | "off" | "false" | "0" | "" => Ok(Self::Ignore),
            "request" | "on" | "true" | "1" => Ok(Self::Request),
            _ => Err(ConfigError::Invalid(
                "DRD_RENDER_OPTIONS",
                "expected 'ignore' or 'request'",
            )),
        }
    }
}

/// Base URIs used when building hypermedia links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Base for resource hrefs (`self`, `collection`, transitions).
    pub deployment_base_uri: String,
    /// Base for ALPS profile links.
    pub alps_base_uri: String,
    /// Base used by the entry point document.
    pub discovery_base_uri: String,
    /// Optional proxy that external links are routed through.
    pub proxy_base_uri: Option<String>,
}

impl LinkConfig {
    /// Link configuration for a service reachable on `localhost:{port}`.
    pub fn localhost(port: u16) -> Self {
        let localhost = format!("http://localhost:{}", port);
        Self {
            alps_base_uri: format!("{}/alps", localhost),
            deployment_base_uri: localhost.clone(),
            discovery_base_uri: localhost,
            proxy_base_uri: None,
        }
    }
}

/// DRD service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL
    pub database_url: String,
    /// HTTP listen address
    pub http_addr: SocketAddr,
    /// Hypermedia link bases
    pub links: LinkConfig,
    /// Directory of SQL scripts executed at startup
    pub initializer_directory: Option<PathBuf>,
    /// Whether callers may supply rendering options
    pub render_options: RenderOptionsPolicy,
    /// Conditions applied when caller options are ignored
    pub default_conditions: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `DRD_DATABASE_URL`: SQLite URL (default: `sqlite:drds.db`)
    /// - `DRD_HTTP_PORT`: HTTP port (default: 3000)
    /// - `DRD_BIND_HOST`: listen address (default: 0.0.0.0)
    /// - `ALPS_BASE_URI`, `DEPLOYMENT_BASE_URI`, `DISCOVERY_BASE_URI`:
    ///   link bases (default: derived from the port)
    /// - `HYPERMEDIA_PROXY_BASE_URI`: external link proxy (default: unset)
    /// - `INITIALIZER_DIRECTORY`: startup SQL scripts (default: unset)
    /// - `DRD_RENDER_OPTIONS`: `ignore` or `request` (default: ignore)
    /// - `DRD_DEFAULT_CONDITIONS`: comma separated list (default: empty)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_port(None)
    }

    /// Load configuration, letting `port` take precedence over `DRD_HTTP_PORT`.
    ///
    /// Link bases that are not set explicitly are derived from the final port.
    pub fn from_env_with_port(port: Option<u16>) -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DRD_DATABASE_URL").unwrap_or_else(|_| "sqlite:drds.db".to_string());

        let port = match port {
            Some(port) => port,
            None => std::env::var("DRD_HTTP_PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("DRD_HTTP_PORT", "must be a valid port number"))?,
        };

        let host: IpAddr = std::env::var("DRD_BIND_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("DRD_BIND_HOST", "must be an IP address"))?;

        let defaults = LinkConfig::localhost(port);
        let links = LinkConfig {
            deployment_base_uri: non_empty_var("DEPLOYMENT_BASE_URI")
                .unwrap_or(defaults.deployment_base_uri),
            alps_base_uri: non_empty_var("ALPS_BASE_URI").unwrap_or(defaults.alps_base_uri),
            discovery_base_uri: non_empty_var("DISCOVERY_BASE_URI")
                .unwrap_or(defaults.discovery_base_uri),
            proxy_base_uri: non_empty_var("HYPERMEDIA_PROXY_BASE_URI"),
        };

        let initializer_directory = non_empty_var("INITIALIZER_DIRECTORY").map(PathBuf::from);

        let render_options = std::env::var("DRD_RENDER_OPTIONS")
            .map(|v| v.parse::<RenderOptionsPolicy>())
            .unwrap_or(Ok(RenderOptionsPolicy::Ignore))?;

        let default_conditions = std::env::var("DRD_DEFAULT_CONDITIONS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            http_addr: SocketAddr::new(host, port),
            links,
            initializer_directory,
            render_options,
            default_conditions,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ALL_VARS: &[&str] = &[
        "DRD_DATABASE_URL",
        "DRD_HTTP_PORT",
        "DRD_BIND_HOST",
        "ALPS_BASE_URI",
        "DEPLOYMENT_BASE_URI",
        "DISCOVERY_BASE_URI",
        "HYPERMEDIA_PROXY_BASE_URI",
        "INITIALIZER_DIRECTORY",
        "DRD_RENDER_OPTIONS",
        "DRD_DEFAULT_CONDITIONS",
    ];

    /// Helper to set env vars for a test and restore them after
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn clean() -> Self {
            let mut guard = Self { vars: Vec::new() };
            for key in ALL_VARS {
                guard.remove(key);
            }
            guard
        }

        fn set(&mut self, key: &str, value: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::set_var(key, value) };
        }

        fn remove(&mut self, key: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::remove_var(key) };
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.vars.drain(..).rev() {
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe {
                    match value {
                        Some(v) => env::set_var(&key, v),
                        None => env::remove_var(&key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_config_from_env_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _guard = EnvGuard::clean();

        let config = Config::from_env().unwrap();

        assert_eq!(config.database_url, "sqlite:drds.db");
        assert_eq!(config.http_addr.port(), 3000);
        assert_eq!(config.links, LinkConfig::localhost(3000));
        assert_eq!(config.links.alps_base_uri, "http://localhost:3000/alps");
        assert!(config.initializer_directory.is_none());
        assert_eq!(config.render_options, RenderOptionsPolicy::Ignore);
        assert!(config.default_conditions.is_empty());
    }

    #[test]
    fn test_port_argument_overrides_env_and_derives_links() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::clean();
        guard.set("DRD_HTTP_PORT", "4000");

        let config = Config::from_env_with_port(Some(1234)).unwrap();

        assert_eq!(config.http_addr.port(), 1234);
        assert_eq!(config.links.deployment_base_uri, "http://localhost:1234");
        assert_eq!(config.links.discovery_base_uri, "http://localhost:1234");
    }

    #[test]
    fn test_explicit_link_bases_win() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::clean();
        guard.set("DEPLOYMENT_BASE_URI", "https://drds.example.org/");
        guard.set("ALPS_BASE_URI", "https://alps.example.org");
        guard.set("HYPERMEDIA_PROXY_BASE_URI", "https://proxy.example.org/crichton");
        guard.set("INITIALIZER_DIRECTORY", "/tmp/init");

        let config = Config::from_env().unwrap();

        assert_eq!(config.links.deployment_base_uri, "https://drds.example.org");
        assert_eq!(config.links.alps_base_uri, "https://alps.example.org");
        assert_eq!(
            config.links.proxy_base_uri.as_deref(),
            Some("https://proxy.example.org/crichton")
        );
        assert_eq!(config.initializer_directory, Some(PathBuf::from("/tmp/init")));
    }

    #[test]
    fn test_render_options_and_default_conditions() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::clean();
        guard.set("DRD_RENDER_OPTIONS", "request");
        guard.set("DRD_DEFAULT_CONDITIONS", "can_create, can_update,,");

        let config = Config::from_env().unwrap();

        assert_eq!(config.render_options, RenderOptionsPolicy::Request);
        assert_eq!(config.default_conditions, vec!["can_create", "can_update"]);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::clean();

        guard.set("DRD_HTTP_PORT", "not-a-port");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("DRD_HTTP_PORT"));

        guard.set("DRD_HTTP_PORT", "3000");
        guard.set("DRD_RENDER_OPTIONS", "sometimes");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("DRD_RENDER_OPTIONS"));
    }
}

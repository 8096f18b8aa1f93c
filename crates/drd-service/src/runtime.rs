// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for drd-service.
//!
//! [`ServiceRuntime`] runs the HTTP service inside an existing tokio
//! application instead of as a standalone process.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use drd_service::persistence::SqliteDrdStore;
//! use drd_service::runtime::ServiceRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(SqliteDrdStore::connect("sqlite:drds.db").await?);
//!
//!     let runtime = ServiceRuntime::builder()
//!         .store(store)
//!         .bind_addr("127.0.0.1:3000".parse()?)
//!         .build()?
//!         .start()
//!         .await?;
//!
//!     // ... run your application ...
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::{DEFAULT_PORT, LinkConfig, RenderOptionsPolicy};
use crate::handlers::ServiceState;
use crate::hale::HaleRenderer;
use crate::persistence::DrdStore;
use crate::server;

/// Builder for creating a [`ServiceRuntime`].
pub struct ServiceRuntimeBuilder {
    store: Option<Arc<dyn DrdStore>>,
    links: Option<LinkConfig>,
    bind_addr: SocketAddr,
    render_policy: RenderOptionsPolicy,
    default_conditions: Vec<String>,
}

impl std::fmt::Debug for ServiceRuntimeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRuntimeBuilder")
            .field("store", &self.store.as_ref().map(|_| "..."))
            .field("links", &self.links)
            .field("bind_addr", &self.bind_addr)
            .field("render_policy", &self.render_policy)
            .finish()
    }
}

impl Default for ServiceRuntimeBuilder {
    fn default() -> Self {
        Self {
            store: None,
            links: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            render_policy: RenderOptionsPolicy::default(),
            default_conditions: Vec::new(),
        }
    }
}

impl ServiceRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the datastore (required).
    pub fn store(mut self, store: Arc<dyn DrdStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the link bases.
    ///
    /// Default: `http://localhost:{port}` with the port actually bound.
    pub fn links(mut self, links: LinkConfig) -> Self {
        self.links = Some(links);
        self
    }

    /// Set the HTTP bind address. Port 0 picks a free port.
    ///
    /// Default: `0.0.0.0:3000`
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn render_policy(mut self, policy: RenderOptionsPolicy) -> Self {
        self.render_policy = policy;
        self
    }

    pub fn default_conditions(mut self, conditions: Vec<String>) -> Self {
        self.default_conditions = conditions;
        self
    }

    /// Build the runtime configuration.
    ///
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<ServiceRuntimeConfig> {
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("store is required"))?;

        Ok(ServiceRuntimeConfig {
            store,
            links: self.links,
            bind_addr: self.bind_addr,
            render_policy: self.render_policy,
            default_conditions: self.default_conditions,
        })
    }
}

/// Configuration for a [`ServiceRuntime`].
pub struct ServiceRuntimeConfig {
    store: Arc<dyn DrdStore>,
    links: Option<LinkConfig>,
    bind_addr: SocketAddr,
    render_policy: RenderOptionsPolicy,
    default_conditions: Vec<String>,
}

impl std::fmt::Debug for ServiceRuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRuntimeConfig")
            .field("store", &"...")
            .field("links", &self.links)
            .field("bind_addr", &self.bind_addr)
            .field("render_policy", &self.render_policy)
            .finish()
    }
}

impl ServiceRuntimeConfig {
    /// Bind the listener and spawn the HTTP server task.
    pub async fn start(self) -> Result<ServiceRuntime> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        let local_addr = listener.local_addr()?;

        let links = self
            .links
            .unwrap_or_else(|| LinkConfig::localhost(local_addr.port()));
        let state = Arc::new(
            ServiceState::new(self.store, HaleRenderer::new(links))
                .with_render_policy(self.render_policy)
                .with_default_conditions(self.default_conditions),
        );

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let shutdown = async move {
            let _ = shutdown_rx.wait_for(|stop| *stop).await;
            info!("DRD HTTP server received shutdown signal");
        };

        let server_handle = tokio::spawn(server::serve(
            listener,
            server::app(state.clone()),
            shutdown,
        ));

        info!(addr = %local_addr, "ServiceRuntime started");

        Ok(ServiceRuntime {
            server_handle,
            shutdown_tx,
            state,
            local_addr,
        })
    }
}

/// A running drd-service that can be embedded in an application.
///
/// Call [`shutdown`](Self::shutdown) for graceful termination.
pub struct ServiceRuntime {
    server_handle: JoinHandle<std::io::Result<()>>,
    shutdown_tx: watch::Sender<bool>,
    state: Arc<ServiceState>,
    local_addr: SocketAddr,
}

impl ServiceRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> ServiceRuntimeBuilder {
        ServiceRuntimeBuilder::new()
    }

    /// Address the HTTP server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> &Arc<ServiceState> {
        &self.state
    }

    pub fn store(&self) -> &Arc<dyn DrdStore> {
        &self.state.store
    }

    /// Gracefully shut down the runtime.
    ///
    /// Stops accepting connections and waits for in-flight requests.
    pub async fn shutdown(self) -> Result<()> {
        info!("ServiceRuntime shutting down...");

        let _ = self.shutdown_tx.send(true);

        match self.server_handle.await {
            Ok(Ok(())) => {
                info!("ServiceRuntime shutdown complete");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("ServiceRuntime server error during shutdown: {}", e);
                Err(e.into())
            }
            Err(e) => {
                error!("ServiceRuntime server task panicked: {}", e);
                Err(anyhow::anyhow!("server task panicked: {}", e))
            }
        }
    }

    /// Check if the runtime is still running.
    pub fn is_running(&self) -> bool {
        !self.server_handle.is_finished()
    }
}

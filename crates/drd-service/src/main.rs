// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! DRD Service - HALE JSON resource server
//!
//! Serves the DRD resource over HTTP and provides the maintenance commands
//! used by test bootstrappers (reseed, migrate).

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use drd_service::config::Config;
use drd_service::persistence::{DrdStore, SqliteDrdStore};
use drd_service::runtime::ServiceRuntime;
use drd_service::{initializer, seed};

/// DRD hypermedia service
#[derive(Parser, Debug)]
#[command(name = "drd-service")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Listen port, overriding DRD_HTTP_PORT
        #[arg(long, short)]
        port: Option<u16>,
    },
    /// Replace every DRD with the seed set
    Reseed,
    /// Apply pending migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drd_service=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Serve { port: None });
    let port = match &command {
        Command::Serve { port } => *port,
        _ => None,
    };

    let config = Config::from_env_with_port(port).map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    // Connecting also applies migrations
    let store = SqliteDrdStore::connect(&config.database_url).await?;
    let healthy = store.health_check().await?;
    info!(database_url = %config.database_url, healthy, "Database ready");

    match command {
        Command::Migrate => {
            info!("Migrations completed");
        }
        Command::Reseed => {
            let seeded = seed::reseed(&store).await?;
            info!(count = seeded.len(), "Reseed completed");
        }
        Command::Serve { .. } => serve(config, store).await?,
    }

    Ok(())
}

async fn serve(config: Config, store: SqliteDrdStore) -> Result<()> {
    if let Some(dir) = &config.initializer_directory {
        initializer::run_directory(store.pool(), dir).await?;
    }

    info!(
        http_addr = %config.http_addr,
        deployment_base_uri = %config.links.deployment_base_uri,
        render_options = ?config.render_options,
        "Starting DRD service"
    );

    let runtime = ServiceRuntime::builder()
        .store(Arc::new(store))
        .links(config.links)
        .bind_addr(config.http_addr)
        .render_policy(config.render_options)
        .default_conditions(config.default_conditions)
        .build()?
        .start()
        .await?;

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    runtime.shutdown().await?;
    info!("Shutdown complete");

    Ok(())
}

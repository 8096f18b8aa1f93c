// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP router for the DRD resource.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::http::Uri;
use axum::http::uri::PathAndQuery;
use axum::routing::{get, put};
use tokio::net::TcpListener;
use tower::Layer;
use tower::util::{MapRequest, MapRequestLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{self, ServiceState};

/// Suffixes accepted on every path and removed before routing.
const FORMAT_SUFFIXES: &[&str] = &[".hale_json", ".json"];

/// The complete service: the router behind the format-suffix rewrite.
pub type App = MapRequest<Router, fn(Request) -> Request>;

/// Build the application for the given handler state.
pub fn app(state: Arc<ServiceState>) -> App {
    let router = Router::new()
        .route("/", get(handlers::root))
        .route("/drds", get(handlers::index).post(handlers::create))
        .route(
            "/drds/{id}",
            get(handlers::show)
                .put(handlers::update)
                .patch(handlers::update)
                .delete(handlers::destroy),
        )
        .route("/drds/{id}/activate", put(handlers::activate))
        .route("/drds/{id}/deactivate", put(handlers::deactivate))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Rewriting must happen before routing, so it wraps the router instead of
    // being one of its layers.
    MapRequestLayer::new(strip_format_suffix as fn(Request) -> Request).layer(router)
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: App, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "DRD HTTP server listening");
    }
    axum::serve(listener, axum::ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown)
        .await
}

fn strip_format_suffix(mut request: Request) -> Request {
    let path = request.uri().path();
    let Some(stripped) = FORMAT_SUFFIXES
        .iter()
        .find_map(|suffix| path.strip_suffix(suffix))
    else {
        return request;
    };

    let stripped = if stripped.is_empty() { "/" } else { stripped };
    let rewritten = match request.uri().query() {
        Some(query) => format!("{}?{}", stripped, query),
        None => stripped.to_string(),
    };

    let mut parts = request.uri().clone().into_parts();
    if let Ok(path_and_query) = PathAndQuery::try_from(rewritten) {
        parts.path_and_query = Some(path_and_query);
        if let Ok(uri) = Uri::from_parts(parts) {
            *request.uri_mut() = uri;
        }
    }
    request
}

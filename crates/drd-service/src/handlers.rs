// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! DRD resource handlers.
//!
//! Every handler validates its input, performs at most one datastore write,
//! and renders the result through the shared [`HaleRenderer`].

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{info, instrument};

use crate::config::RenderOptionsPolicy;
use crate::error::{Result, ServiceError};
use crate::hale::{HaleRenderer, MEDIA_TYPE, QueryPairs, RenderOptions};
use crate::model::{
    DrdAttributes, DrdChangeRequest, DrdChanges, DrdFilter, NewDrd, STATUS_ACTIVATED,
    STATUS_DEACTIVATED, parse_id,
};
use crate::persistence::DrdStore;

/// Shared state for the DRD handlers.
pub struct ServiceState {
    /// Datastore owning all DRD state.
    pub store: Arc<dyn DrdStore>,
    /// Renderer for HALE documents.
    pub renderer: HaleRenderer,
    /// Whether request-supplied rendering options are honored.
    pub render_policy: RenderOptionsPolicy,
    /// Conditions used when request options are ignored.
    pub default_conditions: Vec<String>,
}

impl std::fmt::Debug for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceState")
            .field("store", &"...")
            .field("renderer", &self.renderer)
            .field("render_policy", &self.render_policy)
            .field("default_conditions", &self.default_conditions)
            .finish()
    }
}

impl ServiceState {
    /// Create handler state that ignores request rendering options.
    pub fn new(store: Arc<dyn DrdStore>, renderer: HaleRenderer) -> Self {
        Self {
            store,
            renderer,
            render_policy: RenderOptionsPolicy::Ignore,
            default_conditions: Vec::new(),
        }
    }

    pub fn with_render_policy(mut self, policy: RenderOptionsPolicy) -> Self {
        self.render_policy = policy;
        self
    }

    pub fn with_default_conditions(mut self, conditions: Vec<String>) -> Self {
        self.default_conditions = conditions;
        self
    }

    /// Resolve the options a response is rendered with.
    ///
    /// `body` holds the top-level keys of a JSON body other than `drd`. It is
    /// only read when the policy honors request options.
    fn render_options(&self, query: &QueryPairs, body: &Map<String, Value>) -> Result<RenderOptions> {
        match self.render_policy {
            RenderOptionsPolicy::Ignore => Ok(RenderOptions::with_conditions(
                self.default_conditions.iter().cloned(),
            )),
            RenderOptionsPolicy::Request => {
                let options = RenderOptions::from_query(query);
                if body.is_empty() {
                    return Ok(options);
                }
                let body: RenderOptions = serde_json::from_value(Value::Object(body.clone()))
                    .map_err(|e| ServiceError::validation("options", e.to_string()))?;
                Ok(options.merge(body))
            }
        }
    }
}

/// A HALE JSON response body.
#[derive(Debug)]
pub struct Hale(pub Value);

impl IntoResponse for Hale {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, MEDIA_TYPE)], self.0.to_string()).into_response()
    }
}

/// Request body shared by create and update: the entity under `drd` plus
/// whatever other top-level keys were sent, kept raw until the render
/// policy decides whether they mean anything.
#[derive(Debug)]
struct DrdRequest<T> {
    drd: Option<T>,
    options: Map<String, Value>,
}

/// Split a request body. Text that is not JSON is a BadRequest; a `drd`
/// object whose fields have the wrong types is a ValidationError.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<DrdRequest<T>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DrdRequest {
            drd: None,
            options: Map::new(),
        });
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid JSON body: {}", e)))?;
    let Value::Object(mut options) = value else {
        return Err(ServiceError::validation("drd", "is required"));
    };

    let drd = match options.remove("drd") {
        None | Some(Value::Null) => None,
        Some(drd) => Some(
            serde_json::from_value(drd)
                .map_err(|e| ServiceError::validation("drd", e.to_string()))?,
        ),
    };
    Ok(DrdRequest { drd, options })
}

/// `GET /`
pub async fn root(State(state): State<Arc<ServiceState>>) -> Hale {
    Hale(state.renderer.entry_point())
}

/// `GET /drds`
#[instrument(skip_all)]
pub async fn index(
    State(state): State<Arc<ServiceState>>,
    RawQuery(query): RawQuery,
) -> Result<Hale> {
    let query = QueryPairs::parse(query.as_deref());
    let filter = DrdFilter {
        status: query.first("status").map(str::to_string),
    };
    let drds = state.store.list(&filter).await?;
    let options = state.render_options(&query, &Map::new())?;
    Ok(Hale(state.renderer.render_collection(&drds, &options)))
}

/// `GET /drds/{id}`
#[instrument(skip_all, fields(drd_id = %id))]
pub async fn show(
    State(state): State<Arc<ServiceState>>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Hale> {
    let uuid = parse_id(&id)?;
    let drd = state
        .store
        .get(uuid)
        .await?
        .ok_or_else(|| ServiceError::not_found(&id))?;
    let options = state.render_options(&QueryPairs::parse(query.as_deref()), &Map::new())?;
    Ok(Hale(state.renderer.render_drd(&drd, &options)))
}

/// `POST /drds`
#[instrument(skip_all)]
pub async fn create(
    State(state): State<Arc<ServiceState>>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response> {
    let request = parse_body::<DrdAttributes>(&body)?;
    let attributes = request
        .drd
        .ok_or_else(|| ServiceError::validation("drd", "is required"))?;
    let new = NewDrd::try_from(attributes)?;
    let options = state.render_options(&QueryPairs::parse(query.as_deref()), &request.options)?;

    let drd = state.store.create(&new).await?;
    info!(drd_id = %drd.id, "DRD created");

    let location = state.renderer.item_href(&drd);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Hale(state.renderer.render_drd(&drd, &options)),
    )
        .into_response())
}

/// `PUT|PATCH /drds/{id}`
#[instrument(skip_all, fields(drd_id = %id))]
pub async fn update(
    State(state): State<Arc<ServiceState>>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Hale> {
    let uuid = parse_id(&id)?;
    let request = parse_body::<DrdChangeRequest>(&body)?;
    let changes = DrdChanges::try_from(
        request
            .drd
            .ok_or_else(|| ServiceError::validation("drd", "is required"))?,
    )?;
    let options = state.render_options(&QueryPairs::parse(query.as_deref()), &request.options)?;

    let drd = state
        .store
        .update(uuid, &changes)
        .await?
        .ok_or_else(|| ServiceError::not_found(&id))?;
    info!("DRD updated");

    Ok(Hale(state.renderer.render_drd(&drd, &options)))
}

/// `PUT /drds/{id}/activate`
#[instrument(skip_all, fields(drd_id = %id))]
pub async fn activate(
    State(state): State<Arc<ServiceState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    transition(&state, &id, STATUS_ACTIVATED).await
}

/// `PUT /drds/{id}/deactivate`
#[instrument(skip_all, fields(drd_id = %id))]
pub async fn deactivate(
    State(state): State<Arc<ServiceState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    transition(&state, &id, STATUS_DEACTIVATED).await
}

/// Both transitions are idempotent: the status is written whatever it was.
async fn transition(state: &ServiceState, id: &str, status: &str) -> Result<StatusCode> {
    let uuid = parse_id(id)?;
    if !state.store.set_status(uuid, status).await? {
        return Err(ServiceError::not_found(id));
    }
    info!(status, "DRD status set");
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /drds/{id}`
#[instrument(skip_all, fields(drd_id = %id))]
pub async fn destroy(
    State(state): State<Arc<ServiceState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let uuid = parse_id(&id)?;
    if !state.store.delete(uuid).await? {
        return Err(ServiceError::not_found(&id));
    }
    info!("DRD destroyed");
    Ok(StatusCode::NO_CONTENT)
}

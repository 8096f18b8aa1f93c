// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-process tests of the HTTP surface.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{HeaderMap, Method, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use drd_service::config::{LinkConfig, RenderOptionsPolicy};
use drd_service::hale::{HaleRenderer, MEDIA_TYPE};
use drd_service::handlers::ServiceState;
use drd_service::persistence::SqliteDrdStore;
use drd_service::server::{self, App};

const LEVIATHAN_UUID: &str = "d34c78bd-583c-4eff-a66c-cd9b047417b4";
const LEVIATHAN_URL: &str = "http://example.org/leviathan/d34c78bd";

struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

async fn test_app(policy: RenderOptionsPolicy, default_conditions: &[&str]) -> App {
    let store = SqliteDrdStore::in_memory().await.unwrap();
    let state = ServiceState::new(
        Arc::new(store),
        HaleRenderer::new(LinkConfig::localhost(3000)),
    )
    .with_render_policy(policy)
    .with_default_conditions(default_conditions.iter().map(|c| c.to_string()).collect());
    server::app(Arc::new(state))
}

async fn request_app() -> App {
    test_app(RenderOptionsPolicy::Request, &[]).await
}

async fn send(app: &App, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    Response {
        status,
        headers,
        body,
    }
}

async fn create_pike(app: &App) -> Value {
    let response = send(
        app,
        Method::POST,
        "/drds",
        Some(json!({
            "drd": {
                "name": "Pike",
                "status": "activated",
                "kind": "standard",
                "leviathan_uuid": LEVIATHAN_UUID,
                "leviathan_url": LEVIATHAN_URL,
            },
            "conditions": ["can_do_anything"],
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    response.json()
}

fn id_of(document: &Value) -> String {
    document["id"].as_str().unwrap().to_string()
}

// ============================================================================
// Entry point and media type
// ============================================================================

#[tokio::test]
async fn test_entry_point() {
    let app = request_app().await;
    let response = send(&app, Method::GET, "/", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], MEDIA_TYPE);
    let body = response.json();
    assert_eq!(body["_links"]["drds"]["href"], "http://localhost:3000/drds");
    assert_eq!(body["_links"]["profile"]["href"], "http://localhost:3000/alps/DRDs");
}

// ============================================================================
// Create / show
// ============================================================================

#[tokio::test]
async fn test_create_then_show_round_trip() {
    let app = request_app().await;
    let created = create_pike(&app).await;
    let id = id_of(&created);

    let response = send(&app, Method::GET, &format!("/drds/{}", id), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], MEDIA_TYPE);

    let drd = response.json();
    assert_eq!(drd["name"], "Pike");
    assert_eq!(drd["status"], "activated");
    assert_eq!(drd["kind"], "standard");
    assert_eq!(drd["leviathan_uuid"], LEVIATHAN_UUID);
    assert_eq!(drd["leviathan_url"], LEVIATHAN_URL);
    assert_eq!(drd["destroyed_status"], false);
    assert_eq!(
        drd["_links"]["self"]["href"],
        format!("http://localhost:3000/drds/{}", id)
    );
}

#[tokio::test]
async fn test_create_sets_location_and_ignores_unknown_fields() {
    let app = request_app().await;
    let response = send(
        &app,
        Method::POST,
        "/drds",
        Some(json!({"drd": {"name": "Nautilus", "color": "red", "size": "large"}})),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let body = response.json();
    assert_eq!(
        response.headers[header::LOCATION],
        format!("http://localhost:3000/drds/{}", id_of(&body)).as_str()
    );
    assert!(body.get("color").is_none());
    // size is not a create field
    assert!(body["size"].is_null());
}

#[tokio::test]
async fn test_create_without_name_is_rejected() {
    let app = request_app().await;

    let response = send(&app, Method::POST, "/drds", Some(json!({"drd": {"status": "activated"}}))).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json()["error"]["code"], "VALIDATION_ERROR");

    let response = send(&app, Method::POST, "/drds", None).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let response = send(&app, Method::GET, "/drds", None).await;
    assert_eq!(response.json()["count"], 0);
}

#[tokio::test]
async fn test_create_with_bad_leviathan_uuid_is_rejected() {
    let app = request_app().await;
    let response = send(
        &app,
        Method::POST,
        "/drds",
        Some(json!({"drd": {"name": "Pike", "leviathan_uuid": "nope"}})),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = request_app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/drds")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"drd\": "))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mistyped_fields_are_validation_errors() {
    let app = request_app().await;

    for drd in [
        json!({"name": 42}),
        json!({"name": "Pike", "destroyed_status": "yes"}),
        json!({"name": "Pike", "status": true}),
    ] {
        let response = send(&app, Method::POST, "/drds", Some(json!({"drd": drd.clone()}))).await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY, "{}", drd);
        assert_eq!(response.json()["error"]["code"], "VALIDATION_ERROR");
    }
    let response = send(&app, Method::GET, "/drds", None).await;
    assert_eq!(response.json()["count"], 0);

    let id = id_of(&create_pike(&app).await);
    for drd in [json!({"name": 42}), json!({"destroyed_status": "yes"})] {
        let response = send(
            &app,
            Method::PUT,
            &format!("/drds/{}", id),
            Some(json!({"drd": drd.clone()})),
        )
        .await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY, "{}", drd);
    }
    let drd = send(&app, Method::GET, &format!("/drds/{}", id), None)
        .await
        .json();
    assert_eq!(drd["name"], "Pike");
    assert_eq!(drd["destroyed_status"], false);
}

#[tokio::test]
async fn test_show_unknown_and_malformed_ids() {
    let app = request_app().await;

    let response = send(
        &app,
        Method::GET,
        "/drds/5e7bd8a4-0c53-4b53-a3c3-52ac5ec1c2a1",
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"]["code"], "NOT_FOUND");

    let response = send(&app, Method::GET, "/drds/not-a-uuid", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_then_read() {
    let app = request_app().await;
    let id = id_of(&create_pike(&app).await);

    let response = send(
        &app,
        Method::PUT,
        &format!("/drds/{}", id),
        Some(json!({
            "drd": {
                "status": "deactivated",
                "old_status": "activated",
                "kind": "sentinel",
                "size": "medium",
                "location": "moya",
                "location_detail": "docking bay",
                "destroyed_status": true,
            }
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["size"], "medium");

    let drd = send(&app, Method::GET, &format!("/drds/{}", id), None)
        .await
        .json();
    assert_eq!(drd["name"], "Pike");
    assert_eq!(drd["status"], "deactivated");
    assert_eq!(drd["old_status"], "activated");
    assert_eq!(drd["kind"], "sentinel");
    assert_eq!(drd["size"], "medium");
    assert_eq!(drd["location"], "moya");
    assert_eq!(drd["location_detail"], "docking bay");
    assert_eq!(drd["destroyed_status"], true);
    assert_eq!(drd["leviathan_uuid"], LEVIATHAN_UUID);
}

#[tokio::test]
async fn test_patch_and_update_errors() {
    let app = request_app().await;
    let id = id_of(&create_pike(&app).await);

    let response = send(
        &app,
        Method::PATCH,
        &format!("/drds/{}", id),
        Some(json!({"drd": {"repair_history_url": "http://example.org/repairs/1"}})),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json()["repair_history_url"],
        "http://example.org/repairs/1"
    );

    let response = send(
        &app,
        Method::PUT,
        &format!("/drds/{}", id),
        Some(json!({"drd": {"name": "", "kind": "sentinel"}})),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let drd = send(&app, Method::GET, &format!("/drds/{}", id), None)
        .await
        .json();
    assert_eq!(drd["name"], "Pike");
    assert_eq!(drd["kind"], "standard");

    let response = send(
        &app,
        Method::PUT,
        "/drds/5e7bd8a4-0c53-4b53-a3c3-52ac5ec1c2a1",
        Some(json!({"drd": {"name": "Ghost"}})),
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_clears_and_blanks_fields() {
    let app = request_app().await;
    let id = id_of(&create_pike(&app).await);

    let response = send(
        &app,
        Method::PUT,
        &format!("/drds/{}", id),
        Some(json!({"drd": {"leviathan_url": "", "kind": null, "size": ""}})),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let drd = send(&app, Method::GET, &format!("/drds/{}", id), None)
        .await
        .json();
    assert_eq!(drd["leviathan_url"], "");
    assert!(drd["kind"].is_null());
    assert_eq!(drd["size"], "");
    assert_eq!(drd["leviathan_uuid"], LEVIATHAN_UUID);
    assert!(drd["_links"].get("leviathan").is_none());

    let response = send(
        &app,
        Method::PATCH,
        &format!("/drds/{}", id),
        Some(json!({"drd": {"leviathan_uuid": null, "status": null}})),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let drd = response.json();
    assert!(drd["leviathan_uuid"].is_null());
    assert!(drd["status"].is_null());
    assert_eq!(drd["name"], "Pike");
}

// ============================================================================
// Transitions
// ============================================================================

#[tokio::test]
async fn test_activate_is_idempotent() {
    let app = request_app().await;
    let id = id_of(&create_pike(&app).await);

    for _ in 0..2 {
        let response = send(&app, Method::PUT, &format!("/drds/{}/activate", id), None).await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert!(response.body.is_empty());
    }

    let drd = send(&app, Method::GET, &format!("/drds/{}", id), None)
        .await
        .json();
    assert_eq!(drd["status"], "activated");
}

#[tokio::test]
async fn test_deactivate_is_idempotent_and_touches_only_status() {
    let app = request_app().await;
    let id = id_of(&create_pike(&app).await);

    for _ in 0..2 {
        let response = send(&app, Method::PUT, &format!("/drds/{}/deactivate", id), None).await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);
    }

    let drd = send(&app, Method::GET, &format!("/drds/{}", id), None)
        .await
        .json();
    assert_eq!(drd["status"], "deactivated");
    assert_eq!(drd["name"], "Pike");
    assert_eq!(drd["kind"], "standard");
    assert!(drd["old_status"].is_null());
}

#[tokio::test]
async fn test_transitions_on_missing_drd() {
    let app = request_app().await;
    for action in ["activate", "deactivate"] {
        let response = send(
            &app,
            Method::PUT,
            &format!("/drds/5e7bd8a4-0c53-4b53-a3c3-52ac5ec1c2a1/{}", action),
            None,
        )
        .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);

        let response = send(&app, Method::PUT, &format!("/drds/garbage/{}", action), None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}

// ============================================================================
// Destroy
// ============================================================================

#[tokio::test]
async fn test_destroy_then_read() {
    let app = request_app().await;
    let id = id_of(&create_pike(&app).await);

    let response = send(&app, Method::DELETE, &format!("/drds/{}", id), None).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(response.body.len(), 0);

    let response = send(&app, Method::GET, &format!("/drds/{}", id), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = send(&app, Method::DELETE, &format!("/drds/{}", id), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Collection and hypermedia
// ============================================================================

#[tokio::test]
async fn test_index_filters_by_status() {
    let app = request_app().await;
    create_pike(&app).await;
    send(
        &app,
        Method::POST,
        "/drds",
        Some(json!({"drd": {"name": "Stingray", "status": "deactivated"}})),
    )
    .await;

    let all = send(&app, Method::GET, "/drds", None).await.json();
    assert_eq!(all["count"], 2);
    assert_eq!(all["_embedded"]["items"].as_array().unwrap().len(), 2);

    let deactivated = send(&app, Method::GET, "/drds?status=deactivated", None)
        .await
        .json();
    assert_eq!(deactivated["count"], 1);
    assert_eq!(deactivated["_embedded"]["items"][0]["name"], "Stingray");
}

#[tokio::test]
async fn test_create_link_follows_conditions() {
    let app = request_app().await;

    let with = send(&app, Method::GET, "/drds?conditions%5B%5D=can_create", None)
        .await
        .json();
    assert_eq!(with["_links"]["create"]["method"], "POST");
    assert_eq!(with["_links"]["create"]["href"], "http://localhost:3000/drds");

    let without = send(&app, Method::GET, "/drds", None).await.json();
    assert!(without["_links"].get("create").is_none());
    assert!(without["_links"].get("search").is_some());

    let empty = send(&app, Method::GET, "/drds?conditions%5B%5D=", None)
        .await
        .json();
    assert!(empty["_links"].get("create").is_none());
    assert!(empty["_links"].get("search").is_some());
}

#[tokio::test]
async fn test_empty_conditions_hide_item_transitions() {
    let app = request_app().await;
    let response = send(
        &app,
        Method::POST,
        "/drds",
        Some(json!({"drd": {"name": "Pike", "status": "activated"}, "conditions": []})),
    )
    .await;
    let links = response.json()["_links"].clone();
    for rel in ["activate", "deactivate", "update", "delete"] {
        assert!(links.get(rel).is_none(), "unexpected {}", rel);
    }

    let created = create_pike(&app).await;
    assert!(created["_links"].get("deactivate").is_some());
    assert!(created["_links"].get("activate").is_none());
}

#[tokio::test]
async fn test_ignore_policy_uses_server_conditions() {
    let app = test_app(RenderOptionsPolicy::Ignore, &["can_update"]).await;

    let collection = send(&app, Method::GET, "/drds?conditions%5B%5D=can_create", None)
        .await
        .json();
    assert!(collection["_links"].get("create").is_none());

    let created = send(
        &app,
        Method::POST,
        "/drds",
        Some(json!({"drd": {"name": "Pike"}, "conditions": ["can_delete"], "only": ["name"]})),
    )
    .await
    .json();
    assert!(created["_links"].get("update").is_some());
    assert!(created["_links"].get("delete").is_none());
    assert!(created.get("status").is_some());
}

#[tokio::test]
async fn test_malformed_options_are_inert_when_ignored() {
    let app = test_app(RenderOptionsPolicy::Ignore, &[]).await;

    let response = send(
        &app,
        Method::POST,
        "/drds",
        Some(json!({"drd": {"name": "Pike"}, "conditions": "can_create", "only": 7})),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let id = id_of(&response.json());

    let response = send(
        &app,
        Method::PUT,
        &format!("/drds/{}", id),
        Some(json!({"drd": {"kind": "sentinel"}, "embed_optional": "yes"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let collection = send(&app, Method::GET, "/drds", None).await.json();
    assert_eq!(collection["count"], 1);
}

#[tokio::test]
async fn test_malformed_options_are_rejected_when_honored() {
    let app = request_app().await;

    let response = send(
        &app,
        Method::POST,
        "/drds",
        Some(json!({"drd": {"name": "Pike"}, "conditions": "can_create"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let collection = send(&app, Method::GET, "/drds", None).await.json();
    assert_eq!(collection["count"], 0);
}

#[tokio::test]
async fn test_field_selection_and_link_overrides() {
    let app = request_app().await;
    let id = id_of(&create_pike(&app).await);

    let drd = send(
        &app,
        Method::GET,
        &format!(
            "/drds/{}?only%5B%5D=name&override_links%5Bprofile%5D=http%3A%2F%2Fother%2Fprofile",
            id
        ),
        None,
    )
    .await
    .json();
    assert_eq!(drd["name"], "Pike");
    assert!(drd.get("status").is_none());
    assert_eq!(drd["_links"]["profile"]["href"], "http://other/profile");

    let collection = send(
        &app,
        Method::GET,
        "/drds?embed_optional%5Bitems%5D=link",
        None,
    )
    .await
    .json();
    assert!(collection.get("_embedded").is_none());
    assert_eq!(collection["_links"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_format_suffixes() {
    let app = request_app().await;
    let id = id_of(&create_pike(&app).await);

    let response = send(&app, Method::GET, "/drds.hale_json", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["count"], 1);

    let response = send(&app, Method::GET, &format!("/drds/{}.json", id), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["name"], "Pike");

    let response = send(&app, Method::PUT, &format!("/drds/{}/deactivate.hale_json", id), None).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

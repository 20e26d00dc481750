#![cfg(feature = "http")]

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tether_core::model::FieldUpdate;
use tether_core::{
    AutoConnectSuggestion, ConnectionId, ConnectionPatch, ConnectionStatus, ConnectionType, Error,
    GraphApi, HttpGraphApi, NewConnection, NodeId, ProjectId, SuggestionApi,
};

#[derive(Deserialize)]
struct ProjectQuery {
    project_id: String,
}

fn connection_json(id: &str, project_id: &str, source: &str, target: &str, status: &str) -> Value {
    json!({
        "id": id,
        "project_id": project_id,
        "source_service_id": source,
        "target_service_id": target,
        "connection_type": "api_call",
        "connection_status": status,
        "label": null,
        "description": null,
        "last_verified_at": null,
        "metadata": {},
        "created_by": "u-1",
        "created_at": "2025-03-01T12:00:00Z",
        "updated_at": "2025-03-01T12:00:00Z"
    })
}

async fn list(Query(query): Query<ProjectQuery>) -> Json<Value> {
    Json(json!([
        connection_json("c-1", &query.project_id, "web", "db", "active"),
        connection_json("c-2", &query.project_id, "web", "auth", "definitely_new_status"),
    ]))
}

async fn create(Json(body): Json<Value>) -> impl IntoResponse {
    if body["source_service_id"] == body["target_service_id"] {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Cannot connect a service to itself" })),
        );
    }
    let created = connection_json(
        "srv-9",
        body["project_id"].as_str().unwrap_or_default(),
        body["source_service_id"].as_str().unwrap_or_default(),
        body["target_service_id"].as_str().unwrap_or_default(),
        body["connection_status"].as_str().unwrap_or("active"),
    );
    (StatusCode::CREATED, Json(created))
}

async fn update(Path(id): Path<String>, Json(body): Json<Value>) -> impl IntoResponse {
    if id == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Connection not found" })),
        );
    }
    let mut updated = connection_json(&id, "p", "web", "db", "active");
    if let Some(status) = body.get("connection_status") {
        updated["connection_status"] = status.clone();
    }
    if let Some(description) = body.get("description") {
        updated["description"] = description.clone();
    }
    (StatusCode::OK, Json(updated))
}

async fn delete(Path(id): Path<String>) -> impl IntoResponse {
    if id == "locked" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn suggest(Query(query): Query<ProjectQuery>) -> Json<Value> {
    Json(json!({
        "suggestions": [{
            "source_service_id": format!("{}-web", query.project_id),
            "target_service_id": "db",
            "connection_type": "data_transfer",
            "reason": "DATABASE_URL is referenced",
            "dependency_type": "required"
        }]
    }))
}

async fn apply_bulk(Json(body): Json<Value>) -> impl IntoResponse {
    let project_id = body["project_id"].as_str().unwrap_or_default().to_string();
    let suggestions = body["suggestions"].as_array().cloned().unwrap_or_default();
    if suggestions.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No suggestions provided" })),
        );
    }
    let created: Vec<Value> = suggestions
        .iter()
        .enumerate()
        .map(|(i, s)| {
            connection_json(
                &format!("bulk-{i}"),
                &project_id,
                s["source_service_id"].as_str().unwrap_or_default(),
                s["target_service_id"].as_str().unwrap_or_default(),
                "active",
            )
        })
        .collect();
    (StatusCode::CREATED, Json(json!({ "created": created })))
}

async fn spawn_server() -> HttpGraphApi {
    let app = Router::new()
        .route("/api/connections", get(list).post(create))
        .route("/api/connections/auto", get(suggest).post(apply_bulk))
        .route("/api/connections/{id}", patch(update).delete(delete));
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    HttpGraphApi::new(&format!("http://{addr}")).expect("client")
}

#[tokio::test]
async fn lists_connections_and_tolerates_unknown_status() {
    let api = spawn_server().await;
    let list = api.list(&ProjectId::new("p-7")).await.expect("list");
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].project_id, ProjectId::new("p-7"));
    assert_eq!(list[0].connection_type, ConnectionType::ApiCall);
    assert_eq!(list[1].connection_status, ConnectionStatus::Inactive);
}

#[tokio::test]
async fn create_surfaces_error_message_from_body() {
    let api = spawn_server().await;
    let created = api
        .create(
            &NewConnection::new("p", "web", "db", ConnectionType::ApiCall)
                .with_status(ConnectionStatus::Pending),
        )
        .await
        .expect("create");
    assert_eq!(created.id, ConnectionId::new("srv-9"));
    assert_eq!(created.connection_status, ConnectionStatus::Pending);

    let err = api
        .create(&NewConnection::new("p", "web", "web", ConnectionType::Uses))
        .await
        .unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, Some(400));
            assert_eq!(message, "Cannot connect a service to itself");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn update_sends_only_changed_fields() {
    let api = spawn_server().await;
    let patch = ConnectionPatch {
        connection_status: Some(ConnectionStatus::Error),
        description: FieldUpdate::Set("timeouts since Monday".to_string()),
        ..ConnectionPatch::default()
    };
    let updated = api
        .update(&ConnectionId::new("c-1"), &patch)
        .await
        .expect("update");
    assert_eq!(updated.connection_status, ConnectionStatus::Error);
    assert_eq!(updated.description.as_deref(), Some("timeouts since Monday"));

    let err = api
        .update(&ConnectionId::new("missing"), &patch)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Connection not found");
}

#[tokio::test]
async fn delete_falls_back_to_generic_message() {
    let api = spawn_server().await;
    api.delete(&ConnectionId::new("c-1")).await.expect("delete");

    let err = api.delete(&ConnectionId::new("locked")).await.unwrap_err();
    assert!(matches!(err, Error::Api { status: Some(500), .. }));
    assert_eq!(err.to_string(), "Failed to delete connection");
}

#[tokio::test]
async fn suggestion_endpoints_round_trip() {
    let api = spawn_server().await;
    let project = ProjectId::new("shop");
    let suggestions = api.suggest(&project).await.expect("suggest");
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].source, NodeId::new("shop-web"));
    assert_eq!(suggestions[0].connection_type, ConnectionType::DataTransfer);

    let created = api.apply_bulk(&project, &suggestions).await.expect("apply");
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].target, NodeId::new("db"));

    let empty: Vec<AutoConnectSuggestion> = Vec::new();
    let err = api.apply_bulk(&project, &empty).await.unwrap_err();
    assert_eq!(err.to_string(), "No suggestions provided");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let api = HttpGraphApi::new(&format!("http://{addr}")).expect("client");
    let err = api.list(&ProjectId::new("p")).await.unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));
    assert!(err.is_remote());
}

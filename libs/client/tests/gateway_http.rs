//! Integration tests for the HTTP gateway
//!
//! Each test runs a throwaway axum server standing in for the task API and
//! records every request it receives.

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use client::{
    ApiClient, AuthGateway, CredentialPort, SessionController, SessionStore, TaskGateway,
    TaskSync, models::AuthContext,
};
use common::ClientError;
use serde_json::json;

type Log = Arc<Mutex<Vec<String>>>;

async fn task_api(
    State(log): State<Log>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    log.lock()
        .unwrap()
        .push(format!("{} {} {} {}", method, uri.path(), auth, body).trim().to_string());

    let task = |id: i64, completed: bool| {
        json!({
            "id": id,
            "title": "Report",
            "description": null,
            "completed": completed,
            "user_id": "u1"
        })
    };

    match (method.as_str(), uri.path()) {
        ("POST", "/api/auth/login") => Json(json!({
            "token": "t1",
            "user": {"id": "u1", "email": "a@b.com"}
        }))
        .into_response(),
        ("POST", "/api/auth/signup") => (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Email already registered"})),
        )
            .into_response(),
        ("GET", "/api/auth/profile") => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Could not validate credentials"})),
        )
            .into_response(),
        ("GET", "/api/u1/tasks") => Json(json!({"tasks": [task(5, false)]})).into_response(),
        ("GET", "/api/u2/tasks") => Json(json!({"tasks": [{
            "id": 1,
            "title": "x",
            "completed": false,
            "user_id": "u2",
            "owner_email": "x"
        }]}))
        .into_response(),
        ("POST", "/api/u1/tasks") => (StatusCode::CREATED, Json(task(6, false))).into_response(),
        ("PATCH", "/api/u1/tasks/5/complete") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "Database unavailable"})),
        )
            .into_response(),
        ("DELETE", "/api/u1/tasks/5") => StatusCode::NO_CONTENT.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_api() -> (String, Log) {
    let log = Log::default();
    let app = Router::new().fallback(task_api).with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/api"), log)
}

fn auth(user_id: &str) -> AuthContext {
    AuthContext {
        user_id: user_id.to_string(),
        token: "t1".to_string(),
    }
}

#[tokio::test]
async fn test_login_then_fetch_uses_bearer_token() {
    let (base_url, log) = spawn_api().await;
    let api = ApiClient::new(&base_url).unwrap();
    let store = Arc::new(SessionStore::new(CredentialPort::in_memory("authToken")));

    let session = SessionController::new(api.clone(), store.clone());
    session.login("a@b.com", "x").await.unwrap();

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.user.map(|u| u.id).as_deref(), Some("u1"));
    assert_eq!(snapshot.token.as_deref(), Some("t1"));

    let tasks = TaskSync::new(api, store);
    tasks.load().await.unwrap();
    assert_eq!(tasks.state().tasks().len(), 1);

    let log = log.lock().unwrap().clone();
    assert_eq!(
        log[0],
        r#"POST /api/auth/login - {"email":"a@b.com","password":"x"}"#
    );
    assert_eq!(log[1], "GET /api/u1/tasks Bearer t1");
}

#[tokio::test]
async fn test_server_message_is_surfaced() {
    let (base_url, _log) = spawn_api().await;
    let api = ApiClient::new(&base_url).unwrap();

    let err = api.toggle_task(&auth("u1"), 5).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Server {
            status: 500,
            message: "Database unavailable".to_string()
        }
    );

    let err = api
        .signup(&client::models::SignupRequest {
            email: "a@b.com".into(),
            password: "x".into(),
            name: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Email already registered");
}

#[tokio::test]
async fn test_unauthorized_is_auth_error() {
    let (base_url, log) = spawn_api().await;
    let api = ApiClient::new(&base_url).unwrap();

    let err = api.profile("stale").await.unwrap_err();

    assert_eq!(
        err,
        ClientError::Auth("Could not validate credentials".to_string())
    );
    assert_eq!(log.lock().unwrap()[0], "GET /api/auth/profile Bearer stale");
}

#[tokio::test]
async fn test_unexpected_fields_are_rejected() {
    let (base_url, _log) = spawn_api().await;
    let api = ApiClient::new(&base_url).unwrap();

    let err = api.list_tasks(&auth("u2")).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_create_and_delete() {
    let (base_url, log) = spawn_api().await;
    let api = ApiClient::new(&base_url).unwrap();

    let created = api
        .create_task(
            &auth("u1"),
            &client::models::NewTask {
                title: "Report".into(),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(created.id, 6);

    api.delete_task(&auth("u1"), 5).await.unwrap();

    let log = log.lock().unwrap().clone();
    assert_eq!(log[0], r#"POST /api/u1/tasks Bearer t1 {"title":"Report"}"#);
    assert_eq!(log[1], "DELETE /api/u1/tasks/5 Bearer t1");
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = ApiClient::new(&format!("http://{addr}/api")).unwrap();
    let err = api.list_tasks(&auth("u1")).await.unwrap_err();

    assert_eq!(err, ClientError::Network);
    assert_eq!(err.to_string(), "Network error. Please try again.");
}

//! Web shell routes

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, HeaderName, StatusCode, header::SET_COOKIE},
    middleware,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::{get, patch, post, put},
};
use client::{
    ApiClient, CredentialPort, SessionController, SessionStore, TaskSync,
    models::{Task, User},
    validation::{validate_new_task, validate_task_update},
};
use common::{ApiResponse, ClientError};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{WebError, WebResult},
    guard::{request_credentials, route_guard},
    state::AppState,
};

/// Create the router for the web shell
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/login", get(login_view).post(login))
        .route("/signup", post(signup))
        .route("/logout", post(logout))
        .route("/", get(dashboard))
        .route("/tasks", post(create_task))
        .route("/tasks/:id", put(update_task).delete(delete_task))
        .route("/tasks/:id/complete", patch(toggle_task))
        .layer(middleware::from_fn_with_state(state.clone(), route_guard))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Title and description for task create and update
#[derive(Debug, Deserialize)]
pub struct TaskForm {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// What the login view needs to render
#[derive(Debug, Serialize)]
pub struct LoginView {
    pub login_action: String,
    pub signup_action: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub user: Option<User>,
    pub tasks: Vec<Task>,
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "web"
    }))
}

pub async fn login_view(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(LoginView {
        login_action: state.config.login_path.clone(),
        signup_action: "/signup",
    }))
}

/// Cookie writes made through the session's credential port, as `Set-Cookie` headers
fn cookie_writes(store: &SessionStore) -> AppendHeaders<Vec<(HeaderName, String)>> {
    let writes = store.credentials().cookies().take_writes();
    AppendHeaders(writes.into_iter().map(|c| (SET_COOKIE, c)).collect())
}

/// Session for a sign-in request, starting from empty credentials
fn fresh_session(state: &AppState) -> Arc<SessionStore> {
    Arc::new(SessionStore::new(CredentialPort::in_memory(
        state.config.token_key.clone(),
    )))
}

/// Send the user back through login, expiring the credential cookie
async fn login_required(state: &AppState, store: &SessionStore) -> WebError {
    let mut cookies = store.credentials().cookies().take_writes();
    if cookies.is_empty() {
        store.invalidate().await;
        cookies = store.credentials().cookies().take_writes();
    }

    WebError::LoginRequired {
        cookies,
        login_path: state.config.login_path.clone(),
    }
}

/// Map a task operation failure; a rejected token ends the session
async fn task_failure(state: &AppState, store: &SessionStore, err: ClientError) -> WebError {
    if err.is_auth() {
        login_required(state, store).await
    } else {
        WebError::from(err)
    }
}

/// Restore the session from the request cookie
async fn restore_session(state: &AppState, headers: &HeaderMap) -> WebResult<Arc<SessionStore>> {
    let credentials = request_credentials(&state.config.token_key, headers);
    let store = Arc::new(SessionStore::new(credentials));
    let session = SessionController::new(state.api.clone(), store.clone());

    if session.initialize().await.is_authenticated() {
        Ok(store)
    } else {
        Err(login_required(state, &store).await)
    }
}

/// Restore the session and fetch the user's tasks
async fn load_tasks(
    state: &AppState,
    headers: &HeaderMap,
) -> WebResult<(Arc<SessionStore>, TaskSync<ApiClient>)> {
    let store = restore_session(state, headers).await?;
    let tasks = TaskSync::new(state.api.clone(), store.clone());

    match tasks.load().await {
        Ok(()) => Ok((store, tasks)),
        Err(e) => Err(task_failure(state, &store, e).await),
    }
}

fn require_task(tasks: &TaskSync<ApiClient>, id: i64) -> WebResult<()> {
    match tasks.state().task(id) {
        Some(_) => Ok(()),
        None => Err(WebError::NotFound(id)),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(form): Json<LoginForm>,
) -> WebResult<Response> {
    let store = fresh_session(&state);
    let session = SessionController::new(state.api.clone(), store.clone());

    let user = session.login(&form.email, &form.password).await?;
    Ok((cookie_writes(&store), Json(ApiResponse::ok(user))).into_response())
}

pub async fn signup(
    State(state): State<AppState>,
    Json(form): Json<SignupForm>,
) -> WebResult<Response> {
    let store = fresh_session(&state);
    let session = SessionController::new(state.api.clone(), store.clone());

    let user = session
        .signup(&form.email, &form.password, form.name.as_deref())
        .await?;
    Ok((cookie_writes(&store), Json(ApiResponse::ok(user))).into_response())
}

/// End the session from the request cookie and return to login
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let credentials = request_credentials(&state.config.token_key, &headers);
    let store = Arc::new(SessionStore::new(credentials));
    SessionController::new(state.api.clone(), store.clone())
        .logout()
        .await;

    (cookie_writes(&store), Redirect::to(&state.config.login_path)).into_response()
}

/// Restore the session from the cookie and fetch the user's tasks
///
/// A token the task API rejects sends the user back through login.
pub async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> WebResult<Response> {
    let (store, tasks) = load_tasks(&state, &headers).await?;

    let dashboard = Dashboard {
        user: store.snapshot().await.user,
        tasks: tasks.state().tasks().to_vec(),
    };
    Ok(Json(ApiResponse::ok(dashboard)).into_response())
}

/// Create a task; the input is checked before the session is restored
pub async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(form): Json<TaskForm>,
) -> WebResult<Response> {
    validate_new_task(&form.title, form.description.as_deref())?;
    let store = restore_session(&state, &headers).await?;
    let tasks = TaskSync::new(state.api.clone(), store.clone());

    match tasks.create(&form.title, form.description.as_deref()).await {
        Ok(task) => Ok((StatusCode::CREATED, Json(ApiResponse::ok(task))).into_response()),
        Err(e) => Err(task_failure(&state, &store, e).await),
    }
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(form): Json<TaskForm>,
) -> WebResult<Response> {
    validate_task_update(&form.title, form.description.as_deref())?;
    let (store, tasks) = load_tasks(&state, &headers).await?;
    require_task(&tasks, id)?;

    match tasks.update(id, &form.title, form.description.as_deref()).await {
        Ok(task) => Ok(Json(ApiResponse::ok(task)).into_response()),
        Err(e) => Err(task_failure(&state, &store, e).await),
    }
}

/// Flip completion of a task and answer with its refreshed record
pub async fn toggle_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> WebResult<Response> {
    let (store, tasks) = load_tasks(&state, &headers).await?;
    require_task(&tasks, id)?;

    if let Err(e) = tasks.toggle(id).await {
        return Err(task_failure(&state, &store, e).await);
    }
    let task = tasks.state().task(id).cloned().ok_or(WebError::NotFound(id))?;
    Ok(Json(ApiResponse::ok(task)).into_response())
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> WebResult<Response> {
    let (store, tasks) = load_tasks(&state, &headers).await?;
    require_task(&tasks, id)?;

    match tasks.delete(id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => Err(task_failure(&state, &store, e).await),
    }
}

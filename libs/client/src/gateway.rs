//! API gateway client
//!
//! One method per remote operation. Every method returns an [`ApiResult`]:
//! transport failures become [`ClientError::Network`], a 401 becomes
//! [`ClientError::Auth`], any other non-2xx becomes [`ClientError::Server`]
//! carrying the server's message, and a 2xx body that does not match the
//! expected record becomes [`ClientError::InvalidResponse`]. Nothing is
//! retried here.

use anyhow::{Result, bail};
use common::{AppConfig, ApiResult, ClientError};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, de::DeserializeOwned};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{
    AuthContext, AuthPayload, LoginRequest, NewTask, SignupRequest, Task, TaskUpdate, User,
    task::TaskListBody,
};

/// Authentication operations
pub trait AuthGateway: Send + Sync {
    fn login(&self, request: &LoginRequest) -> impl Future<Output = ApiResult<AuthPayload>> + Send;

    fn signup(&self, request: &SignupRequest)
    -> impl Future<Output = ApiResult<AuthPayload>> + Send;

    fn profile(&self, token: &str) -> impl Future<Output = ApiResult<User>> + Send;

    /// Tell the server the token is no longer in use
    fn logout(&self, token: &str) -> impl Future<Output = ApiResult<()>> + Send;
}

/// Task operations, all scoped to the user in the [`AuthContext`]
pub trait TaskGateway: Send + Sync {
    fn list_tasks(&self, auth: &AuthContext) -> impl Future<Output = ApiResult<Vec<Task>>> + Send;

    fn create_task(
        &self,
        auth: &AuthContext,
        task: &NewTask,
    ) -> impl Future<Output = ApiResult<Task>> + Send;

    fn update_task(
        &self,
        auth: &AuthContext,
        id: i64,
        changes: &TaskUpdate,
    ) -> impl Future<Output = ApiResult<Task>> + Send;

    fn toggle_task(&self, auth: &AuthContext, id: i64)
    -> impl Future<Output = ApiResult<Task>> + Send;

    fn delete_task(&self, auth: &AuthContext, id: i64)
    -> impl Future<Output = ApiResult<()>> + Send;
}

/// Error body returned by the API; `detail` is the FastAPI spelling
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<serde_json::Value>,
    error: Option<String>,
}

/// Fold a non-2xx response into a [`ClientError`]
pub(crate) fn failure(status: StatusCode, body: &[u8], fallback: &str) -> ClientError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| {
            b.message
                .or(match b.detail {
                    Some(serde_json::Value::String(detail)) => Some(detail),
                    _ => None,
                })
                .or(b.error)
        })
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());

    if status == StatusCode::UNAUTHORIZED {
        ClientError::Auth(message)
    } else {
        ClientError::Server {
            status: status.as_u16(),
            message,
        }
    }
}

/// HTTP implementation of both gateways
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            bail!("API base URL cannot have paths appended: {}", base_url);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(&config.api_base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str], token: Option<&str>) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!("{} {}", method, url);

        let builder = self.http.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Authenticated request under `/{user_id}/...`
    fn user_request(
        &self,
        method: Method,
        auth: &AuthContext,
        segments: &[&str],
    ) -> RequestBuilder {
        let mut path = vec![auth.user_id.as_str()];
        path.extend_from_slice(segments);
        self.request(method, &path, Some(auth.token.as_str()))
    }

    /// Send and return the raw body of a 2xx response
    async fn execute(&self, request: RequestBuilder, fallback: &str) -> ApiResult<Vec<u8>> {
        let response = request.send().await.map_err(|e| {
            warn!("{}: {}", fallback, e);
            ClientError::Network
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            warn!("{}: failed to read response body: {}", fallback, e);
            ClientError::Network
        })?;

        if status.is_success() {
            Ok(body.to_vec())
        } else {
            let err = failure(status, &body, fallback);
            warn!("{}: HTTP {}: {}", fallback, status.as_u16(), err);
            Err(err)
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> ApiResult<T> {
        let body = self.execute(request, fallback).await?;
        serde_json::from_slice(&body).map_err(|e| {
            warn!("{}: malformed response body: {}", fallback, e);
            ClientError::InvalidResponse(e.to_string())
        })
    }
}

impl AuthGateway for ApiClient {
    async fn login(&self, request: &LoginRequest) -> ApiResult<AuthPayload> {
        let builder = self
            .request(Method::POST, &["auth", "login"], None)
            .json(request);
        self.fetch(builder, "Login failed").await
    }

    async fn signup(&self, request: &SignupRequest) -> ApiResult<AuthPayload> {
        let builder = self
            .request(Method::POST, &["auth", "signup"], None)
            .json(request);
        self.fetch(builder, "Signup failed").await
    }

    async fn profile(&self, token: &str) -> ApiResult<User> {
        let builder = self.request(Method::GET, &["auth", "profile"], Some(token));
        self.fetch(builder, "Failed to fetch user profile").await
    }

    async fn logout(&self, token: &str) -> ApiResult<()> {
        let builder = self.request(Method::POST, &["auth", "logout"], Some(token));
        self.execute(builder, "Failed to logout").await.map(|_| ())
    }
}

impl TaskGateway for ApiClient {
    async fn list_tasks(&self, auth: &AuthContext) -> ApiResult<Vec<Task>> {
        let builder = self.user_request(Method::GET, auth, &["tasks"]);
        let body: TaskListBody = self.fetch(builder, "Failed to fetch tasks").await?;
        Ok(body.into())
    }

    async fn create_task(&self, auth: &AuthContext, task: &NewTask) -> ApiResult<Task> {
        let builder = self.user_request(Method::POST, auth, &["tasks"]).json(task);
        self.fetch(builder, "Failed to create task").await
    }

    async fn update_task(
        &self,
        auth: &AuthContext,
        id: i64,
        changes: &TaskUpdate,
    ) -> ApiResult<Task> {
        let id = id.to_string();
        let builder = self
            .user_request(Method::PUT, auth, &["tasks", id.as_str()])
            .json(changes);
        self.fetch(builder, "Failed to update task").await
    }

    async fn toggle_task(&self, auth: &AuthContext, id: i64) -> ApiResult<Task> {
        let id = id.to_string();
        let builder = self.user_request(Method::PATCH, auth, &["tasks", id.as_str(), "complete"]);
        self.fetch(builder, "Failed to update task").await
    }

    async fn delete_task(&self, auth: &AuthContext, id: i64) -> ApiResult<()> {
        let id = id.to_string();
        let builder = self.user_request(Method::DELETE, auth, &["tasks", id.as_str()]);
        self.execute(builder, "Failed to delete task").await.map(|_| ())
    }
}

impl<T: AuthGateway> AuthGateway for Arc<T> {
    fn login(&self, request: &LoginRequest) -> impl Future<Output = ApiResult<AuthPayload>> + Send {
        (**self).login(request)
    }

    fn signup(
        &self,
        request: &SignupRequest,
    ) -> impl Future<Output = ApiResult<AuthPayload>> + Send {
        (**self).signup(request)
    }

    fn profile(&self, token: &str) -> impl Future<Output = ApiResult<User>> + Send {
        (**self).profile(token)
    }

    fn logout(&self, token: &str) -> impl Future<Output = ApiResult<()>> + Send {
        (**self).logout(token)
    }
}

impl<T: TaskGateway> TaskGateway for Arc<T> {
    fn list_tasks(
        &self,
        auth: &AuthContext,
    ) -> impl Future<Output = ApiResult<Vec<Task>>> + Send {
        (**self).list_tasks(auth)
    }

    fn create_task(
        &self,
        auth: &AuthContext,
        task: &NewTask,
    ) -> impl Future<Output = ApiResult<Task>> + Send {
        (**self).create_task(auth, task)
    }

    fn update_task(
        &self,
        auth: &AuthContext,
        id: i64,
        changes: &TaskUpdate,
    ) -> impl Future<Output = ApiResult<Task>> + Send {
        (**self).update_task(auth, id, changes)
    }

    fn toggle_task(
        &self,
        auth: &AuthContext,
        id: i64,
    ) -> impl Future<Output = ApiResult<Task>> + Send {
        (**self).toggle_task(auth, id)
    }

    fn delete_task(
        &self,
        auth: &AuthContext,
        id: i64,
    ) -> impl Future<Output = ApiResult<()>> + Send {
        (**self).delete_task(auth, id)
    }
}

//! Error responses for the web shell

use axum::{
    Json,
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use common::{ApiResponse, ClientError};
use thiserror::Error;

/// Custom error type for the web shell
#[derive(Error, Debug)]
pub enum WebError {
    /// Failure reported by the client library
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Task not found: {0}")]
    NotFound(i64),

    /// The session is gone; `cookies` are sent along with the redirect
    #[error("Login required")]
    LoginRequired {
        cookies: Vec<String>,
        login_path: String,
    },
}

impl WebError {
    fn status(&self) -> StatusCode {
        match self {
            WebError::Client(err) => match err {
                ClientError::Validation(_) => StatusCode::BAD_REQUEST,
                ClientError::Auth(_) => StatusCode::UNAUTHORIZED,
                ClientError::Network | ClientError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
                ClientError::Server { status, .. } => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                ClientError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::LoginRequired { .. } => StatusCode::TEMPORARY_REDIRECT,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if let WebError::LoginRequired {
            cookies,
            login_path,
        } = self
        {
            let cookies = cookies.into_iter().map(|c| (SET_COOKIE, c));
            return (AppendHeaders(cookies), Redirect::temporary(&login_path)).into_response();
        }

        let status = self.status();
        let body = Json(ApiResponse::<()>::failure(self.to_string()));

        (status, body).into_response()
    }
}

/// Type alias for handler results
pub type WebResult<T> = Result<T, WebError>;

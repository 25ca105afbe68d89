//! Client library for the task tracker
//!
//! Session handling and task synchronization against the remote task API:
//!
//! - [`gateway`]: typed HTTP operations folded into [`common::ApiResult`]
//! - [`credentials`]: the persisted bearer token, kept in a durable store and
//!   mirrored into a cookie
//! - [`session`]: the authentication state machine and its controller
//! - [`sync`]: optimistic task mutations with reconcile or rollback
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use client::{ApiClient, CredentialPort, SessionController, SessionStore, TaskSync};
//! use common::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let api = ApiClient::from_config(&config)?;
//!     let store = Arc::new(SessionStore::new(CredentialPort::from_config(&config)));
//!
//!     let session = SessionController::new(api.clone(), store.clone());
//!     if session.initialize().await.is_authenticated() {
//!         let tasks = TaskSync::new(api, store);
//!         tasks.load().await?;
//!         println!("{} tasks", tasks.state().tasks().len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod credentials;
pub mod gateway;
pub mod models;
pub mod session;
pub mod sync;
pub mod validation;

#[cfg(test)]
mod testing;

pub use credentials::CredentialPort;
pub use gateway::{ApiClient, AuthGateway, TaskGateway};
pub use session::{SessionController, SessionStore};
pub use sync::{TaskState, TaskSync};

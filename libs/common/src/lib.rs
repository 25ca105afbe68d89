//! Common library for the task tracker
//!
//! This crate provides functionality shared by the client library and the
//! web shell: the error taxonomy, the uniform response envelope,
//! configuration loading and logging setup.

pub mod config;
pub mod error;
pub mod response;
pub mod telemetry;

pub use config::AppConfig;
pub use error::{ApiResult, ClientError};
pub use response::ApiResponse;

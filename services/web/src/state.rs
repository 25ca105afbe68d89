//! Application state shared across handlers

use std::sync::Arc;

use client::ApiClient;
use common::AppConfig;

use crate::guard::GuardPolicy;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub api: ApiClient,
    pub config: Arc<AppConfig>,
    pub policy: Arc<GuardPolicy>,
}

impl AppState {
    pub fn new(api: ApiClient, config: AppConfig) -> Self {
        let policy = GuardPolicy::from_config(&config);
        Self {
            api,
            config: Arc::new(config),
            policy: Arc::new(policy),
        }
    }
}

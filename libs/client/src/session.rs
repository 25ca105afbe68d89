//! Session store and controller
//!
//! [`SessionStore`] owns the authentication state machine and the credential
//! port. [`SessionController`] drives it against an [`AuthGateway`]: silent
//! re-authentication on startup, login, signup and logout.

use common::ApiResult;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::{
    credentials::CredentialPort,
    gateway::AuthGateway,
    models::{AuthContext, AuthPayload, Session, SessionState, User},
    validation::{validate_login, validate_signup},
};

/// Tab-lifetime authentication state
pub struct SessionStore {
    state: RwLock<SessionState>,
    credentials: CredentialPort,
}

impl SessionStore {
    /// Create a store in the `Uninitialized` state
    pub fn new(credentials: CredentialPort) -> Self {
        Self {
            state: RwLock::new(SessionState::Uninitialized),
            credentials,
        }
    }

    pub fn credentials(&self) -> &CredentialPort {
        &self.credentials
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Flat `{user, token, loading}` view of the current state
    pub async fn snapshot(&self) -> Session {
        Session::from(&*self.state.read().await)
    }

    /// Identity and token for task operations, if authenticated
    pub async fn auth_context(&self) -> Option<AuthContext> {
        match &*self.state.read().await {
            SessionState::Authenticated { user, token } => Some(AuthContext {
                user_id: user.id.clone(),
                token: token.clone(),
            }),
            _ => None,
        }
    }

    /// Persist the token and enter `Authenticated`
    async fn authenticate(&self, payload: AuthPayload) -> ApiResult<User> {
        self.credentials.store(&payload.token)?;

        let user = payload.user;
        *self.state.write().await = SessionState::Authenticated {
            user: user.clone(),
            token: payload.token,
        };
        Ok(user)
    }

    /// Clear the persisted token and enter `Unauthenticated`
    pub async fn invalidate(&self) {
        if let Err(e) = self.credentials.clear() {
            error!("Failed to clear persisted credential: {}", e);
        }
        *self.state.write().await = SessionState::Unauthenticated;
    }
}

/// Orchestrates authentication against the gateway
pub struct SessionController<A> {
    gateway: A,
    store: Arc<SessionStore>,
}

impl<A: AuthGateway> SessionController<A> {
    pub fn new(gateway: A, store: Arc<SessionStore>) -> Self {
        Self { gateway, store }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Resolve the startup state from the persisted token
    ///
    /// Runs once; later calls return the current state untouched.
    pub async fn initialize(&self) -> SessionState {
        {
            let mut state = self.store.state.write().await;
            if *state != SessionState::Uninitialized {
                warn!("Session already initialized");
                return state.clone();
            }
            *state = SessionState::Loading;
        }

        let Some(token) = self.store.credentials.token() else {
            info!("No persisted credential, starting unauthenticated");
            *self.store.state.write().await = SessionState::Unauthenticated;
            return SessionState::Unauthenticated;
        };

        match self.gateway.profile(&token).await {
            Ok(user) => {
                info!("Restored session for user: {}", user.id);
                let state = SessionState::Authenticated { user, token };
                *self.store.state.write().await = state.clone();
                state
            }
            Err(e) => {
                warn!("Persisted credential rejected: {}", e);
                self.store.invalidate().await;
                SessionState::Unauthenticated
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        let request = validate_login(email, password)?;
        info!("Login attempt for: {}", request.email);

        let payload = self.gateway.login(&request).await.inspect_err(|e| {
            warn!("Login failed for {}: {}", request.email, e);
        })?;

        let user = self.store.authenticate(payload).await?;
        info!("User logged in: {}", user.id);
        Ok(user)
    }

    pub async fn signup(&self, email: &str, password: &str, name: Option<&str>) -> ApiResult<User> {
        let request = validate_signup(email, password, name)?;
        info!("Signup attempt for: {}", request.email);

        let payload = self.gateway.signup(&request).await.inspect_err(|e| {
            warn!("Signup failed for {}: {}", request.email, e);
        })?;

        let user = self.store.authenticate(payload).await?;
        info!("User signed up: {}", user.id);
        Ok(user)
    }

    /// Drop the session locally, then notify the server
    ///
    /// The server call is best effort; its failure does not undo the logout.
    /// The persisted token is used, so a session that was never initialized
    /// is still signed out on the server.
    pub async fn logout(&self) {
        let token = self.store.credentials.token();
        self.store.invalidate().await;
        info!("User logged out");

        if let Some(token) = token {
            if let Err(e) = self.gateway.logout(&token).await {
                warn!("Server logout notification failed: {}", e);
            }
        }
    }
}

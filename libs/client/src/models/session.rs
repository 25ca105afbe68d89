//! Session model and related functionality

use serde::Serialize;

use super::User;

/// Authentication state machine
///
/// `Uninitialized -> Loading` on mount, `Loading -> Authenticated | Unauthenticated`
/// after the silent re-authentication check, `Unauthenticated -> Authenticated`
/// on login or signup, `Authenticated -> Unauthenticated` on logout or when a
/// request discovers the token is no longer valid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Loading,
    Authenticated { user: User, token: String },
    Unauthenticated,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            SessionState::Authenticated { .. } | SessionState::Unauthenticated
        )
    }
}

/// Flat view of the session handed to views
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user: Option<User>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub loading: bool,
}

impl From<&SessionState> for Session {
    fn from(state: &SessionState) -> Self {
        match state {
            SessionState::Uninitialized | SessionState::Loading => Session {
                user: None,
                token: None,
                loading: true,
            },
            SessionState::Authenticated { user, token } => Session {
                user: Some(user.clone()),
                token: Some(token.clone()),
                loading: false,
            },
            SessionState::Unauthenticated => Session {
                user: None,
                token: None,
                loading: false,
            },
        }
    }
}

/// Identity and credential attached to every task operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub token: String,
}

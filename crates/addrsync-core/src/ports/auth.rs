//! Authorization port

use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

/// Authorization lifecycle as reported by the auth subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthState {
    #[default]
    Uninitialized,
    Refreshed,
    Expired,
    UnrecoverableError,
}

impl AuthState {
    /// Only a refreshed token permits cloud traffic
    #[must_use]
    pub fn is_refreshed(&self) -> bool {
        *self == AuthState::Refreshed
    }
}

impl Display for AuthState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthState::Uninitialized => "uninitialized",
            AuthState::Refreshed => "refreshed",
            AuthState::Expired => "expired",
            AuthState::UnrecoverableError => "unrecoverable_error",
        };
        f.write_str(name)
    }
}

pub trait IAuthObserver: Send + Sync {
    fn on_auth_state_change(&self, state: AuthState);
}

/// Supplies bearer tokens and authorization state changes
pub trait IAuthDelegate: Send + Sync {
    /// Current bearer token, if any
    fn auth_token(&self) -> Option<String>;

    /// Current state, used to seed observers at registration time
    fn auth_state(&self) -> AuthState;

    fn add_auth_observer(&self, observer: Arc<dyn IAuthObserver>);

    fn remove_auth_observer(&self, observer: &Arc<dyn IAuthObserver>);
}

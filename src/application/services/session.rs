use tokio::sync::watch;
use tracing::info;

use crate::domain::entities::auth::AuthState;

/// Explicitly constructed, dependency-injected auth session. Components that
/// depend on the current identity receive this object; the read model
/// subscribes to it so an account switch restarts the paging derivation.
pub struct AuthSession {
    state: watch::Sender<AuthState>,
}

impl AuthSession {
    /// Builds the session from persisted state (or [`AuthState::anonymous`]
    /// on first launch).
    pub fn new(initial: AuthState) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    pub fn anonymous() -> Self {
        Self::new(AuthState::anonymous())
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn set(&self, state: AuthState) {
        info!(user_id = state.id, "auth state replaced");
        self.state.send_replace(state);
    }

    /// Logout: drops identity and token.
    pub fn clear(&self) {
        info!("auth state cleared");
        self.state.send_replace(AuthState::anonymous());
    }

    pub fn is_authorized(&self) -> bool {
        !self.state.borrow().is_anonymous()
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::anonymous()
    }
}

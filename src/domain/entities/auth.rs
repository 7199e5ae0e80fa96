use serde::{Deserialize, Serialize};

/// Identity the client is currently acting as. `id == 0` means anonymous;
/// mutating actions (likes, posts) require a non-anonymous id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    pub id: i64,
    pub token: Option<String>,
    pub login: Option<String>,
}

impl AuthState {
    pub fn new(id: i64, token: String, login: String) -> Self {
        Self {
            id,
            token: Some(token),
            login: Some(login),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            id: 0,
            token: None,
            login: None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.id == 0
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::anonymous()
    }
}

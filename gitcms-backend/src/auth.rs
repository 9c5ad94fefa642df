use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

pub const BACKEND_NAME: &str = "gitlab";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Credentials {
    pub token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoredUser {
    pub id: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub token: String,
    pub backend: String,
}

pub trait AuthStore: Send + Sync {
    fn retrieve(&self) -> Option<StoredUser>;
    fn persist(&self, user: StoredUser);
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryAuthStore {
    user: RwLock<Option<StoredUser>>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuthStore for MemoryAuthStore {
    fn retrieve(&self) -> Option<StoredUser> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn persist(&self, user: StoredUser) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    fn clear(&self) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

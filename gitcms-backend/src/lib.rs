mod auth;
mod backend;
mod config;
mod cursor;
mod entries;

pub use auth::{AuthStore, BACKEND_NAME, Credentials, MemoryAuthStore, StoredUser};
pub use backend::{BackendError, Collection, EntryPage, GitlabBackend, WRITE_ACCESS};
pub use config::{BackendConfig, ConfigError, DEFAULT_API_ROOT, DEFAULT_BRANCH, PublishMode};
pub use cursor::{Cursor, CursorAction, CursorMeta};
pub use entries::Entry;

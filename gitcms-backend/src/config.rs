use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entries::DEFAULT_FETCH_CONCURRENCY;

pub const DEFAULT_API_ROOT: &str = "https://gitlab.com/api/v4";
pub const DEFAULT_BRANCH: &str = "master";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("backend configuration must contain a repo")]
    MissingRepo,
    #[error("gitlab backend does not support the editorial workflow")]
    UnsupportedWorkflow,
    #[error("invalid api root: {0}")]
    InvalidApiRoot(#[from] url::ParseError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    #[default]
    Simple,
    EditorialWorkflow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub repo: String,
    pub branch: String,
    pub api_root: String,
    pub publish_mode: PublishMode,
    pub per_page: u64,
    pub fetch_concurrency: usize,
}

impl BackendConfig {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            branch: DEFAULT_BRANCH.to_string(),
            api_root: DEFAULT_API_ROOT.to_string(),
            publish_mode: PublishMode::Simple,
            per_page: gitcms_core::DEFAULT_PER_PAGE,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into();
        self
    }

    pub fn publish_mode(mut self, publish_mode: PublishMode) -> Self {
        self.publish_mode = publish_mode;
        self
    }

    pub fn per_page(mut self, per_page: u64) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    pub fn fetch_concurrency(mut self, fetch_concurrency: usize) -> Self {
        self.fetch_concurrency = fetch_concurrency.max(1);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.repo.trim().is_empty() {
            return Err(ConfigError::MissingRepo);
        }
        if self.publish_mode == PublishMode::EditorialWorkflow {
            return Err(ConfigError::UnsupportedWorkflow);
        }
        Ok(())
    }
}

use std::fmt;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;
use url::Url;

use gitcms_core::{FileCommit, GitlabClient, GitlabError, TreePage, TreeQuery};

use crate::auth::{AuthStore, BACKEND_NAME, Credentials, StoredUser};
use crate::config::{BackendConfig, ConfigError};
use crate::cursor::{Cursor, CursorAction};
use crate::entries::{self, Entry};

pub const WRITE_ACCESS: u64 = 30;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("not authenticated with gitlab")]
    NotAuthenticated,
    #[error("account has no write access to the repo (access level {access_level})")]
    InsufficientAccess { access_level: u64 },
    #[error("gitlab api: {0}")]
    Api(#[from] GitlabError),
    #[error("cursor does not offer the {0} action")]
    ActionUnavailable(CursorAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collection {
    Folder { name: String, folder: String },
    Files { name: String, files: Vec<String> },
}

impl Collection {
    pub fn folder(name: impl Into<String>, folder: impl Into<String>) -> Self {
        Collection::Folder {
            name: name.into(),
            folder: folder.into(),
        }
    }

    pub fn files(name: impl Into<String>, files: Vec<String>) -> Self {
        Collection::Files {
            name: name.into(),
            files,
        }
    }
}

#[derive(Debug)]
pub struct EntryPage {
    pub entries: Vec<Entry>,
    pub cursor: Cursor,
}

pub struct GitlabBackend {
    config: BackendConfig,
    api_root: Url,
    http: Client,
    store: Arc<dyn AuthStore>,
}

impl fmt::Debug for GitlabBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitlabBackend")
            .field("config", &self.config)
            .field("api_root", &self.api_root)
            .finish_non_exhaustive()
    }
}

impl GitlabBackend {
    pub fn new(config: BackendConfig, store: Arc<dyn AuthStore>) -> Result<Self, BackendError> {
        Self::with_http(Client::new(), config, store)
    }

    pub fn with_http(
        http: Client,
        config: BackendConfig,
        store: Arc<dyn AuthStore>,
    ) -> Result<Self, BackendError> {
        config.validate()?;
        let api_root = Url::parse(&config.api_root).map_err(ConfigError::InvalidApiRoot)?;
        Ok(Self {
            config,
            api_root,
            http,
            store,
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub async fn authenticate(&self, credentials: Credentials) -> Result<StoredUser, BackendError> {
        let client = self.client_with_token(&credentials.token)?;
        let user = client.current_user().await?;
        let project = client.project_info().await?;
        let access_level = project.max_access_level();
        if access_level < WRITE_ACCESS {
            return Err(BackendError::InsufficientAccess { access_level });
        }
        let stored = StoredUser {
            id: user.id,
            username: user.username,
            name: user.name,
            token: credentials.token,
            backend: BACKEND_NAME.to_string(),
        };
        self.store.persist(stored.clone());
        debug!(user = stored.id, repo = %self.config.repo, "gitlab session established");
        Ok(stored)
    }

    pub async fn restore_user(&self) -> Result<StoredUser, BackendError> {
        let stored = self.current_user().ok_or(BackendError::NotAuthenticated)?;
        self.authenticate(Credentials::new(stored.token)).await
    }

    pub fn current_user(&self) -> Option<StoredUser> {
        self.store
            .retrieve()
            .filter(|user| user.backend == BACKEND_NAME)
    }

    pub fn token(&self) -> Option<String> {
        self.current_user().map(|user| user.token)
    }

    pub fn logout(&self) {
        self.store.clear();
    }

    pub async fn list_entries(&self, collection: &Collection) -> Result<EntryPage, BackendError> {
        match collection {
            Collection::Folder { folder, .. } => self.list_folder(folder).await,
            Collection::Files { files, .. } => self.list_files(files).await,
        }
    }

    pub async fn traverse(
        &self,
        cursor: Cursor,
        action: CursorAction,
    ) -> Result<EntryPage, BackendError> {
        let url = cursor
            .action_url(action)
            .cloned()
            .ok_or(BackendError::ActionUnavailable(action))?;
        let client = self.authenticated_client()?;
        debug!(
            folder = %cursor.meta.folder,
            %action,
            from_page = cursor.meta.current_page,
            "traversing listing"
        );
        let page = client.fetch_tree_page(url).await?;
        self.page_result(&client, &cursor.meta.folder, page).await
    }

    pub async fn persist_entry(
        &self,
        path: &str,
        content: &str,
        commit_message: &str,
    ) -> Result<FileCommit, BackendError> {
        let client = self.authenticated_client()?;
        let branch = &self.config.branch;
        match client.update_file(path, content, branch, commit_message).await {
            Ok(commit) => Ok(commit),
            Err(GitlabError::Api { status, .. })
                if status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND =>
            {
                Ok(client
                    .create_file(path, content, branch, commit_message)
                    .await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_entry(&self, path: &str, commit_message: &str) -> Result<(), BackendError> {
        let client = self.authenticated_client()?;
        client
            .delete_file(path, &self.config.branch, commit_message)
            .await?;
        Ok(())
    }

    async fn list_folder(&self, folder: &str) -> Result<EntryPage, BackendError> {
        let client = self.authenticated_client()?;
        let query = TreeQuery::new(folder).per_page(self.config.per_page);
        let (info, _) = client.probe_tree(&query).await?;
        let last_page = info.page_count.max(1);
        // The reported count wins; some servers round instead of taking
        // the ceiling, and the navigation links follow their count.
        if info.page_count != info.expected_page_count() {
            debug!(
                folder,
                reported = info.page_count,
                derived = info.expected_page_count(),
                "page count headers disagree with ceiling division"
            );
        }
        debug!(
            folder,
            total = info.total_count,
            pages = info.page_count,
            "listing newest entries"
        );
        let page = client.list_tree(&query.page(last_page)).await?;
        self.page_result(&client, folder, page).await
    }

    async fn list_files(&self, files: &[String]) -> Result<EntryPage, BackendError> {
        let client = self.authenticated_client()?;
        let entries = entries::fetch_paths(
            &client,
            &self.config.branch,
            files.to_vec(),
            self.config.fetch_concurrency,
        )
        .await?;
        Ok(EntryPage {
            entries,
            cursor: Cursor::unpaginated(),
        })
    }

    async fn page_result(
        &self,
        client: &GitlabClient,
        folder: &str,
        page: TreePage,
    ) -> Result<EntryPage, BackendError> {
        let cursor = Cursor::from_listing(folder, &page.info, &page.links);
        let entries = entries::materialize_blobs(
            client,
            &self.config.branch,
            &page.entries,
            self.config.fetch_concurrency,
        )
        .await?;
        Ok(EntryPage { entries, cursor })
    }

    fn authenticated_client(&self) -> Result<GitlabClient, BackendError> {
        let user = self.store.retrieve().ok_or(BackendError::NotAuthenticated)?;
        self.client_with_token(&user.token)
    }

    fn client_with_token(&self, token: &str) -> Result<GitlabClient, BackendError> {
        Ok(GitlabClient::with_http(
            self.http.clone(),
            self.api_root.as_str(),
            self.config.repo.clone(),
            token,
        )?)
    }
}

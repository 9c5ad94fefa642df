use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::pagination::{PageInfo, PageLinks, PaginationError};

const DEFAULT_BASE_URL: &str = "https://gitlab.com/api/v4";

pub const DEFAULT_PER_PAGE: u64 = 20;

#[derive(Debug, Error)]
pub enum GitlabError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("listing response unusable: {0}")]
    Pagination(#[from] PaginationError),
}

#[derive(Clone)]
pub struct GitlabClient {
    http: Client,
    base_url: Url,
    project: String,
    token: String,
}

impl GitlabClient {
    pub fn new(project: impl Into<String>, token: impl Into<String>) -> Result<Self, GitlabError> {
        Self::with_base_url(DEFAULT_BASE_URL, project, token)
    }

    pub fn with_base_url(
        base_url: &str,
        project: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, GitlabError> {
        Self::with_http(Client::new(), base_url, project, token)
    }

    pub fn with_http(
        http: Client,
        base_url: &str,
        project: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, GitlabError> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            project: project.into(),
            token: token.into(),
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub async fn current_user(&self) -> Result<GitlabUser, GitlabError> {
        let url = self.endpoint(&["user"])?;
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn project_info(&self) -> Result<GitlabProject, GitlabError> {
        let url = self.endpoint(&["projects", &self.project])?;
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn list_tree(&self, query: &TreeQuery) -> Result<TreePage, GitlabError> {
        let mut url = self.endpoint(&["projects", &self.project, "repository", "tree"])?;
        query.apply(&mut url);
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::tree_page(response).await
    }

    pub async fn probe_tree(
        &self,
        query: &TreeQuery,
    ) -> Result<(PageInfo, PageLinks), GitlabError> {
        let mut url = self.endpoint(&["projects", &self.project, "repository", "tree"])?;
        query.apply(&mut url);
        let response = self
            .http
            .head(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let info = PageInfo::from_headers(response.headers())?;
        let links = PageLinks::from_headers(response.headers())?;
        Ok((info, links))
    }

    pub async fn fetch_tree_page(&self, url: Url) -> Result<TreePage, GitlabError> {
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::tree_page(response).await
    }

    pub async fn raw_file(&self, path: &str, reference: &str) -> Result<String, GitlabError> {
        let mut url = self.endpoint(&[
            "projects",
            &self.project,
            "repository",
            "files",
            path,
            "raw",
        ])?;
        url.query_pairs_mut().append_pair("ref", reference);
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.text().await?)
    }

    pub async fn create_file(
        &self,
        path: &str,
        content: &str,
        branch: &str,
        commit_message: &str,
    ) -> Result<FileCommit, GitlabError> {
        let url = self.file_endpoint(path)?;
        let response = self
            .http
            .post(url)
            .header("Authorization", self.auth_header_value())
            .json(&FileCommitRequest {
                branch,
                content,
                commit_message,
            })
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn update_file(
        &self,
        path: &str,
        content: &str,
        branch: &str,
        commit_message: &str,
    ) -> Result<FileCommit, GitlabError> {
        let url = self.file_endpoint(path)?;
        let response = self
            .http
            .put(url)
            .header("Authorization", self.auth_header_value())
            .json(&FileCommitRequest {
                branch,
                content,
                commit_message,
            })
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn delete_file(
        &self,
        path: &str,
        branch: &str,
        commit_message: &str,
    ) -> Result<(), GitlabError> {
        let url = self.file_endpoint(path)?;
        let response = self
            .http
            .delete(url)
            .header("Authorization", self.auth_header_value())
            .json(&FileDeleteRequest {
                branch,
                commit_message,
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }

    fn file_endpoint(&self, path: &str) -> Result<Url, GitlabError> {
        self.endpoint(&["projects", &self.project, "repository", "files", path])
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GitlabError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GitlabError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn auth_header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }

    async fn tree_page(response: reqwest::Response) -> Result<TreePage, GitlabError> {
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let info = PageInfo::from_headers(response.headers())?;
        let links = PageLinks::from_headers(response.headers())?;
        let entries = response.json::<Vec<TreeEntry>>().await?;
        Ok(TreePage { entries, info, links })
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GitlabError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn api_error(response: reqwest::Response) -> GitlabError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        GitlabError::Api { status, body }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeQuery {
    pub path: String,
    pub page: Option<u64>,
    pub per_page: u64,
    pub recursive: bool,
}

impl TreeQuery {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            page: None,
            per_page: DEFAULT_PER_PAGE,
            recursive: false,
        }
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn per_page(mut self, per_page: u64) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    fn apply(&self, url: &mut Url) {
        let mut query = url.query_pairs_mut();
        query.append_pair("path", &self.path);
        if let Some(page) = self.page {
            query.append_pair("page", &page.to_string());
        }
        query.append_pair("per_page", &self.per_page.to_string());
        query.append_pair("recursive", if self.recursive { "true" } else { "false" });
    }
}

#[derive(Debug)]
pub struct TreePage {
    pub entries: Vec<TreeEntry>,
    pub info: PageInfo,
    pub links: PageLinks,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TreeEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub path: String,
    pub mode: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Blob,
    Tree,
    Commit,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitlabUser {
    pub id: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitlabProject {
    #[serde(default)]
    pub permissions: ProjectPermissions,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct ProjectPermissions {
    #[serde(default)]
    pub project_access: Option<ProjectAccess>,
    #[serde(default)]
    pub group_access: Option<ProjectAccess>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ProjectAccess {
    pub access_level: u64,
}

impl GitlabProject {
    pub fn max_access_level(&self) -> u64 {
        let project = self
            .permissions
            .project_access
            .map_or(0, |access| access.access_level);
        let group = self
            .permissions
            .group_access
            .map_or(0, |access| access.access_level);
        project.max(group)
    }
}

#[derive(Debug, Serialize)]
struct FileCommitRequest<'a> {
    branch: &'a str,
    content: &'a str,
    commit_message: &'a str,
}

#[derive(Debug, Serialize)]
struct FileDeleteRequest<'a> {
    branch: &'a str,
    commit_message: &'a str,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileCommit {
    pub file_path: String,
    pub branch: String,
}

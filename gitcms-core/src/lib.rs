mod client;
mod pagination;

pub use client::{
    DEFAULT_PER_PAGE, EntryType, FileCommit, GitlabClient, GitlabError, GitlabProject,
    GitlabUser, ProjectAccess, ProjectPermissions, TreeEntry, TreePage, TreeQuery,
};
pub use pagination::{PageInfo, PageLinks, PaginationError};

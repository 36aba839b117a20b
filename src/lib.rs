//! Grouprepo gives every student group one version-controlled repository,
//! behind a single contract whatever the backend:
//!
//! * `svn`: a centralized, Subversion-like store with numbered revisions
//!   (`grouprepo_on_disk`),
//! * `git`: bare git repositories (`grouprepo_git`).
//!
//! `resolve` picks the backend for a `Config`; `RepositoryBinding` ties
//! groups to their repositories and keeps course staff and group members
//! in the permission file.

pub use grouprepo_core::{config, path, permission, repo, revision, transaction};

pub use grouprepo_core::config::{BackendKind, Config};
pub use grouprepo_core::permission::{Permission, PermissionSet};
pub use grouprepo_core::repo::{
    with_repository, Error, Repository, RepositoryFactory, RepositoryGuard, Result,
};
pub use grouprepo_core::revision::{FileEntry, Revision, RevisionId};
pub use grouprepo_core::transaction::Transaction;
pub use grouprepo_core::TempStorage;

mod factory;
pub use factory::{resolve, resolve_kind};

mod group;
pub use group::{Group, RepositoryBinding, Staff};

//! This crate provides the distributed backend: every group repository is a
//! bare git repository, accessed through libgit2.
//!
//! Revisions are commits on the branch `HEAD` points to. Permissions are
//! kept in a gitolite-style configuration file shared by all repositories
//! of a `Config`.

mod git_repo;
pub use git_repo::{GitFactory, GitRepository};

mod gitolite;
pub use gitolite::GitoliteFormat;

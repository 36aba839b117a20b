//! This crate provides a centralized, Subversion-like repository backend
//! that stores its revisions on the local file system.
//!
//! Every commit produces the next revision number. File content is stored
//! once per distinct content, zlib-compressed and addressed by hash.
//! Permissions are kept in a Subversion `authz` file shared by all
//! repositories of a `Config`.

mod authz;
pub use authz::AuthzFormat;

mod blob;
mod manifest;

mod on_disk_repo;
pub use on_disk_repo::{SvnFactory, SvnRepository};

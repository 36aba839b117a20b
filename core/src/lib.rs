//! This crate implements the core data model for a group repository:
//! the repository contract, revisions, permissions and the files that
//! record them.

pub mod config;
pub mod path;
pub mod permission;
pub mod repo;
pub mod revision;
pub mod transaction;

mod temp_storage;
pub use temp_storage::TempStorage;

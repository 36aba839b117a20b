use std::path::PathBuf;

use thiserror::Error;

use crate::permission::PermissionSet;

/// Describes the potential error conditions that might arise from grouprepo
/// `Repository` and `RepositoryFactory` operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown repository backend `{0}`")]
    UnknownBackend(String),

    #[error("a repository already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("repository not found at {0}")]
    NotFound(PathBuf),

    /// Creation and permission changes are reserved for the authoritative
    /// (repository admin) process.
    #[error("cannot modify repository at {0}: not in repository admin mode")]
    NotAdmin(PathBuf),

    #[error("repository at {0} has been closed")]
    ClosedRepository(PathBuf),

    #[error("repository at {0} has no revisions yet")]
    EmptyRepository(PathBuf),

    /// The handle a revision was obtained from has been closed.
    #[error("revision {revision} of {location} is no longer available")]
    RevisionUnavailable { location: PathBuf, revision: String },

    #[error("revision `{revision}` not found in {location}")]
    RevisionNotFound { location: PathBuf, revision: String },

    #[error("file `{path}` not found in revision {revision}")]
    FileNotFound { path: String, revision: String },

    #[error("transaction conflict on `{path}`: {reason}")]
    TransactionConflict { path: String, reason: &'static str },

    #[error("invalid repository path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// A user name that cannot be recorded in a permission file.
    #[error("invalid principal `{principal}`: {reason}")]
    InvalidPrincipal {
        principal: String,
        reason: &'static str,
    },

    #[error("could not write permission file {path}: {source}")]
    PermissionWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The repository exists but its initial permissions were not recorded.
    /// Retry the permission step alone; do not create the repository again.
    #[error("repository created at {location} but permission bootstrap failed: {source}")]
    PermissionBootstrapFailed {
        location: PathBuf,
        permissions: PermissionSet,
        #[source]
        source: Box<Error>,
    },

    #[error("malformed permission file {path} at line {line}: {reason}")]
    InvalidPermissionFile {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    BackendError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Returns true if the failure is transient I/O rather than a violated
    /// precondition. Nothing in grouprepo retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::IoError(_) | Error::PermissionWrite { .. } | Error::BackendError(_) => true,
            Error::PermissionBootstrapFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// A specialized `Result` type for grouprepo operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn retryable_classification() {
        let io_err = Error::from(io::Error::new(io::ErrorKind::Other, "disk hiccup"));
        assert!(io_err.is_retryable());

        assert!(!Error::AlreadyExists(PathBuf::from("/x")).is_retryable());
        assert!(!Error::ClosedRepository(PathBuf::from("/x")).is_retryable());

        let bootstrap = Error::PermissionBootstrapFailed {
            location: PathBuf::from("/x"),
            permissions: PermissionSet::new(),
            source: Box::new(Error::PermissionWrite {
                path: PathBuf::from("/perms"),
                source: io::Error::new(io::ErrorKind::TimedOut, "locked"),
            }),
        };
        assert!(bootstrap.is_retryable());
    }

    #[test]
    fn messages_name_the_location() {
        let err = Error::NotFound(PathBuf::from("/srv/repos/group_0007"));
        assert_eq!(
            err.to_string(),
            "repository not found at /srv/repos/group_0007"
        );
    }
}

//! Represents an abstract group repository.
//!
//! ## Design Goals
//!
//! Grouprepo presents one contract over version-control backends with
//! different native semantics. A `RepositoryFactory` is bound to one backend
//! and one `Config`; it creates, finds and opens repositories and owns the
//! permission file for them. An open `Repository` hands out `Revision`s and
//! must be closed to release its backend resources (see
//! `with_repository` for the scoped form).

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

mod access;
pub use access::{with_repository, RepositoryGuard};

mod error;
pub use error::{Error, Result};

mod slot;
pub use slot::Slot;

use crate::config::{repository_name, BackendKind, Config};
use crate::permission::{PermissionFile, PermissionSet};
use crate::revision::{Revision, RevisionId};
use crate::transaction::Transaction;

/// An open handle on one repository.
///
/// Every method except `close` and `is_closed` fails with
/// `Error::ClosedRepository` once the handle is closed. Closing twice is a
/// no-op.
pub trait Repository: Send {
    fn location(&self) -> &Path;

    fn kind(&self) -> BackendKind;

    /// The most recent revision; `Error::EmptyRepository` if there is none.
    fn latest_revision(&self) -> Result<Revision>;

    fn revision(&self, id: &RevisionId) -> Result<Revision>;

    /// The latest revision recorded at or before `at`.
    fn revision_at(&self, at: DateTime<Utc>) -> Result<Revision>;

    /// Record `transaction` as a new revision and return it.
    fn commit(&mut self, transaction: Transaction) -> Result<Revision>;

    /// Release the backend resources held by this handle. Revisions
    /// obtained through the handle become unavailable.
    fn close(&mut self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

impl fmt::Debug for dyn Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("location", &self.location())
            .field("kind", &self.kind())
            .finish()
    }
}

/// Creates, finds and opens repositories of one backend, and manages their
/// permissions.
///
/// Backends implement the storage hooks (`init_storage`, `open_existing`,
/// `repository_exists`); the lifecycle rules shared by all backends live in
/// the provided methods.
pub trait RepositoryFactory: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn config(&self) -> &Config;

    fn permission_file(&self) -> &PermissionFile;

    /// Returns true if a complete repository of this backend is stored at
    /// `location`.
    fn repository_exists(&self, location: &Path) -> bool;

    /// Lay out an empty repository in the (empty) directory `staging`.
    fn init_storage(&self, staging: &Path) -> Result<()>;

    /// Open the repository at `location`, known to exist.
    fn open_existing(&self, location: &Path) -> Result<Box<dyn Repository>>;

    /// Create an empty repository at `location`.
    ///
    /// Fails with `Error::AlreadyExists` if anything is stored there
    /// already, leaving it untouched, and with `Error::NotAdmin` outside
    /// repository admin mode.
    fn create(&self, location: &Path) -> Result<()> {
        self.ensure_admin(location)?;
        create_atomically(location, |staging| self.init_storage(staging))?;

        log::info!(
            target: "repo",
            "Created {} repository at {}",
            self.kind(),
            location.display()
        );
        Ok(())
    }

    /// Open the repository at `location`. Never creates one.
    fn open(&self, location: &Path) -> Result<Box<dyn Repository>> {
        if !self.repository_exists(location) {
            return Err(Error::NotFound(location.to_path_buf()));
        }

        let repo = self.open_existing(location)?;
        log::debug!(target: "repo", "Opened {}", location.display());
        Ok(repo)
    }

    /// Permissions currently recorded for the repository at `location`.
    fn permissions(&self, location: &Path) -> Result<PermissionSet> {
        self.permission_file()
            .permissions_of(&repository_name(location))
    }

    /// Merge `permissions` into those of the repository at `location`.
    /// Principals not mentioned keep their access; `Permission::None`
    /// revokes.
    fn set_bulk_permissions(&self, location: &Path, permissions: &PermissionSet) -> Result<()> {
        self.ensure_admin(location)?;
        self.permission_file()
            .grant(&repository_name(location), permissions)
    }

    /// Replace the permissions of the repository at `location`.
    fn set_all_permissions(&self, location: &Path, permissions: &PermissionSet) -> Result<()> {
        self.ensure_admin(location)?;
        self.permission_file()
            .replace(&repository_name(location), permissions)
    }

    /// Remove every grant `principals` hold on the repository at `location`.
    fn delete_bulk_permissions(&self, location: &Path, principals: &[&str]) -> Result<()> {
        self.ensure_admin(location)?;
        self.permission_file()
            .revoke(&repository_name(location), principals)
    }

    fn ensure_admin(&self, location: &Path) -> Result<()> {
        if self.config().is_repository_admin {
            Ok(())
        } else {
            Err(Error::NotAdmin(location.to_path_buf()))
        }
    }
}

/// Build a directory with `init` next to `location` and rename it into
/// place, so nobody observes a partially created repository.
pub fn create_atomically<F>(location: &Path, init: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    if location.exists() {
        return Err(Error::AlreadyExists(location.to_path_buf()));
    }

    let parent = match location.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let staging = tempfile::Builder::new()
        .prefix(".creating-")
        .tempdir_in(parent)?;
    init(staging.path())?;

    if let Err(err) = fs::rename(staging.path(), location) {
        // Somebody else won a race to create the same repository.
        if location.exists() {
            return Err(Error::AlreadyExists(location.to_path_buf()));
        }
        return Err(err.into());
    }

    // Renamed away; nothing left to clean up.
    staging.into_path();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_in_place() {
        let root = tempfile::tempdir().unwrap();
        let location = root.path().join("nested/group_0001");

        create_atomically(&location, |staging| {
            fs::write(staging.join("format"), "1\n")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(fs::read_to_string(location.join("format")).unwrap(), "1\n");
        let leftovers = fs::read_dir(root.path().join("nested")).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn existing_location_is_untouched() {
        let root = tempfile::tempdir().unwrap();
        let location = root.path().join("group_0001");
        fs::create_dir(&location).unwrap();
        fs::write(location.join("keep"), "me").unwrap();

        let err = create_atomically(&location, |_| panic!("must not build")).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert_eq!(fs::read_to_string(location.join("keep")).unwrap(), "me");
    }

    #[test]
    fn failed_init_leaves_nothing() {
        let root = tempfile::tempdir().unwrap();
        let location = root.path().join("group_0001");

        let err = create_atomically(&location, |_| {
            Err(Error::from(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        })
        .unwrap_err();

        assert!(matches!(err, Error::IoError(_)));
        assert!(!location.exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }
}

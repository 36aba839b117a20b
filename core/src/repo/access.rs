use std::ops::{Deref, DerefMut};
use std::path::Path;

use super::{Repository, RepositoryFactory, Result};

/// Owns an open repository and closes it when dropped, whatever the exit
/// path (including unwinding).
///
/// Prefer `close` on the normal path: it reports close errors, which `Drop`
/// can only log.
pub struct RepositoryGuard {
    repo: Box<dyn Repository>,
}

impl RepositoryGuard {
    pub fn new(repo: Box<dyn Repository>) -> RepositoryGuard {
        RepositoryGuard { repo }
    }

    pub fn close(mut self) -> Result<()> {
        self.repo.close()
    }
}

impl Deref for RepositoryGuard {
    type Target = dyn Repository;

    fn deref(&self) -> &Self::Target {
        self.repo.as_ref()
    }
}

impl DerefMut for RepositoryGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.repo.as_mut()
    }
}

impl Drop for RepositoryGuard {
    fn drop(&mut self) {
        if self.repo.is_closed() {
            return;
        }
        if let Err(err) = self.repo.close() {
            log::error!(
                target: "repo",
                "Failed to close {}: {}",
                self.repo.location().display(),
                err
            );
        }
    }
}

/// Open the repository at `location`, pass it to `op`, and close it on
/// every exit path.
///
/// An error from `op` takes precedence over an error from closing.
pub fn with_repository<T, F>(
    factory: &dyn RepositoryFactory,
    location: &Path,
    op: F,
) -> Result<T>
where
    F: FnOnce(&mut dyn Repository) -> Result<T>,
{
    let mut guard = RepositoryGuard::new(factory.open(location)?);
    let result = op(&mut *guard);

    match (result, guard.close()) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), _) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::config::{BackendKind, Config};
    use crate::permission::PermissionFile;
    use crate::repo::{Error, Slot};
    use crate::revision::{Revision, RevisionId};
    use crate::transaction::Transaction;

    struct Counting {
        location: PathBuf,
        slot: Slot<()>,
        closes: Arc<AtomicUsize>,
    }

    impl Repository for Counting {
        fn location(&self) -> &Path {
            &self.location
        }

        fn kind(&self) -> BackendKind {
            BackendKind::Svn
        }

        fn latest_revision(&self) -> Result<Revision> {
            self.slot
                .with(|_| Err(Error::EmptyRepository(self.location.clone())))
                .unwrap_or_else(|| Err(Error::ClosedRepository(self.location.clone())))
        }

        fn revision(&self, _id: &RevisionId) -> Result<Revision> {
            self.latest_revision()
        }

        fn revision_at(&self, _at: DateTime<Utc>) -> Result<Revision> {
            self.latest_revision()
        }

        fn commit(&mut self, _transaction: Transaction) -> Result<Revision> {
            self.latest_revision()
        }

        fn close(&mut self) -> Result<()> {
            if self.slot.close() {
                self.closes.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }

        fn is_closed(&self) -> bool {
            self.slot.is_closed()
        }
    }

    struct CountingFactory {
        config: Config,
        permissions: PermissionFile,
        closes: Arc<AtomicUsize>,
    }

    impl RepositoryFactory for CountingFactory {
        fn kind(&self) -> BackendKind {
            BackendKind::Svn
        }

        fn config(&self) -> &Config {
            &self.config
        }

        fn permission_file(&self) -> &PermissionFile {
            &self.permissions
        }

        fn repository_exists(&self, location: &Path) -> bool {
            location.ends_with("present")
        }

        fn init_storage(&self, _staging: &Path) -> Result<()> {
            Ok(())
        }

        fn open_existing(&self, location: &Path) -> Result<Box<dyn Repository>> {
            Ok(Box::new(Counting {
                location: location.to_path_buf(),
                slot: Slot::new(()),
                closes: Arc::clone(&self.closes),
            }))
        }
    }

    struct NoFormat;

    impl crate::permission::PermissionFormat for NoFormat {
        fn parse(&self, _text: &str, _path: &Path) -> Result<crate::permission::Document> {
            Ok(Default::default())
        }

        fn render(&self, _grants: &crate::permission::Grants) -> String {
            String::new()
        }
    }

    fn factory() -> CountingFactory {
        CountingFactory {
            config: Config::new("/srv", "/srv/perms", false),
            permissions: PermissionFile::new("/srv/perms", NoFormat),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[test]
    fn closes_after_success() {
        let f = factory();
        let value = with_repository(&f, Path::new("/srv/present"), |_| Ok(7)).unwrap();
        assert_eq!(value, 7);
        assert_eq!(f.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closes_after_error() {
        let f = factory();
        let err = with_repository(&f, Path::new("/srv/present"), |repo| {
            repo.latest_revision().map(|_| ())
        })
        .unwrap_err();

        assert!(matches!(err, Error::EmptyRepository(_)));
        assert_eq!(f.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closes_after_panic() {
        let f = factory();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = with_repository(&f, Path::new("/srv/present"), |_| -> Result<()> {
                panic!("boom")
            });
        }));

        assert!(result.is_err());
        assert_eq!(f.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closes_only_once() {
        let f = factory();
        with_repository(&f, Path::new("/srv/present"), |repo| {
            repo.close()?;
            repo.close()
        })
        .unwrap();

        assert_eq!(f.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_repository_is_not_found() {
        let f = factory();
        let err = with_repository(&f, Path::new("/srv/absent"), |_| Ok(())).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(f.closes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn permission_changes_need_admin() {
        let f = factory();
        let err = f
            .set_bulk_permissions(Path::new("/srv/present"), &Default::default())
            .unwrap_err();
        assert!(matches!(err, Error::NotAdmin(_)));

        let err = f.create(Path::new("/srv/new")).unwrap_err();
        assert!(matches!(err, Error::NotAdmin(_)));
    }
}

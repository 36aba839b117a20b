//! A centralized, Subversion-like repository stored on the local file
//! system.
//!
//! ```text
//! <location>/format            "grouprepo-svn 1"
//! <location>/db/current        youngest revision number (0: no revisions)
//! <location>/db/revs/<n>       manifest of revision n
//! <location>/db/objects/..     file content, see `blob`
//! ```
//!
//! A revision manifest is written before `db/current` is switched to it,
//! and both are replaced by rename, so readers only ever see complete
//! revisions.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use grouprepo_core::config::{BackendKind, Config};
use grouprepo_core::path::RepoPath;
use grouprepo_core::permission::{LockFile, PermissionFile};
use grouprepo_core::repo::{Error, Repository, RepositoryFactory, Result, Slot};
use grouprepo_core::revision::{FileEntry, Revision, RevisionId, RevisionSource};
use grouprepo_core::transaction::{Change, Transaction};

use crate::authz::AuthzFormat;
use crate::blob;
use crate::manifest::{Entry, Manifest};

const FORMAT: &str = "grouprepo-svn 1\n";

/// How long a commit waits for a concurrent commit to finish.
const COMMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates and opens Subversion-like repositories; permissions are kept in
/// an `authz` file.
pub struct SvnFactory {
    config: Config,
    permissions: PermissionFile,
}

impl SvnFactory {
    pub fn new(config: Config) -> SvnFactory {
        let permissions = PermissionFile::new(config.permission_file.clone(), AuthzFormat);
        SvnFactory {
            config,
            permissions,
        }
    }
}

impl RepositoryFactory for SvnFactory {
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
        match fs::read_to_string(location.join("format")) {
            Ok(format) => format == FORMAT,
            Err(_) => false,
        }
    }

    fn init_storage(&self, staging: &Path) -> Result<()> {
        init(staging).map_err(|e| e.into())
    }

    fn open_existing(&self, location: &Path) -> Result<Box<dyn Repository>> {
        Ok(Box::new(SvnRepository::open(location)?))
    }
}

fn init(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir.join("db/revs"))?;
    fs::create_dir_all(dir.join("db/objects"))?;
    fs::write(dir.join("db/current"), "0\n")?;

    // Written last: its presence marks a complete repository.
    fs::write(dir.join("format"), FORMAT)
}

/// Files of an open repository. The open `format` file pins the
/// repository for as long as the handle lives.
#[derive(Debug)]
struct Storage {
    root: PathBuf,
    _format: File,
}

impl Storage {
    fn db(&self) -> PathBuf {
        self.root.join("db")
    }

    fn youngest(&self) -> io::Result<u64> {
        let current = fs::read_to_string(self.db().join("current"))?;
        current.trim().parse().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed db/current `{}`", current.trim()),
            )
        })
    }

    /// Manifest of revision `number`, or `None` if there is no such revision.
    fn manifest(&self, number: u64) -> io::Result<Option<Manifest>> {
        if number == 0 {
            return Ok(None);
        }
        match fs::read_to_string(self.db().join("revs").join(number.to_string())) {
            Ok(text) => Manifest::parse(&text).map(Some),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn blob(&self, entry: &Entry) -> io::Result<Vec<u8>> {
        blob::get(&self.db().join("objects"), &entry.blob)
    }

    fn commit(&self, transaction: &Transaction) -> Result<Manifest> {
        let db = self.db();
        let lock = LockFile::acquire(&db.join("current"), COMMIT_TIMEOUT)?;

        let youngest = self.youngest()?;
        let mut files = match self.manifest(youngest)? {
            Some(manifest) => manifest.files,
            None => Default::default(),
        };
        transaction.check_against(files.keys().cloned().collect::<BTreeSet<_>>())?;

        let now = Utc::now();
        let objects = db.join("objects");
        for change in transaction.changes() {
            match change {
                Change::Add { path, content } | Change::Replace { path, content } => {
                    let entry = Entry {
                        blob: blob::put(&objects, content)?,
                        size: content.len() as u64,
                        last_modified: now,
                    };
                    files.insert(path.clone(), entry);
                }
                Change::Remove { path } => {
                    files.remove(path);
                }
            }
        }

        let manifest = Manifest {
            number: youngest + 1,
            date: now,
            author: transaction.user().to_string(),
            message: transaction.log_message().to_string(),
            files,
        };

        let revs = db.join("revs");
        let mut tmp = tempfile::NamedTempFile::new_in(&revs)?;
        tmp.write_all(manifest.render().as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(revs.join(manifest.number.to_string()))
            .map_err(|err| err.error)?;

        lock.commit(format!("{}\n", manifest.number).as_bytes())?;
        Ok(manifest)
    }
}

/// An open Subversion-like repository.
pub struct SvnRepository {
    location: PathBuf,
    storage: Slot<Storage>,
}

impl SvnRepository {
    pub fn open(location: &Path) -> Result<SvnRepository> {
        let format = File::open(location.join("format")).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                Error::NotFound(location.to_path_buf())
            } else {
                err.into()
            }
        })?;

        Ok(SvnRepository {
            location: location.to_path_buf(),
            storage: Slot::new(Storage {
                root: location.to_path_buf(),
                _format: format,
            }),
        })
    }

    /// Run `f` against the open storage.
    fn with_storage<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Storage) -> Result<T>,
    {
        self.storage
            .with(f)
            .unwrap_or_else(|| Err(Error::ClosedRepository(self.location.clone())))
    }

    fn to_revision(&self, manifest: Manifest) -> Revision {
        let manifest = Arc::new(manifest);
        Revision::new(
            RevisionId::Number(manifest.number),
            manifest.date,
            manifest.author.clone(),
            manifest.message.clone(),
            &self.location,
            Box::new(SvnRevision {
                storage: self.storage.clone(),
                manifest,
            }),
        )
    }

    fn not_found(&self, revision: &dyn std::fmt::Display) -> Error {
        Error::RevisionNotFound {
            location: self.location.clone(),
            revision: revision.to_string(),
        }
    }
}

impl Repository for SvnRepository {
    fn location(&self) -> &Path {
        &self.location
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Svn
    }

    fn latest_revision(&self) -> Result<Revision> {
        let manifest = self.with_storage(|s| {
            let youngest = s.youngest()?;
            match s.manifest(youngest)? {
                Some(manifest) => Ok(manifest),
                None => Err(Error::EmptyRepository(self.location.clone())),
            }
        })?;
        Ok(self.to_revision(manifest))
    }

    fn revision(&self, id: &RevisionId) -> Result<Revision> {
        let number = match id {
            RevisionId::Number(n) => *n,
            RevisionId::Hash(_) => return Err(self.not_found(id)),
        };

        let manifest = self.with_storage(|s| {
            if number > s.youngest()? {
                return Ok(None);
            }
            Ok(s.manifest(number)?)
        })?;

        match manifest {
            Some(manifest) => Ok(self.to_revision(manifest)),
            None => Err(self.not_found(id)),
        }
    }

    fn revision_at(&self, at: DateTime<Utc>) -> Result<Revision> {
        let manifest = self.with_storage(|s| {
            let mut number = s.youngest()?;
            while number > 0 {
                if let Some(manifest) = s.manifest(number)? {
                    if manifest.date <= at {
                        return Ok(Some(manifest));
                    }
                }
                number -= 1;
            }
            Ok(None)
        })?;

        match manifest {
            Some(manifest) => Ok(self.to_revision(manifest)),
            None => Err(self.not_found(&at.to_rfc3339())),
        }
    }

    fn commit(&mut self, transaction: Transaction) -> Result<Revision> {
        let manifest = self.with_storage(|s| s.commit(&transaction))?;

        log::info!(
            target: "svn",
            "Committed revision {} to {} ({} changes by {})",
            manifest.number,
            self.location.display(),
            transaction.changes().len(),
            transaction.user()
        );
        Ok(self.to_revision(manifest))
    }

    fn close(&mut self) -> Result<()> {
        if self.storage.close() {
            log::debug!(target: "svn", "Closed {}", self.location.display());
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.storage.is_closed()
    }
}

impl Drop for SvnRepository {
    fn drop(&mut self) {
        if !self.storage.is_closed() {
            log::warn!(
                target: "svn",
                "Repository {} dropped without being closed",
                self.location.display()
            );
            self.storage.close();
        }
    }
}

struct SvnRevision {
    storage: Slot<Storage>,
    manifest: Arc<Manifest>,
}

impl RevisionSource for SvnRevision {
    fn is_available(&self) -> bool {
        !self.storage.is_closed()
    }

    fn files(&self) -> Option<Result<Vec<FileEntry>>> {
        self.storage.with(|_| {
            Ok(self
                .manifest
                .files
                .iter()
                .map(|(path, entry)| FileEntry {
                    path: path.clone(),
                    size: entry.size,
                    last_modified: entry.last_modified,
                })
                .collect())
        })
    }

    fn content(&self, path: &RepoPath) -> Option<Result<Option<Vec<u8>>>> {
        self.storage.with(|s| match self.manifest.files.get(path) {
            Some(entry) => s.blob(entry).map(Some).map_err(Error::from),
            None => Ok(None),
        })
    }
}

#[cfg(test)]
mod tests;

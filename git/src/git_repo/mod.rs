use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use git2::build::TreeUpdateBuilder;
use git2::{ErrorCode, FileMode, ObjectType, Oid, TreeWalkMode, TreeWalkResult};
use grouprepo_core::config::{BackendKind, Config};
use grouprepo_core::path::RepoPath;
use grouprepo_core::permission::PermissionFile;
use grouprepo_core::repo::{Error, Repository, RepositoryFactory, Result, Slot};
use grouprepo_core::revision::{FileEntry, Revision, RevisionId, RevisionSource};
use grouprepo_core::transaction::{Change, Transaction};

use crate::gitolite::GitoliteFormat;

fn backend(err: git2::Error) -> Error {
    Error::BackendError(Box::new(err))
}

/// Creates and opens bare git repositories; permissions are kept in a
/// gitolite configuration file.
pub struct GitFactory {
    config: Config,
    permissions: PermissionFile,
}

impl GitFactory {
    pub fn new(config: Config) -> GitFactory {
        let permissions = PermissionFile::new(config.permission_file.clone(), GitoliteFormat);
        GitFactory {
            config,
            permissions,
        }
    }
}

impl RepositoryFactory for GitFactory {
    fn kind(&self) -> BackendKind {
        BackendKind::Git
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn permission_file(&self) -> &PermissionFile {
        &self.permissions
    }

    fn repository_exists(&self, location: &Path) -> bool {
        location.is_dir() && git2::Repository::open_bare(location).is_ok()
    }

    fn init_storage(&self, staging: &Path) -> Result<()> {
        let repo = git2::Repository::init_opts(
            staging,
            git2::RepositoryInitOptions::new()
                .bare(true)
                .no_reinit(true)
                .external_template(false),
        )
        .map_err(backend)?;

        let mut config = repo.config().map_err(backend)?;
        config.set_str("user.name", "grouprepo").map_err(backend)?;
        config
            .set_str("user.email", "grouprepo@localhost")
            .map_err(backend)?;

        Ok(())
    }

    fn open_existing(&self, location: &Path) -> Result<Box<dyn Repository>> {
        Ok(Box::new(GitRepository::open(location)?))
    }
}

/// An open bare git repository.
pub struct GitRepository {
    location: PathBuf,
    backend: Slot<git2::Repository>,
}

impl GitRepository {
    pub fn open(location: &Path) -> Result<GitRepository> {
        let repo = git2::Repository::open_bare(location).map_err(|err| {
            if err.code() == ErrorCode::NotFound {
                Error::NotFound(location.to_path_buf())
            } else {
                backend(err)
            }
        })?;

        Ok(GitRepository {
            location: location.to_path_buf(),
            backend: Slot::new(repo),
        })
    }

    fn with_backend<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&git2::Repository) -> Result<T>,
    {
        self.backend
            .with(f)
            .unwrap_or_else(|| Err(Error::ClosedRepository(self.location.clone())))
    }

    fn to_revision(&self, commit: &git2::Commit) -> Revision {
        Revision::new(
            RevisionId::Hash(commit.id().to_string()),
            commit_time(commit),
            commit.author().name().unwrap_or_default().to_string(),
            commit.message().unwrap_or_default().to_string(),
            &self.location,
            Box::new(GitRevision {
                backend: self.backend.clone(),
                commit: commit.id(),
            }),
        )
    }

    fn not_found(&self, revision: String) -> Error {
        Error::RevisionNotFound {
            location: self.location.clone(),
            revision,
        }
    }
}

impl Repository for GitRepository {
    fn location(&self) -> &Path {
        &self.location
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Git
    }

    fn latest_revision(&self) -> Result<Revision> {
        self.with_backend(|repo| match head_commit(repo).map_err(backend)? {
            Some(commit) => Ok(self.to_revision(&commit)),
            None => Err(Error::EmptyRepository(self.location.clone())),
        })
    }

    fn revision(&self, id: &RevisionId) -> Result<Revision> {
        let revspec = id.to_string();
        if revspec.is_empty() || !revspec.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(self.not_found(revspec));
        }

        // Any prefix of a commit hash long enough to be unique is accepted.
        self.with_backend(|repo| {
            match repo
                .revparse_single(&revspec)
                .and_then(|object| object.peel_to_commit())
            {
                Ok(commit) => Ok(self.to_revision(&commit)),
                Err(err) => {
                    log::debug!(target: "git", "Cannot resolve `{}`: {}", revspec, err);
                    Err(self.not_found(revspec.clone()))
                }
            }
        })
    }

    fn revision_at(&self, at: DateTime<Utc>) -> Result<Revision> {
        self.with_backend(|repo| {
            let head = match head_commit(repo).map_err(backend)? {
                Some(head) => head,
                None => return Err(self.not_found(at.to_rfc3339())),
            };

            let mut walk = repo.revwalk().map_err(backend)?;
            walk.set_sorting(git2::Sort::TIME).map_err(backend)?;
            walk.push(head.id()).map_err(backend)?;

            for oid in walk {
                let commit = repo
                    .find_commit(oid.map_err(backend)?)
                    .map_err(backend)?;
                if commit_time(&commit) <= at {
                    return Ok(self.to_revision(&commit));
                }
            }
            Err(self.not_found(at.to_rfc3339()))
        })
    }

    fn commit(&mut self, transaction: Transaction) -> Result<Revision> {
        let revision = self.with_backend(|repo| {
            let parent = head_commit(repo).map_err(backend)?;
            let base = match &parent {
                Some(parent) => parent.tree().map_err(backend)?,
                None => {
                    let empty = repo
                        .treebuilder(None)
                        .and_then(|builder| builder.write())
                        .map_err(backend)?;
                    repo.find_tree(empty).map_err(backend)?
                }
            };

            let existing: BTreeSet<RepoPath> = tree_files(&base)
                .map_err(backend)?
                .into_iter()
                .map(|(path, _)| path)
                .collect();
            transaction.check_against(existing)?;

            let mut update = TreeUpdateBuilder::new();
            for change in transaction.changes() {
                match change {
                    Change::Add { path, content } | Change::Replace { path, content } => {
                        let blob = repo.blob(content).map_err(backend)?;
                        update.upsert(path.as_str(), blob, FileMode::Blob);
                    }
                    Change::Remove { path } => {
                        update.remove(path.as_str());
                    }
                }
            }
            let tree = update
                .create_updated(repo, &base)
                .and_then(|oid| repo.find_tree(oid))
                .map_err(backend)?;

            let user = transaction.user();
            let sig = git2::Signature::now(user, &format!("{}@localhost", user))
                .map_err(backend)?;
            let parents: Vec<&git2::Commit> = parent.iter().collect();
            let oid = repo
                .commit(
                    Some("HEAD"),
                    &sig,
                    &sig,
                    transaction.log_message(),
                    &tree,
                    &parents,
                )
                .map_err(backend)?;

            let commit = repo.find_commit(oid).map_err(backend)?;
            Ok(self.to_revision(&commit))
        })?;

        log::info!(
            target: "git",
            "Committed {} to {} ({} changes by {})",
            revision.id(),
            self.location.display(),
            transaction.changes().len(),
            transaction.user()
        );
        Ok(revision)
    }

    fn close(&mut self) -> Result<()> {
        if self.backend.close() {
            log::debug!(target: "git", "Closed {}", self.location.display());
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.backend.is_closed()
    }
}

impl Drop for GitRepository {
    fn drop(&mut self) {
        if !self.backend.is_closed() {
            log::warn!(
                target: "git",
                "Repository {} dropped without being closed",
                self.location.display()
            );
            self.backend.close();
        }
    }
}

struct GitRevision {
    backend: Slot<git2::Repository>,
    commit: Oid,
}

impl RevisionSource for GitRevision {
    fn is_available(&self) -> bool {
        !self.backend.is_closed()
    }

    fn files(&self) -> Option<Result<Vec<FileEntry>>> {
        self.backend
            .with(|repo| list_files(repo, self.commit).map_err(backend))
    }

    fn content(&self, path: &RepoPath) -> Option<Result<Option<Vec<u8>>>> {
        self.backend
            .with(|repo| file_content(repo, self.commit, path).map_err(backend))
    }
}

/// The commit `HEAD` points to, or `None` before the first commit.
fn head_commit(
    repo: &git2::Repository,
) -> std::result::Result<Option<git2::Commit<'_>>, git2::Error> {
    match repo.head() {
        Ok(head) => head.peel_to_commit().map(Some),
        Err(err) if err.code() == ErrorCode::UnbornBranch || err.code() == ErrorCode::NotFound => {
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn commit_time(commit: &git2::Commit) -> DateTime<Utc> {
    Utc.timestamp_opt(commit.time().seconds(), 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Every blob below `tree` with its ID. Paths no backend could store are
/// skipped.
fn tree_files(tree: &git2::Tree) -> std::result::Result<Vec<(RepoPath, Oid)>, git2::Error> {
    let mut files = Vec::new();
    tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() == Some(ObjectType::Blob) {
            if let Some(name) = entry.name() {
                let path = format!("{}{}", root, name);
                match RepoPath::new(&path) {
                    Ok(path) => files.push((path, entry.id())),
                    Err(err) => log::warn!(target: "git", "Skipping {}", err),
                }
            }
        }
        TreeWalkResult::Ok
    })?;
    Ok(files)
}

fn list_files(repo: &git2::Repository, oid: Oid) -> std::result::Result<Vec<FileEntry>, git2::Error> {
    let commit = repo.find_commit(oid)?;
    let files = tree_files(&commit.tree()?)?;
    let modified = last_modified(&commit, &files)?;

    let mut entries = Vec::with_capacity(files.len());
    for (path, id) in files {
        let size = repo.find_blob(id)?.size() as u64;
        let last_modified = modified
            .get(&path)
            .copied()
            .unwrap_or_else(|| commit_time(&commit));
        entries.push(FileEntry {
            path,
            size,
            last_modified,
        });
    }
    Ok(entries)
}

/// Time of the newest commit on the first-parent line of `commit` that
/// changed each of `files`.
fn last_modified(
    commit: &git2::Commit,
    files: &[(RepoPath, Oid)],
) -> std::result::Result<BTreeMap<RepoPath, DateTime<Utc>>, git2::Error> {
    let mut pending: BTreeMap<RepoPath, Oid> = files.iter().cloned().collect();
    let mut modified = BTreeMap::new();
    let mut current = commit.clone();

    while !pending.is_empty() {
        let parent = current.parents().next();
        let parent_tree = match &parent {
            Some(parent) => Some(parent.tree()?),
            None => None,
        };
        let time = commit_time(&current);

        pending.retain(|path, id| {
            let before = parent_tree
                .as_ref()
                .and_then(|tree| tree.get_path(Path::new(path.as_str())).ok())
                .map(|entry| entry.id());
            if before == Some(*id) {
                true
            } else {
                modified.insert(path.clone(), time);
                false
            }
        });

        match parent {
            Some(parent) => current = parent,
            None => break,
        }
    }
    Ok(modified)
}

fn file_content(
    repo: &git2::Repository,
    oid: Oid,
    path: &RepoPath,
) -> std::result::Result<Option<Vec<u8>>, git2::Error> {
    let tree = repo.find_commit(oid)?.tree()?;
    let entry = match tree.get_path(Path::new(path.as_str())) {
        Ok(entry) => entry,
        Err(err) if err.code() == ErrorCode::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };

    if entry.kind() != Some(ObjectType::Blob) {
        return Ok(None);
    }
    Ok(Some(repo.find_blob(entry.id())?.content().to_vec()))
}

#[cfg(test)]
mod tests;

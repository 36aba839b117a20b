//! Immutable snapshots of a repository's file tree.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::path::RepoPath;
use crate::repo::{Error, Result};

/// Identifies a revision within one repository.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum RevisionId {
    /// Sequential revision number of a centralized backend.
    Number(u64),
    /// Commit hash (lowercase hex) of a distributed backend.
    Hash(String),
}

impl Display for RevisionId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            RevisionId::Number(n) => write!(f, "{}", n),
            RevisionId::Hash(hash) => f.write_str(hash),
        }
    }
}

impl FromStr for RevisionId {
    type Err = std::convert::Infallible;

    /// All-digit strings are revision numbers; anything else is a hash.
    ///
    /// A leading zero marks an abbreviated hash, since revision numbers are
    /// never written that way.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.len() > 1 && s.starts_with('0') {
            return Ok(RevisionId::Hash(s.to_ascii_lowercase()));
        }
        Ok(match s.parse::<u64>() {
            Ok(n) if !s.is_empty() && s.len() < 20 => RevisionId::Number(n),
            _ => RevisionId::Hash(s.to_ascii_lowercase()),
        })
    }
}

/// One file as seen by a revision.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileEntry {
    pub path: RepoPath,
    pub size: u64,
    /// Time of the most recent revision, up to this one, that changed the file.
    pub last_modified: DateTime<Utc>,
}

/// Backend access behind a `Revision`.
///
/// Implementations return `None` once the repository handle the revision
/// came from has been closed.
pub trait RevisionSource: Send + Sync {
    /// Returns false once the owning handle has been closed.
    fn is_available(&self) -> bool;

    /// Every file of the revision, in any order.
    fn files(&self) -> Option<Result<Vec<FileEntry>>>;

    /// Content of `path`, or `Ok(None)` if the revision has no such file.
    fn content(&self, path: &RepoPath) -> Option<Result<Option<Vec<u8>>>>;
}

/// The state of a repository at one point in history.
///
/// A revision stays usable only while the handle it was obtained from is
/// open; afterwards every accessor but `id` fails with
/// `Error::RevisionUnavailable`.
pub struct Revision {
    id: RevisionId,
    timestamp: DateTime<Utc>,
    author: String,
    message: String,
    location: PathBuf,
    source: Box<dyn RevisionSource>,
}

impl Revision {
    pub fn new(
        id: RevisionId,
        timestamp: DateTime<Utc>,
        author: String,
        message: String,
        location: &Path,
        source: Box<dyn RevisionSource>,
    ) -> Revision {
        Revision {
            id,
            timestamp,
            author,
            message,
            location: location.to_path_buf(),
            source,
        }
    }

    pub fn id(&self) -> &RevisionId {
        &self.id
    }

    pub fn timestamp(&self) -> Result<DateTime<Utc>> {
        self.ensure_available()?;
        Ok(self.timestamp)
    }

    pub fn author(&self) -> Result<&str> {
        self.ensure_available()?;
        Ok(&self.author)
    }

    pub fn message(&self) -> Result<&str> {
        self.ensure_available()?;
        Ok(&self.message)
    }

    /// Every file in the revision, sorted by path.
    pub fn list_files(&self) -> Result<Vec<FileEntry>> {
        let mut files = self.source.files().ok_or_else(|| self.unavailable())??;
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Files directly inside the directory `dir` (`""` is the top level).
    pub fn files_at_path(&self, dir: &str) -> Result<Vec<FileEntry>> {
        let dir = dir.trim_matches('/');
        Ok(self
            .list_files()?
            .into_iter()
            .filter(|entry| entry.path.parent() == dir)
            .collect())
    }

    /// Returns true if `path` names a file or a directory in this revision.
    pub fn path_exists(&self, path: &str) -> Result<bool> {
        let path = path.trim_matches('/');
        Ok(self
            .list_files()?
            .iter()
            .any(|entry| entry.path.as_str() == path || entry.path.is_within(path)))
    }

    pub fn file_content(&self, path: &str) -> Result<Vec<u8>> {
        let path = RepoPath::new(path)?;
        match self.source.content(&path).ok_or_else(|| self.unavailable())?? {
            Some(content) => Ok(content),
            None => Err(Error::FileNotFound {
                path: path.to_string(),
                revision: self.id.to_string(),
            }),
        }
    }

    fn ensure_available(&self) -> Result<()> {
        if self.source.is_available() {
            Ok(())
        } else {
            Err(self.unavailable())
        }
    }

    fn unavailable(&self) -> Error {
        Error::RevisionUnavailable {
            location: self.location.clone(),
            revision: self.id.to_string(),
        }
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Revision")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp)
            .field("author", &self.author)
            .field("location", &self.location)
            .finish()
    }
}

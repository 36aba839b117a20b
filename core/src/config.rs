//! Backend selection and the configuration bag handed to a backend.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::repo::Error;

/// The version-control technology behind a repository.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BackendKind {
    /// Centralized storage with numbered revisions.
    Svn,
    /// Distributed storage with commit hashes, kept as bare git repositories.
    Git,
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            BackendKind::Svn => write!(f, "svn"),
            BackendKind::Git => write!(f, "git"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svn" | "subversion" => Ok(BackendKind::Svn),
            "git" => Ok(BackendKind::Git),
            _ => Err(Error::UnknownBackend(s.to_string())),
        }
    }
}

/// Configuration for one backend. Validated by whoever builds it; grouprepo
/// only reads it.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Directory that holds one repository per group.
    pub storage_root: PathBuf,

    /// File holding the permission sets of every repository under
    /// `storage_root`.
    pub permission_file: PathBuf,

    /// Whether this process is authoritative, i.e. may create repositories
    /// and write permissions.
    #[serde(default)]
    pub is_repository_admin: bool,

    /// URL under which repositories are served to students, if they may
    /// reach them outside the course site.
    #[serde(default)]
    pub external_base_url: Option<String>,

    /// Whether students must commit through external access instead of
    /// uploading through the course site.
    #[serde(default)]
    pub external_commits_only: bool,
}

impl Config {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        storage_root: P,
        permission_file: Q,
        is_repository_admin: bool,
    ) -> Config {
        Config {
            storage_root: storage_root.into(),
            permission_file: permission_file.into(),
            is_repository_admin,
            external_base_url: None,
            external_commits_only: false,
        }
    }

    pub fn with_external_access<S: Into<String>>(
        mut self,
        base_url: S,
        commits_only: bool,
    ) -> Config {
        self.external_base_url = Some(base_url.into());
        self.external_commits_only = commits_only;
        self
    }

    /// Location of the repository called `name`.
    pub fn location_of(&self, name: &str) -> PathBuf {
        self.storage_root.join(name)
    }
}

/// Name under which a repository's permissions are recorded: the last
/// component of its location.
pub fn repository_name(location: &Path) -> String {
    location
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| location.to_string_lossy().into_owned())
}

//! Paths of files stored inside a repository.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use unicode_normalization::UnicodeNormalization;

use crate::repo::{Error, Result};

/// A relative, slash-separated path that is acceptable inside every backend.
///
/// Paths are normalized to Unicode NFC so that the same name typed on
/// different platforms addresses the same file.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RepoPath {
    path: String,
}

impl RepoPath {
    /// Validate and normalize `path`.
    pub fn new(path: &str) -> Result<RepoPath> {
        let path: String = path.nfc().collect();
        check_path(&path).map_err(|reason| Error::InvalidPath {
            path: path.clone(),
            reason,
        })?;

        Ok(RepoPath { path })
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Return the final component of the path.
    pub fn file_name(&self) -> &str {
        match self.path.rfind('/') {
            Some(n) => &self.path[n + 1..],
            None => &self.path,
        }
    }

    /// Return the directory holding this path, or `""` for top-level files.
    pub fn parent(&self) -> &str {
        match self.path.rfind('/') {
            Some(n) => &self.path[..n],
            None => "",
        }
    }

    /// Returns true if this path lies anywhere below the directory `dir`.
    /// Every path lies below `""`.
    pub fn is_within(&self, dir: &str) -> bool {
        let dir = dir.trim_matches('/');
        dir.is_empty()
            || (self.path.len() > dir.len()
                && self.path.starts_with(dir)
                && self.path.as_bytes()[dir.len()] == b'/')
    }
}

impl Display for RepoPath {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl FromStr for RepoPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RepoPath::new(s)
    }
}

impl AsRef<str> for RepoPath {
    fn as_ref(&self) -> &str {
        &self.path
    }
}

fn check_path(path: &str) -> std::result::Result<(), &'static str> {
    if path.is_empty() {
        Err("path is empty")
    } else if path.starts_with('/') {
        Err("path is absolute")
    } else if path.ends_with('/') {
        Err("path has a trailing slash")
    } else {
        for segment in path.split('/') {
            check_segment(segment)?;
        }
        Ok(())
    }
}

fn check_segment(segment: &str) -> std::result::Result<(), &'static str> {
    if segment.is_empty() {
        Err("path contains a duplicate slash")
    } else if segment == "." || segment == ".." {
        Err("path contains a relative component")
    } else if segment.contains('\0') {
        Err("path contains a null character")
    } else if segment.contains('\\') {
        Err("path contains a backslash")
    } else if segment.chars().any(|c| c.is_control()) {
        Err("path contains a control character")
    } else if segment.eq_ignore_ascii_case(".git") || segment.eq_ignore_ascii_case(".svn") {
        Err("path names version-control metadata")
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(path: &str) -> &'static str {
        match RepoPath::new(path).unwrap_err() {
            Error::InvalidPath { reason, .. } => reason,
            err => panic!("wrong error: {:?}", err),
        }
    }

    #[test]
    fn basic_case() {
        let a = RepoPath::new("a").unwrap();
        assert_eq!(a.as_str(), "a");

        let a = RepoPath::new("A1/src/main.c").unwrap();
        assert_eq!(a.as_str(), "A1/src/main.c");
        assert_eq!(a.file_name(), "main.c");
        assert_eq!(a.parent(), "A1/src");

        assert_eq!(reason(""), "path is empty");
        assert_eq!(reason("/a"), "path is absolute");
        assert_eq!(reason("a/"), "path has a trailing slash");
        assert_eq!(reason("a//b"), "path contains a duplicate slash");
        assert_eq!(reason("a/../b"), "path contains a relative component");
        assert_eq!(reason("a\0b"), "path contains a null character");
        assert_eq!(reason("a\\b"), "path contains a backslash");
        assert_eq!(reason("A1/.GIT/config"), "path names version-control metadata");
    }

    #[test]
    fn normalizes_to_nfc() {
        let decomposed = RepoPath::new("cafe\u{301}.txt").unwrap();
        let composed = RepoPath::new("caf\u{e9}.txt").unwrap();
        assert_eq!(decomposed, composed);
    }

    #[test]
    fn within_directory() {
        let p = RepoPath::new("A1/src/main.c").unwrap();
        assert!(p.is_within(""));
        assert!(p.is_within("A1"));
        assert!(p.is_within("A1/src/"));
        assert!(!p.is_within("A"));
        assert!(!p.is_within("A1/src/main.c"));
    }
}

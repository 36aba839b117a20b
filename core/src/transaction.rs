//! Batches of file changes committed as one revision.

use std::collections::BTreeSet;

use crate::path::RepoPath;
use crate::repo::{Error, Result};

/// A single change within a `Transaction`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Change {
    /// Add a file that must not exist yet.
    Add { path: RepoPath, content: Vec<u8> },
    /// Overwrite a file that must exist.
    Replace { path: RepoPath, content: Vec<u8> },
    /// Delete a file that must exist.
    Remove { path: RepoPath },
}

impl Change {
    pub fn path(&self) -> &RepoPath {
        match self {
            Change::Add { path, .. } | Change::Replace { path, .. } | Change::Remove { path } => {
                path
            }
        }
    }
}

/// A set of changes by one user, applied all-or-nothing by
/// `Repository::commit`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transaction {
    user: String,
    message: String,
    changes: Vec<Change>,
}

impl Transaction {
    pub fn new<S: Into<String>>(user: S) -> Transaction {
        Transaction {
            user: user.into(),
            message: String::new(),
            changes: Vec::new(),
        }
    }

    pub fn message<S: Into<String>>(mut self, message: S) -> Transaction {
        self.message = message.into();
        self
    }

    pub fn add_file<C: Into<Vec<u8>>>(mut self, path: &str, content: C) -> Result<Transaction> {
        self.changes.push(Change::Add {
            path: RepoPath::new(path)?,
            content: content.into(),
        });
        Ok(self)
    }

    pub fn replace_file<C: Into<Vec<u8>>>(
        mut self,
        path: &str,
        content: C,
    ) -> Result<Transaction> {
        self.changes.push(Change::Replace {
            path: RepoPath::new(path)?,
            content: content.into(),
        });
        Ok(self)
    }

    pub fn remove_file(mut self, path: &str) -> Result<Transaction> {
        self.changes.push(Change::Remove {
            path: RepoPath::new(path)?,
        });
        Ok(self)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn log_message(&self) -> &str {
        &self.message
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Check the changes, in order, against the files of the revision they
    /// will be applied to. The first conflicting change is reported as
    /// `Error::TransactionConflict`.
    pub fn check_against(&self, mut files: BTreeSet<RepoPath>) -> Result<()> {
        for change in &self.changes {
            let path = change.path();
            match change {
                Change::Add { .. } => {
                    if files.contains(path) {
                        return Err(conflict(path, "file already exists"));
                    }
                    if files
                        .iter()
                        .any(|f| f.is_within(path.as_str()) || path.is_within(f.as_str()))
                    {
                        return Err(conflict(path, "path collides with an existing directory or file"));
                    }
                    files.insert(path.clone());
                }
                Change::Replace { .. } => {
                    if !files.contains(path) {
                        return Err(conflict(path, "file does not exist"));
                    }
                }
                Change::Remove { .. } => {
                    if !files.remove(path) {
                        return Err(conflict(path, "file does not exist"));
                    }
                }
            }
        }
        Ok(())
    }
}

fn conflict(path: &RepoPath, reason: &'static str) -> Error {
    Error::TransactionConflict {
        path: path.to_string(),
        reason,
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{LockFile, PermissionSet};
use crate::repo::{Error, Result};

/// How long a writer waits for another writer to finish.
const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Permission sets of every repository in one permission file, keyed by
/// repository name.
pub type Grants = BTreeMap<String, PermissionSet>;

/// A parsed permission file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Document {
    /// Permissions of the repository sections grouprepo manages. A hand
    /// written deny shows up as `Permission::None`.
    pub grants: Grants,

    /// Everything outside the managed sections (foreign sections, group
    /// definitions, rules grouprepo does not interpret), in file order.
    /// Written back unchanged ahead of the managed sections.
    pub kept: Vec<String>,
}

impl Document {
    pub fn new(grants: Grants) -> Document {
        Document {
            grants,
            kept: Vec::new(),
        }
    }
}

/// A backend-specific text encoding of `Grants`.
pub trait PermissionFormat: Send + Sync {
    /// Parse the file content. `path` is only used for error reporting.
    ///
    /// Sections the format can render again exactly go into
    /// `Document::grants`; every other non-blank line goes into
    /// `Document::kept`.
    fn parse(&self, text: &str, path: &Path) -> Result<Document>;

    /// Render the managed sections. `Permission::None` entries only come
    /// from hand-written denies and must be rendered as such.
    fn render(&self, grants: &Grants) -> String;
}

/// The permission file shared by all repositories of one backend.
///
/// Reads see a complete file. Updates are read-modify-write cycles done
/// under a `LockFile`, so concurrent writers (threads or processes) are
/// serialized and none of their changes is lost. Lines grouprepo does not
/// manage survive every update.
pub struct PermissionFile {
    path: PathBuf,
    format: Box<dyn PermissionFormat>,
    lock_timeout: Duration,
}

impl PermissionFile {
    pub fn new<P, F>(path: P, format: F) -> PermissionFile
    where
        P: Into<PathBuf>,
        F: PermissionFormat + 'static,
    {
        PermissionFile {
            path: path.into(),
            format: Box::new(format),
            lock_timeout: LOCK_TIMEOUT,
        }
    }

    /// Change how long `update` waits for a concurrent writer.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> PermissionFile {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every repository's permissions. A missing file holds none.
    pub fn read(&self) -> Result<Grants> {
        Ok(self.read_document()?.grants)
    }

    pub fn read_document(&self) -> Result<Document> {
        match fs::read_to_string(&self.path) {
            Ok(text) => self.format.parse(&text, &self.path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Document::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Permissions of the repository called `name`. Principals a
    /// hand-edited file explicitly denies are left out.
    pub fn permissions_of(&self, name: &str) -> Result<PermissionSet> {
        Ok(self
            .read()?
            .remove(name)
            .map(|set| set.effective())
            .unwrap_or_default())
    }

    /// Merge `update` into the permissions of `name`.
    ///
    /// Fails with `Error::InvalidPrincipal` before touching the file if a
    /// principal is not a plain user name.
    pub fn grant(&self, name: &str, update: &PermissionSet) -> Result<()> {
        update.check()?;
        self.update(|grants| {
            grants
                .entry(name.to_string())
                .or_insert_with(PermissionSet::new)
                .merge(update);
        })
    }

    /// Replace the permissions of `name` with `permissions`.
    pub fn replace(&self, name: &str, permissions: &PermissionSet) -> Result<()> {
        permissions.check()?;
        self.update(|grants| {
            grants.insert(name.to_string(), permissions.effective());
        })
    }

    /// Remove `principals` from the permissions of `name`.
    pub fn revoke(&self, name: &str, principals: &[&str]) -> Result<()> {
        self.update(|grants| {
            if let Some(set) = grants.get_mut(name) {
                for principal in principals {
                    set.remove(principal);
                }
            }
        })
    }

    /// Apply `change` to the current content under the lock and publish
    /// the result atomically.
    pub fn update<C>(&self, change: C) -> Result<()>
    where
        C: FnOnce(&mut Grants),
    {
        let write_error = |source: io::Error| Error::PermissionWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_error)?;
            }
        }

        let lock = LockFile::acquire(&self.path, self.lock_timeout).map_err(write_error)?;

        let mut document = self.read_document()?;
        change(&mut document.grants);
        document.grants.retain(|_, set| !set.is_empty());

        lock.commit(self.render(&document).as_bytes())
            .map_err(write_error)?;

        log::debug!(
            target: "permissions",
            "Wrote {} ({} repositories, {} kept lines)",
            self.path.display(),
            document.grants.len(),
            document.kept.len()
        );
        Ok(())
    }

    fn render(&self, document: &Document) -> String {
        let mut text = String::new();
        for line in &document.kept {
            text.push_str(line);
            text.push('\n');
        }
        if !document.kept.is_empty() && !document.grants.is_empty() {
            text.push('\n');
        }
        text.push_str(&self.format.render(&document.grants));
        text
    }
}

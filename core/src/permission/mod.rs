//! Per-user access levels on a repository.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt::{self, Display, Formatter};
use std::iter::FromIterator;

use crate::repo::{Error, Result};

mod file;
pub use file::{Document, Grants, PermissionFile, PermissionFormat};

mod lock;
pub use lock::LockFile;

/// Access level of one principal on one repository.
///
/// Levels are ordered: `None < Read < ReadWrite`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Permission {
    None,
    Read,
    ReadWrite,
}

impl Permission {
    /// Returns true if this level includes `required`.
    pub fn allows(self, required: Permission) -> bool {
        self >= required
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Permission::None => write!(f, "none"),
            Permission::Read => write!(f, "r"),
            Permission::ReadWrite => write!(f, "rw"),
        }
    }
}

/// Characters the permission file formats use as syntax: section headers,
/// `user = level` separators, comments, group references and wildcards.
const RESERVED: &[char] = &['=', '[', ']', '#', ';', '@', '*', '$', '~', '&'];

/// Check that `principal` is a plain user name, so it cannot change the
/// structure of a permission file it is written into.
pub fn check_principal(principal: &str) -> Result<()> {
    let reason = if principal.is_empty() {
        Some("empty name")
    } else if principal.chars().any(char::is_whitespace) {
        Some("contains whitespace")
    } else if principal.chars().any(char::is_control) {
        Some("contains a control character")
    } else if principal.contains(RESERVED) {
        Some("contains a reserved character")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidPrincipal {
            principal: principal.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Mapping from principal (user name) to access level.
///
/// Keys are unique; iteration is ordered by principal.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PermissionSet {
    grants: BTreeMap<String, Permission>,
}

impl PermissionSet {
    pub fn new() -> PermissionSet {
        PermissionSet::default()
    }

    /// Every listed principal at `level`.
    pub fn uniform<I, S>(principals: I, level: Permission) -> PermissionSet
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        principals.into_iter().map(|p| (p.into(), level)).collect()
    }

    /// Set (or overwrite) the level of `principal`.
    pub fn insert<S: Into<String>>(&mut self, principal: S, level: Permission) -> &mut Self {
        self.grants.insert(principal.into(), level);
        self
    }

    pub fn remove(&mut self, principal: &str) -> Option<Permission> {
        self.grants.remove(principal)
    }

    /// Level of `principal`; principals not present have `Permission::None`.
    pub fn get(&self, principal: &str) -> Permission {
        self.grants
            .get(principal)
            .copied()
            .unwrap_or(Permission::None)
    }

    pub fn contains(&self, principal: &str) -> bool {
        self.grants.contains_key(principal)
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Permission)> {
        self.grants.iter().map(|(p, l)| (p.as_str(), *l))
    }

    /// Fails with `Error::InvalidPrincipal` for the first principal that is
    /// not a plain user name.
    pub fn check(&self) -> Result<()> {
        self.grants.keys().try_for_each(|p| check_principal(p))
    }

    /// Apply `other` on top of this set. Principals given `Permission::None`
    /// lose their entry; principals absent from `other` are untouched.
    pub fn merge(&mut self, other: &PermissionSet) {
        for (principal, level) in other.iter() {
            match level {
                Permission::None => {
                    self.grants.remove(principal);
                }
                _ => {
                    self.grants.insert(principal.to_string(), level);
                }
            }
        }
    }

    /// This set without its `Permission::None` entries.
    pub fn effective(&self) -> PermissionSet {
        self.iter()
            .filter(|(_, level)| *level != Permission::None)
            .collect()
    }
}

impl<S: Into<String>> FromIterator<(S, Permission)> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = (S, Permission)>>(iter: I) -> Self {
        PermissionSet {
            grants: iter.into_iter().map(|(p, l)| (p.into(), l)).collect(),
        }
    }
}

impl IntoIterator for PermissionSet {
    type Item = (String, Permission);
    type IntoIter = btree_map::IntoIter<String, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.grants.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(Permission::None < Permission::Read);
        assert!(Permission::Read < Permission::ReadWrite);
        assert!(Permission::ReadWrite.allows(Permission::Read));
        assert!(!Permission::Read.allows(Permission::ReadWrite));
        assert!(Permission::None.allows(Permission::None));
    }

    #[test]
    fn missing_principal_has_no_access() {
        let set = PermissionSet::uniform(vec!["admin"], Permission::ReadWrite);
        assert_eq!(set.get("admin"), Permission::ReadWrite);
        assert_eq!(set.get("student"), Permission::None);
    }

    #[test]
    fn merge_keeps_absent_principals() {
        let mut set = PermissionSet::new();
        set.insert("admin", Permission::ReadWrite)
            .insert("alice", Permission::Read);

        let mut update = PermissionSet::new();
        update
            .insert("alice", Permission::ReadWrite)
            .insert("bob", Permission::Read);
        set.merge(&update);

        let expected: PermissionSet = vec![
            ("admin", Permission::ReadWrite),
            ("alice", Permission::ReadWrite),
            ("bob", Permission::Read),
        ]
        .into_iter()
        .collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn merge_none_removes() {
        let mut set = PermissionSet::uniform(vec!["admin", "alice"], Permission::ReadWrite);
        set.merge(&PermissionSet::uniform(vec!["alice"], Permission::None));

        assert!(!set.contains("alice"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn plain_names_are_valid() {
        for name in &["admin", "c5bennet", "alice.smith", "o'brien", "ta-01", "jürgen"] {
            check_principal(name).unwrap();
        }
    }

    #[test]
    fn names_with_file_syntax_are_rejected() {
        let cases = [
            ("", "empty name"),
            ("alice smith", "contains whitespace"),
            ("alice\n[group_0002:/]\nmallory", "contains whitespace"),
            ("bob\u{0}", "contains a control character"),
            ("alice=rw", "contains a reserved character"),
            ("[groups]", "contains a reserved character"),
            ("#bob", "contains a reserved character"),
            ("@staff", "contains a reserved character"),
            ("*", "contains a reserved character"),
        ];
        for (name, expected) in &cases {
            match check_principal(name).unwrap_err() {
                Error::InvalidPrincipal { principal, reason } => {
                    assert_eq!(&principal, name);
                    assert_eq!(reason, *expected, "{:?}", name);
                }
                err => panic!("wrong error: {:?}", err),
            }
        }
    }

    #[test]
    fn check_reports_bad_member() {
        let mut set = PermissionSet::uniform(vec!["admin"], Permission::ReadWrite);
        set.check().unwrap();

        set.insert("", Permission::Read);
        assert!(set.check().is_err());
    }

    #[test]
    fn effective_drops_none() {
        let mut set = PermissionSet::new();
        set.insert("a", Permission::None).insert("b", Permission::Read);
        assert_eq!(
            set.effective(),
            PermissionSet::uniform(vec!["b"], Permission::Read)
        );
    }
}

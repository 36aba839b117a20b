//! Ties student groups to their repositories.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use grouprepo_core::permission::{Permission, PermissionSet};
use grouprepo_core::repo::{with_repository, Error, Repository, RepositoryFactory, Result};

/// A student group. Each group owns exactly one repository.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Group {
    pub id: u64,
}

impl Group {
    pub fn new(id: u64) -> Group {
        Group { id }
    }

    /// `group_` followed by the id, zero-padded to four digits.
    pub fn repository_name(&self) -> String {
        format!("group_{:04}", self.id)
    }
}

impl Display for Group {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "group {}", self.id)
    }
}

/// Course staff. Admins and graders have read-write access to every group
/// repository.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Staff {
    pub admins: Vec<String>,
    pub graders: Vec<String>,
}

impl Staff {
    pub fn new<I, J, S, T>(admins: I, graders: J) -> Staff
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Staff {
            admins: admins.into_iter().map(Into::into).collect(),
            graders: graders.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, principal: &str) -> bool {
        self.admins.iter().chain(self.graders.iter()).any(|p| p == principal)
    }

    /// `ReadWrite` for every staff member.
    pub fn permissions(&self) -> PermissionSet {
        PermissionSet::uniform(
            self.admins.iter().chain(self.graders.iter()).cloned(),
            Permission::ReadWrite,
        )
    }
}

/// Creates, opens and maintains the permissions of group repositories
/// through one backend.
pub struct RepositoryBinding {
    factory: Box<dyn RepositoryFactory>,
    staff: Staff,
}

impl RepositoryBinding {
    pub fn new(factory: Box<dyn RepositoryFactory>, staff: Staff) -> RepositoryBinding {
        RepositoryBinding { factory, staff }
    }

    pub fn factory(&self) -> &dyn RepositoryFactory {
        self.factory.as_ref()
    }

    pub fn staff(&self) -> &Staff {
        &self.staff
    }

    pub fn repository_location(&self, group: &Group) -> PathBuf {
        self.factory
            .config()
            .location_of(&group.repository_name())
    }

    /// Where students reach the group's repository from outside, if the
    /// configuration names a base URL.
    pub fn repository_external_access_url(&self, group: &Group) -> Option<String> {
        self.factory
            .config()
            .external_base_url
            .as_ref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), group.repository_name()))
    }

    /// Whether students may only submit by committing to the repository
    /// directly.
    pub fn repository_external_commits_only(&self) -> bool {
        self.factory.config().external_commits_only
    }

    /// Create the repository of a newly created group and give the staff
    /// access to it.
    ///
    /// If the permissions cannot be written, the repository is kept and
    /// `Error::PermissionBootstrapFailed` is returned; recover with
    /// `bootstrap_permissions`.
    pub fn build_repository(&self, group: &Group) -> Result<PathBuf> {
        let location = self.repository_location(group);
        self.factory.create(&location)?;
        self.bootstrap_permissions(group)?;

        log::info!(
            target: "group",
            "Built repository {} for {}",
            location.display(),
            group
        );
        Ok(location)
    }

    /// Grant `ReadWrite` to every staff member on the group's repository.
    pub fn bootstrap_permissions(&self, group: &Group) -> Result<()> {
        let location = self.repository_location(group);
        if !self.factory.repository_exists(&location) {
            return Err(Error::NotFound(location));
        }

        let permissions = self.staff.permissions();
        self.factory
            .set_bulk_permissions(&location, &permissions)
            .map_err(|source| {
                log::error!(
                    target: "group",
                    "Permission bootstrap failed for {}: {}",
                    location.display(),
                    source
                );
                Error::PermissionBootstrapFailed {
                    location: location.clone(),
                    permissions,
                    source: Box::new(source),
                }
            })
    }

    /// Open the group's repository. It is never created here.
    pub fn repo(&self, group: &Group) -> Result<Box<dyn Repository>> {
        self.factory.open(&self.repository_location(group))
    }

    /// Run `op` against the group's repository and close it afterwards.
    pub fn access_repo<T, F>(&self, group: &Group, op: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Repository) -> Result<T>,
    {
        with_repository(self.factory(), &self.repository_location(group), op)
    }

    /// Give members who joined the group (or accepted an invitation)
    /// read-write access.
    pub fn grant_members(&self, group: &Group, members: &[&str]) -> Result<()> {
        let location = self.repository_location(group);
        self.factory.set_bulk_permissions(
            &location,
            &PermissionSet::uniform(members.iter().copied(), Permission::ReadWrite),
        )?;

        log::info!(target: "group", "Granted {:?} access to {}", members, group);
        Ok(())
    }

    /// Take access away from members who left the group. Staff keep theirs.
    pub fn revoke_members(&self, group: &Group, members: &[&str]) -> Result<()> {
        let students: Vec<&str> = members
            .iter()
            .copied()
            .filter(|member| !self.staff.contains(member))
            .collect();
        if students.is_empty() {
            return Ok(());
        }

        let location = self.repository_location(group);
        self.factory.delete_bulk_permissions(&location, &students)?;

        log::info!(target: "group", "Revoked {:?} from {}", students, group);
        Ok(())
    }

    /// Make the recorded permissions exactly staff plus `members`.
    pub fn update_repository_permissions(&self, group: &Group, members: &[&str]) -> Result<()> {
        let mut permissions = self.staff.permissions();
        for member in members {
            permissions.insert(*member, Permission::ReadWrite);
        }

        self.factory
            .set_all_permissions(&self.repository_location(group), &permissions)
    }
}

use grouprepo_core::config::{BackendKind, Config};
use grouprepo_core::repo::{RepositoryFactory, Result};
use grouprepo_git::GitFactory;
use grouprepo_on_disk::SvnFactory;

/// Return the factory for the backend named `backend` (`svn`,
/// `subversion` or `git`, in any case), bound to `config`.
///
/// Fails with `Error::UnknownBackend` for any other name.
pub fn resolve(backend: &str, config: Config) -> Result<Box<dyn RepositoryFactory>> {
    let kind: BackendKind = backend.parse()?;
    Ok(resolve_kind(kind, config))
}

pub fn resolve_kind(kind: BackendKind, config: Config) -> Box<dyn RepositoryFactory> {
    log::debug!(
        target: "repo",
        "Using {} repositories under {}",
        kind,
        config.storage_root.display()
    );

    match kind {
        BackendKind::Svn => Box::new(SvnFactory::new(config)),
        BackendKind::Git => Box::new(GitFactory::new(config)),
    }
}

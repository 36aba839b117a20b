use std::path::Path;

use grouprepo::{
    resolve_kind, BackendKind, Config, RepositoryBinding, RepositoryFactory, Staff, TempStorage,
    Transaction,
};

pub const BACKENDS: [BackendKind; 2] = [BackendKind::Svn, BackendKind::Git];

#[allow(dead_code)]
pub fn factory(ts: &TempStorage, kind: BackendKind, admin: bool) -> Box<dyn RepositoryFactory> {
    resolve_kind(kind, ts.config(admin))
}

#[allow(dead_code)]
pub fn binding(ts: &TempStorage, kind: BackendKind, staff: Staff) -> RepositoryBinding {
    RepositoryBinding::new(factory(ts, kind, true), staff)
}

/// Record one file as the first revision the way a student working outside
/// grouprepo would: with git itself for git repositories, through a
/// separate read-only factory for svn repositories.
#[allow(dead_code)]
pub fn commit_externally(kind: BackendKind, location: &Path, path: &str, content: &[u8]) {
    match kind {
        BackendKind::Git => {
            let repo = git2::Repository::open_bare(location).unwrap();
            let sig = git2::Signature::now("student", "student@example.com").unwrap();

            let empty = repo.treebuilder(None).unwrap().write().unwrap();
            let base = repo.find_tree(empty).unwrap();
            let blob = repo.blob(content).unwrap();
            let mut update = git2::build::TreeUpdateBuilder::new();
            update.upsert(path, blob, git2::FileMode::Blob);
            let tree = repo
                .find_tree(update.create_updated(&repo, &base).unwrap())
                .unwrap();

            repo.commit(Some("HEAD"), &sig, &sig, "external", &tree, &[])
                .unwrap();
        }
        BackendKind::Svn => {
            let other = resolve_kind(
                kind,
                Config::new(
                    location.parent().unwrap(),
                    location.join("unused-permissions"),
                    false,
                ),
            );
            let mut repo = other.open(location).unwrap();
            repo.commit(
                Transaction::new("student")
                    .message("external")
                    .add_file(path, content)
                    .unwrap(),
            )
            .unwrap();
            repo.close().unwrap();
        }
    }
}

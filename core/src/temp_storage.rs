use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// A `TempStorage` lays out an empty storage root and a permission file
/// location in a temporary directory. This is used in tests of every
/// backend and of the tools built on them.
///
/// Because this struct is intended for testing, its functions panic
/// instead of returning Result structs.
#[derive(Default)]
pub struct TempStorage {
    #[allow(dead_code)] // tempdir is only used for RAII
    tempdir: Option<tempfile::TempDir>,
    path: PathBuf,
}

impl TempStorage {
    // Create a new storage layout in a temporary directory.
    // This directory will be deleted when the struct is dropped.
    pub fn new() -> TempStorage {
        let tempdir = tempfile::tempdir().unwrap();
        let path: PathBuf = tempdir.path().to_path_buf();

        let r = TempStorage {
            tempdir: Some(tempdir),
            path,
        };

        r.init();
        r
    }

    // Create a new storage layout in the specified location.
    // WARNING: This will erase any content already at that path.
    // Use this only when you need to manually inspect the results
    // of the test run.
    pub fn new_at_path<P: Into<PathBuf>>(p: P) -> TempStorage {
        let path = p.into();
        fs::remove_dir_all(&path).unwrap_or(());
        fs::create_dir_all(&path).unwrap();

        let r = TempStorage {
            tempdir: None,
            path,
        };

        r.init();
        r
    }

    fn init(&self) {
        fs::create_dir_all(self.storage_root()).unwrap();
        fs::create_dir_all(self.path.join("conf")).unwrap();
    }

    // Return the directory holding everything else.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    pub fn storage_root(&self) -> PathBuf {
        self.path.join("repos")
    }

    pub fn permission_file(&self) -> PathBuf {
        self.path.join("conf/permissions")
    }

    // Location of the repository called `name`.
    pub fn location(&self, name: &str) -> PathBuf {
        self.storage_root().join(name)
    }

    pub fn config(&self, is_repository_admin: bool) -> Config {
        Config::new(
            self.storage_root(),
            self.permission_file(),
            is_repository_admin,
        )
    }
}

use std::fs;
use std::sync::Arc;
use std::thread;

use grouprepo::{BackendKind, Error, Permission, PermissionSet, TempStorage};

mod common;

fn admin_and_staff() -> PermissionSet {
    let mut set = PermissionSet::new();
    set.insert("admin", Permission::ReadWrite)
        .insert("staff1", Permission::ReadWrite);
    set
}

#[test]
fn bulk_permissions_read_back() {
    for &kind in common::BACKENDS.iter() {
        let ts = TempStorage::new();
        let f = common::factory(&ts, kind, true);
        let location = ts.location("group_0001");
        f.create(&location).unwrap();

        f.set_bulk_permissions(&location, &admin_and_staff()).unwrap();
        assert_eq!(f.permissions(&location).unwrap(), admin_and_staff());
    }
}

#[test]
fn permission_file_formats() {
    let ts = TempStorage::new();
    let f = common::factory(&ts, BackendKind::Svn, true);
    let location = ts.location("group_0001");
    f.create(&location).unwrap();
    f.set_bulk_permissions(&location, &admin_and_staff()).unwrap();
    assert_eq!(
        fs::read_to_string(ts.permission_file()).unwrap(),
        "[group_0001:/]\nadmin = rw\nstaff1 = rw\n\n"
    );

    let ts = TempStorage::new();
    let f = common::factory(&ts, BackendKind::Git, true);
    let location = ts.location("group_0001");
    f.create(&location).unwrap();
    f.set_bulk_permissions(&location, &admin_and_staff()).unwrap();
    assert_eq!(
        fs::read_to_string(ts.permission_file()).unwrap(),
        "repo group_0001\n    RW+ = admin staff1\n\n"
    );
}

#[test]
fn merge_replace_and_revoke() {
    for &kind in common::BACKENDS.iter() {
        let ts = TempStorage::new();
        let f = common::factory(&ts, kind, true);
        let location = ts.location("group_0001");
        f.create(&location).unwrap();
        f.set_bulk_permissions(&location, &admin_and_staff()).unwrap();

        let mut update = PermissionSet::new();
        update
            .insert("alice", Permission::Read)
            .insert("staff1", Permission::None);
        f.set_bulk_permissions(&location, &update).unwrap();

        let mut expected = PermissionSet::new();
        expected
            .insert("admin", Permission::ReadWrite)
            .insert("alice", Permission::Read);
        assert_eq!(f.permissions(&location).unwrap(), expected);

        f.delete_bulk_permissions(&location, &["alice", "nobody"])
            .unwrap();
        assert_eq!(
            f.permissions(&location).unwrap(),
            PermissionSet::uniform(vec!["admin"], Permission::ReadWrite)
        );

        let replacement = PermissionSet::uniform(vec!["bob"], Permission::Read);
        f.set_all_permissions(&location, &replacement).unwrap();
        assert_eq!(f.permissions(&location).unwrap(), replacement);
    }
}

#[test]
fn repositories_keep_separate_permissions() {
    for &kind in common::BACKENDS.iter() {
        let ts = TempStorage::new();
        let f = common::factory(&ts, kind, true);
        let one = ts.location("group_0001");
        let two = ts.location("group_0002");
        f.create(&one).unwrap();
        f.create(&two).unwrap();

        f.set_bulk_permissions(&one, &PermissionSet::uniform(vec!["alice"], Permission::ReadWrite))
            .unwrap();
        f.set_bulk_permissions(&two, &PermissionSet::uniform(vec!["bob"], Permission::ReadWrite))
            .unwrap();
        f.delete_bulk_permissions(&one, &["alice"]).unwrap();

        assert!(f.permissions(&one).unwrap().is_empty());
        assert_eq!(
            f.permissions(&two).unwrap(),
            PermissionSet::uniform(vec!["bob"], Permission::ReadWrite)
        );
    }
}

#[test]
fn non_admin_cannot_change_permissions() {
    for &kind in common::BACKENDS.iter() {
        let ts = TempStorage::new();
        let location = ts.location("group_0001");
        common::factory(&ts, kind, true).create(&location).unwrap();

        let f = common::factory(&ts, kind, false);
        match f.set_bulk_permissions(&location, &admin_and_staff()).unwrap_err() {
            Error::NotAdmin(path) => assert_eq!(path, location),
            err => panic!("wrong error for {}: {:?}", kind, err),
        }
        assert!(f.set_all_permissions(&location, &admin_and_staff()).is_err());
        assert!(f.delete_bulk_permissions(&location, &["admin"]).is_err());
        assert!(!ts.permission_file().exists());

        // Reading is always allowed.
        assert!(f.permissions(&location).unwrap().is_empty());
    }
}

#[test]
fn concurrent_grants_are_all_recorded() {
    for &kind in common::BACKENDS.iter() {
        let ts = Arc::new(TempStorage::new());
        let location = ts.location("group_0001");
        common::factory(&ts, kind, true).create(&location).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let ts = Arc::clone(&ts);
                let location = location.clone();
                thread::spawn(move || {
                    // Every thread writes through its own factory, as separate
                    // processes would.
                    let f = common::factory(&ts, kind, true);
                    let mut grant = PermissionSet::new();
                    grant.insert(format!("student{}", n), Permission::ReadWrite);
                    f.set_bulk_permissions(&location, &grant).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let permissions = common::factory(&ts, kind, true)
            .permissions(&location)
            .unwrap();
        assert_eq!(permissions.len(), 8, "{} lost a grant", kind);
        for n in 0..8 {
            assert_eq!(
                permissions.get(&format!("student{}", n)),
                Permission::ReadWrite
            );
        }
    }
}

#[test]
fn malformed_permission_file() {
    for &kind in common::BACKENDS.iter() {
        let ts = TempStorage::new();
        let f = common::factory(&ts, kind, true);
        let location = ts.location("group_0001");
        f.create(&location).unwrap();
        fs::write(ts.permission_file(), "admin = rw\n").unwrap();

        match f.permissions(&location).unwrap_err() {
            Error::InvalidPermissionFile { line, .. } => assert_eq!(line, 1),
            err => panic!("wrong error for {}: {:?}", kind, err),
        }

        // Writers refuse to clobber what they cannot read.
        assert!(f.set_bulk_permissions(&location, &admin_and_staff()).is_err());
        assert_eq!(fs::read_to_string(ts.permission_file()).unwrap(), "admin = rw\n");
    }
}

#[test]
fn invalid_principals_leave_the_file_alone() {
    let names = [
        "alice = r\n[group_0002:/]\nmallory",
        "alice\nrepo group_0002\n    RW+ = mallory",
        "",
        "alice smith",
    ];

    for &kind in common::BACKENDS.iter() {
        let ts = TempStorage::new();
        let f = common::factory(&ts, kind, true);
        let location = ts.location("group_0001");
        f.create(&location).unwrap();
        f.set_bulk_permissions(&location, &admin_and_staff()).unwrap();
        let before = fs::read_to_string(ts.permission_file()).unwrap();

        for name in names.iter() {
            let bad = PermissionSet::uniform(vec![*name], Permission::ReadWrite);
            for result in vec![
                f.set_bulk_permissions(&location, &bad),
                f.set_all_permissions(&location, &bad),
            ] {
                match result.unwrap_err() {
                    Error::InvalidPrincipal { principal, .. } => assert_eq!(&principal, name),
                    err => panic!("wrong error for {}: {:?}", kind, err),
                }
            }
        }

        assert_eq!(fs::read_to_string(ts.permission_file()).unwrap(), before);
        assert_eq!(f.permissions(&location).unwrap(), admin_and_staff());
        assert!(f
            .permissions(&ts.location("group_0002"))
            .unwrap()
            .is_empty());

        // The file is still writable for everyone else.
        let mut update = PermissionSet::new();
        update.insert("bob", Permission::Read);
        f.set_bulk_permissions(&location, &update).unwrap();
        assert_eq!(f.permissions(&location).unwrap().len(), 3);
    }
}

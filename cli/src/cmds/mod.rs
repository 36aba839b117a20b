use std::{
    env, fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use clap::{Arg, ArgMatches};
use grouprepo::{Config, Repository, RepositoryFactory, Revision, RevisionId};
use serde::Deserialize;

use crate::{App, Result};

mod build_group;
mod cat;
mod exists;
mod grant;
mod group_name;
mod init;
mod latest;
mod ls;
mod permissions;
mod put;
mod revoke;
mod rm;

const DEFAULT_BACKEND: &str = "svn";
const DEFAULT_PERMISSION_FILE: &str = "permissions.conf";

pub(crate) fn add_subcommands<'a, 'b>(app: clap::App<'a, 'b>) -> clap::App<'a, 'b> {
    app.subcommand(build_group::subcommand())
        .subcommand(cat::subcommand())
        .subcommand(exists::subcommand())
        .subcommand(grant::subcommand())
        .subcommand(group_name::subcommand())
        .subcommand(init::subcommand())
        .subcommand(latest::subcommand())
        .subcommand(ls::subcommand())
        .subcommand(permissions::subcommand())
        .subcommand(put::subcommand())
        .subcommand(revoke::subcommand())
        .subcommand(rm::subcommand())
}

pub(crate) fn dispatch(app: &mut App) -> Result<()> {
    // Subcommands borrow `app` mutably, so they get their own copy.
    let matches = app.arg_matches.clone();

    match matches.subcommand() {
        ("build-group", Some(m)) => build_group::run(app, &m),
        ("cat", Some(m)) => cat::run(app, &m),
        ("exists", Some(m)) => exists::run(app, &m),
        ("grant", Some(m)) => grant::run(app, &m),
        ("group-name", Some(m)) => group_name::run(app, &m),
        ("init", Some(m)) => init::run(app, &m),
        ("latest", Some(m)) => latest::run(app, &m),
        ("ls", Some(m)) => ls::run(app, &m),
        ("permissions", Some(m)) => permissions::run(app, &m),
        ("put", Some(m)) => put::run(app, &m),
        ("revoke", Some(m)) => revoke::run(app, &m),
        ("rm", Some(m)) => rm::run(app, &m),
        // clap prints help and exits when no subcommand is given.
        _ => unreachable!(),
    }
}

/// Layout of the `--config` file. Fields of `Config` sit at the top level
/// next to `backend`.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    backend: Option<String>,
    #[serde(flatten)]
    repository: Config,
}

/// Backend name and `Config` from the global arguments. Explicit arguments
/// win over the `--config` file.
fn config(args: &ArgMatches) -> Result<(String, Config)> {
    let (backend, mut config) = match args.value_of("config") {
        Some(path) => {
            let file: ConfigFile = serde_json::from_str(&fs::read_to_string(path)?)?;
            (file.backend, file.repository)
        }
        None => {
            let storage = env::current_dir()?;
            let permission_file = storage.join(DEFAULT_PERMISSION_FILE);
            (None, Config::new(storage, permission_file, true))
        }
    };

    if let Some(storage) = args.value_of("storage") {
        config.storage_root = PathBuf::from(storage);
        if args.value_of("config").is_none() {
            config.permission_file = config.storage_root.join(DEFAULT_PERMISSION_FILE);
        }
    }
    if let Some(file) = args.value_of("permission-file") {
        config.permission_file = PathBuf::from(file);
    }
    if args.is_present("read-only") {
        config.is_repository_admin = false;
    }

    let backend = args
        .value_of("backend")
        .map(str::to_string)
        .or(backend)
        .unwrap_or_else(|| DEFAULT_BACKEND.to_string());

    log::debug!("Configuration: {} {:?}", backend, config);
    Ok((backend, config))
}

pub(crate) fn factory(args: &ArgMatches) -> Result<Box<dyn RepositoryFactory>> {
    let (backend, config) = config(args)?;
    Ok(grouprepo::resolve(&backend, config)?)
}

/// Location of the repository called `name`.
///
/// Names are single path components, so commands never reach outside the
/// storage directory.
pub(crate) fn location(factory: &dyn RepositoryFactory, name: &str) -> Result<PathBuf> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && Path::new(name).file_name().map_or(false, |n| n == name);
    if !valid {
        return Err(format!("invalid repository name `{}`", name).into());
    }
    Ok(factory.config().location_of(name))
}

pub(crate) fn revision_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("revision")
        .long("revision")
        .short("r")
        .value_name("ID")
        .takes_value(true)
        .conflicts_with("at")
        .help("Revision number or commit hash (default: latest)")
}

pub(crate) fn at_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("at")
        .long("at")
        .value_name("TIME")
        .takes_value(true)
        .help("Use the revision current at TIME (RFC 3339)")
}

/// Which revision a command looks at.
pub(crate) enum Selector {
    Latest,
    Id(RevisionId),
    At(DateTime<Utc>),
}

impl Selector {
    pub(crate) fn from_args(args: &ArgMatches) -> Result<Selector> {
        if let Some(id) = args.value_of("revision") {
            return match id.parse() {
                Ok(id) => Ok(Selector::Id(id)),
                Err(never) => match never {},
            };
        }
        if let Some(at) = args.value_of("at") {
            let at = DateTime::parse_from_rfc3339(at)
                .map_err(|err| format!("invalid time `{}`: {}", at, err))?;
            return Ok(Selector::At(at.with_timezone(&Utc)));
        }
        Ok(Selector::Latest)
    }

    pub(crate) fn select(&self, repo: &dyn Repository) -> grouprepo::Result<Revision> {
        match self {
            Selector::Latest => repo.latest_revision(),
            Selector::Id(id) => repo.revision(id),
            Selector::At(at) => repo.revision_at(*at),
        }
    }
}

pub(crate) fn required<'m>(args: &'m ArgMatches, name: &str) -> &'m str {
    // clap rejects the command line before we get here if it is missing.
    args.value_of(name).unwrap_or_default()
}


#[cfg(test)]
mod tests {
    use std::fs;

    use grouprepo::TempStorage;
    use serial_test::serial;

    use super::test_support::stdout_of;
    use crate::temp_cwd::TempCwd;
    use crate::App;

    #[test]
    #[serial]
    fn defaults_to_current_directory() {
        let dir = tempfile::tempdir().unwrap();
        let _cwd = TempCwd::new(dir.path());

        App::run_with_args(vec!["init", "group_0001", "--grant", "admin"]).unwrap();
        assert!(dir.path().join("group_0001/format").is_file());
        assert_eq!(
            fs::read_to_string(dir.path().join("permissions.conf")).unwrap(),
            "[group_0001:/]\nadmin = rw\n\n"
        );
    }

    #[test]
    fn config_file() {
        let ts = TempStorage::new();
        let config = ts.path().join("grouprepo.json");
        fs::write(
            &config,
            format!(
                r#"{{"backend": "git", "storage_root": "{}", "permission_file": "{}"}}"#,
                ts.storage_root().display(),
                ts.permission_file().display()
            ),
        )
        .unwrap();
        let config = config.to_str().unwrap();

        // Not admin unless the file says so.
        let err = App::run_with_args(vec!["--config", config, "init", "group_0001"]).unwrap_err();
        assert!(err.to_string().contains("not in repository admin mode"));

        let stdout = App::run_with_args(vec!["--config", config, "exists", "group_0001"]).unwrap();
        assert_eq!(stdout, b"false\n");
        assert!(!ts.location("group_0001").exists());
    }

    #[test]
    fn rejects_names_outside_storage() {
        let ts = TempStorage::new();
        for name in &["", "..", ".hidden", "a/b", "/etc"] {
            let err = super::test_support::run_in(&ts, "svn", &["exists", name]).unwrap_err();
            assert!(
                err.to_string().contains("invalid repository name"),
                "{}: {}",
                name,
                err
            );
        }
        assert_eq!(stdout_of(&ts, "svn", &["exists", "group_0001"]), "false\n");
    }

    #[test]
    fn unknown_backend() {
        let ts = TempStorage::new();
        let err = super::test_support::run_in(&ts, "cvs", &["exists", "x"]).unwrap_err();
        assert_eq!(err.to_string(), "unknown repository backend `cvs`");
    }
}

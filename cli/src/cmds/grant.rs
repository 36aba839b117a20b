use std::io::Write;
use std::path::Path;

use clap::{Arg, ArgMatches, SubCommand};
use grouprepo::{Error, Permission, PermissionSet, RepositoryFactory};

use super::{App, Result};

pub(crate) fn subcommand<'a, 'b>() -> clap::App<'a, 'b> {
    SubCommand::with_name("grant")
        .about("Set the access level of a user on a repository")
        .arg(Arg::with_name("name").required(true))
        .arg(Arg::with_name("user").required(true))
        .arg(
            Arg::with_name("level")
                .required(true)
                .possible_values(&["r", "rw", "none"])
                .help("Access level; none revokes"),
        )
}

pub(crate) fn run(app: &mut App, args: &ArgMatches) -> Result<()> {
    let factory = super::factory(&app.arg_matches)?;
    let location = super::location(factory.as_ref(), super::required(args, "name"))?;
    let user = super::required(args, "user");
    let level = parse_level(super::required(args, "level"))?;

    existing(factory.as_ref(), &location)?;

    let mut permissions = PermissionSet::new();
    permissions.insert(user, level);
    factory.set_bulk_permissions(&location, &permissions)?;

    writeln!(app, "{} = {}", user, level)?;
    Ok(())
}

/// Permission changes only make sense for repositories that exist.
pub(crate) fn existing(factory: &dyn RepositoryFactory, location: &Path) -> Result<()> {
    if factory.repository_exists(location) {
        Ok(())
    } else {
        Err(Error::NotFound(location.to_path_buf()).into())
    }
}

fn parse_level(level: &str) -> Result<Permission> {
    match level {
        "r" => Ok(Permission::Read),
        "rw" => Ok(Permission::ReadWrite),
        "none" => Ok(Permission::None),
        _ => Err(format!("invalid access level `{}`", level).into()),
    }
}

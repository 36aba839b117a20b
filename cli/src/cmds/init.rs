use std::io::Write;

use clap::{Arg, ArgMatches, SubCommand};
use grouprepo::{Permission, PermissionSet};

use super::{App, Result};

pub(crate) fn subcommand<'a, 'b>() -> clap::App<'a, 'b> {
    SubCommand::with_name("init")
        .about("Create an empty repository")
        .arg(
            Arg::with_name("name")
                .required(true)
                .help("Name of the repository to create"),
        )
        .arg(
            Arg::with_name("grant")
                .long("grant")
                .value_name("USER")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Give USER read-write access (may be repeated)"),
        )
}

pub(crate) fn run(app: &mut App, args: &ArgMatches) -> Result<()> {
    let factory = super::factory(&app.arg_matches)?;
    let location = super::location(factory.as_ref(), super::required(args, "name"))?;

    factory.create(&location)?;

    if let Some(users) = args.values_of("grant") {
        let permissions = PermissionSet::uniform(users, Permission::ReadWrite);
        factory.set_bulk_permissions(&location, &permissions)?;
    }

    writeln!(
        app,
        "Initialized empty {} repository in {}",
        factory.kind(),
        location.display()
    )?;

    Ok(())
}

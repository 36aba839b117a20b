use std::io::Write;

use clap::{Arg, ArgMatches, SubCommand};
use grouprepo::{Group, RepositoryBinding, Staff};

use super::{App, Result};

pub(crate) fn subcommand<'a, 'b>() -> clap::App<'a, 'b> {
    SubCommand::with_name("build-group")
        .about("Create the repository of a new group and give the staff access")
        .arg(Arg::with_name("id").required(true).help("Group id"))
        .arg(
            Arg::with_name("admin")
                .long("admin")
                .value_name("USER")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Course admin (may be repeated)"),
        )
        .arg(
            Arg::with_name("grader")
                .long("grader")
                .value_name("USER")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Grader (may be repeated)"),
        )
        .arg(
            Arg::with_name("retry-permissions")
                .long("retry-permissions")
                .help("Only write the staff permissions of an existing repository"),
        )
}

pub(crate) fn run(app: &mut App, args: &ArgMatches) -> Result<()> {
    let id = super::required(args, "id");
    let group = Group::new(
        id.parse()
            .map_err(|_| format!("invalid group id `{}`", id))?,
    );

    let staff = Staff::new(
        args.values_of("admin").into_iter().flatten(),
        args.values_of("grader").into_iter().flatten(),
    );
    let binding = RepositoryBinding::new(super::factory(&app.arg_matches)?, staff);

    if args.is_present("retry-permissions") {
        binding.bootstrap_permissions(&group)?;
        writeln!(app, "Wrote staff permissions for {}", group.repository_name())?;
    } else {
        let location = binding.build_repository(&group)?;
        writeln!(
            app,
            "Built repository {} in {}",
            group.repository_name(),
            location.display()
        )?;
    }

    if let Some(url) = binding.repository_external_access_url(&group) {
        writeln!(app, "External access: {}", url)?;
    }

    Ok(())
}

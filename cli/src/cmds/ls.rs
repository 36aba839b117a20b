use std::io::Write;

use chrono::SecondsFormat;
use clap::{Arg, ArgMatches, SubCommand};
use grouprepo::with_repository;

use super::{App, Result, Selector};

pub(crate) fn subcommand<'a, 'b>() -> clap::App<'a, 'b> {
    SubCommand::with_name("ls")
        .about("List the files of a revision")
        .arg(Arg::with_name("name").required(true))
        .arg(
            Arg::with_name("dir")
                .help("Only list files directly inside this directory"),
        )
        .arg(super::revision_arg())
        .arg(super::at_arg())
}

pub(crate) fn run(app: &mut App, args: &ArgMatches) -> Result<()> {
    let factory = super::factory(&app.arg_matches)?;
    let location = super::location(factory.as_ref(), super::required(args, "name"))?;
    let selector = Selector::from_args(args)?;
    let dir = args.value_of("dir");

    let files = with_repository(factory.as_ref(), &location, |repo| {
        let revision = selector.select(repo)?;
        match dir {
            Some(dir) => revision.files_at_path(dir),
            None => revision.list_files(),
        }
    })?;

    for file in files {
        writeln!(
            app,
            "{:>8}  {}  {}",
            file.size,
            file.last_modified.to_rfc3339_opts(SecondsFormat::Secs, true),
            file.path
        )?;
    }

    Ok(())
}

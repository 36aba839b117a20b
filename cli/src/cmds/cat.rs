use std::io::Write;

use clap::{Arg, ArgMatches, SubCommand};
use grouprepo::with_repository;

use super::{App, Result, Selector};

pub(crate) fn subcommand<'a, 'b>() -> clap::App<'a, 'b> {
    SubCommand::with_name("cat")
        .about("Print the content of a file")
        .arg(Arg::with_name("name").required(true))
        .arg(Arg::with_name("path").required(true))
        .arg(super::revision_arg())
        .arg(super::at_arg())
}

pub(crate) fn run(app: &mut App, args: &ArgMatches) -> Result<()> {
    let factory = super::factory(&app.arg_matches)?;
    let location = super::location(factory.as_ref(), super::required(args, "name"))?;
    let selector = Selector::from_args(args)?;
    let path = super::required(args, "path");

    let content = with_repository(factory.as_ref(), &location, |repo| {
        selector.select(repo)?.file_content(path)
    })?;
    app.write_all(&content)?;

    Ok(())
}

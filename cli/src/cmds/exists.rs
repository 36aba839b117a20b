use std::io::Write;

use clap::{Arg, ArgMatches, SubCommand};

use super::{App, Result};

pub(crate) fn subcommand<'a, 'b>() -> clap::App<'a, 'b> {
    SubCommand::with_name("exists")
        .about("Print whether a repository exists")
        .arg(Arg::with_name("name").required(true))
}

pub(crate) fn run(app: &mut App, args: &ArgMatches) -> Result<()> {
    let factory = super::factory(&app.arg_matches)?;
    let location = super::location(factory.as_ref(), super::required(args, "name"))?;

    writeln!(app, "{}", factory.repository_exists(&location))?;

    Ok(())
}

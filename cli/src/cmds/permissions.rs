use std::io::Write;

use clap::{Arg, ArgMatches, SubCommand};

use super::{App, Result};

pub(crate) fn subcommand<'a, 'b>() -> clap::App<'a, 'b> {
    SubCommand::with_name("permissions")
        .about("Print who can access a repository")
        .arg(Arg::with_name("name").required(true))
}

pub(crate) fn run(app: &mut App, args: &ArgMatches) -> Result<()> {
    let factory = super::factory(&app.arg_matches)?;
    let location = super::location(factory.as_ref(), super::required(args, "name"))?;

    for (user, level) in factory.permissions(&location)?.iter() {
        writeln!(app, "{} = {}", user, level)?;
    }
    Ok(())
}

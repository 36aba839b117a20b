use std::io::Write;

use clap::{Arg, ArgMatches, SubCommand};
use grouprepo::Group;

use super::{App, Result};

pub(crate) fn subcommand<'a, 'b>() -> clap::App<'a, 'b> {
    SubCommand::with_name("group-name")
        .about("Print the repository name of a group")
        .arg(Arg::with_name("id").required(true).help("Group id"))
}

pub(crate) fn run(app: &mut App, args: &ArgMatches) -> Result<()> {
    let id = super::required(args, "id");
    let id: u64 = id
        .parse()
        .map_err(|_| format!("invalid group id `{}`", id))?;

    writeln!(app, "{}", Group::new(id).repository_name())?;

    Ok(())
}

use std::io::Write;

use clap::{Arg, ArgMatches, SubCommand};
use grouprepo::{with_repository, Transaction};

use super::{App, Result};

pub(crate) fn subcommand<'a, 'b>() -> clap::App<'a, 'b> {
    SubCommand::with_name("rm")
        .about("Commit the removal of files")
        .arg(Arg::with_name("name").required(true))
        .arg(Arg::with_name("path").required(true).multiple(true))
        .arg(super::put::user_arg())
        .arg(super::put::message_arg())
}

pub(crate) fn run(app: &mut App, args: &ArgMatches) -> Result<()> {
    let factory = super::factory(&app.arg_matches)?;
    let location = super::location(factory.as_ref(), super::required(args, "name"))?;

    let mut transaction = Transaction::new(super::required(args, "user"))
        .message(args.value_of("message").unwrap_or_default());
    for path in args.values_of("path").into_iter().flatten() {
        transaction = transaction.remove_file(path)?;
    }

    let revision = with_repository(factory.as_ref(), &location, |repo| {
        repo.commit(transaction)
    })?;

    writeln!(app, "Committed revision {}", revision.id())?;
    Ok(())
}

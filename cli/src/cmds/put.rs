use std::io::Write;

use clap::{Arg, ArgMatches, SubCommand};
use grouprepo::{with_repository, Error, Transaction};

use super::{App, Result};

pub(crate) fn subcommand<'a, 'b>() -> clap::App<'a, 'b> {
    SubCommand::with_name("put")
        .about("Commit standard input as the content of a file")
        .arg(Arg::with_name("name").required(true))
        .arg(Arg::with_name("path").required(true))
        .arg(user_arg())
        .arg(message_arg())
}

pub(crate) fn user_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("user")
        .long("user")
        .value_name("USER")
        .takes_value(true)
        .default_value("grouprepo")
        .help("Author of the commit")
}

pub(crate) fn message_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("message")
        .long("message")
        .short("m")
        .value_name("MESSAGE")
        .takes_value(true)
        .help("Log message")
}

pub(crate) fn run(app: &mut App, args: &ArgMatches) -> Result<()> {
    let factory = super::factory(&app.arg_matches)?;
    let location = super::location(factory.as_ref(), super::required(args, "name"))?;
    let path = super::required(args, "path");

    let mut content = Vec::new();
    app.stdin.read_to_end(&mut content)?;

    let user = super::required(args, "user");
    let message = args.value_of("message").unwrap_or_default();

    let revision = with_repository(factory.as_ref(), &location, |repo| {
        let exists = match repo.latest_revision() {
            Ok(latest) => latest.path_exists(path)?,
            Err(Error::EmptyRepository(_)) => false,
            Err(err) => return Err(err),
        };

        let transaction = Transaction::new(user).message(message);
        let transaction = if exists {
            transaction.replace_file(path, content)?
        } else {
            transaction.add_file(path, content)?
        };
        repo.commit(transaction)
    })?;

    writeln!(app, "Committed revision {}", revision.id())?;
    Ok(())
}

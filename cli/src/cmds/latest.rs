use std::io::Write;

use chrono::SecondsFormat;
use clap::{Arg, ArgMatches, SubCommand};
use grouprepo::{with_repository, Revision};

use super::{App, Result, Selector};

pub(crate) fn subcommand<'a, 'b>() -> clap::App<'a, 'b> {
    SubCommand::with_name("latest")
        .about("Describe the latest revision of a repository")
        .arg(Arg::with_name("name").required(true))
        .arg(super::revision_arg())
        .arg(super::at_arg())
}

pub(crate) fn run(app: &mut App, args: &ArgMatches) -> Result<()> {
    let factory = super::factory(&app.arg_matches)?;
    let location = super::location(factory.as_ref(), super::required(args, "name"))?;
    let selector = Selector::from_args(args)?;

    let description = with_repository(factory.as_ref(), &location, |repo| {
        describe(&selector.select(repo)?)
    })?;
    app.write_all(description.as_bytes())?;

    Ok(())
}

fn describe(revision: &Revision) -> grouprepo::Result<String> {
    let mut text = format!(
        "revision {}\nauthor {}\ndate {}\nfiles {}\n",
        revision.id(),
        revision.author()?,
        revision
            .timestamp()?
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        revision.list_files()?.len()
    );

    let message = revision.message()?;
    if !message.is_empty() {
        text.push('\n');
        for line in message.lines() {
            text.push_str(&format!("    {}\n", line));
        }
    }
    Ok(text)
}

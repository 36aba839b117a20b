use clap::{Arg, ArgMatches, SubCommand};

use super::{App, Result};

pub(crate) fn subcommand<'a, 'b>() -> clap::App<'a, 'b> {
    SubCommand::with_name("revoke")
        .about("Remove every grant of the given users on a repository")
        .arg(Arg::with_name("name").required(true))
        .arg(Arg::with_name("user").required(true).multiple(true))
}

pub(crate) fn run(app: &mut App, args: &ArgMatches) -> Result<()> {
    let factory = super::factory(&app.arg_matches)?;
    let location = super::location(factory.as_ref(), super::required(args, "name"))?;
    let users: Vec<&str> = args.values_of("user").into_iter().flatten().collect();

    super::grant::existing(factory.as_ref(), &location)?;
    factory.delete_bulk_permissions(&location, &users)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use grouprepo::TempStorage;

    use crate::cmds::test_support::{run_in, stdout_of};

    #[test]
    fn revokes_users() {
        let ts = TempStorage::new();
        run_in(
            &ts,
            "git",
            &["init", "group_0001", "--grant", "ta", "--grant", "alice", "--grant", "bob"],
        )
        .unwrap();

        let stdout = run_in(&ts, "git", &["revoke", "group_0001", "alice", "bob", "carol"]).unwrap();
        assert!(stdout.is_empty());

        assert_eq!(stdout_of(&ts, "git", &["permissions", "group_0001"]), "ta = rw\n");
        assert_eq!(
            fs::read_to_string(ts.permission_file()).unwrap(),
            "repo group_0001\n    RW+ = ta\n\n"
        );
    }
}

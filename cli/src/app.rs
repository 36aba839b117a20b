#![deny(warnings)]

use std::io::{Read, Write};

#[cfg(test)]
use std::ffi::OsString;

use crate::{cmds, Result};

use clap::{crate_version, AppSettings, Arg, ArgMatches};

pub(crate) fn clap_app<'a, 'b>() -> clap::App<'a, 'b> {
    let app = clap::App::new("grouprepo")
        .version(crate_version!())
        .about("Create group repositories and manage who can access them")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .setting(AppSettings::VersionlessSubcommands)
        .arg(
            Arg::with_name("backend")
                .long("backend")
                .value_name("KIND")
                .takes_value(true)
                .help("Repository backend: svn or git (default svn)"),
        )
        .arg(
            Arg::with_name("storage")
                .long("storage")
                .value_name("DIR")
                .takes_value(true)
                .help("Directory holding the repositories (default: current directory)"),
        )
        .arg(
            Arg::with_name("permission-file")
                .long("permission-file")
                .value_name("FILE")
                .takes_value(true)
                .help("Permission file (default: permissions.conf in the storage directory)"),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .value_name("FILE")
                .takes_value(true)
                .help("Read backend, storage and permission file from a JSON file"),
        )
        .arg(
            Arg::with_name("read-only")
                .long("read-only")
                .help("Never create repositories or change permissions"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("Log more (repeat for debug output)"),
        );

    cmds::add_subcommands(app)
}

pub(crate) struct App<'a> {
    pub arg_matches: ArgMatches<'a>,
    pub stdin: &'a mut dyn Read,
    pub stdout: &'a mut dyn Write,
}

impl<'a> App<'a> {
    pub fn run(&mut self) -> Result<()> {
        cmds::dispatch(self)
    }

    #[cfg(test)]
    pub fn run_with_stdin_and_args<I, T>(stdin: Vec<u8>, args: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut args: Vec<OsString> = args.into_iter().map(|x| x.into()).collect();
        args.insert(0, OsString::from("grouprepo"));

        let mut stdin = std::io::Cursor::new(stdin);
        let mut stdout = Vec::new();

        App {
            arg_matches: clap_app().get_matches_from_safe(args)?,
            stdin: &mut stdin,
            stdout: &mut stdout,
        }
        .run()?;

        Ok(stdout)
    }

    #[cfg(test)]
    pub fn run_with_args<I, T>(args: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let stdin: Vec<u8> = Vec::new();
        App::run_with_stdin_and_args(stdin, args)
    }
}

impl<'a> Write for App<'a> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stdout.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stdout.flush()
    }
}

#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use predicates::prelude::*;

    #[test]
    fn no_subcommand_prints_help() {
        let mut cmd = Command::cargo_bin("grouprepo").unwrap();
        cmd.assert()
            .failure()
            .stdout("")
            .stderr(predicate::str::starts_with("grouprepo 0."))
            .stderr(predicate::str::contains("USAGE:"));
    }

    #[test]
    fn version() {
        let mut cmd = Command::cargo_bin("grouprepo").unwrap();
        cmd.arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::starts_with("grouprepo 0."))
            .stderr("");
    }

    #[test]
    fn errors_go_to_stderr() {
        let storage = tempfile::tempdir().unwrap();
        let mut cmd = Command::cargo_bin("grouprepo").unwrap();
        cmd.args(&["--backend", "cvs", "--storage"])
            .arg(storage.path())
            .args(&["exists", "group_0001"])
            .assert()
            .failure()
            .stdout("")
            .stderr(predicate::str::contains("unknown repository backend `cvs`"));
    }
}

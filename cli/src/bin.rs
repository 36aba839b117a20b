#![deny(warnings)]

use std::{
    error::Error,
    io::{self, Write},
};

mod app;
pub(crate) use app::App;

mod cmds;
mod logging;
#[cfg(test)]
mod temp_cwd;

pub(crate) type Result<T> = std::result::Result<T, Box<dyn Error>>;

#[allow(unused_must_use)]
fn main() {
    let stdin = io::stdin();
    let mut stdin = stdin.lock();

    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    let arg_matches = app::clap_app().get_matches();

    // Keep the handle alive so buffered log lines are written on exit.
    let _logger = match logging::init(arg_matches.occurrences_of("verbose")) {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("WARNING: logging disabled: {}", err);
            None
        }
    };

    let mut app = App {
        arg_matches,
        stdin: &mut stdin,
        stdout: &mut stdout,
    };

    let r = app.run();

    app.flush();

    std::process::exit(match r {
        Ok(()) => 0,
        Err(err) => {
            log::debug!("{:?}", err);
            eprintln!("ERROR: {}", err);
            1
        }
    });
}

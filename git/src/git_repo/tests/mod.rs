use grouprepo_core::TempStorage;

use super::*;


fn created(ts: &TempStorage, name: &str) -> (GitFactory, PathBuf) {
    let f = GitFactory::new(ts.config(true));
    let location = ts.location(name);
    f.create(&location).unwrap();
    (f, location)
}

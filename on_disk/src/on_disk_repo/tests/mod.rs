use grouprepo_core::TempStorage;

use super::*;


fn factory(ts: &TempStorage) -> SvnFactory {
    SvnFactory::new(ts.config(true))
}

fn created(ts: &TempStorage, name: &str) -> (SvnFactory, PathBuf) {
    let f = factory(ts);
    let location = ts.location(name);
    f.create(&location).unwrap();
    (f, location)
}

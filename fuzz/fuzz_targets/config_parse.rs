#![no_main]

use std::fs;
use std::path::Path;

use courier_config::{BuildConfig, load_config};
use libfuzzer_sys::fuzz_target;
use tempfile::tempdir;

fuzz_target!(|data: &[u8]| {
    let td = match tempdir() {
        Ok(v) => v,
        Err(_) => return,
    };

    if fs::write(td.path().join(".courier.toml"), data).is_err() {
        return;
    }
    if let Ok(config) = load_config(td.path()) {
        // Resolution never fails once the file parsed.
        let build = BuildConfig::resolve(Path::new("/project"), &config);
        let _ = build.target_options("local-dir");
    }
});

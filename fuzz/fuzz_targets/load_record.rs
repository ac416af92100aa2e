#![no_main]

use std::fs;

use courier_snapshot::{SnapshotStore, record_file_name};
use libfuzzer_sys::fuzz_target;
use tempfile::tempdir;

fuzz_target!(|data: &[u8]| {
    let td = match tempdir() {
        Ok(v) => v,
        Err(_) => return,
    };

    let record = td.path().join("0123456789abcdef");
    if fs::create_dir(&record).is_err() {
        return;
    }
    if fs::write(record.join(record_file_name(0)), data).is_ok() {
        let _ = SnapshotStore::new(td.path()).load_all();
    }
});

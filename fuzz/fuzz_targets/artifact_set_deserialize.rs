#![no_main]

use courier_types::{ArtifactSet, PublishGroup};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(set) = serde_json::from_slice::<ArtifactSet>(data) {
        // A parsed set survives a round trip unchanged.
        let json = serde_json::to_vec(&set).expect("serialize");
        let back: ArtifactSet = serde_json::from_slice(&json).expect("reparse");
        assert_eq!(set, back);
    }
    let _ = serde_json::from_slice::<PublishGroup>(data);
});

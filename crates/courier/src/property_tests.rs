//! Property-based tests for dispatch invariants.
//!
//! - Resolution order: targets come out in exactly the order they were named
//! - Resume fan-out: every persisted group reaches every target exactly once

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;
    use tempfile::tempdir;

    use crate::config::{BuildConfig, Config};
    use crate::engine::{RunOptions, run_publish};
    use crate::make::StaticMaker;
    use crate::resolve::{resolve_targets, target_names};
    use crate::snapshot::SnapshotStore;
    use crate::target::{RunnableTarget, TargetRegistry, TargetSpec};
    use crate::test_support::{CollectingReporter, RecordingTarget, group_of, set};
    use crate::types::PublishGroup;

    fn target_name_strategy() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,11}"
    }

    fn registry_for(names: &[String]) -> TargetRegistry {
        let mut registry = TargetRegistry::new();
        for name in names {
            let target = RecordingTarget::new(name);
            registry.register(name, move |_| Ok(target.clone() as RunnableTarget));
        }
        registry
    }

    fn group_strategy() -> impl Strategy<Value = PublishGroup> {
        prop::collection::vec(
            (
                prop_oneof![Just("darwin"), Just("linux"), Just("win32")],
                prop_oneof![Just("x64"), Just("arm64")],
                prop::collection::vec("[a-z]{1,8}\\.(zip|deb|exe)", 0..3),
            ),
            1..4,
        )
        .prop_map(|sets| {
            group_of(
                sets.into_iter()
                    .map(|(platform, arch, files)| {
                        let files: Vec<&str> = files.iter().map(String::as_str).collect();
                        set(platform, arch, &files)
                    })
                    .collect(),
            )
        })
    }

    proptest! {
        /// Property: resolution preserves the order of the configured names
        #[test]
        fn resolution_preserves_order(
            names in prop::collection::vec(target_name_strategy(), 0..8)
        ) {
            let mut config = Config::new();
            config.set_publishers(names.clone());
            let build = BuildConfig::resolve(std::path::Path::new("/project"), &config);
            let mut reporter = CollectingReporter::default();

            let targets = resolve_targets(None, &build, &registry_for(&names), &mut reporter)
                .expect("resolve");

            prop_assert_eq!(target_names(&targets), names.clone());

            let specs: Vec<TargetSpec> = names.iter().cloned().map(TargetSpec::from).collect();
            let explicit = resolve_targets(
                Some(specs.as_slice()),
                &build,
                &registry_for(&names),
                &mut reporter,
            )
            .expect("resolve");
            prop_assert_eq!(target_names(&explicit), names);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Property: resume invokes each target once per persisted group,
        /// with exactly that group's sets
        #[test]
        fn resume_delivers_each_group_to_each_target(
            groups in prop::collection::vec(group_strategy(), 1..4),
            target_count in 0usize..4,
        ) {
            let td = tempdir().expect("tempdir");
            let build = BuildConfig::resolve(td.path(), &Config::new());

            let mut store = SnapshotStore::new(&build.snapshot_dir);
            for group in &groups {
                store.persist(group).expect("persist");
            }

            let targets: Vec<Arc<RecordingTarget>> = (0..target_count)
                .map(|i| RecordingTarget::new(&format!("t{i}")))
                .collect();
            let mut opts = RunOptions::new(td.path());
            opts.dry_run_resume = true;
            opts.targets = Some(
                targets
                    .iter()
                    .map(|t| TargetSpec::Instance(t.clone() as RunnableTarget))
                    .collect(),
            );
            let mut reporter = CollectingReporter::default();

            let report = run_publish(
                &opts,
                &build,
                &StaticMaker::default(),
                &TargetRegistry::new(),
                &mut reporter,
            )
            .expect("resume");

            prop_assert_eq!(report.group_count, groups.len());
            prop_assert_eq!(report.invocation_count(), groups.len() * target_count);

            let mut expected = groups.clone();
            expected.sort_by_key(|g| serde_json::to_string(g).unwrap_or_default());
            for target in &targets {
                let mut seen: Vec<PublishGroup> =
                    target.calls().into_iter().map(|c| c.group).collect();
                seen.sort_by_key(|g| serde_json::to_string(g).unwrap_or_default());
                prop_assert_eq!(&seen, &expected);
            }
        }
    }
}

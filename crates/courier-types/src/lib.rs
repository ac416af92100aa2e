//! Core domain types for courier.
//!
//! This crate provides the data model shared by the snapshot store, the
//! dispatcher, and the CLI: artifact sets produced by a make stage, the
//! groups they are published in, the dispatch mode selected for a run, and
//! the report a run hands back to its caller.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of make output.
///
/// Artifact paths are stored exactly as the make stage produced them
/// (absolute or relative); they are never re-rooted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSet {
    /// Paths of the produced artifacts, in production order
    pub artifacts: Vec<PathBuf>,
    /// Platform identifier (e.g. "darwin", "linux", "win32")
    pub platform: String,
    /// Architecture identifier (e.g. "x64", "arm64")
    pub arch: String,
    /// Package metadata copied verbatim from the build stage
    #[serde(rename = "packageJSON", default)]
    pub package_json: serde_json::Value,
}

impl ArtifactSet {
    /// Create an artifact set with empty package metadata.
    pub fn new(
        artifacts: Vec<PathBuf>,
        platform: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            artifacts,
            platform: platform.into(),
            arch: arch.into(),
            package_json: serde_json::Value::Null,
        }
    }

    /// Attach package metadata.
    pub fn with_package_json(mut self, package_json: serde_json::Value) -> Self {
        self.package_json = package_json;
        self
    }

    /// "platform-arch" label, e.g. `darwin-arm64`.
    pub fn target_label(&self) -> String {
        format!("{}-{}", self.platform, self.arch)
    }
}

/// All artifact sets produced together by a single make invocation.
///
/// Serializes as a bare JSON array so make commands can emit it directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublishGroup {
    sets: Vec<ArtifactSet>,
}

impl PublishGroup {
    pub fn new(sets: Vec<ArtifactSet>) -> Self {
        Self { sets }
    }

    pub fn sets(&self) -> &[ArtifactSet] {
        &self.sets
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArtifactSet> {
        self.sets.iter()
    }

    /// Total number of artifact paths across every set in the group.
    pub fn artifact_count(&self) -> usize {
        self.sets.iter().map(|s| s.artifacts.len()).sum()
    }

    /// Distinct "platform-arch" labels, in first-seen order.
    pub fn target_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for set in &self.sets {
            let label = set.target_label();
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels
    }
}

impl From<Vec<ArtifactSet>> for PublishGroup {
    fn from(sets: Vec<ArtifactSet>) -> Self {
        Self::new(sets)
    }
}

impl<'a> IntoIterator for &'a PublishGroup {
    type Item = &'a ArtifactSet;
    type IntoIter = std::slice::Iter<'a, ArtifactSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.iter()
    }
}

/// Which of the three dispatch flows a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Make, then publish the fresh group to every target
    #[default]
    Live,
    /// Make, then persist the group to the snapshot root; publish nothing
    SnapshotWrite,
    /// Skip make; publish every persisted group to every target
    Resume,
}

impl DispatchMode {
    /// Select a mode from the dry-run / dry-run-resume flags.
    pub fn from_flags(dry_run: bool, dry_run_resume: bool) -> Result<Self, DispatchError> {
        match (dry_run, dry_run_resume) {
            (true, true) => Err(DispatchError::ConflictingModes),
            (true, false) => Ok(Self::SnapshotWrite),
            (false, true) => Ok(Self::Resume),
            (false, false) => Ok(Self::Live),
        }
    }
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchMode::Live => write!(f, "live"),
            DispatchMode::SnapshotWrite => write!(f, "snapshot-write"),
            DispatchMode::Resume => write!(f, "resume"),
        }
    }
}

/// Evidence for a single (group, target) invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationReceipt {
    /// Name of the target that was invoked
    pub target: String,
    /// Index of the group within this run
    pub group: usize,
    /// "platform-arch" labels present in the group
    pub platforms: Vec<String>,
    /// Number of artifact paths handed to the target
    pub artifact_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Outcome of one dispatcher run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub mode: DispatchMode,
    /// Resolved target names, in dispatch order
    pub targets: Vec<String>,
    /// Number of groups made or loaded
    pub group_count: usize,
    /// Name of the snapshot record written (snapshot-write mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_record: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub invocations: Vec<InvocationReceipt>,
}

impl DispatchReport {
    /// Start an empty report for the given mode.
    pub fn begin(mode: DispatchMode, targets: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            mode,
            targets,
            group_count: 0,
            snapshot_record: None,
            started_at: now,
            finished_at: now,
            invocations: Vec::new(),
        }
    }

    /// Stamp the finish time.
    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.len()
    }
}

/// Typed dispatch failures.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A publish target name has no registered loader
    #[error("publish target '{name}' could not be resolved (available: {})", available.join(", "))]
    UnknownTarget {
        name: String,
        available: Vec<String>,
    },

    /// Both dry-run and dry-run-resume were requested
    #[error("dry-run and dry-run-resume are mutually exclusive")]
    ConflictingModes,

    /// A target's publish call failed; remaining invocations were not attempted
    #[error("publish target '{target}' failed on group {group}")]
    TargetFailed {
        target: String,
        group: usize,
        #[source]
        source: anyhow::Error,
    },

    /// Resume was requested but nothing has been persisted
    #[error("no snapshot records found in {}; run a dry-run publish first", root.display())]
    EmptySnapshot { root: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn darwin_set() -> ArtifactSet {
        ArtifactSet::new(
            vec![PathBuf::from("out/make/app.dmg"), PathBuf::from("out/make/app.zip")],
            "darwin",
            "arm64",
        )
        .with_package_json(json!({ "name": "app", "version": "1.2.3" }))
    }

    #[test]
    fn artifact_set_uses_package_json_field_name() {
        let value = serde_json::to_value(darwin_set()).expect("serialize");
        assert_eq!(value["packageJSON"]["version"], "1.2.3");
        assert_eq!(value["platform"], "darwin");
        assert_eq!(value["arch"], "arm64");
        assert_eq!(value["artifacts"][0], "out/make/app.dmg");
    }

    #[test]
    fn artifact_set_missing_package_json_defaults_to_null() {
        let set: ArtifactSet = serde_json::from_str(
            r#"{ "artifacts": ["a"], "platform": "linux", "arch": "x64" }"#,
        )
        .expect("parse");
        assert_eq!(set.package_json, serde_json::Value::Null);
    }

    #[test]
    fn artifact_set_rejects_missing_platform() {
        let parsed = serde_json::from_str::<ArtifactSet>(r#"{ "artifacts": [], "arch": "x64" }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn publish_group_is_a_bare_array() {
        let group = PublishGroup::new(vec![darwin_set()]);
        let json = serde_json::to_string(&group).expect("serialize");
        assert!(json.starts_with('['));

        let parsed: PublishGroup = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed, group);
    }

    #[test]
    fn publish_group_counts_and_labels() {
        let mut x64 = darwin_set();
        x64.arch = "x64".to_string();
        let group = PublishGroup::new(vec![darwin_set(), x64, darwin_set()]);

        assert_eq!(group.len(), 3);
        assert_eq!(group.artifact_count(), 6);
        assert_eq!(group.target_labels(), vec!["darwin-arm64", "darwin-x64"]);
    }

    #[test]
    fn dispatch_mode_from_flags() {
        assert_eq!(DispatchMode::from_flags(false, false).unwrap(), DispatchMode::Live);
        assert_eq!(
            DispatchMode::from_flags(true, false).unwrap(),
            DispatchMode::SnapshotWrite
        );
        assert_eq!(DispatchMode::from_flags(false, true).unwrap(), DispatchMode::Resume);
        assert!(matches!(
            DispatchMode::from_flags(true, true),
            Err(DispatchError::ConflictingModes)
        ));
    }

    #[test]
    fn dispatch_mode_display() {
        insta::assert_snapshot!(
            format!("{} {} {}", DispatchMode::Live, DispatchMode::SnapshotWrite, DispatchMode::Resume),
            @"live snapshot-write resume"
        );
    }

    #[test]
    fn unknown_target_lists_available_names() {
        let err = DispatchError::UnknownTarget {
            name: "s3".to_string(),
            available: vec!["local-dir".to_string(), "noop".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "publish target 's3' could not be resolved (available: local-dir, noop)"
        );
    }

    #[test]
    fn target_failed_keeps_source() {
        use std::error::Error as _;

        let err = DispatchError::TargetFailed {
            target: "noop".to_string(),
            group: 1,
            source: anyhow::anyhow!("upload refused"),
        };
        assert_eq!(err.to_string(), "publish target 'noop' failed on group 1");
        assert_eq!(err.source().expect("source").to_string(), "upload refused");
    }

    #[test]
    fn report_omits_snapshot_record_when_absent() {
        let report = DispatchReport::begin(DispatchMode::Live, vec!["noop".to_string()]).finish();
        let value = serde_json::to_value(&report).expect("serialize");
        assert!(value.get("snapshot_record").is_none());
        assert_eq!(value["mode"], "live");
        assert!(report.finished_at >= report.started_at);
    }
}

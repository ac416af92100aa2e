use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::config::BuildConfig;
use crate::make::Maker;
use crate::resolve::{resolve_targets, target_names};
use crate::snapshot::SnapshotStore;
use crate::target::{PublishContext, RunnableTarget, TargetLoader, TargetSpec};
use crate::types::{DispatchError, DispatchMode, DispatchReport, InvocationReceipt, PublishGroup};

/// Progress sink for a run; the CLI prints these lines to stderr.
pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Working directory
    pub dir: PathBuf,
    /// Whether the make stage and targets may prompt
    pub interactive: bool,
    /// Explicit targets; `None` falls back to the configured publishers
    pub targets: Option<Vec<TargetSpec>>,
    /// Make, then persist to the snapshot root instead of publishing
    pub dry_run: bool,
    /// Publish every persisted group without running make
    pub dry_run_resume: bool,
}

impl RunOptions {
    /// Live-mode options for `dir`, using the configured publishers.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Mode selected by the dry-run flags.
    pub fn mode(&self) -> Result<DispatchMode, DispatchError> {
        DispatchMode::from_flags(self.dry_run, self.dry_run_resume)
    }
}

/// Run one publish: resolve targets, then make + publish, make + persist,
/// or load + publish depending on the selected mode.
///
/// Targets are invoked one at a time; the first failure aborts the rest of
/// the run.
pub fn run_publish(
    opts: &RunOptions,
    config: &BuildConfig,
    maker: &dyn Maker,
    loader: &dyn TargetLoader,
    reporter: &mut dyn Reporter,
) -> Result<DispatchReport> {
    let mode = opts.mode()?;
    reporter.info(&format!("mode: {mode}"));

    let targets = resolve_targets(opts.targets.as_deref(), config, loader, reporter)?;
    let names = target_names(&targets);
    if names.is_empty() {
        reporter.warn("no publish targets configured; nothing will be published");
    } else {
        reporter.info(&format!("publish targets: {}", names.join(", ")));
    }

    // The configuration targets see carries the final, resolved name list.
    let run_config = config.with_publishers(names.clone());
    let mut report = DispatchReport::begin(mode, names);

    match mode {
        DispatchMode::Live => {
            let group = make(maker, opts, reporter)?;
            report.group_count = 1;
            dispatch(
                std::slice::from_ref(&group),
                &targets,
                &run_config,
                opts,
                &mut report,
                reporter,
            )?;
        }
        DispatchMode::SnapshotWrite => {
            // The first persist clears the root, so vet it before building.
            let mut store = SnapshotStore::new(&config.snapshot_dir)
                .protect(&config.dir)
                .protect(&config.out_dir);
            store.check_root()?;

            let group = make(maker, opts, reporter)?;
            let record = store.persist(&group).with_context(|| {
                format!("failed to persist make output to {}", config.snapshot_dir.display())
            })?;
            reporter.info(&format!(
                "saved {} artifact set(s) to snapshot record {record} in {}",
                group.len(),
                store.root().display()
            ));
            report.group_count = 1;
            report.snapshot_record = Some(record);
        }
        DispatchMode::Resume => {
            let store = SnapshotStore::new(&config.snapshot_dir);
            let groups = store.load_all().with_context(|| {
                format!("failed to load snapshot records from {}", store.root().display())
            })?;
            if groups.is_empty() {
                return Err(DispatchError::EmptySnapshot {
                    root: store.root().to_path_buf(),
                }
                .into());
            }
            reporter.info(&format!(
                "resuming {} snapshot group(s) from {}",
                groups.len(),
                store.root().display()
            ));
            report.group_count = groups.len();
            dispatch(&groups, &targets, &run_config, opts, &mut report, reporter)?;
        }
    }

    Ok(report.finish())
}

fn make(maker: &dyn Maker, opts: &RunOptions, reporter: &mut dyn Reporter) -> Result<PublishGroup> {
    reporter.info("running make...");
    let group = maker
        .make(&opts.dir, opts.interactive)
        .context("make failed")?;
    reporter.info(&format!(
        "make produced {} artifact set(s) ({} artifacts)",
        group.len(),
        group.artifact_count()
    ));
    Ok(group)
}

fn dispatch(
    groups: &[PublishGroup],
    targets: &[RunnableTarget],
    config: &BuildConfig,
    opts: &RunOptions,
    report: &mut DispatchReport,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    for (idx, group) in groups.iter().enumerate() {
        for target in targets {
            let name = target.name().to_string();
            let platforms = group.target_labels();
            reporter.info(&format!(
                "[{}/{}] publishing {} to {name}...",
                idx + 1,
                groups.len(),
                platforms.join(", ")
            ));

            let ctx = PublishContext {
                dir: &opts.dir,
                make_results: group,
                config,
            };

            let started_at = Utc::now();
            let start = Instant::now();
            if let Err(source) = target.publish(&ctx) {
                reporter.error(&format!("{name} failed: {source:#}"));
                return Err(DispatchError::TargetFailed {
                    target: name,
                    group: idx,
                    source,
                }
                .into());
            }
            let duration = start.elapsed();
            let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);

            reporter.info(&format!("{name} finished in {duration_ms}ms"));
            report.invocations.push(InvocationReceipt {
                target: name,
                group: idx,
                platforms,
                artifact_count: group.artifact_count(),
                started_at,
                finished_at: Utc::now(),
                duration_ms,
            });
        }
    }
    Ok(())
}

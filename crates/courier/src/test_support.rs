use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};

use crate::config::BuildConfig;
use crate::engine::Reporter;
use crate::make::Maker;
use crate::target::{PublishContext, PublishTarget};
use crate::types::{ArtifactSet, PublishGroup};

#[derive(Debug, Default)]
pub(crate) struct CollectingReporter {
    pub infos: Vec<String>,
    pub warns: Vec<String>,
    pub errors: Vec<String>,
}

impl Reporter for CollectingReporter {
    fn info(&mut self, msg: &str) {
        self.infos.push(msg.to_string());
    }

    fn warn(&mut self, msg: &str) {
        self.warns.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }
}

pub(crate) fn set(platform: &str, arch: &str, artifacts: &[&str]) -> ArtifactSet {
    ArtifactSet::new(
        artifacts.iter().map(PathBuf::from).collect(),
        platform,
        arch,
    )
}

pub(crate) fn group_of(sets: Vec<ArtifactSet>) -> PublishGroup {
    PublishGroup::new(sets)
}

/// Maker that counts its calls and returns a fixed group, or fails.
pub(crate) struct CountingMaker {
    result: std::result::Result<PublishGroup, String>,
    calls: Cell<usize>,
}

impl CountingMaker {
    pub fn new(group: PublishGroup) -> Self {
        Self {
            result: Ok(group),
            calls: Cell::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Maker for CountingMaker {
    fn make(&self, _dir: &Path, _interactive: bool) -> Result<PublishGroup> {
        self.calls.set(self.calls.get() + 1);
        match &self.result {
            Ok(group) => Ok(group.clone()),
            Err(message) => bail!("{message}"),
        }
    }
}

/// What a [`RecordingTarget`] saw on one invocation.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub dir: PathBuf,
    pub group: PublishGroup,
    pub config: BuildConfig,
}

pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

/// Target that records every invocation and, optionally, appends
/// `name#n` to a journal shared with other targets.
pub(crate) struct RecordingTarget {
    name: String,
    calls: Mutex<Vec<Call>>,
    journal: Option<Journal>,
}

impl RecordingTarget {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            calls: Mutex::new(Vec::new()),
            journal: None,
        })
    }

    pub fn journal() -> Journal {
        Arc::new(Mutex::new(Vec::new()))
    }

    pub fn with_journal(name: &str, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            calls: Mutex::new(Vec::new()),
            journal: Some(journal),
        })
    }

    pub fn label(&self) -> &str {
        &self.name
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl PublishTarget for RecordingTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&self, ctx: &PublishContext<'_>) -> Result<()> {
        let mut calls = self.calls.lock().expect("calls lock");
        if let Some(journal) = &self.journal {
            journal
                .lock()
                .expect("journal lock")
                .push(format!("{}#{}", self.name, calls.len()));
        }
        calls.push(Call {
            dir: ctx.dir.to_path_buf(),
            group: ctx.make_results.clone(),
            config: ctx.config.clone(),
        });
        Ok(())
    }
}

/// Target that always fails with the given message.
pub(crate) struct FailingTarget {
    name: String,
    message: String,
}

impl FailingTarget {
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
        }
    }
}

impl PublishTarget for FailingTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&self, _ctx: &PublishContext<'_>) -> Result<()> {
        bail!("{}", self.message)
    }
}

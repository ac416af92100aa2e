use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::BuildConfig;
use crate::types::{DispatchError, PublishGroup};

/// Payload delivered to a publish target for one invocation.
#[derive(Debug, Clone, Copy)]
pub struct PublishContext<'a> {
    /// Working directory of the run; relative artifact paths resolve against it
    pub dir: &'a Path,
    /// The one group this invocation publishes
    pub make_results: &'a PublishGroup,
    /// Resolved configuration, including the final target-name list
    pub config: &'a BuildConfig,
}

/// A runnable publish target.
///
/// Implementations own their upload protocol, credentials, and retries;
/// the dispatcher only calls [`publish`](PublishTarget::publish) and waits
/// for it to return.
pub trait PublishTarget: Send + Sync {
    /// Name used in reports and in the injected `publishers` list
    fn name(&self) -> &str;

    /// Publish one group of make output
    fn publish(&self, ctx: &PublishContext<'_>) -> Result<()>;
}

/// A resolved, shareable target instance.
pub type RunnableTarget = Arc<dyn PublishTarget>;

/// A publish-target identifier: a name to load, or an instance to use as-is.
#[derive(Clone)]
pub enum TargetSpec {
    Name(String),
    Instance(RunnableTarget),
}

impl TargetSpec {
    /// Wrap an already-constructed target.
    pub fn instance<T: PublishTarget + 'static>(target: T) -> Self {
        TargetSpec::Instance(Arc::new(target))
    }

    /// Display label: the name, or the instance's own name.
    pub fn label(&self) -> &str {
        match self {
            TargetSpec::Name(name) => name,
            TargetSpec::Instance(target) => target.name(),
        }
    }
}

impl fmt::Debug for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSpec::Name(name) => f.debug_tuple("Name").field(name).finish(),
            TargetSpec::Instance(target) => {
                f.debug_tuple("Instance").field(&target.name()).finish()
            }
        }
    }
}

impl From<&str> for TargetSpec {
    fn from(name: &str) -> Self {
        TargetSpec::Name(name.to_string())
    }
}

impl From<String> for TargetSpec {
    fn from(name: String) -> Self {
        TargetSpec::Name(name)
    }
}

impl From<RunnableTarget> for TargetSpec {
    fn from(target: RunnableTarget) -> Self {
        TargetSpec::Instance(target)
    }
}

/// Plugin-loading collaborator: turns a target name into an instance.
pub trait TargetLoader {
    /// Construct the named target with its options table.
    ///
    /// Unknown names fail with [`DispatchError::UnknownTarget`].
    fn load(&self, name: &str, options: &toml::Table) -> Result<RunnableTarget>;

    /// Names this loader can construct, sorted.
    fn available(&self) -> Vec<String>;
}

/// Constructor for a named target.
pub type TargetFactory = Box<dyn Fn(&toml::Table) -> Result<RunnableTarget> + Send + Sync>;

/// In-process [`TargetLoader`] backed by a name → constructor map.
#[derive(Default)]
pub struct TargetRegistry {
    factories: BTreeMap<String, TargetFactory>,
}

impl TargetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in targets.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::targets::register_builtins(&mut registry);
        registry
    }

    /// Register (or replace) a constructor under `name`.
    pub fn register<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(&toml::Table) -> Result<RunnableTarget> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
        self
    }
}

impl TargetLoader for TargetRegistry {
    fn load(&self, name: &str, options: &toml::Table) -> Result<RunnableTarget> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| DispatchError::UnknownTarget {
                name: name.to_string(),
                available: self.available(),
            })?;
        factory(options).with_context(|| format!("failed to construct publish target '{name}'"))
    }

    fn available(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetRegistry")
            .field("targets", &self.available())
            .finish()
    }
}

//! Built-in publish targets.

mod local_dir;
mod noop;

pub use local_dir::LocalDirTarget;
pub use noop::NoopTarget;

use std::sync::Arc;

use crate::target::{RunnableTarget, TargetRegistry};

/// Register every built-in target on `registry`.
pub fn register_builtins(registry: &mut TargetRegistry) {
    registry
        .register(NoopTarget::NAME, |_| Ok(Arc::new(NoopTarget) as RunnableTarget))
        .register(LocalDirTarget::NAME, |options| {
            Ok(Arc::new(LocalDirTarget::from_options(options)?) as RunnableTarget)
        });
}

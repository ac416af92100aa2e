//! # Courier
//!
//! A dispatch-and-checkpoint engine for build publishing.
//!
//! Courier sits between a build's make stage and its publish targets. It
//! resolves which targets to run, hands every target the make output, and
//! can checkpoint make output to disk so a later run publishes it without
//! rebuilding.
//!
//! ## Modes
//!
//! - **Live**: make once, then publish the single resulting group to every
//!   target.
//! - **Snapshot-write** (`dry_run`): make once, then persist the group as a
//!   new record under the snapshot root. No target is invoked.
//! - **Resume** (`dry_run_resume`): skip make, load every persisted record,
//!   and publish each one to every target.
//!
//! Targets are invoked one at a time in resolution order, groups outer and
//! targets inner. The first failing target aborts the run.
//!
//! ## Example
//!
//! ```ignore
//! use courier::config::{BuildConfig, load_config};
//! use courier::engine::{RunOptions, run_publish};
//! use courier::make::CommandMaker;
//! use courier::target::TargetRegistry;
//!
//! let dir = std::env::current_dir()?;
//! let config = BuildConfig::resolve(&dir, &load_config(&dir)?);
//! let maker = CommandMaker::new(config.make_command.clone());
//! let registry = TargetRegistry::with_builtins();
//!
//! let mut opts = RunOptions::new(&dir);
//! opts.dry_run = true;
//! let report = run_publish(&opts, &config, &maker, &registry, &mut reporter)?;
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: Mode selection and sequential dispatch
//! - [`resolve`]: Target resolution
//! - [`target`]: The `PublishTarget` trait and the name → constructor registry
//! - [`targets`]: Built-in targets (`noop`, `local-dir`)
//! - [`make`]: The make collaborator
//! - [`snapshot`]: Snapshot records on disk
//! - [`config`]: Configuration file (`.courier.toml`) loading and merging
//! - [`types`]: Domain types: artifact sets, groups, reports, errors

/// Mode selection and sequential dispatch.
pub mod engine;

/// The make collaborator: external command or fixed output.
pub mod make;

/// Target resolution: names and instances to runnable targets.
pub mod resolve;

/// The `PublishTarget` trait, target specs, and the target registry.
pub mod target;

/// Built-in publish targets.
pub mod targets;

/// Configuration file (`.courier.toml`) loading and merging.
/// Re-exported from courier-config microcrate.
pub use courier_config as config;

/// Snapshot records: persist and reload make output.
/// Re-exported from courier-snapshot microcrate.
pub use courier_snapshot as snapshot;

/// Domain types: artifact sets, groups, reports, errors.
/// Re-exported from courier-types microcrate.
pub use courier_types as types;

/// Property-based tests for dispatch invariants.
#[cfg(test)]
mod property_tests;

#[cfg(test)]
mod test_support;

use anyhow::Result;

use crate::config::BuildConfig;
use crate::engine::Reporter;
use crate::target::{RunnableTarget, TargetLoader, TargetSpec};

/// Resolve target specs into runnable targets, preserving input order.
///
/// With no specs, the configured `publishers` list is used; an empty list
/// resolves to no targets. The first name that fails to load aborts the
/// whole resolution.
pub fn resolve_targets(
    specs: Option<&[TargetSpec]>,
    config: &BuildConfig,
    loader: &dyn TargetLoader,
    reporter: &mut dyn Reporter,
) -> Result<Vec<RunnableTarget>> {
    let defaults: Vec<TargetSpec>;
    let specs = match specs {
        Some(specs) => specs,
        None => {
            defaults = config
                .publishers
                .iter()
                .cloned()
                .map(TargetSpec::Name)
                .collect();
            &defaults
        }
    };

    let mut resolved = Vec::with_capacity(specs.len());
    for spec in specs {
        let target = match spec {
            TargetSpec::Name(name) => {
                let target = loader.load(name, &config.target_options(name))?;
                reporter.info(&format!("loaded publish target {name}"));
                target
            }
            TargetSpec::Instance(target) => target.clone(),
        };
        resolved.push(target);
    }

    Ok(resolved)
}

/// Names of resolved targets, in dispatch order.
pub fn target_names(targets: &[RunnableTarget]) -> Vec<String> {
    targets.iter().map(|t| t.name().to_string()).collect()
}

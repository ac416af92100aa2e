use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use crate::config::resolve_dir;
use crate::target::{PublishContext, PublishTarget};

/// Copies artifacts into `<path>/<platform>-<arch>/`.
///
/// `path` comes from the target's options table; a relative path is
/// resolved against the run's working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDirTarget {
    path: PathBuf,
}

impl LocalDirTarget {
    pub const NAME: &'static str = "local-dir";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_options(options: &toml::Table) -> Result<Self> {
        match options.get("path") {
            Some(toml::Value::String(path)) if !path.is_empty() => Ok(Self::new(path)),
            Some(other) => bail!("option 'path' must be a non-empty string, got {other}"),
            None => bail!("missing required option 'path' (set [targets.local-dir] path = \"...\")"),
        }
    }
}

impl PublishTarget for LocalDirTarget {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn publish(&self, ctx: &PublishContext<'_>) -> Result<()> {
        let root = resolve_dir(ctx.dir, &self.path);

        for set in ctx.make_results {
            let dest_dir = root.join(set.target_label());
            fs::create_dir_all(&dest_dir)
                .with_context(|| format!("failed to create {}", dest_dir.display()))?;

            for artifact in &set.artifacts {
                let source = resolve_dir(ctx.dir, artifact);
                let file_name = source
                    .file_name()
                    .with_context(|| format!("artifact path has no file name: {}", source.display()))?;
                if !source.is_file() {
                    bail!("artifact not found: {}", source.display());
                }
                let dest = dest_dir.join(file_name);
                fs::copy(&source, &dest).with_context(|| {
                    format!("failed to copy {} to {}", source.display(), dest.display())
                })?;
            }
        }

        Ok(())
    }
}

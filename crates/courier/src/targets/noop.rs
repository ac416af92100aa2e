use anyhow::Result;

use crate::target::{PublishContext, PublishTarget};

/// Accepts every group and publishes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTarget;

impl NoopTarget {
    pub const NAME: &'static str = "noop";
}

impl PublishTarget for NoopTarget {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn publish(&self, _ctx: &PublishContext<'_>) -> Result<()> {
        Ok(())
    }
}

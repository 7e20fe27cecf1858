//! Catalog composition under the write-tools policy.

use crate::catalog::Catalog;
use crate::tools;

/// Which tool families are exposed. Read tools are always on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    pub enable_write_tools: bool,
}

impl Policy {
    pub fn read_only() -> Self {
        Self::default()
    }

    pub fn with_write_tools(enable: bool) -> Self {
        Self {
            enable_write_tools: enable,
        }
    }
}

/// Build the validated catalog the server exposes for `policy`.
pub fn compose(policy: Policy) -> crate::Result<Catalog> {
    let mut builder = Catalog::builder().extend(tools::read_tools());
    if policy.enable_write_tools {
        builder = builder.extend(tools::write_tools());
    }
    let catalog = builder.build()?;
    tracing::debug!(
        tools = catalog.len(),
        write_tools = policy.enable_write_tools,
        "Tool catalog composed"
    );
    Ok(catalog)
}

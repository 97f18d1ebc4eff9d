//! CLI command implementations

pub mod list;
pub mod migrate;
pub mod secrets;

pub use list::ListArgs;
pub use migrate::MigrateArgs;
pub use secrets::SecretsArgs;

use anyhow::Context;
use drover_core::{EndpointConfig, Instance};

/// Build an [`Instance`] from one side of the configuration
pub(crate) fn instance(side: &str, endpoint: &EndpointConfig, token: String) -> anyhow::Result<Instance> {
    let url = endpoint
        .url
        .as_deref()
        .with_context(|| format!("{side} URL is not configured"))?;
    let group = endpoint
        .group
        .as_deref()
        .with_context(|| format!("{side} group is not configured"))?;

    Ok(Instance::new(url, group, token))
}

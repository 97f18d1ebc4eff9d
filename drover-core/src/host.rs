//! Abstraction over the forge drover reads projects from and writes them to

use async_trait::async_trait;

use crate::config::Visibility;
use crate::project::{Group, Instance, Project, ProvisionOutcome};
use crate::Result;

/// A GitLab-like service hosting groups and projects
#[async_trait]
pub trait ProjectHost: Send + Sync {
    /// The instance this host talks to, including its token
    fn instance(&self) -> &Instance;

    /// Look up a group by name or full path
    async fn resolve_group(&self, group: &str) -> Result<Group>;

    /// Fetch one page (1-based) of the group's projects
    ///
    /// An empty page signals the end of the listing.
    async fn list_projects_page(&self, group_id: u64, page: u32, per_page: u32)
        -> Result<Vec<Project>>;

    /// Create a project under `group`, treating a taken path as success
    async fn provision_project(
        &self,
        group: &Group,
        name: &str,
        path: &str,
        visibility: Visibility,
    ) -> Result<ProvisionOutcome>;
}

//! Domain types shared by the lister, provisioner and mirror

use serde::{Deserialize, Serialize};

/// A GitLab instance together with the group drover works in
#[derive(Clone, PartialEq, Eq)]
pub struct Instance {
    /// Base URL without trailing slash (e.g. "https://gitlab.com")
    pub base_url: String,
    /// Group name or full path as configured
    pub group: String,
    /// Personal access token
    pub token: String,
}

impl Instance {
    pub fn new(
        base_url: impl Into<String>,
        group: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            group: group.into(),
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("base_url", &self.base_url)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

/// A resolved group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Numeric group id
    pub id: u64,
    /// Display name
    pub name: String,
    /// Namespace path used in repository URLs (e.g. "parent/child")
    pub full_path: String,
}

/// A project as listed from the source group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Display name
    pub name: String,
    /// URL-safe path, unique within its group
    pub path: String,
    /// Id of the owning group (namespace)
    pub group_id: u64,
    /// HTTP clone URL as reported by the API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_url_to_repo: Option<String>,
}

impl Project {
    /// HTTP clone URL, falling back to `{base}/{group}/{path}.git`
    pub fn clone_url(&self, base_url: &str, group_path: &str) -> String {
        match &self.http_url_to_repo {
            Some(url) => url.clone(),
            None => repository_url(base_url, group_path, &self.path),
        }
    }
}

/// Build `{base}/{group_path}/{path}.git`
pub fn repository_url(base_url: &str, group_path: &str, path: &str) -> String {
    format!(
        "{}/{}/{}.git",
        base_url.trim_end_matches('/'),
        group_path.trim_matches('/'),
        path
    )
}

/// Result of asking the destination for a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum ProvisionOutcome {
    /// A new project was created; carries its clone URL
    Created(String),
    /// The path was already taken; carries the constructed clone URL
    AlreadyExists(String),
}

impl ProvisionOutcome {
    /// Clone URL of the destination repository
    pub fn url(&self) -> &str {
        match self {
            ProvisionOutcome::Created(url) | ProvisionOutcome::AlreadyExists(url) => url,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, ProvisionOutcome::Created(_))
    }
}

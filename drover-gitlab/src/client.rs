//! GitLab REST client using reqwest

use std::time::Duration;

use async_trait::async_trait;
use drover_core::project::repository_url;
use drover_core::{Group, Instance, Project, ProjectHost, ProvisionOutcome, Visibility};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::types::{is_path_taken, ApiGroup, ApiProject, CreateProjectRequest};

const TOKEN_HEADER: &str = "private-token";

/// GitLab API client bound to one instance and token
#[derive(Clone)]
pub struct GitLabClient {
    http: reqwest::Client,
    instance: Instance,
    api: Url,
}

impl GitLabClient {
    /// Create a client for `instance`
    ///
    /// `timeout` applies to each request; `None` keeps reqwest's default.
    pub fn new(instance: Instance, timeout: Option<Duration>) -> Result<Self> {
        let mut api = Url::parse(&instance.base_url)?;
        if api.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "GitLab URL cannot be used as a base: {}",
                instance.base_url
            )));
        }
        api.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid GitLab URL: {}", instance.base_url)))?
            .pop_if_empty()
            .extend(["api", "v4"]);

        let mut token = HeaderValue::from_str(&instance.token)
            .map_err(|_| Error::Auth("Access token contains invalid characters".to_string()))?;
        token.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(TOKEN_HEADER), token);

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("drover/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create GitLab client: {}", e)))?;

        info!(url = %instance.base_url, group = %instance.group, "Created GitLab client");

        Ok(Self {
            http,
            instance,
            api,
        })
    }

    /// Base URL of the instance
    pub fn base_url(&self) -> &str {
        &self.instance.base_url
    }

    /// API URL for the given path segments; each segment is percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::from_status(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("Unexpected GitLab response: {}", e)))
    }

    /// Look up a group by id, name or full path
    pub async fn get_group(&self, group: &str) -> Result<ApiGroup> {
        let url = self.endpoint(&["groups", group]);
        debug!(group, "Resolving group");

        match self.send(self.http.get(url)).await {
            Err(Error::Api { status: 404, .. }) => Err(Error::GroupNotFound(group.to_string())),
            other => other,
        }
    }

    /// Fetch one page of a group's projects
    pub async fn list_group_projects_page(
        &self,
        group_id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ApiProject>> {
        let mut url = self.endpoint(&["groups", &group_id.to_string(), "projects"]);
        url.query_pairs_mut()
            .append_pair("per_page", &per_page.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("order_by", "id")
            .append_pair("sort", "asc");

        self.send(self.http.get(url)).await
    }

    /// Create a project in `group`
    ///
    /// A 400 whose validation errors say the path is taken yields
    /// `AlreadyExists` with the URL the project is known to live at.
    pub async fn create_project(
        &self,
        group: &Group,
        name: &str,
        path: &str,
        visibility: Visibility,
    ) -> Result<ProvisionOutcome> {
        let body = CreateProjectRequest {
            name,
            path,
            namespace_id: group.id,
            visibility: visibility.as_str(),
        };

        debug!(group = %group.full_path, path, "Creating project");
        let response = self
            .http
            .post(self.endpoint(&["projects"]))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        let existing_url = repository_url(&self.instance.base_url, &group.full_path, path);
        interpret_create(status, &text, existing_url)
    }
}

/// Turn a create-project response into an outcome
fn interpret_create(status: StatusCode, body: &str, existing_url: String) -> Result<ProvisionOutcome> {
    if status.is_success() {
        let project: ApiProject = serde_json::from_str(body)
            .map_err(|e| Error::Parse(format!("Unexpected create-project response: {}", e)))?;
        let url = project
            .http_url_to_repo
            .ok_or_else(|| Error::Parse("Created project has no http_url_to_repo".to_string()))?;
        return Ok(ProvisionOutcome::Created(url));
    }

    if status == StatusCode::BAD_REQUEST && is_path_taken(body) {
        return Ok(ProvisionOutcome::AlreadyExists(existing_url));
    }

    Err(Error::from_status(status, body))
}

#[async_trait]
impl ProjectHost for GitLabClient {
    fn instance(&self) -> &Instance {
        &self.instance
    }

    async fn resolve_group(&self, group: &str) -> drover_core::Result<Group> {
        Ok(self.get_group(group).await?.into())
    }

    async fn list_projects_page(
        &self,
        group_id: u64,
        page: u32,
        per_page: u32,
    ) -> drover_core::Result<Vec<Project>> {
        let projects = self.list_group_projects_page(group_id, page, per_page).await?;
        Ok(projects.into_iter().map(Project::from).collect())
    }

    async fn provision_project(
        &self,
        group: &Group,
        name: &str,
        path: &str,
        visibility: Visibility,
    ) -> drover_core::Result<ProvisionOutcome> {
        Ok(self.create_project(group, name, path, visibility).await?)
    }
}

impl std::fmt::Debug for GitLabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabClient")
            .field("base_url", &self.instance.base_url)
            .field("group", &self.instance.group)
            .finish_non_exhaustive()
    }
}

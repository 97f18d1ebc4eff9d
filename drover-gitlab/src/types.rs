//! GitLab REST payloads

use std::collections::BTreeMap;

use drover_core::{Group, Project};
use serde::{Deserialize, Serialize};

/// `GET /groups/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiGroup {
    pub id: u64,
    pub name: String,
    pub full_path: String,
}

impl From<ApiGroup> for Group {
    fn from(group: ApiGroup) -> Self {
        Group {
            id: group.id,
            name: group.name,
            full_path: group.full_path,
        }
    }
}

/// Namespace embedded in a project
#[derive(Debug, Clone, Deserialize)]
pub struct ApiNamespace {
    pub id: u64,
    #[serde(default)]
    pub full_path: Option<String>,
}

/// An element of `GET /groups/:id/projects`, or the result of `POST /projects`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiProject {
    pub id: u64,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub path_with_namespace: Option<String>,
    #[serde(default)]
    pub http_url_to_repo: Option<String>,
    pub namespace: ApiNamespace,
}

impl From<ApiProject> for Project {
    fn from(project: ApiProject) -> Self {
        Project {
            name: project.name,
            path: project.path,
            group_id: project.namespace.id,
            http_url_to_repo: project.http_url_to_repo,
        }
    }
}

/// Body of `POST /projects`
#[derive(Debug, Clone, Serialize)]
pub struct CreateProjectRequest<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub namespace_id: u64,
    pub visibility: &'a str,
}

/// Validation failure body: `{"message": {"path": ["has already been taken"]}}`
#[derive(Debug, Deserialize)]
struct ValidationErrors {
    message: BTreeMap<String, serde_json::Value>,
}

const TAKEN: &str = "has already been taken";

/// Whether a create-project error body says the path is in use
///
/// Only the structured per-field form counts; free-text messages are not
/// matched. A taken `name` alone belongs to some other project and does not
/// count.
pub(crate) fn is_path_taken(body: &str) -> bool {
    let Ok(errors) = serde_json::from_str::<ValidationErrors>(body) else {
        return false;
    };

    errors.message.iter().any(|(field, messages)| {
        let field = field.rsplit('.').next().unwrap_or(field);
        field == "path"
            && messages
                .as_array()
                .is_some_and(|list| list.iter().filter_map(|m| m.as_str()).any(|m| m.contains(TAKEN)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_project() {
        let json = r#"{
            "id": 17,
            "name": "Widget Service",
            "path": "widget-service",
            "path_with_namespace": "acme/widget-service",
            "http_url_to_repo": "https://gitlab.com/acme/widget-service.git",
            "ssh_url_to_repo": "git@gitlab.com:acme/widget-service.git",
            "visibility": "private",
            "namespace": {"id": 9, "name": "acme", "path": "acme", "kind": "group", "full_path": "acme"}
        }"#;
        let project: Project = serde_json::from_str::<ApiProject>(json).unwrap().into();
        assert_eq!(project.name, "Widget Service");
        assert_eq!(project.path, "widget-service");
        assert_eq!(project.group_id, 9);
        assert_eq!(
            project.http_url_to_repo.as_deref(),
            Some("https://gitlab.com/acme/widget-service.git")
        );
    }

    #[test]
    fn test_deserialize_group() {
        let json = r#"{"id": 9, "name": "Acme", "path": "acme", "full_path": "parent/acme", "projects": []}"#;
        let group: Group = serde_json::from_str::<ApiGroup>(json).unwrap().into();
        assert_eq!(group.id, 9);
        assert_eq!(group.full_path, "parent/acme");
    }

    #[test]
    fn test_create_request_body() {
        let body = serde_json::to_value(CreateProjectRequest {
            name: "Widget",
            path: "widget",
            namespace_id: 3,
            visibility: "private",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "name": "Widget",
                "path": "widget",
                "namespace_id": 3,
                "visibility": "private"
            })
        );
    }

    #[test]
    fn test_is_path_taken() {
        assert!(is_path_taken(
            r#"{"message":{"name":["has already been taken"],"path":["has already been taken"]}}"#
        ));
        assert!(is_path_taken(
            r#"{"message":{"project_namespace.path":["has already been taken"]}}"#
        ));
        assert!(!is_path_taken(r#"{"message":{"path":["is invalid"]}}"#));
        assert!(!is_path_taken(
            r#"{"message":{"import_url":["has already been taken"]}}"#
        ));
        // Free text is not a structured signal
        assert!(!is_path_taken(r#"{"message":"path has already been taken"}"#));
        assert!(!is_path_taken("has already been taken"));
        // A name clash alone leaves the path free
        assert!(!is_path_taken(
            r#"{"message":{"name":["has already been taken"]}}"#
        ));
        // Unrelated non-list fields do not break detection
        assert!(is_path_taken(
            r#"{"message":{"limit_reached":false,"path":["has already been taken"]}}"#
        ));
    }
}

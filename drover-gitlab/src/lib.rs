//! Drover GitLab - GitLab REST integration for drover
//!
//! This crate talks to the GitLab REST API (v4) to resolve groups, list
//! their projects and create projects on the destination instance.

mod client;
mod error;
mod types;

pub use client::GitLabClient;
pub use error::{Error, Result};
pub use types::{ApiGroup, ApiNamespace, ApiProject, CreateProjectRequest};

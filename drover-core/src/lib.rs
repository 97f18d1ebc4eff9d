//! Drover Core - Core library for drover GitLab group migrations
//!
//! This crate provides configuration, the project listing and provisioning
//! seam, git mirroring, and the sequential migration workflow that moves
//! every repository of one GitLab group into another.

pub mod config;
pub mod credentials;
pub mod error;
pub mod git;
pub mod host;
pub mod listing;
pub mod migrate;
pub mod project;
pub mod report;
pub mod secrets;

pub use config::{CliOverrides, Config, EndpointConfig, HttpConfig, MigrationConfig, Visibility};
pub use credentials::{authenticated_url, redact};
pub use error::{Error, Result};
pub use git::{GitMirror, MirrorOutcome, MirrorStats, RepositoryMirror};
pub use host::ProjectHost;
pub use listing::ProjectLister;
pub use migrate::{MigrateOptions, Migrator, Progress};
pub use project::{Group, Instance, Project, ProvisionOutcome};
pub use report::{MigrationReport, OutcomeStatus, ProjectOutcome};
pub use secrets::Secrets;

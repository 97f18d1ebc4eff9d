//! Configuration management for drover
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (DROVER_*)
//! 3. Config file (~/.config/drover/config.toml)
//! 4. Default values
//!
//! Access tokens are not part of this file; see [`crate::Secrets`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Largest page size the GitLab projects endpoint accepts
pub const MAX_PER_PAGE: u32 = 100;

/// Refs GitLab keeps for itself and rejects on push
pub const DEFAULT_EXCLUDED_REF_PREFIXES: &[&str] = &[
    "refs/merge-requests/",
    "refs/pipelines/",
    "refs/keep-around/",
    "refs/environments/",
];

/// Visibility assigned to projects created on the destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Internal,
    Public,
}

impl Visibility {
    /// The value GitLab expects in the `visibility` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Internal => "internal",
            Visibility::Public => "public",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(Visibility::Private),
            "internal" => Ok(Visibility::Internal),
            "public" => Ok(Visibility::Public),
            other => Err(Error::Config(format!(
                "Invalid visibility '{}'. Expected private, internal or public",
                other
            ))),
        }
    }
}

/// One side of the migration: a GitLab instance and a group on it
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL of the GitLab instance (e.g. "https://gitlab.com")
    pub url: Option<String>,

    /// Group name or full path (subgroups as "parent/child")
    pub group: Option<String>,
}

/// Migration behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Directory holding the temporary mirror clones
    pub workdir: Option<PathBuf>,

    /// Page size used when listing group projects
    pub per_page: u32,

    /// Visibility for newly created destination projects
    pub visibility: Visibility,

    /// Path to the git executable
    pub git_path: String,

    /// Push even when the destination repository already has refs
    pub overwrite: bool,

    /// Compare destination refs with the local mirror after pushing
    pub verify: bool,

    /// Ref prefixes removed from the mirror before pushing
    pub exclude_ref_prefixes: Vec<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            workdir: None,
            per_page: MAX_PER_PAGE,
            visibility: Visibility::Private,
            git_path: "git".to_string(),
            overwrite: false,
            verify: true,
            exclude_ref_prefixes: DEFAULT_EXCLUDED_REF_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout; unset leaves the client default
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Where projects are read from
    pub source: EndpointConfig,

    /// Where projects are created and pushed to
    pub destination: EndpointConfig,

    /// Migration behaviour
    pub migration: MigrationConfig,

    /// HTTP client settings
    pub http: HttpConfig,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub source_url: Option<String>,
    pub source_group: Option<String>,
    pub dest_url: Option<String>,
    pub dest_group: Option<String>,
    pub workdir: Option<PathBuf>,
    pub visibility: Option<Visibility>,
    pub overwrite: bool,
    pub no_verify: bool,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::parse(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/drover/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("drover").join("config.toml"))
    }

    /// Get the default directory for mirror clones
    ///
    /// Returns `~/.cache/drover/repos`
    pub fn default_workdir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| Error::Config("Could not determine cache directory".to_string()))?;

        Ok(cache_dir.join("drover").join("repos"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - DROVER_SOURCE_URL / DROVER_SOURCE_GROUP
    /// - DROVER_DEST_URL / DROVER_DEST_GROUP
    /// - DROVER_WORKDIR
    /// - DROVER_GIT_PATH
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("DROVER_SOURCE_URL") {
            self.source.url = Some(url);
        }
        if let Some(group) = var("DROVER_SOURCE_GROUP") {
            self.source.group = Some(group);
        }
        if let Some(url) = var("DROVER_DEST_URL") {
            self.destination.url = Some(url);
        }
        if let Some(group) = var("DROVER_DEST_GROUP") {
            self.destination.group = Some(group);
        }
        if let Some(workdir) = var("DROVER_WORKDIR") {
            self.migration.workdir = Some(PathBuf::from(workdir));
        }
        if let Some(git_path) = var("DROVER_GIT_PATH") {
            self.migration.git_path = git_path;
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, cli: CliOverrides) -> Self {
        if let Some(url) = cli.source_url {
            self.source.url = Some(url);
        }
        if let Some(group) = cli.source_group {
            self.source.group = Some(group);
        }
        if let Some(url) = cli.dest_url {
            self.destination.url = Some(url);
        }
        if let Some(group) = cli.dest_group {
            self.destination.group = Some(group);
        }
        if let Some(workdir) = cli.workdir {
            self.migration.workdir = Some(workdir);
        }
        if let Some(visibility) = cli.visibility {
            self.migration.visibility = visibility;
        }
        if cli.overwrite {
            self.migration.overwrite = true;
        }
        if cli.no_verify {
            self.migration.verify = false;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(path: Option<&Path>, cli: CliOverrides) -> Result<Self> {
        let base = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };

        Ok(base.with_env_overrides().with_cli_overrides(cli))
    }

    /// Check that both endpoints are fully specified and settings are sane
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.source.url.is_none() {
            missing.push("source.url");
        }
        if self.source.group.is_none() {
            missing.push("source.group");
        }
        if self.destination.url.is_none() {
            missing.push("destination.url");
        }
        if self.destination.group.is_none() {
            missing.push("destination.group");
        }

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )));
        }

        if self.migration.per_page == 0 || self.migration.per_page > MAX_PER_PAGE {
            return Err(Error::Config(format!(
                "migration.per_page must be between 1 and {}, got {}",
                MAX_PER_PAGE, self.migration.per_page
            )));
        }

        Ok(())
    }

    /// The configured mirror directory, or the default cache location
    pub fn workdir(&self) -> Result<PathBuf> {
        match &self.migration.workdir {
            Some(dir) => Ok(dir.clone()),
            None => Self::default_workdir(),
        }
    }
}

//! Secrets management for drover
//!
//! Access tokens are stored separately from configuration to avoid accidental
//! sharing. The secrets file is located at `~/.config/drover/secrets.toml` and
//! must have restrictive permissions (0600 on Unix).
//!
//! Loading priority:
//! 1. Environment variables (DROVER_SOURCE_TOKEN, DROVER_DEST_TOKEN)
//! 2. Secrets file (~/.config/drover/secrets.toml)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

const SOURCE_TOKEN_VAR: &str = "DROVER_SOURCE_TOKEN";
const DEST_TOKEN_VAR: &str = "DROVER_DEST_TOKEN";

/// Secrets structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    /// Token for the source instance
    pub source: TokenSecret,

    /// Token for the destination instance
    pub destination: TokenSecret,
}

/// A single personal access token
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenSecret {
    /// GitLab personal access token (needs `api` and `write_repository`)
    pub token: Option<String>,
}

impl std::fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSecret")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Secrets {
    /// Load secrets from the default location
    ///
    /// Returns default (empty) secrets if file doesn't exist
    pub fn load() -> Result<Self> {
        let secrets_path = Self::default_secrets_path();

        if let Some(path) = secrets_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load secrets from a specific file with permission checking
    pub fn load_from_file(path: &Path) -> Result<Self> {
        // Check file permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let metadata = std::fs::metadata(path).map_err(Error::Io)?;
            let mode = metadata.permissions().mode();

            // Readable by group or others
            if mode & 0o077 != 0 {
                return Err(Error::Config(format!(
                    "Secrets file {} has insecure permissions {:o}. \
                     Please run: chmod 600 {}",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }

            debug!(path = %path.display(), mode = format!("{:o}", mode & 0o777), "Secrets file permissions OK");
        }

        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        for slot in [&mut secrets.source.token, &mut secrets.destination.token] {
            if let Some(token) = slot {
                *token = token.trim().to_string();
            }
        }

        Ok(secrets)
    }

    /// Get the default secrets file path
    ///
    /// Returns `~/.config/drover/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("drover").join("secrets.toml"))
    }

    /// Source token with environment variable override
    ///
    /// Priority: DROVER_SOURCE_TOKEN env var > secrets file
    pub fn source_token(&self) -> Option<String> {
        resolve_token(
            std::env::var(SOURCE_TOKEN_VAR).ok(),
            self.source.token.as_deref(),
            SOURCE_TOKEN_VAR,
        )
    }

    /// Destination token with environment variable override
    ///
    /// Priority: DROVER_DEST_TOKEN env var > secrets file
    pub fn destination_token(&self) -> Option<String> {
        resolve_token(
            std::env::var(DEST_TOKEN_VAR).ok(),
            self.destination.token.as_deref(),
            DEST_TOKEN_VAR,
        )
    }

    /// Source token, or a configuration error naming where to put it
    pub fn require_source_token(&self) -> Result<String> {
        self.source_token()
            .ok_or_else(|| missing_token_error("source", SOURCE_TOKEN_VAR))
    }

    /// Destination token, or a configuration error naming where to put it
    pub fn require_destination_token(&self) -> Result<String> {
        self.destination_token()
            .ok_or_else(|| missing_token_error("destination", DEST_TOKEN_VAR))
    }

    /// Create a template secrets file at the default location
    ///
    /// Creates parent directories if needed and sets secure permissions
    pub fn create_template() -> Result<PathBuf> {
        let path = Self::default_secrets_path()
            .ok_or_else(|| Error::Config("Could not determine secrets path".to_string()))?;

        Self::create_template_at(&path)?;
        Ok(path)
    }

    /// Create a template secrets file at `path`
    pub fn create_template_at(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }

        // Don't overwrite existing file
        if path.exists() {
            return Err(Error::Config(format!(
                "Secrets file already exists at {}",
                path.display()
            )));
        }

        let template = r#"# Drover Secrets
# This file contains sensitive credentials - do not share or commit to version control
#
# IMPORTANT: This file must have restrictive permissions (chmod 600)

[source]
# Personal access token for the instance projects are read from
# Required scopes: read_api, read_repository
token = ""

[destination]
# Personal access token for the instance projects are created on
# Required scopes: api, write_repository
token = ""
"#;

        std::fs::write(path, template).map_err(Error::Io)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, perms).map_err(Error::Io)?;
        }

        warn!(path = %path.display(), "Created secrets template - please edit and add your tokens");

        Ok(())
    }
}

fn resolve_token(from_env: Option<String>, from_file: Option<&str>, var: &str) -> Option<String> {
    if let Some(token) = from_env {
        let token = token.trim().to_string();
        if !token.is_empty() {
            debug!(var, "Using token from environment variable");
            return Some(token);
        }
    }

    match from_file {
        Some(token) if !token.is_empty() => {
            debug!("Using token from secrets file");
            Some(token.to_string())
        }
        _ => None,
    }
}

fn missing_token_error(side: &str, var: &str) -> Error {
    Error::Config(format!(
        "No {side} token found. Set {var} or add it to the [{side}] section of \
         ~/.config/drover/secrets.toml (run `drover secrets init` to create one)"
    ))
}

//! Running the git executable

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::credentials::redact;
use crate::{Error, Result};

/// Invokes `git` with credentials kept out of errors and logs
#[derive(Debug, Clone)]
pub struct GitCommand {
    git_path: String,
    secrets: Vec<String>,
}

impl GitCommand {
    pub fn new(git_path: impl Into<String>) -> Self {
        Self {
            git_path: git_path.into(),
            secrets: Vec::new(),
        }
    }

    /// Strings to mask in any error text
    pub fn with_secrets(mut self, secrets: impl IntoIterator<Item = String>) -> Self {
        self.secrets.extend(secrets.into_iter().filter(|s| !s.is_empty()));
        self
    }

    /// Run git with `args`, returning stdout on success
    pub async fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<String> {
        // Only the subcommand is logged; the rest may carry credentials
        debug!(subcommand = args.first().copied().unwrap_or(""), "Running git");

        let mut cmd = Command::new(&self.git_path);
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Git(format!(
                    "git executable not found at '{}'. Is git installed?",
                    self.git_path
                ))
            } else {
                Error::Io(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let subcommand = args.first().copied().unwrap_or("command");
            return Err(Error::Git(self.redact(&classify_failure(
                subcommand,
                stderr.trim(),
            ))));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Mask secrets in `text`
    pub fn redact(&self, text: &str) -> String {
        redact(text, &self.secrets)
    }
}

fn classify_failure(subcommand: &str, stderr: &str) -> String {
    if stderr.contains("Authentication failed") || stderr.contains("Permission denied") {
        return format!("git {} authentication failed: {}", subcommand, stderr);
    }

    if stderr.contains("Could not resolve host") {
        return format!("git {} network error: {}", subcommand, stderr);
    }

    if stderr.contains("not found") || stderr.contains("does not exist") {
        return format!("git {} repository not found: {}", subcommand, stderr);
    }

    format!("git {} failed: {}", subcommand, stderr)
}

//! Mirror clone and mirror push of a single repository

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::Repository;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::command::GitCommand;
use super::refs::{diff_refs, is_excluded, local_refs, parse_ls_remote, prune_refs, RefMap};
use crate::config::{Config, DEFAULT_EXCLUDED_REF_PREFIXES};
use crate::credentials::url_password;
use crate::{Error, Result};

/// Name of the remote the destination URL is registered under
pub const DESTINATION_REMOTE: &str = "destination";

/// What a completed mirror push did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorStats {
    /// Refs present in the destination after the push
    pub refs: usize,
    /// Hidden refs removed from the local mirror before pushing
    pub pruned: usize,
    /// Whether destination refs were compared after pushing
    pub verified: bool,
}

/// Result of mirroring one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MirrorOutcome {
    /// All refs were pushed to the destination
    Pushed(MirrorStats),
    /// The destination already holds exactly the source's refs
    UpToDate { refs: usize },
    /// The destination holds other refs and overwriting is disabled
    Diverged { differing: Vec<String> },
}

/// Copies every ref of one repository to another
#[async_trait]
pub trait RepositoryMirror: Send + Sync {
    /// Mirror `source_url` into `dest_url`; `name` labels the local clone
    async fn mirror(&self, source_url: &str, dest_url: &str, name: &str)
        -> Result<MirrorOutcome>;
}

/// Mirror implementation driving the git executable
#[derive(Debug, Clone)]
pub struct GitMirror {
    git_path: String,
    workdir: PathBuf,
    exclude_ref_prefixes: Vec<String>,
    overwrite: bool,
    verify: bool,
}

impl GitMirror {
    /// Create a mirror that keeps its clones under `workdir`
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            git_path: "git".to_string(),
            workdir: workdir.into(),
            exclude_ref_prefixes: DEFAULT_EXCLUDED_REF_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            overwrite: false,
            verify: true,
        }
    }

    /// Build a mirror from the `[migration]` settings
    pub fn from_config(config: &Config) -> Result<Self> {
        let migration = &config.migration;
        Ok(Self::new(config.workdir()?)
            .with_git_path(migration.git_path.clone())
            .with_excluded_refs(migration.exclude_ref_prefixes.clone())
            .with_overwrite(migration.overwrite)
            .with_verify(migration.verify))
    }

    pub fn with_git_path(mut self, path: impl Into<String>) -> Self {
        self.git_path = path.into();
        self
    }

    pub fn with_excluded_refs(mut self, prefixes: Vec<String>) -> Self {
        self.exclude_ref_prefixes = prefixes;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Directory holding the temporary clones
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Where the clone for `name` lives while it is being mirrored
    pub fn clone_path(&self, name: &str) -> PathBuf {
        self.workdir.join(sanitize_dir_name(name))
    }

    async fn remote_refs(&self, git: &GitCommand, url: &str) -> Result<RefMap> {
        let output = git.run(&["ls-remote", url], None).await?;
        Ok(parse_ls_remote(&output)
            .into_iter()
            .filter(|(name, _)| !is_excluded(name, &self.exclude_ref_prefixes))
            .collect())
    }
}

#[async_trait]
impl RepositoryMirror for GitMirror {
    async fn mirror(&self, source_url: &str, dest_url: &str, name: &str) -> Result<MirrorOutcome> {
        let git = GitCommand::new(&self.git_path)
            .with_secrets(url_password(source_url).into_iter().chain(url_password(dest_url)));

        if !self.overwrite {
            let existing = self.remote_refs(&git, dest_url).await?;
            if !existing.is_empty() {
                let source = self.remote_refs(&git, source_url).await?;
                let differing = diff_refs(&source, &existing);
                if differing.is_empty() {
                    info!(repo = %name, refs = existing.len(), "Destination already up to date");
                    return Ok(MirrorOutcome::UpToDate {
                        refs: existing.len(),
                    });
                }

                warn!(
                    repo = %name,
                    differing = differing.len(),
                    "Destination has diverged from source, skipping"
                );
                return Ok(MirrorOutcome::Diverged { differing });
            }
        }

        std::fs::create_dir_all(&self.workdir).map_err(|e| {
            Error::Other(format!(
                "Failed to create working directory {}: {}",
                self.workdir.display(),
                e
            ))
        })?;

        let local = self.clone_path(name);
        if local.exists() {
            warn!(path = %local.display(), "Removing clone left by an earlier run");
            std::fs::remove_dir_all(&local)?;
        }

        let local_str = local
            .to_str()
            .ok_or_else(|| Error::Other(format!("Invalid clone path: {}", local.display())))?;

        info!(repo = %name, path = %local.display(), "Cloning mirror");
        git.run(&["clone", "--mirror", "--quiet", source_url, local_str], None)
            .await?;

        let pruned = prune_refs(&local, &self.exclude_ref_prefixes)?;
        if pruned > 0 {
            debug!(repo = %name, pruned, "Pruned hidden refs");
        }

        let pushed = local_refs(&local)?;

        // git refuses to push a repository without refs
        if pushed.is_empty() {
            info!(repo = %name, "Source repository is empty, nothing to push");
        } else {
            Repository::open_bare(&local)?
                .remote(DESTINATION_REMOTE, dest_url)
                .map_err(|e| Error::Git(git.redact(e.message())))?;

            info!(repo = %name, "Pushing mirror to destination");
            git.run(&["push", "--mirror", "--quiet", DESTINATION_REMOTE], Some(&local))
                .await?;
        }

        if self.verify {
            let remote = self.remote_refs(&git, dest_url).await?;
            let differences = diff_refs(&pushed, &remote);
            if !differences.is_empty() {
                return Err(Error::Git(format!(
                    "Destination refs differ after push: {}",
                    differences.join(", ")
                )));
            }
        }

        std::fs::remove_dir_all(&local)?;

        Ok(MirrorOutcome::Pushed(MirrorStats {
            refs: pushed.len(),
            pruned,
            verified: self.verify,
        }))
    }
}

/// Turn a repository name into a single safe path component
fn sanitize_dir_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '-',
            c if c.is_whitespace() => '-',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "repo".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::refs::fixtures;
    use tempfile::TempDir;

    struct Sandbox {
        _root: TempDir,
        source: PathBuf,
        dest: PathBuf,
        workdir: PathBuf,
    }

    impl Sandbox {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let source = root.path().join("source");
            let dest = root.path().join("dest.git");
            let workdir = root.path().join("work");
            fixtures::source_repo(&source);
            Repository::init_bare(&dest).unwrap();
            Self {
                _root: root,
                source,
                dest,
                workdir,
            }
        }

        fn mirror(&self) -> GitMirror {
            GitMirror::new(&self.workdir)
        }

        fn source_url(&self) -> &str {
            self.source.to_str().unwrap()
        }

        fn dest_url(&self) -> &str {
            self.dest.to_str().unwrap()
        }
    }

    #[test]
    fn test_sanitize_dir_name() {
        assert_eq!(sanitize_dir_name("widget"), "widget");
        assert_eq!(sanitize_dir_name("My Widget"), "My-Widget");
        assert_eq!(sanitize_dir_name("../etc"), "-etc");
        assert_eq!(sanitize_dir_name(".."), "repo");
    }

    #[test]
    fn test_clone_path_stays_in_workdir() {
        let mirror = GitMirror::new("/tmp/work");
        assert_eq!(
            mirror.clone_path("group/widget"),
            PathBuf::from("/tmp/work/group-widget")
        );
    }

    #[tokio::test]
    async fn test_mirror_copies_all_refs() {
        let sandbox = Sandbox::new();
        let mirror = sandbox.mirror();

        let outcome = mirror
            .mirror(sandbox.source_url(), sandbox.dest_url(), "widget")
            .await
            .unwrap();

        let MirrorOutcome::Pushed(stats) = outcome else {
            panic!("expected the mirror to push");
        };
        assert_eq!(stats.pruned, 1);
        assert!(stats.verified);

        let mut expected = local_refs(&sandbox.source).unwrap();
        expected.remove("refs/merge-requests/1/head");
        let actual = local_refs(&sandbox.dest).unwrap();
        assert_eq!(expected, actual);
        assert_eq!(stats.refs, actual.len());

        // Clone directory is removed after success
        assert!(!mirror.clone_path("widget").exists());
        assert!(sandbox.workdir.exists());
    }

    #[tokio::test]
    async fn test_unrelated_destination_is_diverged() {
        let sandbox = Sandbox::new();
        let dest = Repository::open_bare(&sandbox.dest).unwrap();
        fixtures::commit(&dest, "refs/heads/stale", "unrelated", &[]);

        let outcome = sandbox
            .mirror()
            .mirror(sandbox.source_url(), sandbox.dest_url(), "widget")
            .await
            .unwrap();

        let MirrorOutcome::Diverged { differing } = outcome else {
            panic!("expected a diverged destination");
        };
        assert!(differing.contains(&"unexpected refs/heads/stale".to_string()));
        assert!(differing.contains(&"missing refs/heads/main".to_string()));
        let refs = local_refs(&sandbox.dest).unwrap();
        assert_eq!(refs.len(), 1);
        assert!(!sandbox.mirror().clone_path("widget").exists());
    }

    #[tokio::test]
    async fn test_partially_pushed_destination_is_diverged() {
        let sandbox = Sandbox::new();
        let mirror = sandbox.mirror();
        mirror
            .mirror(sandbox.source_url(), sandbox.dest_url(), "widget")
            .await
            .unwrap();

        // Leave the destination holding a strict subset of the source refs
        let dest = Repository::open_bare(&sandbox.dest).unwrap();
        dest.find_reference("refs/heads/feature")
            .unwrap()
            .delete()
            .unwrap();

        let outcome = mirror
            .mirror(sandbox.source_url(), sandbox.dest_url(), "widget")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            MirrorOutcome::Diverged {
                differing: vec!["missing refs/heads/feature".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_rerun_after_success_is_up_to_date() {
        let sandbox = Sandbox::new();
        let mirror = sandbox.mirror();

        let first = mirror
            .mirror(sandbox.source_url(), sandbox.dest_url(), "widget")
            .await
            .unwrap();
        let MirrorOutcome::Pushed(stats) = first else {
            panic!("expected the first run to push");
        };

        let second = mirror
            .mirror(sandbox.source_url(), sandbox.dest_url(), "widget")
            .await
            .unwrap();
        assert_eq!(second, MirrorOutcome::UpToDate { refs: stats.refs });
    }

    #[tokio::test]
    async fn test_empty_source_is_not_a_failure() {
        let sandbox = Sandbox::new();
        let empty = sandbox.workdir.with_file_name("empty.git");
        Repository::init_bare(&empty).unwrap();
        let mirror = sandbox.mirror();

        let outcome = mirror
            .mirror(empty.to_str().unwrap(), sandbox.dest_url(), "empty")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            MirrorOutcome::Pushed(MirrorStats {
                refs: 0,
                pruned: 0,
                verified: true,
            })
        );
        assert!(local_refs(&sandbox.dest).unwrap().is_empty());
        assert!(!mirror.clone_path("empty").exists());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_destination_refs() {
        let sandbox = Sandbox::new();
        let dest = Repository::open_bare(&sandbox.dest).unwrap();
        fixtures::commit(&dest, "refs/heads/stale", "unrelated", &[]);

        let outcome = sandbox
            .mirror()
            .with_overwrite(true)
            .mirror(sandbox.source_url(), sandbox.dest_url(), "widget")
            .await
            .unwrap();

        assert!(matches!(outcome, MirrorOutcome::Pushed(_)));
        let refs = local_refs(&sandbox.dest).unwrap();
        assert!(!refs.contains_key("refs/heads/stale"));
        assert!(refs.contains_key("refs/heads/feature"));
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent_with_overwrite() {
        let sandbox = Sandbox::new();
        let mirror = sandbox.mirror().with_overwrite(true);

        for _ in 0..2 {
            let outcome = mirror
                .mirror(sandbox.source_url(), sandbox.dest_url(), "widget")
                .await
                .unwrap();
            assert!(matches!(outcome, MirrorOutcome::Pushed(_)));
        }
    }

    #[tokio::test]
    async fn test_failed_clone_reports_error() {
        let sandbox = Sandbox::new();
        let missing = sandbox.workdir.join("no-such-repo");

        let result = sandbox
            .mirror()
            .mirror(missing.to_str().unwrap(), sandbox.dest_url(), "ghost")
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Git(_)));
        assert!(local_refs(&sandbox.dest).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_clone_is_replaced() {
        let sandbox = Sandbox::new();
        let mirror = sandbox.mirror();
        let stale = mirror.clone_path("widget");
        std::fs::create_dir_all(stale.join("leftover")).unwrap();

        let outcome = mirror
            .mirror(sandbox.source_url(), sandbox.dest_url(), "widget")
            .await
            .unwrap();

        assert!(matches!(outcome, MirrorOutcome::Pushed(_)));
        assert!(!stale.exists());
    }
}

//! End-to-end migration runs against local repositories
//!
//! The hosts are in-memory; repositories are real bare git repositories and
//! the mirror drives the git executable. HTTPS URLs produced by the workflow
//! are mapped onto directories under a temporary root.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use drover_core::git::local_refs;
use drover_core::{
    Error, GitMirror, Group, Instance, MigrateOptions, Migrator, MirrorOutcome, OutcomeStatus,
    Project, ProjectHost, ProvisionOutcome, RepositoryMirror, Result, Visibility,
};
use git2::{Oid, Repository, Signature};
use tempfile::TempDir;
use url::Url;

const SOURCE_TOKEN: &str = "glpat-source";
const DEST_TOKEN: &str = "glpat-dest";

struct LocalHost {
    instance: Instance,
    root: PathBuf,
    projects: Vec<Project>,
    existing: Mutex<HashSet<String>>,
}

impl LocalHost {
    fn new(root: &Path, base_url: &str, group: &str, token: &str) -> Self {
        Self {
            instance: Instance::new(base_url, group, token),
            root: root.to_path_buf(),
            projects: Vec::new(),
            existing: Mutex::new(HashSet::new()),
        }
    }

    fn repo_dir(&self, path: &str) -> PathBuf {
        let host = Url::parse(&self.instance.base_url).unwrap();
        self.root
            .join(host.host_str().unwrap())
            .join(&self.instance.group)
            .join(format!("{}.git", path))
    }
}

#[async_trait]
impl ProjectHost for LocalHost {
    fn instance(&self) -> &Instance {
        &self.instance
    }

    async fn resolve_group(&self, group: &str) -> Result<Group> {
        if group != self.instance.group {
            return Err(Error::Host(format!("Group not found: {}", group)));
        }
        Ok(Group {
            id: 7,
            name: group.to_string(),
            full_path: group.to_string(),
        })
    }

    async fn list_projects_page(&self, _group_id: u64, page: u32, per_page: u32) -> Result<Vec<Project>> {
        let start = ((page - 1) * per_page) as usize;
        Ok(self
            .projects
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect())
    }

    async fn provision_project(
        &self,
        group: &Group,
        _name: &str,
        path: &str,
        _visibility: Visibility,
    ) -> Result<ProvisionOutcome> {
        let url = format!("{}/{}/{}.git", self.instance.base_url, group.full_path, path);
        if !self.existing.lock().unwrap().insert(path.to_string()) {
            return Ok(ProvisionOutcome::AlreadyExists(url));
        }
        Repository::init_bare(self.repo_dir(path)).unwrap();
        Ok(ProvisionOutcome::Created(url))
    }
}

/// Rewrites credentialed HTTPS URLs to local paths before mirroring
struct LocalMirror {
    inner: GitMirror,
    root: PathBuf,
    seen_tokens: Mutex<Vec<String>>,
}

impl LocalMirror {
    fn new(root: &Path, workdir: &Path) -> Self {
        Self {
            inner: GitMirror::new(workdir),
            root: root.to_path_buf(),
            seen_tokens: Mutex::new(Vec::new()),
        }
    }

    fn local(&self, url: &str) -> String {
        let parsed = Url::parse(url).unwrap();
        if let Some(password) = parsed.password() {
            self.seen_tokens.lock().unwrap().push(password.to_string());
        }
        let dir = self
            .root
            .join(parsed.host_str().unwrap())
            .join(parsed.path().trim_start_matches('/'));
        dir.to_str().unwrap().to_string()
    }
}

#[async_trait]
impl RepositoryMirror for LocalMirror {
    async fn mirror(&self, source_url: &str, dest_url: &str, name: &str) -> Result<MirrorOutcome> {
        let source = self.local(source_url);
        let dest = self.local(dest_url);
        self.inner.mirror(&source, &dest, name).await
    }
}

struct World {
    root: TempDir,
    workdir: PathBuf,
    source: LocalHost,
    destination: LocalHost,
}

impl World {
    /// Source group `legacy` on src.test holding `paths`; `broken` paths are
    /// listed but have no repository behind them
    fn new(paths: &[&str], broken: &[&str]) -> Self {
        let root = TempDir::new().unwrap();
        let workdir = root.path().join("work");
        let mut source = LocalHost::new(root.path(), "https://src.test", "legacy", SOURCE_TOKEN);
        let destination = LocalHost::new(root.path(), "https://dst.test", "archive", DEST_TOKEN);

        for path in paths {
            if !broken.contains(path) {
                seed_repository(&source.repo_dir(path));
            }
            source.projects.push(Project {
                name: path.to_uppercase(),
                path: path.to_string(),
                group_id: 7,
                http_url_to_repo: Some(format!("https://src.test/legacy/{}.git", path)),
            });
        }

        Self {
            root,
            workdir,
            source,
            destination,
        }
    }

    fn root(&self) -> &Path {
        self.root.path()
    }

    fn mirror(&self) -> LocalMirror {
        LocalMirror::new(self.root(), &self.workdir)
    }
}

fn seed_repository(path: &Path) {
    let repo = Repository::init_bare(path).unwrap();
    let first = commit(&repo, "refs/heads/main", "initial", &[]);
    let second = commit(&repo, "refs/heads/main", "second", &[first]);
    commit(&repo, "refs/heads/topic", "topic", &[first]);
    repo.reference("refs/tags/v1.0", second, false, "tag").unwrap();
    repo.reference("refs/merge-requests/3/head", second, false, "mr")
        .unwrap();
    repo.set_head("refs/heads/main").unwrap();
}

fn commit(repo: &Repository, refname: &str, message: &str, parents: &[Oid]) -> Oid {
    let sig = Signature::now("Drover Test", "drover@example.com").unwrap();
    let tree_id = repo.treebuilder(None).unwrap().write().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let parents: Vec<_> = parents
        .iter()
        .map(|oid| repo.find_commit(*oid).unwrap())
        .collect();
    let parent_refs: Vec<_> = parents.iter().collect();
    repo.commit(Some(refname), &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

#[tokio::test]
async fn test_migrates_every_ref_and_isolates_failures() {
    let world = World::new(&["alpha", "broken", "gamma"], &["broken"]);
    let mirror = world.mirror();

    let report = Migrator::new(&world.source, &world.destination, &mirror, MigrateOptions::default())
        .run()
        .await
        .unwrap();

    let paths: Vec<_> = report.outcomes.iter().map(|o| o.path.as_str()).collect();
    assert_eq!(paths, vec!["alpha", "broken", "gamma"]);
    assert_eq!(report.migrated(), 2);
    assert_eq!(report.failed(), 1);
    assert!(report.outcomes[1].is_failed());

    for path in ["alpha", "gamma"] {
        let mut expected = local_refs(&world.source.repo_dir(path)).unwrap();
        expected.remove("refs/merge-requests/3/head");
        let actual = local_refs(&world.destination.repo_dir(path)).unwrap();
        assert_eq!(expected, actual, "refs of {}", path);
        assert!(!mirror.inner.clone_path(path).exists());
    }

    let tokens = mirror.seen_tokens.lock().unwrap();
    assert!(tokens.iter().any(|t| t == SOURCE_TOKEN));
    assert!(tokens.iter().any(|t| t == DEST_TOKEN));
}

#[tokio::test]
async fn test_rerun_recognises_mirrored_destinations() {
    let world = World::new(&["alpha"], &[]);
    let mirror = world.mirror();
    let migrator = Migrator::new(&world.source, &world.destination, &mirror, MigrateOptions::default());

    let first = migrator.run().await.unwrap();
    assert_eq!(first.migrated(), 1);
    assert_eq!(first.outcomes[0].created, Some(true));

    let second = migrator.run().await.unwrap();
    assert_eq!(second.up_to_date(), 1);
    assert_eq!(second.outcomes[0].created, Some(false));
    assert!(second.is_complete());
}

#[tokio::test]
async fn test_rerun_flags_partially_pushed_destination() {
    let world = World::new(&["alpha"], &[]);
    let mirror = world.mirror();
    let migrator = Migrator::new(&world.source, &world.destination, &mirror, MigrateOptions::default());
    migrator.run().await.unwrap();

    let dest = Repository::open_bare(world.destination.repo_dir("alpha")).unwrap();
    dest.find_reference("refs/tags/v1.0")
        .unwrap()
        .delete()
        .unwrap();

    let second = migrator.run().await.unwrap();
    assert_eq!(second.diverged(), 1);
    assert!(!second.is_complete());
    let OutcomeStatus::Diverged { differing } = &second.outcomes[0].status else {
        panic!("expected the destination to be reported as diverged");
    };
    assert_eq!(differing, &vec!["missing refs/tags/v1.0".to_string()]);
}

#[tokio::test]
async fn test_empty_source_repository_migrates() {
    let world = World::new(&["alpha", "blank"], &["blank"]);
    Repository::init_bare(world.source.repo_dir("blank")).unwrap();
    let mirror = world.mirror();

    let report = Migrator::new(&world.source, &world.destination, &mirror, MigrateOptions::default())
        .run()
        .await
        .unwrap();

    assert_eq!(report.migrated(), 2);
    assert!(report.is_complete());
    assert!(local_refs(&world.destination.repo_dir("blank"))
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_rerun_with_overwrite_pushes_again() {
    let world = World::new(&["alpha"], &[]);
    let mirror = LocalMirror {
        inner: GitMirror::new(&world.workdir).with_overwrite(true),
        ..world.mirror()
    };
    let migrator = Migrator::new(&world.source, &world.destination, &mirror, MigrateOptions::default());

    migrator.run().await.unwrap();
    let second = migrator.run().await.unwrap();

    assert_eq!(second.migrated(), 1);
    assert_eq!(
        local_refs(&world.source.repo_dir("alpha")).unwrap().len() - 1,
        local_refs(&world.destination.repo_dir("alpha")).unwrap().len()
    );
}

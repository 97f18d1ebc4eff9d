//! The migration workflow: list, provision, mirror
//!
//! Projects are handled one at a time. Failing to list the source or to
//! provision a destination project aborts the run; a failed mirror is
//! recorded and the run moves on to the next project.

use tracing::{error, info, warn};

use crate::config::{Config, Visibility, MAX_PER_PAGE};
use crate::credentials::authenticated_url;
use crate::git::{MirrorOutcome, RepositoryMirror};
use crate::host::ProjectHost;
use crate::listing::ProjectLister;
use crate::project::{Group, Project, ProvisionOutcome};
use crate::report::{MigrationReport, OutcomeStatus, ProjectOutcome};
use crate::Result;

/// Knobs for a migration run
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// Page size for listing source projects
    pub per_page: u32,
    /// Visibility for created destination projects
    pub visibility: Visibility,
    /// List only; neither provision nor push
    pub dry_run: bool,
    /// Restrict the run to these project paths (all when empty)
    pub only: Vec<String>,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            per_page: MAX_PER_PAGE,
            visibility: Visibility::Private,
            dry_run: false,
            only: Vec::new(),
        }
    }
}

impl MigrateOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            per_page: config.migration.per_page,
            visibility: config.migration.visibility,
            ..Default::default()
        }
    }
}

/// Progress notifications emitted while a run is underway
#[derive(Debug)]
pub enum Progress<'a> {
    /// Source listing finished
    Listed { total: usize },
    /// About to migrate `project` (1-based `index` of `total`)
    Started {
        index: usize,
        total: usize,
        project: &'a Project,
    },
    /// Destination project is ready
    Provisioned {
        project: &'a Project,
        outcome: &'a ProvisionOutcome,
    },
    /// Project finished, successfully or not
    Finished(&'a ProjectOutcome),
}

type ProgressFn<'a> = Box<dyn Fn(Progress<'_>) + Send + Sync + 'a>;

/// Moves every project of the source group into the destination group
pub struct Migrator<'a, S: ?Sized, D: ?Sized, M: ?Sized> {
    source: &'a S,
    destination: &'a D,
    mirror: &'a M,
    options: MigrateOptions,
    progress: Option<ProgressFn<'a>>,
}

impl<'a, S, D, M> Migrator<'a, S, D, M>
where
    S: ProjectHost + ?Sized,
    D: ProjectHost + ?Sized,
    M: RepositoryMirror + ?Sized,
{
    pub fn new(source: &'a S, destination: &'a D, mirror: &'a M, options: MigrateOptions) -> Self {
        Self {
            source,
            destination,
            mirror,
            options,
            progress: None,
        }
    }

    /// Call `f` as the run progresses
    pub fn on_progress(mut self, f: impl Fn(Progress<'_>) + Send + Sync + 'a) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    fn emit(&self, event: Progress<'_>) {
        if let Some(f) = &self.progress {
            f(event);
        }
    }

    /// Resolve the source group and list its projects, applying `only`
    pub async fn list_source(&self) -> Result<(Group, Vec<Project>)> {
        let instance = self.source.instance();
        let group = self.source.resolve_group(&instance.group).await?;
        info!(group = %group.full_path, id = group.id, "Resolved source group");

        let projects = ProjectLister::new(self.source, group.id, self.options.per_page)
            .collect_all()
            .await?;
        info!(count = projects.len(), "Listed source projects");

        Ok((group, self.select(projects)))
    }

    fn select(&self, projects: Vec<Project>) -> Vec<Project> {
        if self.options.only.is_empty() {
            return projects;
        }

        for wanted in &self.options.only {
            if !projects.iter().any(|p| &p.path == wanted) {
                warn!(project = %wanted, "Requested project not found in source group");
            }
        }

        projects
            .into_iter()
            .filter(|p| self.options.only.contains(&p.path))
            .collect()
    }

    /// Run the whole migration
    pub async fn run(&self) -> Result<MigrationReport> {
        let (source_group, projects) = self.list_source().await?;
        let total = projects.len();
        self.emit(Progress::Listed { total });

        let dest_instance = self.destination.instance();

        // A dry run never contacts the destination, so only the configured name is known
        if self.options.dry_run {
            let mut report = MigrationReport::new(
                source_group.full_path.clone(),
                dest_instance.group.clone(),
                true,
            );
            for project in &projects {
                let outcome = ProjectOutcome::new(project, OutcomeStatus::Planned);
                self.emit(Progress::Finished(&outcome));
                report.record(outcome);
            }
            report.finish();
            return Ok(report);
        }

        let dest_group = self.destination.resolve_group(&dest_instance.group).await?;
        info!(group = %dest_group.full_path, id = dest_group.id, "Resolved destination group");

        let mut report = MigrationReport::new(
            source_group.full_path.clone(),
            dest_group.full_path.clone(),
            false,
        );

        for (i, project) in projects.iter().enumerate() {
            self.emit(Progress::Started {
                index: i + 1,
                total,
                project,
            });
            info!(project = %project.path, index = i + 1, total, "Migrating project");

            let outcome = self
                .migrate_project(project, &source_group, &dest_group)
                .await?;
            self.emit(Progress::Finished(&outcome));
            report.record(outcome);
        }

        report.finish();
        info!(
            migrated = report.migrated(),
            up_to_date = report.up_to_date(),
            diverged = report.diverged(),
            failed = report.failed(),
            "Migration complete"
        );

        Ok(report)
    }

    /// Provision and mirror one project
    ///
    /// Provisioning errors are returned; mirror errors become a `Failed`
    /// outcome.
    async fn migrate_project(
        &self,
        project: &Project,
        source_group: &Group,
        dest_group: &Group,
    ) -> Result<ProjectOutcome> {
        let provision = self
            .destination
            .provision_project(
                dest_group,
                &project.name,
                &project.path,
                self.options.visibility,
            )
            .await?;

        match &provision {
            ProvisionOutcome::Created(url) => {
                info!(project = %project.path, url = %url, "Created destination project")
            }
            ProvisionOutcome::AlreadyExists(url) => {
                info!(project = %project.path, url = %url, "Destination project already exists, continuing")
            }
        }
        self.emit(Progress::Provisioned {
            project,
            outcome: &provision,
        });

        let status = match self.mirror_project(project, source_group, &provision).await {
            Ok(MirrorOutcome::Pushed(stats)) => OutcomeStatus::Migrated { stats },
            Ok(MirrorOutcome::UpToDate { refs }) => OutcomeStatus::UpToDate { refs },
            Ok(MirrorOutcome::Diverged { differing }) => OutcomeStatus::Diverged { differing },
            Err(e) => {
                error!(project = %project.path, error = %e, "Mirroring failed");
                OutcomeStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        Ok(ProjectOutcome::new(project, status)
            .with_destination(provision.url(), provision.is_new()))
    }

    async fn mirror_project(
        &self,
        project: &Project,
        source_group: &Group,
        provision: &ProvisionOutcome,
    ) -> Result<MirrorOutcome> {
        let source = self.source.instance();
        let dest = self.destination.instance();

        let source_url = authenticated_url(
            &project.clone_url(&source.base_url, &source_group.full_path),
            &source.token,
        )?;
        let dest_url = authenticated_url(provision.url(), &dest.token)?;

        self.mirror
            .mirror(&source_url, &dest_url, &project.path)
            .await
    }
}

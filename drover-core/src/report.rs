//! Per-project outcomes and the run summary

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::git::MirrorStats;
use crate::project::Project;
use crate::{Error, Result};

/// How a single project ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Dry run: would have been migrated
    Planned,
    /// All refs were pushed to the destination
    Migrated { stats: MirrorStats },
    /// Destination already held exactly the source's refs
    UpToDate { refs: usize },
    /// Destination holds other refs; left untouched
    Diverged { differing: Vec<String> },
    /// Clone, push or verification failed
    Failed { error: String },
}

/// Result for one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectOutcome {
    pub name: String,
    pub path: String,
    /// Destination clone URL, without credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_url: Option<String>,
    /// Whether the destination project was newly created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl ProjectOutcome {
    pub fn new(project: &Project, status: OutcomeStatus) -> Self {
        Self {
            name: project.name.clone(),
            path: project.path.clone(),
            destination_url: None,
            created: None,
            status,
        }
    }

    pub fn with_destination(mut self, url: impl Into<String>, created: bool) -> Self {
        self.destination_url = Some(url.into());
        self.created = Some(created);
        self
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }

    /// Whether the destination does not yet match the source
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self.status,
            OutcomeStatus::Failed { .. } | OutcomeStatus::Diverged { .. }
        )
    }
}

/// Summary of a migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub source_group: String,
    pub destination_group: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcomes: Vec<ProjectOutcome>,
}

impl MigrationReport {
    pub fn new(
        source_group: impl Into<String>,
        destination_group: impl Into<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            source_group: source_group.into(),
            destination_group: destination_group.into(),
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: ProjectOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn migrated(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Migrated { .. }))
    }

    pub fn up_to_date(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::UpToDate { .. }))
    }

    pub fn diverged(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Diverged { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Failed { .. }))
    }

    pub fn planned(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Planned))
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(ProjectOutcome::is_failed)
    }

    /// Whether every project ended with a destination matching its source
    pub fn is_complete(&self) -> bool {
        !self.outcomes.iter().any(ProjectOutcome::is_incomplete)
    }

    /// Outcomes of projects that failed or diverged, in run order
    pub fn failures(&self) -> impl Iterator<Item = &ProjectOutcome> {
        self.outcomes.iter().filter(|o| o.is_incomplete())
    }

    /// Wall-clock duration, once finished
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| {
            Error::Other(format!("Failed to write report to {}: {}", path.display(), e))
        })
    }

    /// Read a report written by [`MigrationReport::write_json`]
    pub fn read_json(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn count(&self, pred: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

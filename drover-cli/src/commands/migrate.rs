//! Migrate command - move every project of the source group

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use drover_core::config::CliOverrides;
use drover_core::{
    Config, GitMirror, MigrateOptions, MigrationReport, Migrator, OutcomeStatus, Progress,
    ProvisionOutcome, Secrets, Visibility,
};
use drover_gitlab::GitLabClient;

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// List what would be migrated without creating or pushing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Force-push into destination projects that already have refs
    #[arg(long)]
    pub overwrite: bool,

    /// Skip comparing destination refs after each push
    #[arg(long)]
    pub no_verify: bool,

    /// Only migrate the project with this path (repeatable)
    #[arg(long, value_name = "PATH")]
    pub only: Vec<String>,

    /// Write a JSON report of the run to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Directory for temporary mirror clones
    #[arg(short = 'w', long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// Visibility of newly created destination projects
    #[arg(long, value_name = "LEVEL")]
    pub visibility: Option<Visibility>,
}

impl MigrateArgs {
    /// Execute the migrate command
    pub async fn execute(&self, config: Config, verbose: bool) -> anyhow::Result<()> {
        let config = config.with_cli_overrides(CliOverrides {
            workdir: self.workdir.clone(),
            visibility: self.visibility,
            overwrite: self.overwrite,
            no_verify: self.no_verify,
            ..Default::default()
        });
        config.validate()?;

        let secrets = Secrets::load()?;
        let source_token = secrets.require_source_token()?;
        // A dry run never talks to the destination API
        let dest_token = if self.dry_run {
            secrets.destination_token().unwrap_or_default()
        } else {
            secrets.require_destination_token()?
        };

        let source = GitLabClient::new(
            super::instance("Source", &config.source, source_token)?,
            config.http.timeout,
        )?;
        let destination = GitLabClient::new(
            super::instance("Destination", &config.destination, dest_token)?,
            config.http.timeout,
        )?;
        let mirror = GitMirror::from_config(&config)?;

        if verbose {
            println!("Working directory: {}", mirror.workdir().display());
        }

        let options = MigrateOptions {
            dry_run: self.dry_run,
            only: self.only.clone(),
            ..MigrateOptions::from_config(&config)
        };

        let report = Migrator::new(&source, &destination, &mirror, options)
            .on_progress(print_progress)
            .run()
            .await
            .context("Migration aborted")?;

        print_summary(&report);

        if let Some(path) = &self.report {
            report.write_json(path)?;
            println!("Report written to {}", path.display());
        }

        if !report.is_complete() {
            anyhow::bail!(
                "{} project(s) failed, {} diverged",
                report.failed(),
                report.diverged()
            );
        }

        Ok(())
    }
}

fn print_progress(event: Progress<'_>) {
    match event {
        Progress::Listed { total } => {
            println!("Found {} project(s) to migrate", total);
        }
        Progress::Started {
            index,
            total,
            project,
        } => {
            println!();
            println!("[{}/{}] {} ({})", index, total, project.name, project.path);
        }
        Progress::Provisioned { outcome, .. } => match outcome {
            ProvisionOutcome::Created(url) => println!("  created {}", url),
            ProvisionOutcome::AlreadyExists(url) => {
                println!("  already exists, continuing: {}", url)
            }
        },
        Progress::Finished(outcome) => match &outcome.status {
            OutcomeStatus::Planned => println!("  would migrate {}", outcome.path),
            OutcomeStatus::Migrated { stats } => {
                let check = if stats.verified { ", verified" } else { "" };
                println!("  pushed {} ref(s){}", stats.refs, check);
            }
            OutcomeStatus::UpToDate { refs } => println!("  already up to date ({} refs)", refs),
            OutcomeStatus::Diverged { differing } => {
                eprintln!(
                    "  diverged: destination differs in {} ref(s); rerun with --overwrite to replace it",
                    differing.len()
                )
            }
            OutcomeStatus::Failed { error } => eprintln!("  failed: {}", error),
        },
    }
}

fn print_summary(report: &MigrationReport) {
    println!();
    if report.dry_run {
        println!(
            "Dry run: {} project(s) would be migrated from {} to {}",
            report.planned(),
            report.source_group,
            report.destination_group
        );
        return;
    }

    let elapsed = report
        .duration()
        .map(|d| format!(" in {}s", d.num_seconds()))
        .unwrap_or_default();
    println!(
        "Migration complete{}: {} migrated, {} up to date, {} diverged, {} failed",
        elapsed,
        report.migrated(),
        report.up_to_date(),
        report.diverged(),
        report.failed()
    );

    for outcome in report.failures() {
        match &outcome.status {
            OutcomeStatus::Failed { error } => eprintln!("  {}: {}", outcome.path, error),
            OutcomeStatus::Diverged { differing } => {
                eprintln!("  {}: {}", outcome.path, differing.join(", "))
            }
            _ => {}
        }
    }
}

//! List command - show the projects drover would migrate

use clap::Args;
use drover_core::{Config, ProjectHost, ProjectLister, Secrets};
use drover_gitlab::GitLabClient;

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print the projects as JSON
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    /// Execute the list command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let token = Secrets::load()?.require_source_token()?;
        let instance = super::instance("Source", &config.source, token)?;
        let client = GitLabClient::new(instance, config.http.timeout)?;

        let group = client.resolve_group(&client.instance().group).await?;
        let projects = ProjectLister::new(&client, group.id, config.migration.per_page)
            .collect_all()
            .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&projects)?);
            return Ok(());
        }

        println!("{} ({} projects)", group.full_path, projects.len());
        println!();
        for project in &projects {
            println!(
                "  {:<32} {:<32} {}",
                project.name,
                project.path,
                project.clone_url(client.base_url(), &group.full_path)
            );
        }

        Ok(())
    }
}

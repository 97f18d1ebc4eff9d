//! Secrets file management

use clap::{Args, Subcommand};
use drover_core::Secrets;

/// Secrets file commands
#[derive(Args, Debug)]
pub struct SecretsArgs {
    #[command(subcommand)]
    pub command: SecretsCommand,
}

#[derive(Subcommand, Debug)]
pub enum SecretsCommand {
    /// Write a template secrets file with owner-only permissions
    Init,

    /// Show where the secrets file is expected
    Path,
}

impl SecretsArgs {
    /// Execute the secrets command
    pub fn execute(&self) -> anyhow::Result<()> {
        match self.command {
            SecretsCommand::Init => {
                let path = Secrets::create_template()?;
                println!("Created {}", path.display());
                println!("Add your source and destination tokens, then run `drover migrate`.");
            }
            SecretsCommand::Path => match Secrets::default_secrets_path() {
                Some(path) => println!("{}", path.display()),
                None => anyhow::bail!("Could not determine secrets path"),
            },
        }
        Ok(())
    }
}

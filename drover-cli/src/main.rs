//! Drover CLI - Command line interface for drover
//!
//! Moves every repository of a GitLab group into a group on another (or the
//! same) GitLab instance, full history included.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use drover_core::config::CliOverrides;
use drover_core::{Config, Secrets};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{ListArgs, MigrateArgs, SecretsArgs};

/// Drover: mirror a GitLab group's repositories into another group
#[derive(Parser, Debug)]
#[command(name = "drover")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/drover/config.toml)
    #[arg(short, long, global = true, env = "DROVER_CONFIG")]
    config: Option<PathBuf>,

    /// Source GitLab URL (overrides config and env)
    #[arg(long, global = true)]
    source_url: Option<String>,

    /// Source group name or full path (overrides config and env)
    #[arg(long, global = true)]
    source_group: Option<String>,

    /// Destination GitLab URL (overrides config and env)
    #[arg(long, global = true)]
    dest_url: Option<String>,

    /// Destination group name or full path (overrides config and env)
    #[arg(long, global = true)]
    dest_group: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Migrate every project of the source group to the destination
    #[command(visible_alias = "m")]
    Migrate(MigrateArgs),

    /// List the projects of the source group
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Manage the secrets file
    Secrets(SecretsArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise warnings only, or debug for our crates with -v
    let default_filter = if cli.verbose {
        "warn,drover=debug,drover_core=debug,drover_gitlab=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let overrides = CliOverrides {
        source_url: cli.source_url.clone(),
        source_group: cli.source_group.clone(),
        dest_url: cli.dest_url.clone(),
        dest_group: cli.dest_group.clone(),
        ..Default::default()
    };
    let config = Config::load_with_overrides(cli.config.as_deref(), overrides)?;

    if cli.verbose {
        tracing::info!(
            source = ?config.source.url,
            destination = ?config.destination.url,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("drover {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Migrate(args)) => {
            args.execute(config, cli.verbose).await?;
        }
        Some(Commands::List(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Secrets(args)) => {
            args.execute()?;
        }
        Some(Commands::Config) => {
            print_config(&config, cli.config.as_deref());
        }
        None => {
            println!("Drover - mirror a GitLab group's repositories into another group");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn print_config(config: &Config, explicit_path: Option<&std::path::Path>) {
    let unset = "(not set)";
    let secrets = Secrets::load();

    println!("Drover Configuration");
    println!("====================");
    println!();
    println!("Source:");
    println!("  url:   {}", config.source.url.as_deref().unwrap_or(unset));
    println!("  group: {}", config.source.group.as_deref().unwrap_or(unset));
    println!();
    println!("Destination:");
    println!("  url:   {}", config.destination.url.as_deref().unwrap_or(unset));
    println!("  group: {}", config.destination.group.as_deref().unwrap_or(unset));
    println!();
    println!("Migration:");
    match config.workdir() {
        Ok(dir) => println!("  workdir:    {}", dir.display()),
        Err(e) => println!("  workdir:    ({})", e),
    }
    println!("  per_page:   {}", config.migration.per_page);
    println!("  visibility: {}", config.migration.visibility);
    println!("  git_path:   {}", config.migration.git_path);
    println!("  overwrite:  {}", config.migration.overwrite);
    println!("  verify:     {}", config.migration.verify);
    println!(
        "  excluded refs: {}",
        config.migration.exclude_ref_prefixes.join(", ")
    );
    if let Some(timeout) = config.http.timeout {
        println!("  http timeout: {:?}", timeout);
    }
    println!();

    println!("Tokens:");
    match secrets {
        Ok(secrets) => {
            let state = |t: Option<String>| if t.is_some() { "set" } else { "not set" };
            println!("  source:      {}", state(secrets.source_token()));
            println!("  destination: {}", state(secrets.destination_token()));
        }
        Err(e) => println!("  (failed to load secrets: {})", e),
    }
    println!();

    let path = explicit_path
        .map(|p| p.to_path_buf())
        .or_else(Config::default_config_path);
    if let Some(path) = path {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}
